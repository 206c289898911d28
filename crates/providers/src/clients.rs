//! HTTP implementations of the provider traits.

use crate::config::{ConfigError, ProviderConfig};
use crate::http::UpstreamClient;
use crate::payload;
use crate::traits::*;
use async_trait::async_trait;
use quest_model::{Artwork, BoundingBox, Location, Museum, ProviderResult, User};
use serde_json::json;
use tracing::{debug, instrument};

// =============================================================================
// Profile and location
// =============================================================================

/// Client for the user profile service
#[derive(Debug, Clone)]
pub struct HttpUserProvider {
    client: UpstreamClient,
}

impl HttpUserProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: UpstreamClient::new("users", &config.user_url, config.request_timeout)?,
        })
    }
}

#[async_trait]
impl UserProvider for HttpUserProvider {
    #[instrument(skip(self))]
    async fn user(&self, user_id: &str) -> ProviderResult<User> {
        self.client.get_json(&format!("/{}", user_id), &[]).await
    }

    #[instrument(skip(self))]
    async fn preferences(&self, user_id: &str) -> ProviderResult<Vec<String>> {
        let raw = self
            .client
            .get_text(&format!("/{}/preferences", user_id), &[])
            .await?;
        payload::parse_preferences(self.client.service(), &raw)
    }
}

/// Client for the geolocation service
#[derive(Debug, Clone)]
pub struct HttpLocationProvider {
    client: UpstreamClient,
}

impl HttpLocationProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: UpstreamClient::new("location", &config.location_url, config.request_timeout)?,
        })
    }
}

#[async_trait]
impl LocationProvider for HttpLocationProvider {
    #[instrument(skip(self))]
    async fn user_location(&self, user_id: &str) -> ProviderResult<Location> {
        self.client.get_json(&format!("/{}", user_id), &[]).await
    }
}

// =============================================================================
// Catalogs
// =============================================================================

/// Client for the museum catalog
#[derive(Debug, Clone)]
pub struct HttpMuseumCatalog {
    client: UpstreamClient,
}

impl HttpMuseumCatalog {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: UpstreamClient::new("museums", &config.museum_url, config.request_timeout)?,
        })
    }
}

#[async_trait]
impl MuseumCatalog for HttpMuseumCatalog {
    #[instrument(skip(self))]
    async fn museum(&self, museum_id: &str) -> ProviderResult<Museum> {
        self.client.get_json(&format!("/{}", museum_id), &[]).await
    }

    #[instrument(skip(self))]
    async fn museums_by_name(&self, name: &str) -> ProviderResult<Vec<Museum>> {
        self.client
            .get_json("/search", &[("name", name.to_string())])
            .await
    }

    #[instrument(skip(self))]
    async fn museums_in(&self, window: &BoundingBox) -> ProviderResult<Vec<Museum>> {
        let museums: Vec<Museum> = self
            .client
            .get_json(
                "/search",
                &[
                    ("minLat", window.min_lat.to_string()),
                    ("maxLat", window.max_lat.to_string()),
                    ("minLon", window.min_lon.to_string()),
                    ("maxLon", window.max_lon.to_string()),
                ],
            )
            .await?;
        debug!("Found {} museums in window", museums.len());
        Ok(museums)
    }
}

/// Client for the artwork catalog
#[derive(Debug, Clone)]
pub struct HttpArtworkCatalog {
    client: UpstreamClient,
}

impl HttpArtworkCatalog {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: UpstreamClient::new("artworks", &config.artwork_url, config.request_timeout)?,
        })
    }
}

#[async_trait]
impl ArtworkCatalog for HttpArtworkCatalog {
    #[instrument(skip(self))]
    async fn artworks_of(&self, museum_id: &str) -> ProviderResult<Vec<Artwork>> {
        // Some deployments answer `null` for museums without artworks
        let artworks: Option<Vec<Artwork>> = self
            .client
            .get_json("/search", &[("museum", museum_id.to_string())])
            .await?;
        Ok(artworks.unwrap_or_default())
    }
}

// =============================================================================
// Routing and crowd status
// =============================================================================

/// Client for an OSRM-compatible table service (walking profile)
#[derive(Debug, Clone)]
pub struct HttpDistanceProvider {
    client: UpstreamClient,
}

impl HttpDistanceProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: UpstreamClient::new("routing", &config.routing_url, config.request_timeout)?,
        })
    }

    /// Path and query of a one-source table request.
    ///
    /// OSRM takes `lon,lat` pairs separated by `;`; the source is index 0 and
    /// the destinations follow it.
    pub fn table_path(source: Location, destinations: &[Location]) -> String {
        let coords = std::iter::once(source)
            .chain(destinations.iter().copied())
            .map(|l| format!("{},{}", l.longitude, l.latitude))
            .collect::<Vec<_>>()
            .join(";");
        let indices = (1..=destinations.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "/table/v1/walking/{}?sources=0&destinations={}&annotations=distance",
            coords, indices
        )
    }
}

#[async_trait]
impl DistanceProvider for HttpDistanceProvider {
    #[instrument(skip(self, destinations), fields(destinations = destinations.len()))]
    async fn table_distances(
        &self,
        source: Location,
        destinations: &[Location],
    ) -> ProviderResult<Vec<f64>> {
        if destinations.is_empty() {
            return Ok(Vec::new());
        }
        let raw = self
            .client
            .get_text(&Self::table_path(source, destinations), &[])
            .await?;
        payload::parse_distance_row(self.client.service(), &raw)
    }
}

/// Client for the quest-manager status endpoint
#[derive(Debug, Clone)]
pub struct HttpCrowdStatus {
    client: UpstreamClient,
}

impl HttpCrowdStatus {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: UpstreamClient::new("crowd", &config.crowd_url, config.request_timeout)?,
        })
    }
}

#[async_trait]
impl CrowdStatusProvider for HttpCrowdStatus {
    #[instrument(skip(self))]
    async fn count_by_status(
        &self,
        museum_id: &str,
        status: QuestStatus,
    ) -> ProviderResult<Option<u32>> {
        let raw = self
            .client
            .get_text(
                "/status",
                &[
                    ("subject", museum_id.to_string()),
                    ("status", status.as_str().to_string()),
                    ("full", "false".to_string()),
                ],
            )
            .await?;
        Ok(payload::parse_crowd_count(&raw))
    }
}

// =============================================================================
// Text generation
// =============================================================================

/// Client for the chat/generation endpoint
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    client: UpstreamClient,
    model: Option<String>,
}

impl HttpTextGenerator {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: UpstreamClient::new("chat", &config.chat_url, config.request_timeout)?,
            model: config.chat_model.clone(),
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        match &self.model {
            Some(model) => json!({ "model": model, "prompt": prompt, "stream": false }),
            None => json!({ "prompt": prompt }),
        }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        let raw = self
            .client
            .post_json("/generate", &self.request_body(prompt))
            .await?;
        Ok(payload::parse_chat_reply(&raw))
    }
}
