//! Capability traits for the upstream providers.
//!
//! Every provider is modelled as a remote call that can fail with a
//! `ProviderError`. Implementations must be `Send + Sync` so a single
//! instance can be shared across concurrent quest builds behind an `Arc`.

use async_trait::async_trait;
use quest_model::{Artwork, BoundingBox, Location, Museum, ProviderResult, User};
use std::fmt;

/// Profile service: user records and preference tags.
#[async_trait]
pub trait UserProvider: Send + Sync {
    async fn user(&self, user_id: &str) -> ProviderResult<User>;

    /// Ordered preference tags of a user
    async fn preferences(&self, user_id: &str) -> ProviderResult<Vec<String>>;
}

/// Geolocation service: last known position of a user.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn user_location(&self, user_id: &str) -> ProviderResult<Location>;
}

/// Museum catalog.
#[async_trait]
pub trait MuseumCatalog: Send + Sync {
    async fn museum(&self, museum_id: &str) -> ProviderResult<Museum>;

    async fn museums_by_name(&self, name: &str) -> ProviderResult<Vec<Museum>>;

    async fn museums_in(&self, window: &BoundingBox) -> ProviderResult<Vec<Museum>>;
}

/// Artwork catalog.
#[async_trait]
pub trait ArtworkCatalog: Send + Sync {
    async fn artworks_of(&self, museum_id: &str) -> ProviderResult<Vec<Artwork>>;
}

/// Route-distance provider.
///
/// Returns one distance per destination, aligned positionally. Unreachable
/// destinations come back as NaN. An empty destination list yields an empty
/// result without any remote call.
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    async fn table_distances(
        &self,
        source: Location,
        destinations: &[Location],
    ) -> ProviderResult<Vec<f64>>;
}

/// Quest states tracked by the crowd-status service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestStatus {
    InProgress,
    Pending,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::InProgress => "in_progress",
            QuestStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live crowd-status provider.
///
/// `Ok(None)` means the service answered but did not know the count.
#[async_trait]
pub trait CrowdStatusProvider: Send + Sync {
    async fn count_by_status(
        &self,
        museum_id: &str,
        status: QuestStatus,
    ) -> ProviderResult<Option<u32>>;
}

/// Free-form text generation (a language model behind an HTTP endpoint).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> ProviderResult<String>;
}
