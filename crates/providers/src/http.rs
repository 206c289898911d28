//! Shared HTTP plumbing for the upstream clients.
//!
//! Every client wraps an `UpstreamClient`, which owns a pooled
//! `reqwest::Client`, a base URL and the service name used in errors.
//!
//! Failure mapping:
//! - non-2xx status: `ProviderError::UpstreamHttp` with status and body verbatim
//! - send failure, timeout, undecodable body: `ProviderError::Unavailable`

use crate::config::ConfigError;
use quest_model::{ProviderError, ProviderResult};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: String,
    service: &'static str,
}

impl UpstreamClient {
    pub fn new(
        service: &'static str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        reqwest::Url::parse(base_url).map_err(|_| ConfigError::InvalidUrl {
            service,
            value: base_url.to_string(),
        })?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` with query parameters and return the raw body of a 2xx response.
    pub async fn get_text(&self, path: &str, query: &[(&str, String)]) -> ProviderResult<String> {
        let url = self.url(path);
        debug!(service = self.service, %url, "GET");

        let response = self
            .http
            .get(&url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        self.read_success(response).await
    }

    /// GET `path` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let body = self.get_text(path, query).await?;
        self.decode(&body)
    }

    /// POST a JSON body and return the raw text of a 2xx response.
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> ProviderResult<String> {
        let url = self.url(path);
        debug!(service = self.service, %url, "POST");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        self.read_success(response).await
    }

    /// Decode a JSON body, reporting malformed payloads as unavailability.
    pub fn decode<T: DeserializeOwned>(&self, body: &str) -> ProviderResult<T> {
        serde_json::from_str(body).map_err(|e| {
            warn!(service = self.service, "Malformed response: {}", e);
            ProviderError::unavailable(self.service, format!("malformed response: {}", e))
        })
    }

    async fn read_success(&self, response: Response) -> ProviderResult<String> {
        let status = response.status();
        // An unreadable error body is reported as empty
        let body = if status.is_success() {
            response.text().await.map_err(|e| self.unavailable(e))?
        } else {
            response.text().await.unwrap_or_default()
        };

        if !status.is_success() {
            warn!(
                service = self.service,
                status = status.as_u16(),
                "Upstream returned an error status"
            );
            return Err(ProviderError::UpstreamHttp {
                service: self.service,
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn unavailable(&self, error: reqwest::Error) -> ProviderError {
        warn!(service = self.service, "Upstream unreachable: {}", error);
        ProviderError::unavailable(self.service, error)
    }
}
