//! Provider configuration.
//!
//! Assembled once at process start (from flags or the environment) and
//! passed by reference into each client constructor. Nothing below the
//! binaries reads the environment.

use std::time::Duration;
use thiserror::Error;

/// Model name sent to the chat endpoint when talking to a raw Ollama server
pub const DEFAULT_CHAT_MODEL: &str = "CustomGemma9";

/// Per-request timeout applied to every upstream call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base url for {service}: {value:?}")]
    InvalidUrl { service: &'static str, value: String },

    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Base URLs and transport settings for every upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub user_url: String,
    pub location_url: String,
    pub museum_url: String,
    pub artwork_url: String,
    pub routing_url: String,
    pub crowd_url: String,
    pub chat_url: String,

    /// Sent as `model` in chat requests; `None` sends the prompt only
    pub chat_model: Option<String>,

    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            user_url: base_url("127.0.0.1:2000"),
            location_url: base_url("127.0.0.1:9000"),
            museum_url: base_url("127.0.0.1:8000"),
            artwork_url: base_url("127.0.0.1:4000"),
            routing_url: base_url("127.0.0.1:3000"),
            crowd_url: base_url("quest-manager"),
            chat_url: base_url("192.168.250.20:11434/api"),
            chat_model: Some(DEFAULT_CHAT_MODEL.to_string()),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    /// Build a config from the service-name variables used by the deployment.
    ///
    /// Each `*_SVC_NAME` variable holds a host (optionally with port and path
    /// prefix); unset variables keep the default. A custom `CHAT_SVC_NAME`
    /// points at a proxy that picks its own model, so no model is sent.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let set = |key: &str, slot: &mut String| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = base_url(&value);
            }
        };

        set("USER_SVC_NAME", &mut config.user_url);
        set("LOC_SVC_NAME", &mut config.location_url);
        set("MUSEUM_SVC_NAME", &mut config.museum_url);
        set("ARTWORK_SVC_NAME", &mut config.artwork_url);
        set("OSRM_SVC_NAME", &mut config.routing_url);
        set("QUEST_MAN_SVC_NAME", &mut config.crowd_url);

        if let Some(chat) = lookup("CHAT_SVC_NAME").filter(|v| !v.trim().is_empty()) {
            config.chat_url = base_url(&chat);
            config.chat_model = None;
        }

        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Turn a service name into a base URL: prepend `http://` when no scheme is
/// given and drop trailing slashes.
pub fn base_url(service: &str) -> String {
    let trimmed = service.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
