//! Error types shared across the workspace.
//!
//! Two layers:
//! - `ProviderError` describes how a single upstream call failed. Status and
//!   body are kept verbatim so the boundary layer can forward them.
//! - `QuestError` is what the orchestrator operations return.

use crate::types::MuseumId;
use thiserror::Error;

/// HTTP status reported for transport-level failures
pub const SERVICE_UNAVAILABLE: u16 = 503;

/// Failure of a call to an upstream provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with a non-success status
    #[error("{service} returned HTTP {status}: {body}")]
    UpstreamHttp {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Timeout, refused connection, or a response we could not decode
    #[error("{service} unavailable: {cause}")]
    Unavailable {
        service: &'static str,
        cause: String,
    },
}

impl ProviderError {
    pub fn unavailable(service: &'static str, cause: impl ToString) -> Self {
        Self::Unavailable {
            service,
            cause: cause.to_string(),
        }
    }

    /// Name of the upstream that failed
    pub fn service(&self) -> &'static str {
        match self {
            Self::UpstreamHttp { service, .. } | Self::Unavailable { service, .. } => service,
        }
    }

    /// Status the boundary layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            Self::UpstreamHttp { status, .. } => *status,
            Self::Unavailable { .. } => SERVICE_UNAVAILABLE,
        }
    }

    /// Body the boundary layer should answer with.
    pub fn body(&self) -> &str {
        match self {
            Self::UpstreamHttp { body, .. } => body,
            Self::Unavailable { cause, .. } => cause,
        }
    }
}

/// Errors returned by the quest operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuestError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// No museum carries the configured featured-event name
    #[error("no museum named {0:?}")]
    FeaturedMuseumNotFound(String),

    /// A worker died before producing a result (panic or abort)
    #[error("quest worker for museum {museum_id} failed: {reason}")]
    WorkerFailed { museum_id: MuseumId, reason: String },
}

impl QuestError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Provider(e) => e.status(),
            Self::FeaturedMuseumNotFound(_) => 404,
            Self::WorkerFailed { .. } => 500,
        }
    }
}

/// Convenience type alias for provider call results
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Convenience type alias for quest operation results
pub type Result<T> = std::result::Result<T, QuestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_and_body_are_preserved() {
        let err = ProviderError::UpstreamHttp {
            service: "museums",
            status: 404,
            body: "{\"detail\":\"not found\"}".to_string(),
        };
        assert_eq!(err.status(), 404);
        assert_eq!(err.body(), "{\"detail\":\"not found\"}");

        let quest_err = QuestError::from(err.clone());
        assert_eq!(quest_err.status(), 404);
        assert_eq!(quest_err.to_string(), err.to_string());
    }

    #[test]
    fn test_unavailable_maps_to_503() {
        let err = ProviderError::unavailable("artworks", "connection refused");
        assert_eq!(err.status(), SERVICE_UNAVAILABLE);
        assert_eq!(err.service(), "artworks");
        assert!(err.to_string().contains("connection refused"));
    }
}
