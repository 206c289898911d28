//! Crowd penalty: how busy a museum is right now.

use providers::{CrowdStatusProvider, QuestStatus};
use quest_model::ProviderResult;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Sum of in-progress and pending quests at a museum.
///
/// A count the service could not give adds nothing to the sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrowdPenalty {
    Known(u32),

    /// Neither count is known
    Unknown,
}

impl CrowdPenalty {
    pub fn from_counts(
        in_progress: ProviderResult<Option<u32>>,
        pending: ProviderResult<Option<u32>>,
    ) -> Self {
        match (in_progress.ok().flatten(), pending.ok().flatten()) {
            (None, None) => CrowdPenalty::Unknown,
            (a, b) => CrowdPenalty::Known(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
        }
    }
}

impl fmt::Display for CrowdPenalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrowdPenalty::Known(n) => write!(f, "{}", n),
            CrowdPenalty::Unknown => f.write_str("unknown"),
        }
    }
}

/// Reads crowd penalties from the crowd-status service. Never fails.
#[derive(Clone)]
pub struct CrowdGauge {
    status: Arc<dyn CrowdStatusProvider>,
}

impl CrowdGauge {
    pub fn new(status: Arc<dyn CrowdStatusProvider>) -> Self {
        Self { status }
    }

    pub async fn penalty(&self, museum_id: &str) -> CrowdPenalty {
        let (in_progress, pending) = tokio::join!(
            self.status.count_by_status(museum_id, QuestStatus::InProgress),
            self.status.count_by_status(museum_id, QuestStatus::Pending),
        );

        for failed in [&in_progress, &pending].into_iter().filter_map(|r| r.as_ref().err()) {
            warn!(museum_id, "Crowd status unavailable: {}", failed);
        }
        CrowdPenalty::from_counts(in_progress, pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::MemoryUpstream;

    #[tokio::test]
    async fn test_penalty_sums_both_statuses() {
        let upstream = MemoryUpstream::new()
            .with_crowd("busy", Some(2), Some(3))
            .with_crowd("half", Some(2), None)
            .with_crowd("blank", None, None)
            .with_failing_crowd("down");
        let gauge = CrowdGauge::new(Arc::new(upstream));

        assert_eq!(gauge.penalty("busy").await, CrowdPenalty::Known(5));
        assert_eq!(gauge.penalty("quiet").await, CrowdPenalty::Known(0));
        assert_eq!(gauge.penalty("half").await, CrowdPenalty::Known(2));
        assert_eq!(gauge.penalty("blank").await, CrowdPenalty::Unknown);
        assert_eq!(gauge.penalty("down").await, CrowdPenalty::Unknown);
    }

    #[test]
    fn test_known_count_survives_failed_sibling() {
        let failed = || -> ProviderResult<Option<u32>> {
            Err(quest_model::ProviderError::unavailable("crowd", "timed out"))
        };
        assert_eq!(CrowdPenalty::from_counts(Ok(Some(5)), failed()), CrowdPenalty::Known(5));
        assert_eq!(CrowdPenalty::from_counts(failed(), Ok(Some(1))), CrowdPenalty::Known(1));
        assert_eq!(CrowdPenalty::from_counts(Ok(None), Ok(Some(0))), CrowdPenalty::Known(0));
        assert_eq!(CrowdPenalty::from_counts(failed(), Ok(None)), CrowdPenalty::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(CrowdPenalty::Known(4).to_string(), "4");
        assert_eq!(CrowdPenalty::Unknown.to_string(), "unknown");
    }
}
