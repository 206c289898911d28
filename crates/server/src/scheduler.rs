//! Fan-out/fan-in of per-museum quest builds.
//!
//! Every build runs as its own tokio task; a semaphore caps how many run
//! at once. Results are drained in completion order. A build that errors,
//! panics, or returns a quest for the wrong museum becomes a
//! `DegradedBuild` instead of failing the batch.
//!
//! Dropping the future returned by `run_builds` drops the `JoinSet`, which
//! aborts every build still in flight.

use quest_model::{MuseumId, ProviderResult, Quest};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// A museum left out of a batch, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedBuild {
    pub museum_id: MuseumId,
    pub reason: String,
}

/// Quests produced by a batch plus the museums that were dropped
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuestBatch {
    pub quests: Vec<Quest>,
    pub degraded: Vec<DegradedBuild>,
}

impl QuestBatch {
    /// Reorder quests to follow `museum_ids`.
    ///
    /// Quests whose museum is not listed are dropped; listed museums without
    /// a quest are skipped.
    pub fn order_by(&mut self, museum_ids: &[MuseumId]) {
        let mut by_museum: HashMap<MuseumId, Quest> = self
            .quests
            .drain(..)
            .map(|q| (q.museum_id.clone(), q))
            .collect();
        self.quests = museum_ids
            .iter()
            .filter_map(|id| by_museum.remove(id))
            .collect();
    }
}

/// Pool size for `jobs` builds: min(jobs, available parallelism), at least 1.
pub fn worker_count(jobs: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    jobs.min(cpus).max(1)
}

/// Run one build per museum with at most `workers` in flight.
///
/// Futures are lazy: a build does not start until it holds a permit.
pub async fn run_builds<F>(jobs: Vec<(MuseumId, F)>, workers: usize) -> QuestBatch
where
    F: Future<Output = ProviderResult<Quest>> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();
    let mut museum_of_task = HashMap::with_capacity(jobs.len());

    for (museum_id, build) in jobs {
        let permits = permits.clone();
        let expected = museum_id.clone();
        let handle = set.spawn(async move {
            // The semaphore is never closed
            let _permit = permits.acquire_owned().await.ok();
            build.await
        });
        museum_of_task.insert(handle.id(), expected);
    }
    debug!("Submitted {} quest builds to {} workers", museum_of_task.len(), workers);

    let mut batch = QuestBatch::default();
    while let Some(joined) = set.join_next_with_id().await {
        let (task_id, outcome) = match joined {
            Ok((id, result)) => (id, result.map_err(|e| e.to_string())),
            Err(e) => (e.id(), Err(describe_join_error(&e))),
        };
        let museum_id = museum_of_task.remove(&task_id).unwrap_or_default();

        match outcome {
            Ok(quest) if quest.museum_id == museum_id => batch.quests.push(quest),
            Ok(quest) => degrade(
                &mut batch,
                museum_id,
                format!("quest built for museum {}", quest.museum_id),
            ),
            Err(reason) => degrade(&mut batch, museum_id, reason),
        }
    }
    batch
}

fn degrade(batch: &mut QuestBatch, museum_id: MuseumId, reason: String) {
    warn!(museum_id = %museum_id, "Quest build dropped: {}", reason);
    batch.degraded.push(DegradedBuild { museum_id, reason });
}

fn describe_join_error(error: &tokio::task::JoinError) -> String {
    if error.is_panic() {
        "quest worker panicked".to_string()
    } else {
        "quest worker cancelled".to_string()
    }
}
