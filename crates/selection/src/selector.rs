//! Museum Selector
//!
//! Picks at most `quota` museums from the candidates found around a user.
//!
//! ## Algorithm
//! 1. Shuffle candidates with a fixed seed so the same candidates always
//!    produce the same selection
//! 2. Split into primaries (no parent) and secondaries, keeping shuffle order
//! 3. For each primary: ask the oracle, select on a match, then walk the
//!    secondaries nested under it and apply the same test
//! 4. Stop at the quota; never pad with non-matching museums
//!
//! Oracle failures count as "no match".

use crate::oracle::{RelevanceOracle, Subject};
use providers::ArtworkCatalog;
use quest_model::{Museum, MuseumId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Seed of the candidate shuffle
pub const SELECTION_SEED: u64 = 42;

pub struct MuseumSelector {
    oracle: Arc<dyn RelevanceOracle>,

    /// When set, each museum's artwork names are shown to the oracle
    artworks: Option<Arc<dyn ArtworkCatalog>>,

    seed: u64,
}

impl MuseumSelector {
    pub fn new(oracle: Arc<dyn RelevanceOracle>) -> Self {
        Self {
            oracle,
            artworks: None,
            seed: SELECTION_SEED,
        }
    }

    /// Include artwork names in the subject passed to the oracle
    pub fn with_artwork_context(mut self, catalog: Arc<dyn ArtworkCatalog>) -> Self {
        self.artworks = Some(catalog);
        self
    }

    /// Override the shuffle seed (default: 42)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Select up to `quota` museums matching `preferences`.
    #[instrument(skip(self, candidates, preferences), fields(candidates = candidates.len()))]
    pub async fn select(
        &self,
        candidates: Vec<Museum>,
        preferences: &[String],
        quota: usize,
    ) -> Vec<Museum> {
        if quota == 0 || candidates.is_empty() {
            return Vec::new();
        }

        let mut shuffled = candidates;
        let mut rng = StdRng::seed_from_u64(self.seed);
        shuffled.shuffle(&mut rng);

        let (primaries, secondaries): (Vec<Museum>, Vec<Museum>) =
            shuffled.into_iter().partition(Museum::is_primary);
        debug!(
            "Considering {} primary and {} secondary museums",
            primaries.len(),
            secondaries.len()
        );

        let mut selected: Vec<Museum> = Vec::new();
        let mut considered: HashSet<MuseumId> = HashSet::new();

        'primaries: for primary in &primaries {
            if selected.len() >= quota {
                break;
            }
            // A primary listed twice is only walked once, matched or not
            if considered.contains(&primary.id) {
                continue;
            }
            self.consider(primary, preferences, &mut selected, &mut considered)
                .await;

            for child in secondaries.iter().filter(|s| s.is_child_of(&primary.id)) {
                if selected.len() >= quota {
                    break 'primaries;
                }
                self.consider(child, preferences, &mut selected, &mut considered)
                    .await;
            }
        }

        debug!("Selected {} of {} requested museums", selected.len(), quota);
        selected
    }

    async fn consider(
        &self,
        museum: &Museum,
        preferences: &[String],
        selected: &mut Vec<Museum>,
        considered: &mut HashSet<MuseumId>,
    ) {
        if !considered.insert(museum.id.clone()) {
            return;
        }
        if self.is_relevant(museum, preferences).await {
            selected.push(museum.clone());
        }
    }

    async fn is_relevant(&self, museum: &Museum, preferences: &[String]) -> bool {
        let mut subject = Subject::museum(museum);
        if let Some(catalog) = &self.artworks {
            match catalog.artworks_of(&museum.id).await {
                Ok(artworks) => subject = subject.with_artworks(&artworks),
                Err(e) => debug!(museum_id = %museum.id, "No artwork context: {}", e),
            }
        }

        match self.oracle.matches(&subject, preferences).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(museum_id = %museum.id, "Relevance check failed, skipping: {}", e);
                false
            }
        }
    }
}
