//! # Quest Orchestrator
//!
//! This module coordinates the whole quest pipeline:
//! 1. Fetch the user's profile and stored location (in parallel)
//! 2. Derive the search window and query museums inside it
//! 3. Select museums matching the user's preferences
//! 4. Build one quest per museum (bounded fan-out) while ordering the
//!    museums into a walking tour
//! 5. Return quests in tour order
//!
//! Only steps 1 and 2 can fail the request. Everything after degrades.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use pipeline::{QuestBuilder, RouteReorderer};
use providers::{
    ArtworkCatalog, ConfigError, CrowdStatusProvider, DistanceProvider, HttpArtworkCatalog,
    HttpCrowdStatus, HttpDistanceProvider, HttpLocationProvider, HttpMuseumCatalog,
    HttpTextGenerator, HttpUserProvider, LocationProvider, MuseumCatalog, ProviderConfig,
    TextGenerator, UserProvider,
};
use quest_model::{BoundingBox, MuseumId, ProviderError, Quest, QuestError, Result, Task};
use selection::{MuseumSelector, PromptOracle, RelevanceOracle, TagOverlapOracle};

use crate::scheduler::{QuestBatch, run_builds, worker_count};
use crate::settings::{BatchProfile, QuestSettings, RelevanceMode};

/// Every upstream the orchestrator talks to
#[derive(Clone)]
pub struct Providers {
    pub users: Arc<dyn UserProvider>,
    pub locations: Arc<dyn LocationProvider>,
    pub museums: Arc<dyn MuseumCatalog>,
    pub artworks: Arc<dyn ArtworkCatalog>,
    pub distances: Arc<dyn DistanceProvider>,
    pub crowd: Arc<dyn CrowdStatusProvider>,

    /// Needed for chat relevance and generated quest text
    pub text: Option<Arc<dyn TextGenerator>>,
}

impl Providers {
    /// HTTP clients for every upstream in `config`.
    pub fn http(config: &ProviderConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            users: Arc::new(HttpUserProvider::new(config)?),
            locations: Arc::new(HttpLocationProvider::new(config)?),
            museums: Arc::new(HttpMuseumCatalog::new(config)?),
            artworks: Arc::new(HttpArtworkCatalog::new(config)?),
            distances: Arc::new(HttpDistanceProvider::new(config)?),
            crowd: Arc::new(HttpCrowdStatus::new(config)?),
            text: Some(Arc::new(HttpTextGenerator::new(config)?)),
        })
    }

    /// One value serving every provider role, such as `MemoryUpstream`.
    pub fn shared<T>(upstream: Arc<T>) -> Self
    where
        T: UserProvider
            + LocationProvider
            + MuseumCatalog
            + ArtworkCatalog
            + DistanceProvider
            + CrowdStatusProvider
            + 'static,
    {
        Self {
            users: upstream.clone(),
            locations: upstream.clone(),
            museums: upstream.clone(),
            artworks: upstream.clone(),
            distances: upstream.clone(),
            crowd: upstream,
            text: None,
        }
    }

    pub fn with_text(mut self, text: Arc<dyn TextGenerator>) -> Self {
        self.text = Some(text);
        self
    }
}

/// Main orchestrator behind every quest operation
#[derive(Clone)]
pub struct QuestOrchestrator {
    providers: Providers,
    settings: QuestSettings,
    selector: Arc<MuseumSelector>,
    builder: Arc<QuestBuilder>,
    reorderer: Arc<RouteReorderer>,
}

impl QuestOrchestrator {
    /// Wire the pipeline stages from `settings`.
    ///
    /// Fails when a setting needs the text generator and none is configured.
    pub fn new(
        providers: Providers,
        settings: QuestSettings,
    ) -> std::result::Result<Self, ConfigError> {
        let needs_text = settings.generate_text || settings.relevance == RelevanceMode::Chat;
        let text = match (&providers.text, needs_text) {
            (Some(text), _) => Some(text.clone()),
            (None, false) => None,
            (None, true) => {
                return Err(ConfigError::InvalidValue {
                    field: "text generator",
                    value: "not configured".to_string(),
                });
            }
        };

        let oracle: Arc<dyn RelevanceOracle> = match (settings.relevance, &text) {
            (RelevanceMode::Chat, Some(text)) => Arc::new(PromptOracle::new(text.clone())),
            _ => Arc::new(TagOverlapOracle),
        };

        let mut selector = MuseumSelector::new(oracle.clone());
        if settings.relevance == RelevanceMode::Chat {
            selector = selector.with_artwork_context(providers.artworks.clone());
        }

        let mut builder = QuestBuilder::new(providers.artworks.clone(), oracle);
        if let (true, Some(text)) = (settings.generate_text, text) {
            builder = builder.with_text_generation(text, providers.museums.clone());
        }

        let reorderer = RouteReorderer::new(providers.distances.clone(), providers.crowd.clone())
            .with_penalty_coefficient(settings.penalty_coefficient)
            .with_unknown_crowd(settings.unknown_crowd);

        Ok(Self {
            providers,
            settings,
            selector: Arc::new(selector),
            builder: Arc::new(builder),
            reorderer: Arc::new(reorderer),
        })
    }

    pub fn settings(&self) -> &QuestSettings {
        &self.settings
    }

    /// Build a quest for one museum using the user's stored preferences.
    ///
    /// Upstream failures are returned unchanged.
    #[instrument(skip(self))]
    pub async fn build_single_quest(
        &self,
        user_id: &str,
        museum_id: &str,
        max_tasks: usize,
    ) -> Result<Quest> {
        let preferences = self.providers.users.preferences(user_id).await?;
        let quest = self.builder.build(museum_id, &preferences, max_tasks).await?;
        info!("Built quest with {} tasks", quest.tasks.len());
        Ok(quest)
    }

    /// Build up to `desired` quests around the user, in visiting order.
    pub async fn build_quest_batch(
        &self,
        user_id: &str,
        desired: usize,
        max_tasks: usize,
    ) -> Result<Vec<Quest>> {
        Ok(self
            .build_quest_batch_report(user_id, desired, max_tasks)
            .await?
            .quests)
    }

    /// Same as `build_quest_batch`, keeping the list of dropped museums.
    #[instrument(skip(self))]
    pub async fn build_quest_batch_report(
        &self,
        user_id: &str,
        desired: usize,
        max_tasks: usize,
    ) -> Result<QuestBatch> {
        let start_time = Instant::now();
        if desired == 0 {
            return Ok(QuestBatch::default());
        }

        // Prerequisites: any failure here fails the request
        let (location, user) = tokio::try_join!(
            self.providers.locations.user_location(user_id),
            self.providers.users.user(user_id),
        )?;

        let window = BoundingBox::around(location, user.preference_radius_km);
        if window.is_degenerate() && !self.settings.point_query_tolerated {
            info!("Search window around user {} is empty", user_id);
            return Ok(QuestBatch::default());
        }

        let candidates = self.providers.museums.museums_in(&window).await?;
        info!("Found {} museums around user {}", candidates.len(), user_id);

        let selected = self
            .selector
            .select(candidates, &user.preferences, desired)
            .await;
        info!("Selected {} museums", selected.len());
        if selected.is_empty() {
            return Ok(QuestBatch::default());
        }

        let preferences: Arc<[String]> = user.preferences.into();
        let jobs: Vec<_> = selected
            .iter()
            .map(|museum| {
                let builder = self.builder.clone();
                let preferences = preferences.clone();
                let museum_id = museum.id.clone();
                (museum.id.clone(), async move {
                    builder.build(&museum_id, &preferences, max_tasks).await
                })
            })
            .collect();
        let workers = self.workers_for(jobs.len());

        // Building and routing are independent, run them side by side
        let (mut batch, tour) = tokio::join!(
            run_builds(jobs, workers),
            self.reorderer.reorder(location, selected),
        );

        let tour_ids: Vec<MuseumId> = tour.into_iter().map(|m| m.id).collect();
        batch.order_by(&tour_ids);

        info!(
            "Built {} quests ({} dropped) for user {} in {:.2?}",
            batch.quests.len(),
            batch.degraded.len(),
            user_id,
            start_time.elapsed()
        );
        Ok(batch)
    }

    /// The featured-event quest, as a one-element list.
    #[instrument(skip(self))]
    pub async fn build_featured_quest(&self, user_id: &str, max_tasks: usize) -> Result<Vec<Quest>> {
        let event = &self.settings.featured;
        let museum = self
            .providers
            .museums
            .museums_by_name(&event.museum_name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| QuestError::FeaturedMuseumNotFound(event.museum_name.clone()))?;
        debug!(museum_id = %museum.id, "Featured museum found");

        let mut quest = self
            .build_single_quest(user_id, &museum.id, max_tasks)
            .await?;
        quest.title = event.title.clone();
        quest.description = event.description.clone();
        Ok(vec![quest])
    }

    /// Offline quests that exercise the scheduler without any upstream.
    #[instrument(skip(self))]
    pub async fn build_placeholder_batch(&self, count: usize, max_tasks: usize) -> Vec<Quest> {
        let jobs: Vec<_> = (1..=count)
            .map(|n| {
                let quest = placeholder_quest(n, max_tasks);
                (quest.museum_id.clone(), async move { Ok::<_, ProviderError>(quest) })
            })
            .collect();
        let ids: Vec<MuseumId> = jobs.iter().map(|(id, _)| id.clone()).collect();

        let mut batch = run_builds(jobs, self.workers_for(count)).await;
        batch.order_by(&ids);
        batch.quests
    }

    /// Dispatch a batch request according to the configured profile.
    pub async fn build_profile_batch(
        &self,
        user_id: &str,
        desired: usize,
        max_tasks: usize,
    ) -> Result<Vec<Quest>> {
        match self.settings.profile {
            BatchProfile::Standard => self.build_quest_batch(user_id, desired, max_tasks).await,
            BatchProfile::Featured => self.build_featured_quest(user_id, max_tasks).await,
            BatchProfile::Placeholder => Ok(self.build_placeholder_batch(desired, max_tasks).await),
        }
    }

    fn workers_for(&self, jobs: usize) -> usize {
        let workers = worker_count(jobs);
        match self.settings.max_workers {
            Some(cap) => workers.min(cap.max(1)),
            None => workers,
        }
    }
}

/// Quest `n` of a placeholder batch.
pub fn placeholder_quest(n: usize, max_tasks: usize) -> Quest {
    let mut quest = Quest::new(format!("placeholder-{}", n));
    quest.title = format!("Quest {}", n);
    quest.description = "Description for quest".to_string();
    for j in 1..=max_tasks {
        quest.add_task(Task {
            artwork_id: format!("artwork-{}-{}", n, j),
            title: format!("Artwork {}", j),
            description: "Description for artwork".to_string(),
        });
    }
    quest
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::{FnTextGenerator, MemoryUpstream};
    use quest_model::{Artwork, Location, Museum, User};

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    fn museum(id: &str, name: &str, lon: f64) -> Museum {
        Museum {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            location: Location::new(0.0, lon),
            types: vec!["art".to_string()],
            parent: None,
        }
    }

    fn artworks(museum_id: &str, n: usize) -> Vec<Artwork> {
        (0..n)
            .map(|i| Artwork {
                id: format!("{}-{}", museum_id, i),
                name: format!("Piece {}", i),
                description: String::new(),
                museum_id: museum_id.to_string(),
                types: vec!["art".to_string()],
            })
            .collect()
    }

    fn user(radius: f64) -> User {
        User {
            id: "u1".to_string(),
            preferences: vec!["art".to_string()],
            preference_radius_km: radius,
        }
    }

    fn orchestrator(upstream: MemoryUpstream, settings: QuestSettings) -> QuestOrchestrator {
        QuestOrchestrator::new(Providers::shared(Arc::new(upstream)), settings).unwrap()
    }

    // ============================================================================
    // Tests
    // ============================================================================

    #[tokio::test]
    async fn test_single_quest_surfaces_upstream_error() {
        let upstream = MemoryUpstream::new()
            .with_user(user(10.0), Location::default())
            .with_failing_artworks("m1");
        let o = orchestrator(upstream, QuestSettings::default());

        let err = o.build_single_quest("u1", "m1", 3).await.unwrap_err();
        assert_eq!(err.status(), 503);

        let missing_user = o.build_single_quest("nobody", "m1", 3).await.unwrap_err();
        assert_eq!(missing_user.status(), 404);
    }

    #[tokio::test]
    async fn test_batch_fails_only_on_prerequisites() {
        let o = orchestrator(MemoryUpstream::new(), QuestSettings::default());
        let err = o.build_quest_batch("ghost", 2, 3).await.unwrap_err();
        assert!(matches!(err, QuestError::Provider(ProviderError::UpstreamHttp { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_zero_radius_gives_empty_batch_unless_tolerated() {
        let upstream = || {
            MemoryUpstream::new()
                .with_user(user(0.0), Location::new(0.0, 0.0))
                .with_museum(museum("m1", "Here", 0.0))
                .with_artworks("m1", artworks("m1", 2))
        };

        let strict = orchestrator(upstream(), QuestSettings::default());
        assert!(strict.build_quest_batch("u1", 2, 2).await.unwrap().is_empty());

        let tolerant = orchestrator(
            upstream(),
            QuestSettings {
                point_query_tolerated: true,
                ..Default::default()
            },
        );
        let quests = tolerant.build_quest_batch("u1", 2, 2).await.unwrap();
        assert_eq!(quests.len(), 1);
        assert_eq!(quests[0].museum_id, "m1");
    }

    #[tokio::test]
    async fn test_zero_quests_requested() {
        let o = orchestrator(MemoryUpstream::new(), QuestSettings::default());
        assert!(o.build_quest_batch("anyone", 0, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_featured_quest_overrides_text() {
        let upstream = MemoryUpstream::new()
            .with_user(user(10.0), Location::default())
            .with_museum(museum("ndr", "Notte dei Ricercatori", 0.0))
            .with_artworks("ndr", artworks("ndr", 5));
        let o = orchestrator(upstream, QuestSettings::default());

        let quests = o.build_featured_quest("u1", 3).await.unwrap();
        assert_eq!(quests.len(), 1);
        assert_eq!(quests[0].museum_id, "ndr");
        assert_eq!(quests[0].title, "Notte dei Ricercatori");
        assert!(!quests[0].description.is_empty());
        assert_eq!(quests[0].tasks.len(), 3);
    }

    #[tokio::test]
    async fn test_featured_museum_missing() {
        let upstream = MemoryUpstream::new().with_user(user(10.0), Location::default());
        let o = orchestrator(upstream, QuestSettings::default());

        let err = o.build_featured_quest("u1", 3).await.unwrap_err();
        assert_eq!(err, QuestError::FeaturedMuseumNotFound("Notte dei Ricercatori".to_string()));
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_placeholder_batch() {
        let o = orchestrator(MemoryUpstream::new(), QuestSettings::default());
        let quests = o.build_placeholder_batch(3, 2).await;

        let titles: Vec<&str> = quests.iter().map(|q| q.title.as_str()).collect();
        assert_eq!(titles, vec!["Quest 1", "Quest 2", "Quest 3"]);
        assert_eq!(quests[1].museum_id, "placeholder-2");
        assert_eq!(quests[1].artwork_ids(), vec!["artwork-2-1", "artwork-2-2"]);
    }

    #[tokio::test]
    async fn test_profile_dispatch() {
        let o = orchestrator(
            MemoryUpstream::new(),
            QuestSettings {
                profile: BatchProfile::Placeholder,
                ..Default::default()
            },
        );
        let quests = o.build_profile_batch("unused", 2, 1).await.unwrap();
        assert_eq!(quests.len(), 2);
    }

    #[tokio::test]
    async fn test_chat_mode_requires_text_generator() {
        let settings = QuestSettings {
            relevance: RelevanceMode::Chat,
            ..Default::default()
        };
        let providers = Providers::shared(Arc::new(MemoryUpstream::new()));
        assert!(QuestOrchestrator::new(providers.clone(), settings.clone()).is_err());

        let generator = FnTextGenerator::new(|_: &str| Ok("true".to_string()));
        let providers = providers.with_text(Arc::new(generator));
        assert!(QuestOrchestrator::new(providers, settings).is_ok());
    }

    #[tokio::test]
    async fn test_chat_relevance_and_generated_text() {
        let upstream = MemoryUpstream::new()
            .with_user(user(10.0), Location::new(0.0, 0.0))
            .with_museum(museum("m1", "Museo Arcos", 0.01))
            .with_museum(museum("m2", "Hortus Conclusus", 0.02))
            .with_artworks("m1", artworks("m1", 3))
            .with_artworks("m2", artworks("m2", 3));

        // Only "Museo Arcos" is relevant; every artwork is
        let generator = FnTextGenerator::new(|prompt: &str| {
            if prompt.contains("MUSEUM:") {
                let verdict = if prompt.contains("Arcos") { "true" } else { "False." };
                Ok(verdict.to_string())
            } else if prompt.contains("ARTWORK:") {
                Ok("true".to_string())
            } else {
                Ok(" Generated ".to_string())
            }
        });
        let providers = Providers::shared(Arc::new(upstream)).with_text(Arc::new(generator));
        let o = QuestOrchestrator::new(
            providers,
            QuestSettings {
                relevance: RelevanceMode::Chat,
                generate_text: true,
                ..Default::default()
            },
        )
        .unwrap();

        let quests = o.build_quest_batch("u1", 2, 2).await.unwrap();
        assert_eq!(quests.len(), 1);
        assert_eq!(quests[0].museum_id, "m1");
        assert_eq!(quests[0].title, "Generated");
        assert_eq!(quests[0].tasks.len(), 2);
    }
}
