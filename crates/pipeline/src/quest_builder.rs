//! Single-Quest Builder
//!
//! Turns one museum's artworks into a quest of at most `max_tasks` tasks.
//!
//! ## Algorithm
//! 1. Fetch the museum's artworks and shuffle them (unseeded, so repeated
//!    requests see different quests)
//! 2. Walk the shuffled list:
//!    - if the artworks left (this one included) are no more than the tasks
//!      still needed, accept unconditionally (tail-fill)
//!    - otherwise accept only when the oracle says the artwork matches
//! 3. Stop at `max_tasks` or when artworks run out
//!
//! Tail-fill guarantees exactly `max_tasks` tasks whenever the museum has
//! at least that many distinct artworks.

use providers::{ArtworkCatalog, MuseumCatalog, TextGenerator};
use quest_model::{Artwork, Museum, ProviderResult, Quest, Task};
use rand::seq::SliceRandom;
use selection::{RelevanceOracle, Subject};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Collaborators needed to write a quest title and description
struct QuestText {
    generator: Arc<dyn TextGenerator>,
    museums: Arc<dyn MuseumCatalog>,
}

pub struct QuestBuilder {
    artworks: Arc<dyn ArtworkCatalog>,
    oracle: Arc<dyn RelevanceOracle>,
    text: Option<QuestText>,
}

impl QuestBuilder {
    pub fn new(artworks: Arc<dyn ArtworkCatalog>, oracle: Arc<dyn RelevanceOracle>) -> Self {
        Self {
            artworks,
            oracle,
            text: None,
        }
    }

    /// Generate quest titles and descriptions with `generator`.
    ///
    /// Without this, title and description stay empty.
    pub fn with_text_generation(
        mut self,
        generator: Arc<dyn TextGenerator>,
        museums: Arc<dyn MuseumCatalog>,
    ) -> Self {
        self.text = Some(QuestText { generator, museums });
        self
    }

    pub fn generates_text(&self) -> bool {
        self.text.is_some()
    }

    /// Build a quest for `museum_id`.
    ///
    /// An artwork catalog failure is returned as is; an empty catalog gives
    /// a quest without tasks.
    #[instrument(skip(self, preferences))]
    pub async fn build(
        &self,
        museum_id: &str,
        preferences: &[String],
        max_tasks: usize,
    ) -> ProviderResult<Quest> {
        let artworks = shuffled(self.artworks.artworks_of(museum_id).await?);
        debug!("Museum has {} distinct artworks", artworks.len());

        let chosen = self.pick_tasks(&artworks, preferences, max_tasks).await;

        let mut quest = Quest::new(museum_id);
        for artwork in &chosen {
            quest.add_task(Task::from(*artwork));
        }

        if let Some(text) = &self.text {
            let museum = text.museums.museum(museum_id).await?;
            let (title, description) = text.compose(&museum, &chosen, preferences).await?;
            quest.title = title;
            quest.description = description;
        }

        debug!("Built quest with {} tasks", quest.tasks.len());
        Ok(quest)
    }

    /// Apply the acceptance policy to an already ordered artwork list.
    pub async fn pick_tasks<'a>(
        &self,
        artworks: &'a [Artwork],
        preferences: &[String],
        max_tasks: usize,
    ) -> Vec<&'a Artwork> {
        let limit = artworks.len().min(max_tasks);
        let mut accepted = Vec::with_capacity(limit);

        for (i, artwork) in artworks.iter().enumerate() {
            if accepted.len() >= limit {
                break;
            }
            let remaining = artworks.len() - i;
            let needed = limit - accepted.len();

            if remaining <= needed || self.is_relevant(artwork, preferences).await {
                accepted.push(artwork);
            }
        }
        accepted
    }

    async fn is_relevant(&self, artwork: &Artwork, preferences: &[String]) -> bool {
        match self
            .oracle
            .matches(&Subject::artwork(artwork), preferences)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(artwork_id = %artwork.id, "Relevance check failed, skipping: {}", e);
                false
            }
        }
    }
}

/// Drop repeated artwork ids and shuffle with the thread RNG.
fn shuffled(artworks: Vec<Artwork>) -> Vec<Artwork> {
    let mut seen = HashSet::new();
    let mut artworks: Vec<Artwork> = artworks
        .into_iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect();
    artworks.shuffle(&mut rand::rng());
    artworks
}

impl QuestText {
    async fn compose(
        &self,
        museum: &Museum,
        artworks: &[&Artwork],
        preferences: &[String],
    ) -> ProviderResult<(String, String)> {
        let context = format!(
            "The quest is set in the museum \"{}\".\nThe museum types are: {}.\n\
             The interests of the user are: {}.\nThe artworks that the user will visit are: {}.",
            museum.name,
            museum.types.join(", "),
            preferences.join(", "),
            artworks
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let title = self
            .generator
            .generate(&format!(
                "Write a short, adventurous title for a museum quest in a mobile game.\n\n{}\n\n\
                 Return just the title, without markdown.",
                context
            ))
            .await?;
        let description = self
            .generator
            .generate(&format!(
                "Write a short, adventurous description for a museum quest in a mobile game.\n\n{}\n\n\
                 Return just the description, without markdown.",
                context
            ))
            .await?;

        Ok((title.trim().to_string(), description.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::{FnTextGenerator, MemoryUpstream};
    use quest_model::{Location, ProviderError};
    use selection::TagOverlapOracle;

    fn artwork(id: &str, types: &[&str]) -> Artwork {
        Artwork {
            id: id.to_string(),
            name: format!("Artwork {}", id),
            description: String::new(),
            museum_id: "m1".to_string(),
            types: types.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn collection(matching: usize, other: usize) -> Vec<Artwork> {
        let mut artworks: Vec<Artwork> = (0..matching)
            .map(|i| artwork(&format!("art-{}", i), &["art"]))
            .collect();
        artworks.extend((0..other).map(|i| artwork(&format!("other-{}", i), &["science"])));
        artworks
    }

    fn builder(upstream: MemoryUpstream) -> QuestBuilder {
        QuestBuilder::new(Arc::new(upstream), Arc::new(TagOverlapOracle))
    }

    fn prefs() -> Vec<String> {
        vec!["art".to_string()]
    }

    #[tokio::test]
    async fn test_tail_fill_reaches_quota_without_matches() {
        let upstream = MemoryUpstream::new().with_artworks("m1", collection(0, 5));
        let quest = builder(upstream).build("m1", &prefs(), 3).await.unwrap();
        assert_eq!(quest.tasks.len(), 3);
    }

    #[tokio::test]
    async fn test_never_exceeds_max_tasks() {
        let upstream = MemoryUpstream::new().with_artworks("m1", collection(10, 0));
        let quest = builder(upstream).build("m1", &prefs(), 3).await.unwrap();
        assert_eq!(quest.tasks.len(), 3);
    }

    #[tokio::test]
    async fn test_fewer_artworks_than_quota() {
        let upstream = MemoryUpstream::new().with_artworks("m1", collection(1, 1));
        let quest = builder(upstream).build("m1", &prefs(), 5).await.unwrap();
        assert_eq!(quest.tasks.len(), 2);
    }

    #[tokio::test]
    async fn test_matching_artworks_are_preferred() {
        let upstream = MemoryUpstream::new().with_artworks("m1", collection(3, 7));
        let b = builder(upstream);

        // Shuffle is random, so repeat a few times
        for _ in 0..20 {
            let quest = b.build("m1", &prefs(), 3).await.unwrap();
            assert_eq!(quest.artwork_ids(), vec!["art-0", "art-1", "art-2"]);
        }
    }

    #[tokio::test]
    async fn test_tasks_belong_to_the_museum() {
        let artworks = collection(4, 4);
        let ids: HashSet<String> = artworks.iter().map(|a| a.id.clone()).collect();
        let upstream = MemoryUpstream::new().with_artworks("m1", artworks);

        let quest = builder(upstream).build("m1", &prefs(), 5).await.unwrap();
        assert_eq!(quest.museum_id, "m1");
        assert!(quest.tasks.iter().all(|t| ids.contains(&t.artwork_id)));
        assert!(quest.title.is_empty());
        assert!(quest.description.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_artworks_count_once() {
        let upstream = MemoryUpstream::new()
            .with_artworks("m1", vec![artwork("a", &[]), artwork("a", &[]), artwork("b", &[])]);
        let quest = builder(upstream).build("m1", &prefs(), 2).await.unwrap();
        assert_eq!(quest.artwork_ids(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_catalog_gives_empty_quest() {
        let quest = builder(MemoryUpstream::new())
            .build("m1", &prefs(), 3)
            .await
            .unwrap();
        assert_eq!(quest.museum_id, "m1");
        assert!(quest.tasks.is_empty());

        let zero = builder(MemoryUpstream::new().with_artworks("m1", collection(3, 0)))
            .build("m1", &prefs(), 0)
            .await
            .unwrap();
        assert!(zero.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let upstream = MemoryUpstream::new().with_failing_artworks("m1");
        let err = builder(upstream).build("m1", &prefs(), 3).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable { service: "artworks", .. }));
    }

    #[tokio::test]
    async fn test_text_generation_fills_title_and_description() {
        let upstream = Arc::new(
            MemoryUpstream::new()
                .with_museum(Museum {
                    id: "m1".to_string(),
                    name: "Museo del Sannio".to_string(),
                    description: String::new(),
                    location: Location::default(),
                    types: vec!["history".to_string()],
                    parent: None,
                })
                .with_artworks("m1", collection(2, 0)),
        );
        let generator = FnTextGenerator::new(|prompt: &str| {
            assert!(prompt.contains("Museo del Sannio"));
            if prompt.contains("title") {
                Ok("  The Sannio Trail \n".to_string())
            } else {
                Ok("Walk among the ruins.".to_string())
            }
        });

        let b = QuestBuilder::new(upstream.clone(), Arc::new(TagOverlapOracle))
            .with_text_generation(Arc::new(generator), upstream);
        assert!(b.generates_text());

        let quest = b.build("m1", &prefs(), 2).await.unwrap();
        assert_eq!(quest.title, "The Sannio Trail");
        assert_eq!(quest.description, "Walk among the ruins.");
    }

    #[tokio::test]
    async fn test_text_generation_failure_propagates() {
        let upstream = Arc::new(
            MemoryUpstream::new()
                .with_museum(Museum {
                    id: "m1".to_string(),
                    name: "m1".to_string(),
                    description: String::new(),
                    location: Location::default(),
                    types: vec![],
                    parent: None,
                })
                .with_artworks("m1", collection(1, 0)),
        );
        let generator = FnTextGenerator::new(|_: &str| {
            Err(ProviderError::UpstreamHttp {
                service: "chat",
                status: 500,
                body: "model not loaded".to_string(),
            })
        });
        let b = QuestBuilder::new(upstream.clone(), Arc::new(TagOverlapOracle))
            .with_text_generation(Arc::new(generator), upstream);

        let err = b.build("m1", &prefs(), 1).await.unwrap_err();
        assert_eq!(err.body(), "model not loaded");
    }
}
