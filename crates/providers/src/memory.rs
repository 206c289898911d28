//! In-memory providers for tests, demos and offline runs.
//!
//! `MemoryUpstream` implements every provider trait over plain collections
//! and can be told to fail per museum. Distances are great-circle meters.

use crate::traits::*;
use async_trait::async_trait;
use quest_model::{
    Artwork, BoundingBox, Location, Museum, MuseumId, ProviderError, ProviderResult, User, UserId,
    haversine_km,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Snapshot of how many times each provider call was made
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub museums_in: usize,
    pub artworks: usize,
    pub distance_tables: usize,
    pub crowd: usize,

    /// Highest number of artwork fetches that were in flight at once
    pub max_concurrent_artworks: usize,
}

#[derive(Debug, Default)]
struct Counters {
    museums_in: AtomicUsize,
    artworks: AtomicUsize,
    distance_tables: AtomicUsize,
    crowd: AtomicUsize,
    artworks_in_flight: AtomicUsize,
    max_concurrent_artworks: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct MemoryUpstream {
    users: HashMap<UserId, User>,
    locations: HashMap<UserId, Location>,
    museums: Vec<Museum>,
    artworks: HashMap<MuseumId, Vec<Artwork>>,
    failing_artworks: HashSet<MuseumId>,
    panicking_artworks: HashSet<MuseumId>,
    artwork_delay: Option<Duration>,
    crowd: HashMap<MuseumId, (Option<u32>, Option<u32>)>,
    failing_crowd: HashSet<MuseumId>,
    unreachable: Vec<Location>,
    distances_fail: bool,
    counters: Counters,
}

impl MemoryUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user together with their stored location.
    pub fn with_user(mut self, user: User, location: Location) -> Self {
        self.locations.insert(user.id.clone(), location);
        self.users.insert(user.id.clone(), user);
        self
    }

    pub fn with_museum(mut self, museum: Museum) -> Self {
        self.museums.push(museum);
        self
    }

    pub fn with_artworks(mut self, museum_id: &str, artworks: Vec<Artwork>) -> Self {
        self.artworks.insert(museum_id.to_string(), artworks);
        self
    }

    /// Artwork lookups for this museum fail as unavailable.
    pub fn with_failing_artworks(mut self, museum_id: &str) -> Self {
        self.failing_artworks.insert(museum_id.to_string());
        self
    }

    /// Artwork lookups for this museum panic, simulating a crashed worker.
    pub fn with_panicking_artworks(mut self, museum_id: &str) -> Self {
        self.panicking_artworks.insert(museum_id.to_string());
        self
    }

    /// Every artwork lookup sleeps for `delay` before answering.
    pub fn with_artwork_delay(mut self, delay: Duration) -> Self {
        self.artwork_delay = Some(delay);
        self
    }

    /// Crowd counts for a museum; `None` means the service does not know.
    pub fn with_crowd(
        mut self,
        museum_id: &str,
        in_progress: Option<u32>,
        pending: Option<u32>,
    ) -> Self {
        self.crowd
            .insert(museum_id.to_string(), (in_progress, pending));
        self
    }

    pub fn with_failing_crowd(mut self, museum_id: &str) -> Self {
        self.failing_crowd.insert(museum_id.to_string());
        self
    }

    /// Distances towards this location come back as NaN.
    pub fn with_unreachable(mut self, location: Location) -> Self {
        self.unreachable.push(location);
        self
    }

    /// Every distance table request fails.
    pub fn with_failing_distances(mut self) -> Self {
        self.distances_fail = true;
        self
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            museums_in: self.counters.museums_in.load(Ordering::SeqCst),
            artworks: self.counters.artworks.load(Ordering::SeqCst),
            distance_tables: self.counters.distance_tables.load(Ordering::SeqCst),
            crowd: self.counters.crowd.load(Ordering::SeqCst),
            max_concurrent_artworks: self.counters.max_concurrent_artworks.load(Ordering::SeqCst),
        }
    }

    fn not_found(service: &'static str, what: &str) -> ProviderError {
        ProviderError::UpstreamHttp {
            service,
            status: 404,
            body: format!("{} not found", what),
        }
    }
}

#[async_trait]
impl UserProvider for MemoryUpstream {
    async fn user(&self, user_id: &str) -> ProviderResult<User> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| Self::not_found("users", user_id))
    }

    async fn preferences(&self, user_id: &str) -> ProviderResult<Vec<String>> {
        Ok(self.user(user_id).await?.preferences)
    }
}

#[async_trait]
impl LocationProvider for MemoryUpstream {
    async fn user_location(&self, user_id: &str) -> ProviderResult<Location> {
        self.locations
            .get(user_id)
            .copied()
            .ok_or_else(|| Self::not_found("location", user_id))
    }
}

#[async_trait]
impl MuseumCatalog for MemoryUpstream {
    async fn museum(&self, museum_id: &str) -> ProviderResult<Museum> {
        self.museums
            .iter()
            .find(|m| m.id == museum_id)
            .cloned()
            .ok_or_else(|| Self::not_found("museums", museum_id))
    }

    async fn museums_by_name(&self, name: &str) -> ProviderResult<Vec<Museum>> {
        Ok(self
            .museums
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect())
    }

    async fn museums_in(&self, window: &BoundingBox) -> ProviderResult<Vec<Museum>> {
        self.counters.museums_in.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .museums
            .iter()
            .filter(|m| window.contains(m.location))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ArtworkCatalog for MemoryUpstream {
    async fn artworks_of(&self, museum_id: &str) -> ProviderResult<Vec<Artwork>> {
        self.counters.artworks.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.counters.artworks_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .max_concurrent_artworks
            .fetch_max(in_flight, Ordering::SeqCst);

        if let Some(delay) = self.artwork_delay {
            tokio::time::sleep(delay).await;
        }
        self.counters.artworks_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking_artworks.contains(museum_id) {
            panic!("artwork catalog crashed for {}", museum_id);
        }
        if self.failing_artworks.contains(museum_id) {
            return Err(ProviderError::unavailable("artworks", "connection refused"));
        }
        Ok(self.artworks.get(museum_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DistanceProvider for MemoryUpstream {
    async fn table_distances(
        &self,
        source: Location,
        destinations: &[Location],
    ) -> ProviderResult<Vec<f64>> {
        if destinations.is_empty() {
            return Ok(Vec::new());
        }
        self.counters.distance_tables.fetch_add(1, Ordering::SeqCst);
        if self.distances_fail {
            return Err(ProviderError::UpstreamHttp {
                service: "routing",
                status: 400,
                body: "{\"code\":\"InvalidQuery\"}".to_string(),
            });
        }

        Ok(destinations
            .iter()
            .map(|&dest| {
                if self.unreachable.contains(&dest) {
                    f64::NAN
                } else {
                    haversine_km(source, dest) * 1000.0
                }
            })
            .collect())
    }
}

#[async_trait]
impl CrowdStatusProvider for MemoryUpstream {
    async fn count_by_status(
        &self,
        museum_id: &str,
        status: QuestStatus,
    ) -> ProviderResult<Option<u32>> {
        self.counters.crowd.fetch_add(1, Ordering::SeqCst);
        if self.failing_crowd.contains(museum_id) {
            return Err(ProviderError::unavailable("crowd", "timed out"));
        }

        let (in_progress, pending) = self
            .crowd
            .get(museum_id)
            .copied()
            .unwrap_or((Some(0), Some(0)));
        Ok(match status {
            QuestStatus::InProgress => in_progress,
            QuestStatus::Pending => pending,
        })
    }
}

/// Text generator backed by a closure, for scripting oracle replies.
pub struct FnTextGenerator<F> {
    reply: F,
}

impl<F> FnTextGenerator<F>
where
    F: Fn(&str) -> ProviderResult<String> + Send + Sync,
{
    pub fn new(reply: F) -> Self {
        Self { reply }
    }
}

#[async_trait]
impl<F> TextGenerator for FnTextGenerator<F>
where
    F: Fn(&str) -> ProviderResult<String> + Send + Sync,
{
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        (self.reply)(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn museum(id: &str, lat: f64, lon: f64) -> Museum {
        Museum {
            id: id.to_string(),
            name: format!("Museum {}", id),
            description: String::new(),
            location: Location::new(lat, lon),
            types: vec![],
            parent: None,
        }
    }

    #[tokio::test]
    async fn test_window_filters_museums() {
        let upstream = MemoryUpstream::new()
            .with_museum(museum("near", 0.01, 0.01))
            .with_museum(museum("far", 5.0, 5.0));

        let window = BoundingBox::around(Location::new(0.0, 0.0), 10.0);
        let found = upstream.museums_in(&window).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "near");
        assert_eq!(upstream.calls().museums_in, 1);
    }

    #[tokio::test]
    async fn test_distances_and_unreachable() {
        let target = Location::new(1.0, 0.0);
        let blocked = Location::new(2.0, 0.0);
        let upstream = MemoryUpstream::new().with_unreachable(blocked);

        let row = upstream
            .table_distances(Location::new(0.0, 0.0), &[target, blocked])
            .await
            .unwrap();
        assert!((row[0] - 111_194.9).abs() < 1.0);
        assert!(row[1].is_nan());

        assert!(upstream.table_distances(target, &[]).await.unwrap().is_empty());
        assert_eq!(upstream.calls().distance_tables, 1);
    }

    #[tokio::test]
    async fn test_crowd_defaults_to_zero() {
        let upstream = MemoryUpstream::new()
            .with_crowd("busy", Some(4), None)
            .with_failing_crowd("down");

        assert_eq!(
            upstream.count_by_status("quiet", QuestStatus::Pending).await,
            Ok(Some(0))
        );
        assert_eq!(
            upstream.count_by_status("busy", QuestStatus::InProgress).await,
            Ok(Some(4))
        );
        assert_eq!(
            upstream.count_by_status("busy", QuestStatus::Pending).await,
            Ok(None)
        );
        assert!(upstream.count_by_status("down", QuestStatus::Pending).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_user_is_404() {
        let upstream = MemoryUpstream::new();
        let err = upstream.user("ghost").await.unwrap_err();
        assert_eq!(err.status(), 404);
    }
}
