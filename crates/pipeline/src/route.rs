//! Route Reorderer
//!
//! Orders selected museums into a walking tour.
//!
//! ## Algorithm
//! Greedy nearest neighbor, repeated until no museum is left:
//! 1. One distance table request from the current position to every
//!    remaining museum
//! 2. Weight each distance by the museum's crowd penalty:
//!    `distance * coefficient * penalty` when the penalty is positive,
//!    the bare distance otherwise
//! 3. Move to the museum with the smallest weight (first one on ties)
//!
//! Missing or NaN distances weigh infinity, so an unreachable museum only
//! comes first when nothing else is reachable. Reordering never fails.

use crate::crowd::{CrowdGauge, CrowdPenalty};
use providers::{CrowdStatusProvider, DistanceProvider};
use quest_model::{Location, Museum};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Multiplier applied to positive crowd penalties
pub const DEFAULT_PENALTY_COEFFICIENT: f64 = 1.0;

/// How a museum with unknown crowd status is weighted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownCrowd {
    /// Weigh it like an empty museum
    #[default]
    NoPenalty,

    /// Visit it after every museum with a known crowd
    RankLast,
}

/// Weight of one candidate leg.
pub fn weighted_distance(
    distance: f64,
    penalty: CrowdPenalty,
    coefficient: f64,
    unknown: UnknownCrowd,
) -> f64 {
    if distance.is_nan() {
        return f64::INFINITY;
    }
    let weight = match (penalty, unknown) {
        (CrowdPenalty::Known(0), _) | (CrowdPenalty::Unknown, UnknownCrowd::NoPenalty) => distance,
        (CrowdPenalty::Known(n), _) => distance * coefficient * n as f64,
        (CrowdPenalty::Unknown, UnknownCrowd::RankLast) => f64::INFINITY,
    };
    if weight.is_nan() { f64::INFINITY } else { weight }
}

/// Index of the smallest weight; the first one wins ties.
pub fn pick_next(weights: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &w) in weights.iter().enumerate() {
        match best {
            Some((_, best_w)) if w >= best_w => {}
            _ => best = Some((i, w)),
        }
    }
    best.map(|(i, _)| i)
}

pub struct RouteReorderer {
    distances: Arc<dyn DistanceProvider>,
    crowd: CrowdGauge,
    coefficient: f64,
    unknown: UnknownCrowd,
}

impl RouteReorderer {
    pub fn new(distances: Arc<dyn DistanceProvider>, crowd: Arc<dyn CrowdStatusProvider>) -> Self {
        Self {
            distances,
            crowd: CrowdGauge::new(crowd),
            coefficient: DEFAULT_PENALTY_COEFFICIENT,
            unknown: UnknownCrowd::default(),
        }
    }

    /// Configure the penalty coefficient (default: 1.0).
    ///
    /// Values below 1.0 (or NaN) would let a busy museum outrank an empty
    /// one at the same distance, so they fall back to the default.
    pub fn with_penalty_coefficient(mut self, coefficient: f64) -> Self {
        if coefficient >= 1.0 {
            self.coefficient = coefficient;
        } else {
            warn!("Ignoring penalty coefficient {}, using {}", coefficient, DEFAULT_PENALTY_COEFFICIENT);
            self.coefficient = DEFAULT_PENALTY_COEFFICIENT;
        }
        self
    }

    pub fn with_unknown_crowd(mut self, policy: UnknownCrowd) -> Self {
        self.unknown = policy;
        self
    }

    pub fn penalty_coefficient(&self) -> f64 {
        self.coefficient
    }

    /// Order `museums` into a visiting sequence starting from `start`.
    #[instrument(skip(self, museums), fields(museums = museums.len()))]
    pub async fn reorder(&self, start: Location, museums: Vec<Museum>) -> Vec<Museum> {
        let mut remaining = museums;
        let mut route = Vec::with_capacity(remaining.len());
        let mut current = start;

        while !remaining.is_empty() {
            let next = if remaining.len() == 1 {
                0
            } else {
                let weights = self.weights_from(current, &remaining).await;
                pick_next(&weights).unwrap_or(0)
            };

            let museum = remaining.remove(next);
            debug!(museum_id = %museum.id, step = route.len(), "Next stop");
            current = museum.location;
            route.push(museum);
        }
        route
    }

    async fn weights_from(&self, current: Location, remaining: &[Museum]) -> Vec<f64> {
        let destinations: Vec<Location> = remaining.iter().map(|m| m.location).collect();
        let distances = match self.distances.table_distances(current, &destinations).await {
            Ok(row) => row,
            Err(e) => {
                warn!("Distance table failed, keeping remaining order: {}", e);
                return vec![f64::INFINITY; remaining.len()];
            }
        };

        let mut weights = Vec::with_capacity(remaining.len());
        for (i, museum) in remaining.iter().enumerate() {
            let distance = distances.get(i).copied().unwrap_or(f64::INFINITY);
            let penalty = self.crowd.penalty(&museum.id).await;
            let weight = weighted_distance(distance, penalty, self.coefficient, self.unknown);
            debug!(museum_id = %museum.id, distance, %penalty, weight, "Weighted leg");
            weights.push(weight);
        }
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::MemoryUpstream;

    fn museum(id: &str, lon: f64) -> Museum {
        Museum {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            location: Location::new(0.0, lon),
            types: vec![],
            parent: None,
        }
    }

    fn order(route: &[Museum]) -> Vec<&str> {
        route.iter().map(|m| m.id.as_str()).collect()
    }

    fn reorderer(upstream: MemoryUpstream) -> (Arc<MemoryUpstream>, RouteReorderer) {
        let upstream = Arc::new(upstream);
        let r = RouteReorderer::new(upstream.clone(), upstream.clone());
        (upstream, r)
    }

    const ORIGIN: Location = Location {
        latitude: 0.0,
        longitude: 0.0,
    };

    #[test]
    fn test_weighted_distance() {
        let none = UnknownCrowd::NoPenalty;
        assert_eq!(weighted_distance(100.0, CrowdPenalty::Known(0), 1.0, none), 100.0);
        assert_eq!(weighted_distance(100.0, CrowdPenalty::Known(3), 1.0, none), 300.0);
        assert_eq!(weighted_distance(100.0, CrowdPenalty::Known(3), 2.0, none), 600.0);
        assert_eq!(weighted_distance(100.0, CrowdPenalty::Unknown, 1.0, none), 100.0);
        assert_eq!(
            weighted_distance(100.0, CrowdPenalty::Unknown, 1.0, UnknownCrowd::RankLast),
            f64::INFINITY
        );
        assert_eq!(weighted_distance(f64::NAN, CrowdPenalty::Known(0), 1.0, none), f64::INFINITY);
        assert_eq!(
            weighted_distance(0.0, CrowdPenalty::Known(2), f64::INFINITY, none),
            f64::INFINITY
        );
    }

    #[test]
    fn test_pick_next_first_minimum_wins() {
        assert_eq!(pick_next(&[]), None);
        assert_eq!(pick_next(&[3.0, 1.0, 1.0]), Some(1));
        assert_eq!(pick_next(&[f64::INFINITY, f64::INFINITY]), Some(0));
        assert_eq!(pick_next(&[f64::INFINITY, 5.0]), Some(1));
    }

    #[test]
    fn test_low_coefficient_falls_back_to_default() {
        let (_, r) = reorderer(MemoryUpstream::new());
        assert_eq!(r.with_penalty_coefficient(0.5).penalty_coefficient(), 1.0);
        let (_, r) = reorderer(MemoryUpstream::new());
        assert_eq!(r.with_penalty_coefficient(2.5).penalty_coefficient(), 2.5);
    }

    #[tokio::test]
    async fn test_empty_and_single_need_no_calls() {
        let (upstream, r) = reorderer(MemoryUpstream::new());
        assert!(r.reorder(ORIGIN, vec![]).await.is_empty());

        let route = r.reorder(ORIGIN, vec![museum("only", 0.5)]).await;
        assert_eq!(order(&route), vec!["only"]);
        assert_eq!(upstream.calls().distance_tables, 0);
        assert_eq!(upstream.calls().crowd, 0);
    }

    #[tokio::test]
    async fn test_zero_penalties_give_nearest_neighbor() {
        let (upstream, r) = reorderer(MemoryUpstream::new());
        let route = r
            .reorder(
                ORIGIN,
                vec![museum("c", 0.03), museum("a", 0.01), museum("b", 0.02)],
            )
            .await;
        assert_eq!(order(&route), vec!["a", "b", "c"]);
        // One table per step with more than one museum left
        assert_eq!(upstream.calls().distance_tables, 2);
    }

    #[tokio::test]
    async fn test_crowd_pushes_museum_later() {
        let (_, r) = reorderer(MemoryUpstream::new().with_crowd("a", Some(2), Some(1)));
        let route = r
            .reorder(ORIGIN, vec![museum("a", 0.01), museum("b", 0.02)])
            .await;
        assert_eq!(order(&route), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_raising_penalty_never_moves_museum_earlier() {
        let museums = || {
            vec![
                museum("a", 0.01),
                museum("b", 0.015),
                museum("c", 0.03),
                museum("d", 0.05),
            ]
        };

        let mut last_position = 0;
        for penalty in 0..6 {
            let (_, r) = reorderer(MemoryUpstream::new().with_crowd("a", Some(penalty), Some(0)));
            let route = r.reorder(ORIGIN, museums()).await;
            let position = route.iter().position(|m| m.id == "a").unwrap();
            assert!(position >= last_position, "penalty {} moved a earlier", penalty);
            last_position = position;
        }
        assert!(last_position > 0);
    }

    #[tokio::test]
    async fn test_reorder_is_deterministic() {
        let upstream = MemoryUpstream::new()
            .with_crowd("a", Some(1), Some(1))
            .with_crowd("c", Some(0), Some(4));
        let (_, r) = reorderer(upstream);
        let museums = vec![museum("a", 0.02), museum("b", 0.04), museum("c", 0.01)];

        let first = r.reorder(ORIGIN, museums.clone()).await;
        let second = r.reorder(ORIGIN, museums).await;
        assert_eq!(order(&first), order(&second));
    }

    #[tokio::test]
    async fn test_unreachable_museum_goes_last() {
        let blocked = museum("blocked", 0.01);
        let (_, r) = reorderer(MemoryUpstream::new().with_unreachable(blocked.location));
        let route = r.reorder(ORIGIN, vec![blocked, museum("far", 0.05)]).await;
        assert_eq!(order(&route), vec!["far", "blocked"]);
    }

    #[tokio::test]
    async fn test_distance_failure_keeps_input_order() {
        let (_, r) = reorderer(MemoryUpstream::new().with_failing_distances());
        let route = r
            .reorder(
                ORIGIN,
                vec![museum("c", 0.03), museum("a", 0.01), museum("b", 0.02)],
            )
            .await;
        assert_eq!(order(&route), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_partly_known_crowd_still_penalizes() {
        // a: 1.1 km with 5 in progress and an unknown pending count (5.5 km weighted)
        let (_, r) = reorderer(MemoryUpstream::new().with_crowd("a", Some(5), None));
        let route = r
            .reorder(ORIGIN, vec![museum("a", 0.01), museum("b", 0.02)])
            .await;
        assert_eq!(order(&route), vec!["b", "a"]);

        let (_, r) = reorderer(MemoryUpstream::new().with_crowd("a", Some(5), None));
        let r = r.with_unknown_crowd(UnknownCrowd::RankLast);
        let route = r
            .reorder(ORIGIN, vec![museum("a", 0.01), museum("b", 0.03)])
            .await;
        assert_eq!(order(&route), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_unknown_crowd_policies() {
        let upstream = || {
            MemoryUpstream::new()
                .with_crowd("a", None, None)
                .with_crowd("b", Some(0), Some(0))
        };
        let museums = || vec![museum("a", 0.01), museum("b", 0.02)];

        let (_, no_penalty) = reorderer(upstream());
        assert_eq!(order(&no_penalty.reorder(ORIGIN, museums()).await), vec!["a", "b"]);

        let (_, rank_last) = reorderer(upstream());
        let rank_last = rank_last.with_unknown_crowd(UnknownCrowd::RankLast);
        assert_eq!(order(&rank_last.reorder(ORIGIN, museums()).await), vec!["b", "a"]);

        // A failing crowd service is unknown too
        let (_, failing) = reorderer(MemoryUpstream::new().with_failing_crowd("a"));
        let failing = failing.with_unknown_crowd(UnknownCrowd::RankLast);
        assert_eq!(order(&failing.reorder(ORIGIN, museums()).await), vec!["b", "a"]);
    }
}
