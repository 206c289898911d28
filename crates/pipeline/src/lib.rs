//! Per-museum quest building and route ordering.
//!
//! This crate provides:
//! - QuestBuilder: picks the tasks of one museum's quest (tail-fill rule)
//! - RouteReorderer: greedy crowd-weighted nearest-neighbor tour
//! - CrowdGauge: live crowd penalty of a museum
//!
//! ## Architecture
//! Both stages sit after museum selection:
//! 1. QuestBuilder runs once per selected museum, concurrently
//! 2. RouteReorderer orders the selected museums into a walk
//! 3. The caller lines quests up with the walk
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{QuestBuilder, RouteReorderer};
//!
//! let builder = QuestBuilder::new(artworks.clone(), oracle.clone());
//! let quest = builder.build("museum-1", &preferences, 5).await?;
//!
//! let reorderer = RouteReorderer::new(distances, crowd).with_penalty_coefficient(1.5);
//! let tour = reorderer.reorder(user_location, museums).await;
//! ```

pub mod crowd;
pub mod quest_builder;
pub mod route;

// Re-export main types
pub use crowd::{CrowdGauge, CrowdPenalty};
pub use quest_builder::QuestBuilder;
pub use route::{DEFAULT_PENALTY_COEFFICIENT, RouteReorderer, UnknownCrowd, pick_next, weighted_distance};
