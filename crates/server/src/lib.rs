//! Server crate for the quest builder.
//!
//! This crate contains the orchestrator that turns a user id into an
//! ordered set of museum quests, the fan-out scheduler it builds them
//! with, and the settings that shape both.

pub mod orchestrator;
pub mod scheduler;
pub mod settings;

pub use orchestrator::{Providers, QuestOrchestrator, placeholder_quest};
pub use scheduler::{DegradedBuild, QuestBatch, run_builds, worker_count};
pub use settings::{BatchProfile, FeaturedEvent, QuestSettings, RelevanceMode};
