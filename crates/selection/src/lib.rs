//! # Selection Crate
//!
//! Decides which museums and artworks are relevant to a user.
//!
//! ## Components
//!
//! ### Relevance oracles
//! - `TagOverlapOracle`: type tags vs. preference tags, no remote calls
//! - `PromptOracle`: asks a language model and parses a lenient true/false
//!
//! ### Museum Selector
//! Fixed-seed shuffle, primary/secondary walk, quota.
//!
//! ## Example Usage
//!
//! ```ignore
//! use selection::{MuseumSelector, TagOverlapOracle};
//! use std::sync::Arc;
//!
//! let selector = MuseumSelector::new(Arc::new(TagOverlapOracle));
//! let museums = selector.select(candidates, &preferences, 3).await;
//! ```

pub mod oracle;
pub mod selector;

pub use oracle::{PromptOracle, RelevanceOracle, Subject, SubjectKind, TagOverlapOracle, parse_verdict};
pub use selector::{MuseumSelector, SELECTION_SEED};
