//! # Quest Model Crate
//!
//! Domain types for the quest builder.
//!
//! ## Main Components
//!
//! - **types**: Snapshots of upstream records (User, Museum, Artwork) and the
//!   quest output (Task, Quest)
//! - **geo**: Bounding-box window around a user location
//! - **error**: Provider and quest error taxonomy
//!
//! ## Example Usage
//!
//! ```ignore
//! use quest_model::{BoundingBox, Location};
//!
//! let window = BoundingBox::around(Location::new(41.13, 14.78), 10.0);
//! let museums = catalog.museums_in(&window).await?;
//! ```

pub mod error;
pub mod geo;
pub mod types;

pub use error::{ProviderError, ProviderResult, QuestError, Result};
pub use geo::{BoundingBox, EARTH_RADIUS_KM, haversine_km};
pub use types::{
    // Type aliases
    ArtworkId,
    MuseumId,
    UserId,
    // Core types
    Artwork,
    Location,
    Museum,
    Quest,
    Task,
    User,
    // Helpers
    normalize_parent,
};
