//! # Providers Crate
//!
//! Capability traits for every upstream the quest builder talks to, the
//! configuration that points at them, and their HTTP clients.
//!
//! ## Main Components
//!
//! - **traits**: `UserProvider`, `LocationProvider`, `MuseumCatalog`,
//!   `ArtworkCatalog`, `DistanceProvider`, `CrowdStatusProvider`, `TextGenerator`
//! - **config**: `ProviderConfig`, built once at startup
//! - **clients**: reqwest-backed implementations
//! - **memory**: in-memory implementations with failure injection (`test-util`)
//!
//! ## Example Usage
//!
//! ```ignore
//! use providers::{HttpMuseumCatalog, MuseumCatalog, ProviderConfig};
//!
//! let config = ProviderConfig::from_env();
//! let museums = HttpMuseumCatalog::new(&config)?;
//! let found = museums.museums_by_name("Museo del Sannio").await?;
//! ```

pub mod clients;
pub mod config;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod payload;
pub mod traits;

pub use clients::{
    HttpArtworkCatalog, HttpCrowdStatus, HttpDistanceProvider, HttpLocationProvider,
    HttpMuseumCatalog, HttpTextGenerator, HttpUserProvider,
};
pub use config::{ConfigError, DEFAULT_CHAT_MODEL, DEFAULT_TIMEOUT, ProviderConfig, base_url};
#[cfg(any(test, feature = "test-util"))]
pub use memory::{CallCounts, FnTextGenerator, MemoryUpstream};
pub use traits::{
    ArtworkCatalog, CrowdStatusProvider, DistanceProvider, LocationProvider, MuseumCatalog,
    QuestStatus, TextGenerator, UserProvider,
};
