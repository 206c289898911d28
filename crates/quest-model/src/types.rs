//! Core domain types shared by every crate in the workspace.
//!
//! Museums, artworks and users are read-only snapshots of upstream records;
//! tasks and quests are built in memory for the duration of one request.
//! Upstream payloads use Mongo-style `_id` keys and carry extra fields we
//! don't care about, so every snapshot type ignores unknown fields.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

// =============================================================================
// Type Aliases
// =============================================================================

/// Identifier of a user record in the profile service
pub type UserId = String;

/// Identifier of a museum record in the museum catalog
pub type MuseumId = String;

/// Identifier of an artwork record in the artwork catalog
pub type ArtworkId = String;

// =============================================================================
// Geography
// =============================================================================

/// A point on the globe, both coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

// =============================================================================
// Upstream snapshots
// =============================================================================

/// A user profile as exposed by the profile service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,

    /// Ordered preference tags ("art", "history", ...)
    #[serde(default)]
    pub preferences: Vec<String>,

    /// Half-side of the search window around the user, in kilometers
    #[serde(rename = "range_preferences", default)]
    pub preference_radius_km: f64,
}

/// A museum record.
///
/// A museum without a parent is *primary*; one with a parent is *secondary*
/// and nests under a primary museum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Museum {
    #[serde(rename = "_id")]
    pub id: MuseumId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub location: Location,

    #[serde(default)]
    pub types: Vec<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_parent",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent: Option<MuseumId>,
}

impl Museum {
    pub fn is_primary(&self) -> bool {
        self.parent.is_none()
    }

    /// True when this museum nests under the museum with the given id.
    pub fn is_child_of(&self, museum_id: &str) -> bool {
        self.parent.as_deref() == Some(museum_id)
    }
}

/// An artwork record, always scoped to exactly one museum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    #[serde(rename = "_id")]
    pub id: ArtworkId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "museum", default)]
    pub museum_id: MuseumId,

    #[serde(default)]
    pub types: Vec<String>,
}

// =============================================================================
// Quest output
// =============================================================================

/// A single artwork-visit unit within a quest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Task {
    pub artwork_id: ArtworkId,
    pub title: String,
    pub description: String,
}

impl From<&Artwork> for Task {
    fn from(artwork: &Artwork) -> Self {
        Self {
            artwork_id: artwork.id.clone(),
            title: artwork.name.clone(),
            description: artwork.description.clone(),
        }
    }
}

/// A bundle of visit tasks scoped to one museum.
///
/// Title and description stay empty unless quest text generation is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Quest {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub museum_id: MuseumId,

    #[serde(default)]
    pub tasks: HashSet<Task>,
}

impl Quest {
    /// Create an empty quest for a museum.
    pub fn new(museum_id: impl Into<MuseumId>) -> Self {
        Self {
            museum_id: museum_id.into(),
            ..Self::default()
        }
    }

    /// Add a task; returns false if an identical task was already present.
    pub fn add_task(&mut self, task: Task) -> bool {
        self.tasks.insert(task)
    }

    /// Artwork ids of every task, sorted for stable display.
    pub fn artwork_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tasks.iter().map(|t| t.artwork_id.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

// =============================================================================
// Parent normalisation
// =============================================================================

/// Normalise a raw parent reference.
///
/// Empty, blank, or all-`0` identifiers (a zeroed ObjectId) mean "no parent".
pub fn normalize_parent(raw: Option<&str>) -> Option<MuseumId> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '0') {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn deserialize_parent<'de, D>(deserializer: D) -> Result<Option<MuseumId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(normalize_parent(raw.as_deref()))
}
