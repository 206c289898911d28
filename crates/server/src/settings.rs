//! Quest-building settings, separate from the upstream addresses in
//! `ProviderConfig`.

use pipeline::{DEFAULT_PENALTY_COEFFICIENT, UnknownCrowd};
use providers::ConfigError;
use std::str::FromStr;

pub const DEFAULT_FEATURED_NAME: &str = "Notte dei Ricercatori";

pub const DEFAULT_FEATURED_DESCRIPTION: &str = "Sei pronto per un'avventura elettrizzante? \
La Notte dei Ricercatori è iniziata e la città è piena di segreti scientifici da scoprire! \
Trova i codici QR sparsi per l'evento, sblocca i misteri dietro gli stand e completa la quest \
per diventare un esperto di ricerca!";

/// Which oracle decides relevance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelevanceMode {
    /// Type tags against preference tags, no remote calls
    #[default]
    Tags,

    /// Ask the chat service
    Chat,
}

impl FromStr for RelevanceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tags" => Ok(RelevanceMode::Tags),
            "chat" => Ok(RelevanceMode::Chat),
            _ => Err(ConfigError::InvalidValue {
                field: "relevance mode",
                value: s.to_string(),
            }),
        }
    }
}

/// What a batch request builds by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchProfile {
    /// Museums around the user
    #[default]
    Standard,

    /// The single featured-event quest
    Featured,

    /// Offline placeholder quests
    Placeholder,
}

/// Event whose museum gets a fixed title and description
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedEvent {
    pub museum_name: String,
    pub title: String,
    pub description: String,
}

impl Default for FeaturedEvent {
    fn default() -> Self {
        Self {
            museum_name: DEFAULT_FEATURED_NAME.to_string(),
            title: DEFAULT_FEATURED_NAME.to_string(),
            description: DEFAULT_FEATURED_DESCRIPTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestSettings {
    pub relevance: RelevanceMode,

    /// Ask the chat service for quest titles and descriptions
    pub generate_text: bool,

    pub penalty_coefficient: f64,
    pub unknown_crowd: UnknownCrowd,

    /// Query the catalog even when the user's window is a single point
    pub point_query_tolerated: bool,

    pub featured: FeaturedEvent,
    pub profile: BatchProfile,

    /// Upper bound on concurrent quest builds; `None` uses available parallelism
    pub max_workers: Option<usize>,
}

impl Default for QuestSettings {
    fn default() -> Self {
        Self {
            relevance: RelevanceMode::default(),
            generate_text: false,
            penalty_coefficient: DEFAULT_PENALTY_COEFFICIENT,
            unknown_crowd: UnknownCrowd::default(),
            point_query_tolerated: false,
            featured: FeaturedEvent::default(),
            profile: BatchProfile::default(),
            max_workers: None,
        }
    }
}

impl QuestSettings {
    /// Read the deployment switches.
    ///
    /// - `NOTTE_DEI_RICERCATORI=true`: featured profile and generated text
    /// - `DUMMY_MODE=true`: placeholder profile (wins over the featured one)
    /// - `NDR_MUSEUM_NAME`: featured museum name
    /// - `RELEVANCE_MODE`: `tags` or `chat`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let flag = |key: &str| {
            lookup(key)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        let mut settings = Self::default();

        if flag("NOTTE_DEI_RICERCATORI") {
            settings.generate_text = true;
            settings.profile = BatchProfile::Featured;
        }
        if flag("DUMMY_MODE") {
            settings.profile = BatchProfile::Placeholder;
        }
        if let Some(name) = lookup("NDR_MUSEUM_NAME").filter(|v| !v.trim().is_empty()) {
            settings.featured.museum_name = name.trim().to_string();
        }
        if let Some(mode) = lookup("RELEVANCE_MODE") {
            settings.relevance = mode.parse()?;
        }

        Ok(settings)
    }
}
