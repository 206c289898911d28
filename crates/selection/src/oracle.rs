//! Relevance oracles.
//!
//! An oracle answers one question: does this museum or artwork match the
//! user's preference tags? Two implementations:
//! - `TagOverlapOracle`: deterministic, compares type tags
//! - `PromptOracle`: asks a text generator and parses its verdict leniently

use async_trait::async_trait;
use providers::TextGenerator;
use quest_model::{Artwork, Museum, ProviderResult};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::debug;

static VERDICT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(true|false)\b").expect("verdict pattern is valid"));

/// What kind of record a subject describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Museum,
    Artwork,
}

impl SubjectKind {
    fn label(&self) -> &'static str {
        match self {
            SubjectKind::Museum => "museum",
            SubjectKind::Artwork => "artwork",
        }
    }
}

/// The thing an oracle is asked about.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: String,
    pub description: String,
    pub types: Vec<String>,

    /// Names of the artworks a museum holds; empty for artworks
    pub artworks: Vec<String>,
}

impl Subject {
    pub fn museum(museum: &Museum) -> Self {
        Self {
            kind: SubjectKind::Museum,
            name: museum.name.clone(),
            description: museum.description.clone(),
            types: museum.types.clone(),
            artworks: Vec::new(),
        }
    }

    pub fn artwork(artwork: &Artwork) -> Self {
        Self {
            kind: SubjectKind::Artwork,
            name: artwork.name.clone(),
            description: artwork.description.clone(),
            types: artwork.types.clone(),
            artworks: Vec::new(),
        }
    }

    pub fn with_artworks(mut self, artworks: &[Artwork]) -> Self {
        self.artworks = artworks.iter().map(|a| a.name.clone()).collect();
        self
    }

    /// Plain-text description fed to prompt-backed oracles.
    pub fn describe(&self) -> String {
        let mut text = format!(
            "{}:\n  Name: {}\n  Description: {}\n  Types: {}\n",
            self.kind.label().to_uppercase(),
            self.name,
            self.description,
            self.types.join(", ")
        );
        if !self.artworks.is_empty() {
            text.push_str(&format!("  Artworks: {}\n", self.artworks.join(", ")));
        }
        text
    }
}

/// Judges whether a subject matches a list of preference tags.
#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    async fn matches(&self, subject: &Subject, preferences: &[String]) -> ProviderResult<bool>;
}

/// Matches when any type tag of the subject equals a preference tag,
/// ignoring case and surrounding whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagOverlapOracle;

impl TagOverlapOracle {
    fn normalize(tag: &str) -> String {
        tag.trim().to_lowercase()
    }

    pub fn overlaps(types: &[String], preferences: &[String]) -> bool {
        let wanted: HashSet<String> = preferences
            .iter()
            .map(|p| Self::normalize(p))
            .filter(|p| !p.is_empty())
            .collect();
        types.iter().any(|t| wanted.contains(&Self::normalize(t)))
    }
}

#[async_trait]
impl RelevanceOracle for TagOverlapOracle {
    async fn matches(&self, subject: &Subject, preferences: &[String]) -> ProviderResult<bool> {
        Ok(Self::overlaps(&subject.types, preferences))
    }
}

/// Asks a text generator for a true/false verdict.
pub struct PromptOracle {
    generator: Arc<dyn TextGenerator>,
}

impl PromptOracle {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn prompt(subject: &Subject, preferences: &[String]) -> String {
        format!(
            "Given the following {} details and user preferences, determine if the {} \
             is a good match for the preferences.\n\n{}\nUSER PREFERENCES: {}\n\n\
             Respond with only the boolean value \"true\" or \"false\".",
            subject.kind.label(),
            subject.kind.label(),
            subject.describe(),
            preferences.join(", ")
        )
    }
}

#[async_trait]
impl RelevanceOracle for PromptOracle {
    async fn matches(&self, subject: &Subject, preferences: &[String]) -> ProviderResult<bool> {
        let reply = self
            .generator
            .generate(&Self::prompt(subject, preferences))
            .await?;
        let verdict = parse_verdict(&reply);
        debug!(subject = %subject.name, verdict, "Oracle verdict");
        Ok(verdict)
    }
}

/// Extract a boolean from free-form text.
///
/// The first standalone `true`/`false` token wins, case-insensitive.
/// Anything else is `false`.
pub fn parse_verdict(reply: &str) -> bool {
    VERDICT_RE
        .captures(reply)
        .map(|c| c[1].eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
