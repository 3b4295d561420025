//! Core identifiers and records for the Draftwright content pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DraftwrightError;
use crate::payload::Payload;

/// Current schema version for the persisted workspace snapshot.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// ArtifactId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper shared by artifacts and artifact sets (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub Uuid);

impl ArtifactId {
    /// Generate a new time-sortable identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtifactId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One step of the content pipeline, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Product,
    Persona,
    Keywords,
    Analysis,
    Objectives,
    Titles,
    MetaDescriptions,
    Sapo,
    Cta,
    Outline,
    Images,
    Article,
}

impl Stage {
    /// Every stage, in pipeline order.
    pub const ALL: [Stage; 12] = [
        Stage::Product,
        Stage::Persona,
        Stage::Keywords,
        Stage::Analysis,
        Stage::Objectives,
        Stage::Titles,
        Stage::MetaDescriptions,
        Stage::Sapo,
        Stage::Cta,
        Stage::Outline,
        Stage::Images,
        Stage::Article,
    ];

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Persona => "persona",
            Self::Keywords => "keywords",
            Self::Analysis => "analysis",
            Self::Objectives => "objectives",
            Self::Titles => "titles",
            Self::MetaDescriptions => "meta_descriptions",
            Self::Sapo => "sapo",
            Self::Cta => "cta",
            Self::Outline => "outline",
            Self::Images => "images",
            Self::Article => "article",
        }
    }

    /// Zero-based position in the pipeline.
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DraftwrightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| DraftwrightError::parse(format!("unknown stage '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Whether a selection slot holds one id or a list of ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Single,
    Multi,
}

/// A key of the selection state. Stages with a set-level choice expose a
/// set slot plus one or more item slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Product,
    Persona,
    KeywordSet,
    Keywords,
    Analysis,
    ObjectiveSet,
    Objectives,
    TitleSet,
    Title,
    MetaDescriptionSet,
    MetaDescription,
    SapoSet,
    Sapo,
    CtaSet,
    Ctas,
    Outline,
    ImageSet,
    Images,
    FeatureImage,
    Article,
}

impl Slot {
    /// Every slot, in pipeline order.
    pub const ALL: [Slot; 20] = [
        Slot::Product,
        Slot::Persona,
        Slot::KeywordSet,
        Slot::Keywords,
        Slot::Analysis,
        Slot::ObjectiveSet,
        Slot::Objectives,
        Slot::TitleSet,
        Slot::Title,
        Slot::MetaDescriptionSet,
        Slot::MetaDescription,
        Slot::SapoSet,
        Slot::Sapo,
        Slot::CtaSet,
        Slot::Ctas,
        Slot::Outline,
        Slot::ImageSet,
        Slot::Images,
        Slot::FeatureImage,
        Slot::Article,
    ];

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Persona => "persona",
            Self::KeywordSet => "keyword_set",
            Self::Keywords => "keywords",
            Self::Analysis => "analysis",
            Self::ObjectiveSet => "objective_set",
            Self::Objectives => "objectives",
            Self::TitleSet => "title_set",
            Self::Title => "title",
            Self::MetaDescriptionSet => "meta_description_set",
            Self::MetaDescription => "meta_description",
            Self::SapoSet => "sapo_set",
            Self::Sapo => "sapo",
            Self::CtaSet => "cta_set",
            Self::Ctas => "ctas",
            Self::Outline => "outline",
            Self::ImageSet => "image_set",
            Self::Images => "images",
            Self::FeatureImage => "feature_image",
            Self::Article => "article",
        }
    }

    /// Multi-select slots hold a list; every other slot holds one id.
    pub fn kind(&self) -> SlotKind {
        match self {
            Self::Keywords | Self::Objectives | Self::Ctas | Self::Images => SlotKind::Multi,
            _ => SlotKind::Single,
        }
    }

    /// The stage whose artifacts this slot references.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Product => Stage::Product,
            Self::Persona => Stage::Persona,
            Self::KeywordSet | Self::Keywords => Stage::Keywords,
            Self::Analysis => Stage::Analysis,
            Self::ObjectiveSet | Self::Objectives => Stage::Objectives,
            Self::TitleSet | Self::Title => Stage::Titles,
            Self::MetaDescriptionSet | Self::MetaDescription => Stage::MetaDescriptions,
            Self::SapoSet | Self::Sapo => Stage::Sapo,
            Self::CtaSet | Self::Ctas => Stage::Cta,
            Self::Outline => Stage::Outline,
            Self::ImageSet | Self::Images | Self::FeatureImage => Stage::Images,
            Self::Article => Stage::Article,
        }
    }

    /// Zero-based position in pipeline order.
    pub fn position(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = DraftwrightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str() == normalized)
            .ok_or_else(|| DraftwrightError::parse(format!("unknown selection slot '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// ParentRef
// ---------------------------------------------------------------------------

/// The upstream selection(s) an artifact set was generated from.
///
/// Ids are kept sorted and de-duplicated so that two references to the same
/// upstream context compare equal regardless of input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParentRef(Vec<ArtifactId>);

impl ParentRef {
    /// A set with no upstream context (the product stage).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn one(id: ArtifactId) -> Self {
        Self(vec![id])
    }

    pub fn from_ids(ids: impl IntoIterator<Item = ArtifactId>) -> Self {
        let mut ids: Vec<ArtifactId> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    pub fn ids(&self) -> &[ArtifactId] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Artifact / ArtifactSet
// ---------------------------------------------------------------------------

/// One generated candidate. Immutable once created, except for the body of
/// a saved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub created_at: DateTime<Utc>,
    pub payload: Payload,
}

/// The batch of candidates produced by one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSet {
    pub id: ArtifactId,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    /// Upstream selection(s) that produced this set.
    pub parent: ParentRef,
    pub options: Vec<Artifact>,
}

impl ArtifactSet {
    /// Find an option of this set by id.
    pub fn option(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.options.iter().find(|a| &a.id == id)
    }

    pub fn option_ids(&self) -> Vec<ArtifactId> {
        self.options.iter().map(|a| a.id).collect()
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Output language for generated content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Vi,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Vi => "vi",
        }
    }
}

impl FromStr for Language {
    type Err = DraftwrightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Self::En),
            "vi" => Ok(Self::Vi),
            other => Err(DraftwrightError::parse(format!("unknown language '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl FromStr for Theme {
    type Err = DraftwrightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(DraftwrightError::parse(format!("unknown theme '{other}'"))),
        }
    }
}

/// User preferences persisted alongside the pipeline state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub user_name: String,
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: Language::default(),
            theme: Theme::default(),
            user_name: String::new(),
            words_per_minute: default_words_per_minute(),
        }
    }
}

/// Default reading speed used for reading-time estimates.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 225;

fn default_words_per_minute() -> u32 {
    DEFAULT_WORDS_PER_MINUTE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_id_roundtrip() {
        let id = ArtifactId::new();
        let s = id.to_string();
        let parsed: ArtifactId = s.parse().expect("parse ArtifactId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn slots_are_listed_in_stage_order() {
        let positions: Vec<usize> = Slot::ALL.iter().map(|s| s.stage().position()).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn every_stage_has_a_slot() {
        for stage in Stage::ALL {
            assert!(Slot::ALL.iter().any(|s| s.stage() == stage), "{stage} has no slot");
        }
    }

    #[test]
    fn stage_and_slot_parse_loosely() {
        assert_eq!("meta-descriptions".parse::<Stage>().unwrap(), Stage::MetaDescriptions);
        assert_eq!("Feature_Image".parse::<Slot>().unwrap(), Slot::FeatureImage);
        assert!("nope".parse::<Slot>().is_err());
    }

    #[test]
    fn multi_select_slots() {
        let multi: Vec<Slot> = Slot::ALL
            .into_iter()
            .filter(|s| s.kind() == SlotKind::Multi)
            .collect();
        assert_eq!(
            multi,
            vec![Slot::Keywords, Slot::Objectives, Slot::Ctas, Slot::Images]
        );
    }

    #[test]
    fn parent_ref_is_order_insensitive() {
        let a = ArtifactId::new();
        let b = ArtifactId::new();
        assert_eq!(ParentRef::from_ids([a, b]), ParentRef::from_ids([b, a, b]));
        assert!(ParentRef::root().is_root());
    }

    #[test]
    fn preferences_default_reading_speed() {
        let prefs: Preferences = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(prefs.words_per_minute, DEFAULT_WORDS_PER_MINUTE);
        assert_eq!(prefs.language, Language::En);
    }
}
