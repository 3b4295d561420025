//! Shared types, error model, and configuration for Draftwright.
//!
//! This crate is the foundation depended on by all other Draftwright crates.
//! It provides:
//! - [`DraftwrightError`], the unified error type
//! - Pipeline identifiers ([`Stage`], [`Slot`], [`ArtifactId`]) and records
//!   ([`Artifact`], [`ArtifactSet`])
//! - Stage payloads ([`Payload`] and friends)
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod payload;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BridgeConfig, DefaultsConfig, config_dir, config_file_path, expand_home,
    init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{DraftwrightError, Result};
pub use payload::{
    Analysis, Breakthroughs, Competition, CtaOption, Document, DocumentParts, EmpathyMap,
    GenerationOptions, ImageOption, Keyword, MetaDescriptionOption, ObjectiveOption, Outline,
    OutlineSection, Payload, Persona, PersonaDetails, PersonaModel, ProductInfo, SapoOption,
    SearchIntent, Source, TitleOption, WritingStyle,
};
pub use types::{
    Artifact, ArtifactId, ArtifactSet, CURRENT_SCHEMA_VERSION, DEFAULT_WORDS_PER_MINUTE, Language,
    ParentRef, Preferences, Slot, SlotKind, Stage, Theme,
};
