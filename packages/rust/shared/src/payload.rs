//! Stage-specific artifact payloads.
//!
//! Field names follow the camelCase JSON the generation collaborator returns,
//! so a model response can be deserialized straight into these types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DraftwrightError, Result};
use crate::types::{ArtifactId, Stage};

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The content of one artifact, tagged by the stage that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Product(ProductInfo),
    Persona(Persona),
    Keyword(Keyword),
    Analysis(Analysis),
    Objective(ObjectiveOption),
    Title(TitleOption),
    MetaDescription(MetaDescriptionOption),
    Sapo(SapoOption),
    Cta(CtaOption),
    Outline(Outline),
    Image(ImageOption),
    Document(Box<Document>),
}

impl Payload {
    /// The stage this payload belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Product(_) => Stage::Product,
            Self::Persona(_) => Stage::Persona,
            Self::Keyword(_) => Stage::Keywords,
            Self::Analysis(_) => Stage::Analysis,
            Self::Objective(_) => Stage::Objectives,
            Self::Title(_) => Stage::Titles,
            Self::MetaDescription(_) => Stage::MetaDescriptions,
            Self::Sapo(_) => Stage::Sapo,
            Self::Cta(_) => Stage::Cta,
            Self::Outline(_) => Stage::Outline,
            Self::Image(_) => Stage::Images,
            Self::Document(_) => Stage::Article,
        }
    }

    /// Deserialize an untagged JSON value as the payload type of `stage`.
    pub fn from_value(stage: Stage, value: Value) -> Result<Self> {
        fn typed<T: serde::de::DeserializeOwned>(stage: Stage, value: Value) -> Result<T> {
            serde_json::from_value(value)
                .map_err(|e| DraftwrightError::parse(format!("invalid {stage} payload: {e}")))
        }

        Ok(match stage {
            Stage::Product => Self::Product(typed(stage, value)?),
            Stage::Persona => Self::Persona(typed(stage, value)?),
            Stage::Keywords => Self::Keyword(typed(stage, value)?),
            Stage::Analysis => Self::Analysis(typed(stage, value)?),
            Stage::Objectives => Self::Objective(typed(stage, value)?),
            Stage::Titles => Self::Title(typed(stage, value)?),
            Stage::MetaDescriptions => Self::MetaDescription(typed(stage, value)?),
            Stage::Sapo => Self::Sapo(typed(stage, value)?),
            Stage::Cta => Self::Cta(typed(stage, value)?),
            Stage::Outline => Self::Outline(typed(stage, value)?),
            Stage::Images => Self::Image(typed(stage, value)?),
            Stage::Article => Self::Document(Box::new(typed(stage, value)?)),
        })
    }

    /// A short one-line label for listings.
    pub fn label(&self) -> String {
        match self {
            Self::Product(p) => p.name.clone(),
            Self::Persona(p) => p.summary.clone(),
            Self::Keyword(k) => k.term.clone(),
            Self::Analysis(a) => a.summary.clone(),
            Self::Objective(o) => o.description.clone(),
            Self::Title(t) => t.title.clone(),
            Self::MetaDescription(m) => m.description.clone(),
            Self::Sapo(s) => s.content.clone(),
            Self::Cta(c) => c.content.clone(),
            Self::Outline(o) => format!("{} sections", o.sections.len()),
            Self::Image(i) => i.prompt.clone(),
            Self::Document(d) => d.title.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Product / Persona
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Persona frameworks the generator can be asked to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonaModel {
    Standard,
    Empathy,
    ValueProp,
    Jtbd,
    Journey,
    Mental,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaDetails {
    #[serde(default)]
    pub demographics: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmpathyMap {
    #[serde(default)]
    pub says: Vec<String>,
    #[serde(default)]
    pub thinks: Vec<String>,
    #[serde(default)]
    pub does: Vec<String>,
    #[serde(default)]
    pub feels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub summary: String,
    #[serde(default)]
    pub models: Vec<PersonaModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<PersonaDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empathy_map: Option<EmpathyMap>,
    // The remaining frameworks are carried through as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_proposition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jtbd: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journey: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mental_model: Option<Value>,
}

// ---------------------------------------------------------------------------
// Keywords / Analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Competition {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchIntent {
    #[default]
    Informational,
    Navigational,
    Commercial,
    Transactional,
}

impl fmt::Display for SearchIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Informational => "Informational",
            Self::Navigational => "Navigational",
            Self::Commercial => "Commercial",
            Self::Transactional => "Transactional",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyword {
    pub term: String,
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub search_volume: u64,
    #[serde(default)]
    pub competition: Competition,
    #[serde(default)]
    pub kei: f64,
    #[serde(default)]
    pub kgr: f64,
    #[serde(default)]
    pub intent: SearchIntent,
    #[serde(default)]
    pub lsi_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakthroughs {
    #[serde(default)]
    pub unique_insights: String,
    #[serde(default, rename = "humanExperienceEEAT")]
    pub human_experience_eeat: String,
    #[serde(default)]
    pub hcu_exploitation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub summary: String,
    #[serde(default, deserialize_with = "string_list")]
    pub objectives: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub content_gaps: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub creative_ideas: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakthroughs: Option<Breakthroughs>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Accept a list of strings, a list of `{title, description}`-like objects,
/// or a single newline-separated string with optional `- ` bullets.
fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(normalize_string_list(&value))
}

fn normalize_string_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().map(list_item_text).collect(),
        Value::String(s) => s
            .lines()
            .map(|line| line.trim().trim_start_matches("- ").trim().to_string())
            .collect(),
        _ => Vec::new(),
    };
    items.into_iter().filter(|s| !s.trim().is_empty()).collect()
}

fn list_item_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            let field = |k: &str| map.get(k).and_then(Value::as_str);
            match (field("title"), field("description")) {
                (Some(t), Some(d)) => format!("{t}: {d}"),
                (Some(t), None) => t.to_string(),
                (None, Some(d)) => d.to_string(),
                (None, None) => field("name")
                    .map(str::to_string)
                    .unwrap_or_else(|| item.to_string()),
            }
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Scored and free-text options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveOption {
    pub description: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleOption {
    pub title: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaDescriptionOption {
    pub description: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub score: f64,
}

/// Introductory paragraph ("sapo") placed under the title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SapoOption {
    pub content: String,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CtaOption {
    pub content: String,
    #[serde(default)]
    pub rationale: String,
}

// ---------------------------------------------------------------------------
// Outline / Images
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    #[serde(alias = "h2")]
    pub heading: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub sections: Vec<OutlineSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageOption {
    /// Image location; generated images arrive as `data:` URLs.
    pub url: String,
    #[serde(default)]
    pub prompt: String,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingStyle {
    #[default]
    Default,
    Pas,
    #[serde(rename = "3s")]
    ThreeS,
    Aidasas,
    Storytelling,
    Expository,
    Persuasive,
    Descriptive,
    Narrative,
    Technical,
    Conversational,
}

impl WritingStyle {
    pub const ALL: [WritingStyle; 11] = [
        WritingStyle::Default,
        WritingStyle::Pas,
        WritingStyle::ThreeS,
        WritingStyle::Aidasas,
        WritingStyle::Storytelling,
        WritingStyle::Expository,
        WritingStyle::Persuasive,
        WritingStyle::Descriptive,
        WritingStyle::Narrative,
        WritingStyle::Technical,
        WritingStyle::Conversational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Pas => "pas",
            Self::ThreeS => "3s",
            Self::Aidasas => "aidasas",
            Self::Storytelling => "storytelling",
            Self::Expository => "expository",
            Self::Persuasive => "persuasive",
            Self::Descriptive => "descriptive",
            Self::Narrative => "narrative",
            Self::Technical => "technical",
            Self::Conversational => "conversational",
        }
    }
}

impl FromStr for WritingStyle {
    type Err = DraftwrightError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == wanted)
            .ok_or_else(|| DraftwrightError::parse(format!("unknown writing style '{s}'")))
    }
}

/// Options forwarded to the generator when writing article parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(default = "default_true")]
    pub include_faq: bool,
    #[serde(default = "default_true")]
    pub use_tables: bool,
    #[serde(default = "default_true")]
    pub use_quotes: bool,
    #[serde(default = "default_true")]
    pub add_wikipedia_links: bool,
    #[serde(default = "default_true")]
    pub use_inverted_pyramid: bool,
    #[serde(default = "default_true")]
    pub optimize_for_ai_overview: bool,
    #[serde(default)]
    pub internal_links: Vec<String>,
    #[serde(default)]
    pub external_links: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            include_faq: true,
            use_tables: true,
            use_quotes: true,
            add_wikipedia_links: true,
            use_inverted_pyramid: true,
            optimize_for_ai_overview: true,
            internal_links: Vec::new(),
            external_links: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// The three generated text parts of a document, pre-merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentParts {
    pub part1: String,
    pub part2: String,
    pub part3: String,
}

/// The terminal artifact: the merged, publishable article plus references
/// to every upstream selection that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub title: String,
    /// Merged markup body; the only field editable after saving.
    pub body: String,
    pub parts: DocumentParts,
    pub meta_description: String,
    pub sapo: String,
    #[serde(default)]
    pub ctas: Vec<String>,
    pub outline_id: ArtifactId,
    pub feature_image: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub persona_id: ArtifactId,
    pub analysis_id: ArtifactId,
    pub primary_keyword_id: ArtifactId,
    #[serde(default)]
    pub objective_ids: Vec<ArtifactId>,
    #[serde(default)]
    pub writing_style: WritingStyle,
    #[serde(default)]
    pub generation_options: GenerationOptions,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub reading_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_is_tagged_by_kind() {
        let payload = Payload::Title(TitleOption {
            title: "Ten ways to brew".into(),
            rationale: "direct".into(),
            score: 8.5,
        });
        let value = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(value["kind"], "title");
        assert_eq!(value["data"]["title"], "Ten ways to brew");
        assert_eq!(payload.stage(), Stage::Titles);
    }

    #[test]
    fn keyword_accepts_generator_json() {
        let value = json!({
            "id": "ignored",
            "term": "cold brew, at home",
            "relevance": 9,
            "searchVolume": 1200,
            "competition": "High",
            "kei": 1.5,
            "kgr": 0.2,
            "intent": "Commercial",
            "lsiKeywords": ["iced coffee", "brew ratio"]
        });
        let payload = Payload::from_value(Stage::Keywords, value).expect("keyword");
        match payload {
            Payload::Keyword(k) => {
                assert_eq!(k.search_volume, 1200);
                assert_eq!(k.competition, Competition::High);
                assert_eq!(k.intent, SearchIntent::Commercial);
                assert_eq!(k.lsi_keywords.len(), 2);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn outline_accepts_legacy_h2_field() {
        let value = json!({ "sections": [{ "h2": "Intro", "bullets": ["a"] }] });
        let payload = Payload::from_value(Stage::Outline, value).expect("outline");
        match payload {
            Payload::Outline(o) => assert_eq!(o.sections[0].heading, "Intro"),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn from_value_rejects_wrong_shape() {
        let err = Payload::from_value(Stage::Titles, json!({ "content": "x" })).unwrap_err();
        assert!(err.to_string().contains("titles"));
    }

    #[test]
    fn analysis_lists_are_lenient() {
        let value = json!({
            "summary": "s",
            "objectives": "- learn brewing\n- pick beans\n",
            "contentGaps": [{ "title": "Ratios", "description": "nobody covers them" }, "", "Grind"],
            "creativeIdeas": null
        });
        let Payload::Analysis(a) = Payload::from_value(Stage::Analysis, value).unwrap() else {
            panic!("expected analysis");
        };
        assert_eq!(a.objectives, vec!["learn brewing", "pick beans"]);
        assert_eq!(a.content_gaps, vec!["Ratios: nobody covers them", "Grind"]);
        assert!(a.creative_ideas.is_empty());
    }

    #[test]
    fn writing_style_names() {
        assert_eq!("3s".parse::<WritingStyle>().unwrap(), WritingStyle::ThreeS);
        let json = serde_json::to_string(&WritingStyle::ThreeS).unwrap();
        assert_eq!(json, "\"3s\"");
        assert!("haiku".parse::<WritingStyle>().is_err());
    }

    #[test]
    fn analysis_breakthrough_field_names() {
        let value = json!({
            "summary": "s",
            "breakthroughs": {
                "uniqueInsights": "u",
                "humanExperienceEEAT": "h",
                "hcuExploitation": "c"
            }
        });
        let payload = Payload::from_value(Stage::Analysis, value).expect("analysis");
        let Payload::Analysis(a) = payload else {
            panic!("expected analysis");
        };
        assert_eq!(a.breakthroughs.unwrap().human_experience_eeat, "h");
    }
}
