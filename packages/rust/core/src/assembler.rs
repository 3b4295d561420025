//! Document assembly: split the outline, distribute images and CTAs across
//! the three article parts, inject images into generated text, and merge the
//! parts into the final body.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use draftwright_markdown::{feature_embed, image_embed, placeholder, reading_time, word_count};
use draftwright_shared::{
    Analysis, ArtifactId, Document, DocumentParts, DraftwrightError, GenerationOptions, Language,
    Outline, Payload, Persona, Result, Slot, WritingStyle,
};

use crate::generation::PartRequest;
use crate::state::WorkspaceState;

// ---------------------------------------------------------------------------
// Parts
// ---------------------------------------------------------------------------

/// One of the three generated article parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Part {
    Part1,
    Part2,
    Part3,
}

impl Part {
    pub const ALL: [Part; 3] = [Part::Part1, Part::Part2, Part::Part3];

    /// Zero-based index.
    pub fn index(&self) -> usize {
        match self {
            Self::Part1 => 0,
            Self::Part2 => 1,
            Self::Part3 => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Part1 => "part1",
            Self::Part2 => "part2",
            Self::Part3 => "part3",
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Part {
    type Err = DraftwrightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1" | "part1" => Ok(Self::Part1),
            "2" | "part2" => Ok(Self::Part2),
            "3" | "part3" => Ok(Self::Part3),
            other => Err(DraftwrightError::parse(format!(
                "unknown part '{other}', expected 1, 2 or 3"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Split outline sections into three ordered, contiguous parts.
///
/// Fewer than three sections all go to part 1. Otherwise every part is
/// non-empty and remainder sections land in part 3.
pub fn split_outline<T>(sections: &[T]) -> [&[T]; 3] {
    let n = sections.len();
    if n < 3 {
        return [sections, &[], &[]];
    }
    let third = n / 3;
    let part1_end = third.max(1);
    let part2_end = (part1_end + 1).max(third * 2);
    [
        &sections[..part1_end],
        &sections[part1_end..part2_end],
        &sections[part2_end..],
    ]
}

/// Split body images into chunks of `ceil(M / 3)`; part 3 takes the rest.
pub fn distribute_images<T>(images: &[T]) -> [&[T]; 3] {
    let m = images.len();
    if m == 0 {
        return [&[], &[], &[]];
    }
    let chunk = m.div_ceil(3);
    let first = chunk.min(m);
    let second = (2 * chunk).min(m);
    [&images[..first], &images[first..second], &images[second..]]
}

/// The first CTA goes to part 1, the second to part 2, the rest to part 3.
pub fn distribute_ctas<T>(ctas: &[T]) -> [&[T]; 3] {
    let first = ctas.len().min(1);
    let second = ctas.len().min(2);
    [&ctas[..first], &ctas[first..second], &ctas[second..]]
}

// ---------------------------------------------------------------------------
// Injection and merge
// ---------------------------------------------------------------------------

/// Replace `[IMAGE_i]` placeholders (case-insensitive, 1-based, no leading
/// zeros) with image embeds. Images whose placeholder is absent are appended
/// in order.
pub fn inject_images(text: &str, image_urls: &[String]) -> String {
    static PLACEHOLDER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\[IMAGE_([1-9]\d*)\]").expect("valid regex"));

    let mut placed = vec![false; image_urls.len()];
    let mut result = PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures| {
            let url = caps[1]
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .and_then(|n| image_urls.get(n - 1).map(|url| (n, url)));
            match url {
                Some((n, url)) => {
                    placed[n - 1] = true;
                    image_embed(url, n)
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    for (i, url) in image_urls.iter().enumerate() {
        if !placed[i] {
            debug!(image = i + 1, "placeholder missing, appending image");
            result.push_str(&format!("\n\n{}\n", image_embed(url, i + 1)));
        }
    }
    result
}

/// Concatenate the parts separated by a blank line, prefixed by the feature
/// image embed when there is one.
pub fn merge_document(feature_image: Option<&str>, parts: [&str; 3]) -> String {
    let feature = feature_image.map(feature_embed).unwrap_or_default();
    format!("{feature}{}\n\n{}\n\n{}", parts[0], parts[1], parts[2])
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// The three generated part texts of one article, possibly user-edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleDraft {
    parts: [Option<String>; 3],
}

impl ArticleDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, part: Part, text: impl Into<String>) {
        self.parts[part.index()] = Some(text.into());
    }

    /// Non-empty text of `part`.
    pub fn get(&self, part: Part) -> Option<&str> {
        self.parts[part.index()]
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }

    /// Parts that have not been generated yet.
    pub fn missing_parts(&self) -> Vec<Part> {
        Part::ALL
            .into_iter()
            .filter(|p| self.get(*p).is_none())
            .collect()
    }

    /// True when all three parts have text.
    pub fn is_complete(&self) -> bool {
        self.missing_parts().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Assembly context
// ---------------------------------------------------------------------------

/// Everything assembly needs, resolved from the current selections.
#[derive(Debug, Clone)]
pub struct AssemblyContext {
    pub persona_id: ArtifactId,
    pub persona: Persona,
    pub analysis_id: ArtifactId,
    pub analysis: Analysis,
    pub title: String,
    pub meta_description: String,
    pub sapo: String,
    pub ctas: Vec<String>,
    pub outline_id: ArtifactId,
    pub outline: Outline,
    pub feature_image: String,
    /// Selected images other than the feature image, in set order.
    pub body_images: Vec<String>,
    pub objective_ids: Vec<ArtifactId>,
    pub primary_keyword_id: Option<ArtifactId>,
}

/// The merged body plus its metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedBody {
    pub body: String,
    pub word_count: usize,
    pub reading_minutes: u32,
}

impl AssemblyContext {
    /// Resolve the assembly inputs, or fail with `NotReady` listing every
    /// missing selection.
    pub fn resolve(state: &WorkspaceState) -> Result<Self> {
        let mut missing: Vec<&str> = Vec::new();

        let persona = state.selected_artifact(Slot::Persona).and_then(|a| match &a.payload {
            Payload::Persona(p) => Some((a.id, p.clone())),
            _ => None,
        });
        let title = state.selected_artifact(Slot::Title).and_then(|a| match &a.payload {
            Payload::Title(t) => Some(t.title.clone()),
            _ => None,
        });
        let meta = state
            .selected_artifact(Slot::MetaDescription)
            .and_then(|a| match &a.payload {
                Payload::MetaDescription(m) => Some(m.description.clone()),
                _ => None,
            });
        let sapo = state.selected_artifact(Slot::Sapo).and_then(|a| match &a.payload {
            Payload::Sapo(s) => Some(s.content.clone()),
            _ => None,
        });
        let ctas: Vec<String> = state
            .selected_artifacts(Slot::Ctas)
            .into_iter()
            .filter_map(|a| match &a.payload {
                Payload::Cta(c) => Some(c.content.clone()),
                _ => None,
            })
            .collect();
        let feature = state
            .selected_artifact(Slot::FeatureImage)
            .and_then(|a| match &a.payload {
                Payload::Image(i) => Some((a.id, i.url.clone())),
                _ => None,
            });
        let outline = state.selected_artifact(Slot::Outline).and_then(|a| match &a.payload {
            Payload::Outline(o) => Some((a.id, o.clone())),
            _ => None,
        });
        let analysis = state.selected_artifact(Slot::Analysis).and_then(|a| match &a.payload {
            Payload::Analysis(an) => Some((a.id, an.clone())),
            _ => None,
        });

        if persona.is_none() {
            missing.push("persona");
        }
        if title.is_none() {
            missing.push("title");
        }
        if meta.is_none() {
            missing.push("meta description");
        }
        if sapo.is_none() {
            missing.push("sapo");
        }
        if ctas.is_empty() {
            missing.push("CTA");
        }
        if feature.is_none() {
            missing.push("feature image");
        }
        if outline.is_none() {
            missing.push("outline");
        }
        if analysis.is_none() {
            missing.push("analysis");
        }

        let (
            Some((persona_id, persona)),
            Some(title),
            Some(meta_description),
            Some(sapo),
            Some((feature_id, feature_image)),
            Some((outline_id, outline)),
            Some((analysis_id, analysis)),
        ) = (persona, title, meta, sapo, feature, outline, analysis)
        else {
            return Err(DraftwrightError::not_ready(missing));
        };
        if !missing.is_empty() {
            return Err(DraftwrightError::not_ready(missing));
        }

        Ok(Self {
            persona_id,
            persona,
            analysis_id,
            analysis,
            title,
            meta_description,
            sapo,
            ctas,
            outline_id,
            outline,
            feature_image,
            body_images: body_images(state, feature_id),
            objective_ids: state.resolved_ids(Slot::Objectives),
            primary_keyword_id: state.primary_keyword().map(|a| a.id),
        })
    }

    /// Generation input for one part.
    pub fn part_request(
        &self,
        part: Part,
        language: Language,
        style: WritingStyle,
        options: &GenerationOptions,
    ) -> PartRequest {
        let i = part.index();
        let images = distribute_images(&self.body_images)[i].to_vec();
        PartRequest {
            part,
            sections: split_outline(&self.outline.sections)[i].to_vec(),
            placeholders: (1..=images.len()).map(placeholder).collect(),
            images,
            ctas: distribute_ctas(&self.ctas)[i].to_vec(),
            title: self.title.clone(),
            sapo: self.sapo.clone(),
            persona_summary: self.persona.summary.clone(),
            analysis_summary: self.analysis.summary.clone(),
            language,
            style,
            options: options.clone(),
        }
    }

    /// Inject each part's images and merge. Requires all three parts.
    #[instrument(skip_all, fields(outline = %self.outline_id))]
    pub fn publish(&self, draft: &ArticleDraft, words_per_minute: u32) -> Result<PublishedBody> {
        let missing = draft.missing_parts();
        if !missing.is_empty() {
            return Err(DraftwrightError::not_ready(
                missing.iter().map(|p| p.to_string()),
            ));
        }

        let images = distribute_images(&self.body_images);
        let injected: Vec<String> = Part::ALL
            .into_iter()
            .map(|p| inject_images(draft.get(p).unwrap_or_default(), images[p.index()]))
            .collect();

        let body = merge_document(
            Some(self.feature_image.as_str()),
            [&injected[0], &injected[1], &injected[2]],
        );
        let words = word_count(&body);
        info!(words, "merged document");

        Ok(PublishedBody {
            body,
            word_count: words,
            reading_minutes: reading_time(words, words_per_minute),
        })
    }

    /// Build the document record for saving. Also requires a primary keyword.
    pub fn build_document(
        &self,
        draft: &ArticleDraft,
        style: WritingStyle,
        options: GenerationOptions,
        words_per_minute: u32,
    ) -> Result<Document> {
        let primary_keyword_id = self
            .primary_keyword_id
            .ok_or_else(|| DraftwrightError::not_ready(["primary keyword"]))?;
        let published = self.publish(draft, words_per_minute)?;

        let part_text = |p: Part| draft.get(p).unwrap_or_default().to_string();
        Ok(Document {
            title: self.title.clone(),
            body: published.body,
            parts: DocumentParts {
                part1: part_text(Part::Part1),
                part2: part_text(Part::Part2),
                part3: part_text(Part::Part3),
            },
            meta_description: self.meta_description.clone(),
            sapo: self.sapo.clone(),
            ctas: self.ctas.clone(),
            outline_id: self.outline_id,
            feature_image: self.feature_image.clone(),
            images: self.body_images.clone(),
            persona_id: self.persona_id,
            analysis_id: self.analysis_id,
            primary_keyword_id,
            objective_ids: self.objective_ids.clone(),
            writing_style: style,
            generation_options: options,
            word_count: published.word_count,
            reading_minutes: published.reading_minutes,
            edited_at: None,
        })
    }
}

/// Selected image URLs minus the feature image, in the order of the selected
/// image set (selection order if the set itself is gone).
fn body_images(state: &WorkspaceState, feature_id: ArtifactId) -> Vec<String> {
    let selected = state.selection.multi(Slot::Images);
    let ordered: Vec<&draftwright_shared::Artifact> = match state.selected_set(Slot::ImageSet) {
        Some(set) => set.options.iter().filter(|a| selected.contains(&a.id)).collect(),
        None => state.selected_artifacts(Slot::Images),
    };
    ordered
        .into_iter()
        .filter(|a| a.id != feature_id)
        .filter_map(|a| match &a.payload {
            Payload::Image(i) => Some(i.url.clone()),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
