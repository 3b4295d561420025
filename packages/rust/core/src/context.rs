//! Builds the generation input for each stage from the current selections.

use serde_json::{Value, json};
use tracing::debug;

use draftwright_shared::{
    Analysis, DraftwrightError, Outline, Payload, Persona, ProductInfo, Result, Slot, Stage,
};

use crate::generation::StageRequest;
use crate::state::WorkspaceState;

/// Outline sections sampled for image prompts.
const MAX_IMAGE_PROMPTS: usize = 4;

/// Collects upstream inputs, remembering which ones are missing.
struct Inputs<'a> {
    state: &'a WorkspaceState,
    missing: Vec<&'static str>,
}

impl<'a> Inputs<'a> {
    fn new(state: &'a WorkspaceState) -> Self {
        Self {
            state,
            missing: Vec::new(),
        }
    }

    fn note<T>(&mut self, value: Option<T>, name: &'static str) -> Option<T> {
        if value.is_none() {
            self.missing.push(name);
        }
        value
    }

    fn product(&mut self) -> Option<&'a ProductInfo> {
        let found = self.state.selected_artifact(Slot::Product).and_then(|a| match &a.payload {
            Payload::Product(p) => Some(p),
            _ => None,
        });
        self.note(found, "product")
    }

    fn persona(&mut self) -> Option<&'a Persona> {
        let found = self.state.selected_artifact(Slot::Persona).and_then(|a| match &a.payload {
            Payload::Persona(p) => Some(p),
            _ => None,
        });
        self.note(found, "persona")
    }

    fn analysis(&mut self) -> Option<&'a Analysis> {
        let found = self.state.selected_artifact(Slot::Analysis).and_then(|a| match &a.payload {
            Payload::Analysis(an) => Some(an),
            _ => None,
        });
        self.note(found, "analysis")
    }

    fn outline(&mut self) -> Option<&'a Outline> {
        let found = self.state.selected_artifact(Slot::Outline).and_then(|a| match &a.payload {
            Payload::Outline(o) => Some(o),
            _ => None,
        });
        self.note(found, "outline")
    }

    fn keyword_terms(&mut self) -> Option<Vec<String>> {
        let terms: Vec<String> = self
            .state
            .selected_artifacts(Slot::Keywords)
            .into_iter()
            .map(|a| a.payload.label())
            .collect();
        self.note((!terms.is_empty()).then_some(terms), "keywords")
    }

    fn primary_keyword(&mut self) -> Option<String> {
        let found = self.state.primary_keyword().map(|a| a.payload.label());
        self.note(found, "primary keyword")
    }

    fn objectives(&mut self) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .state
            .selected_artifacts(Slot::Objectives)
            .into_iter()
            .map(|a| a.payload.label())
            .collect();
        self.note((!items.is_empty()).then_some(items), "objectives")
    }

    fn text(&mut self, slot: Slot, name: &'static str) -> Option<String> {
        let found = self.state.selected_artifact(slot).map(|a| a.payload.label());
        self.note(found, name)
    }

    fn ctas(&self) -> Vec<String> {
        self.state
            .selected_artifacts(Slot::Ctas)
            .into_iter()
            .map(|a| a.payload.label())
            .collect()
    }

    fn finish(self, context: Value) -> Result<Value> {
        if self.missing.is_empty() {
            Ok(context)
        } else {
            Err(DraftwrightError::not_ready(self.missing))
        }
    }
}

/// Build the generation request for `stage`, or fail with `NotReady` naming
/// every missing upstream selection.
pub fn stage_request(state: &WorkspaceState, stage: Stage) -> Result<StageRequest> {
    let mut inputs = Inputs::new(state);

    let context = match stage {
        Stage::Product => {
            return Err(DraftwrightError::validation(
                "product details are imported, not generated",
            ));
        }
        Stage::Article => {
            return Err(DraftwrightError::validation(
                "articles are assembled from parts, not generated",
            ));
        }
        Stage::Persona => {
            let product = inputs.product();
            inputs.finish(json!({ "product": product }))?
        }
        Stage::Keywords => {
            let persona = inputs.persona().map(|p| p.summary.as_str());
            let location = state
                .selected_artifact(Slot::Product)
                .and_then(|a| match &a.payload {
                    Payload::Product(p) => p.location.clone(),
                    _ => None,
                });
            inputs.finish(json!({ "persona": persona, "location": location }))?
        }
        Stage::Analysis => {
            let keywords = inputs.keyword_terms();
            let persona = inputs.persona().map(|p| p.summary.as_str());
            inputs.finish(json!({ "keywords": keywords, "persona": persona }))?
        }
        Stage::Objectives => {
            let analysis = inputs.analysis();
            inputs.finish(json!({ "analysis": analysis }))?
        }
        Stage::Titles => {
            let objectives = inputs.objectives();
            let primary = inputs.primary_keyword();
            inputs.finish(json!({ "objectives": objectives, "primaryKeyword": primary }))?
        }
        Stage::MetaDescriptions => {
            let title = inputs.text(Slot::Title, "title");
            let primary = inputs.primary_keyword();
            inputs.finish(json!({ "title": title, "primaryKeyword": primary }))?
        }
        Stage::Sapo => {
            let title = inputs.text(Slot::Title, "title");
            let meta = inputs.text(Slot::MetaDescription, "meta description");
            let primary = inputs.primary_keyword();
            let persona = inputs.persona().map(|p| p.summary.as_str());
            inputs.finish(json!({
                "title": title,
                "metaDescription": meta,
                "primaryKeyword": primary,
                "persona": persona,
            }))?
        }
        Stage::Cta => {
            let sapo = inputs.text(Slot::Sapo, "sapo");
            let objectives = inputs.objectives();
            let persona = inputs.persona().map(|p| p.summary.as_str());
            inputs.finish(json!({
                "sapo": sapo,
                "objectives": objectives,
                "persona": persona,
            }))?
        }
        Stage::Outline => {
            let analysis = inputs.analysis().map(|a| {
                json!({
                    "summary": a.summary,
                    "contentGaps": a.content_gaps,
                    "creativeIdeas": a.creative_ideas,
                })
            });
            let persona = inputs.persona().map(|p| p.summary.as_str());
            let title = inputs.text(Slot::Title, "title");
            let meta = inputs.text(Slot::MetaDescription, "meta description");
            let objectives = inputs.objectives();
            let primary = inputs.primary_keyword();
            let ctas = inputs.ctas();
            inputs.finish(json!({
                "analysis": analysis,
                "persona": persona,
                "title": title,
                "metaDescription": meta,
                "objectives": objectives,
                "primaryKeyword": primary,
                "ctas": ctas,
            }))?
        }
        Stage::Images => {
            let prompts = inputs.outline().map(image_prompts);
            inputs.finish(json!({ "prompts": prompts }))?
        }
    };

    debug!(%stage, "built stage context");
    Ok(StageRequest {
        stage,
        language: state.preferences.language,
        context,
        parent: state.parent_for(stage),
    })
}

/// One prompt per even-indexed outline section, at most four.
pub fn image_prompts(outline: &Outline) -> Vec<String> {
    outline
        .sections
        .iter()
        .step_by(2)
        .take(MAX_IMAGE_PROMPTS)
        .map(|section| {
            format!(
                "A visually stunning, photorealistic image representing: {}. {}. Style: \
                 cinematic, high detail. IMPORTANT: Do not include any text, letters, or \
                 words in the image.",
                section.heading,
                section.bullets.join(". ")
            )
        })
        .collect()
}
