//! Workspace orchestration: stage runs, part writing, publishing and saving,
//! with write-through persistence of every mutation.

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use draftwright_shared::{
    ArtifactId, DraftwrightError, GenerationOptions, ParentRef, Payload, Preferences, Result,
    Slot, Stage, WritingStyle,
};
use draftwright_storage::Storage;

use crate::assembler::{AssemblyContext, Part, PublishedBody};
use crate::context;
use crate::drafts::DraftStore;
use crate::generation::Generator;
use crate::selection::Selection;
use crate::state::{Command, Outcome, WorkspaceState};

/// Progress callback for long-running workspace operations.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the operation completes.
    fn done(&self, summary: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _summary: &str) {}
}

/// The workspace state plus where it is persisted.
pub struct Workspace {
    state: WorkspaceState,
    storage: Option<Storage>,
    key: String,
}

impl Workspace {
    /// Load the snapshot stored under `key`, or start empty with `defaults`.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn open(storage: Storage, key: &str, defaults: Preferences) -> Result<Self> {
        let state = match storage.load_snapshot(key).await? {
            Some(snapshot) => {
                let state = WorkspaceState::from_snapshot_json(&snapshot.json)?;
                info!(sets = state.store.len(), updated_at = %snapshot.updated_at, "loaded workspace");
                state
            }
            None => {
                info!("no snapshot, starting a fresh workspace");
                WorkspaceState {
                    preferences: defaults,
                    ..WorkspaceState::default()
                }
            }
        };
        Ok(Self {
            state,
            storage: Some(storage),
            key: key.to_string(),
        })
    }

    /// A workspace that is never persisted.
    pub fn in_memory() -> Self {
        Self::detached(Preferences::default())
    }

    /// An empty, unpersisted workspace starting from `defaults`.
    pub fn detached(defaults: Preferences) -> Self {
        Self {
            state: WorkspaceState {
                preferences: defaults,
                ..WorkspaceState::default()
            },
            storage: None,
            key: String::new(),
        }
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    /// Apply a command to a copy of the state, persist the copy, then make
    /// it current. On any error the visible state is unchanged.
    pub async fn apply(&mut self, command: Command) -> Result<Outcome> {
        let mut next = self.state.clone();
        let outcome = next.apply(command)?;
        self.persist(&next).await?;
        self.state = next;
        Ok(outcome)
    }

    async fn persist(&self, state: &WorkspaceState) -> Result<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        let json = state.to_snapshot_json()?;
        storage.save_snapshot(&self.key, &json).await
    }

    // -----------------------------------------------------------------------
    // Artifacts and selections
    // -----------------------------------------------------------------------

    /// Record a set under the parent implied by the current selections (or
    /// an explicit one) and adopt the stage's default selection.
    pub async fn record_set(
        &mut self,
        stage: Stage,
        parent: Option<ParentRef>,
        options: Vec<Payload>,
    ) -> Result<ArtifactId> {
        let parent = parent.unwrap_or_else(|| self.state.parent_for(stage));
        match self
            .apply(Command::RecordSet {
                stage,
                parent,
                options,
                adopt_defaults: true,
            })
            .await?
        {
            Outcome::SetRecorded { set_id, .. } => Ok(set_id),
            other => Err(DraftwrightError::Storage(format!(
                "unexpected outcome {other:?}"
            ))),
        }
    }

    /// Write a slot and cascade. Returns the cleared slots.
    pub async fn select(&mut self, slot: Slot, value: Selection) -> Result<Vec<Slot>> {
        match self.apply(Command::Select { slot, value }).await? {
            Outcome::Selected { cleared } => Ok(cleared),
            other => Err(DraftwrightError::Storage(format!(
                "unexpected outcome {other:?}"
            ))),
        }
    }

    pub async fn set_preferences(&mut self, preferences: Preferences) -> Result<()> {
        self.apply(Command::SetPreferences(preferences)).await?;
        Ok(())
    }

    /// Replace a saved document's body. `false` when the id is unknown.
    pub async fn edit_document_body(&mut self, id: ArtifactId, body: String) -> Result<bool> {
        match self.apply(Command::EditDocumentBody { id, body }).await? {
            Outcome::DocumentEdited { found } => Ok(found),
            other => Err(DraftwrightError::Storage(format!(
                "unexpected outcome {other:?}"
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    /// Generate candidates for `stage` and record them as a new set.
    ///
    /// When the generator has no result the workspace is left as it was and
    /// a `Generation` error is returned.
    #[instrument(skip_all, fields(stage = %stage))]
    pub async fn run_stage<G: Generator>(
        &mut self,
        generator: &mut G,
        stage: Stage,
        progress: &dyn ProgressReporter,
    ) -> Result<ArtifactId> {
        progress.phase(&format!("Preparing {stage} context"));
        let request = context::stage_request(&self.state, stage)?;

        progress.phase(&format!("Generating {stage}"));
        let Some(options) = generator.generate_options(&request).await else {
            warn!("generator returned no result");
            return Err(DraftwrightError::Generation(format!(
                "{stage} generation returned no result"
            )));
        };

        let count = options.len();
        let set_id = self.record_set(stage, Some(request.parent), options).await?;
        info!(%set_id, options = count, "stage run complete");
        progress.done(&format!("{count} {stage} option(s) recorded"));
        Ok(set_id)
    }

    /// Generate one article part and store it as an editable draft.
    #[instrument(skip_all, fields(part = %part))]
    pub async fn generate_part<G: Generator>(
        &self,
        generator: &mut G,
        drafts: &DraftStore,
        part: Part,
        style: WritingStyle,
        options: &GenerationOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf> {
        let ctx = AssemblyContext::resolve(&self.state)?;
        let request = ctx.part_request(part, self.state.preferences.language, style, options);

        progress.phase(&format!("Writing {part}"));
        let Some(text) = generator.generate_part(&request).await else {
            warn!("generator returned no text");
            return Err(DraftwrightError::Generation(format!(
                "{part} generation returned no result"
            )));
        };

        let path = drafts.save_part(ctx.outline_id, part, &text)?;
        progress.done(&format!("{part} written to {}", path.display()));
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // Publishing
    // -----------------------------------------------------------------------

    /// Merge the current drafts into the final body. Re-reads the draft files
    /// every time so manual edits are always reflected.
    pub fn publish(&self, drafts: &DraftStore) -> Result<PublishedBody> {
        let ctx = AssemblyContext::resolve(&self.state)?;
        let draft = drafts.load(ctx.outline_id)?;
        ctx.publish(&draft, self.state.preferences.words_per_minute)
    }

    /// Assemble the document and store it in the library. Returns the id of
    /// the saved document.
    #[instrument(skip_all)]
    pub async fn save_document(
        &mut self,
        drafts: &DraftStore,
        style: WritingStyle,
        options: GenerationOptions,
    ) -> Result<ArtifactId> {
        let ctx = AssemblyContext::resolve(&self.state)?;
        let draft = drafts.load(ctx.outline_id)?;
        let document = ctx.build_document(
            &draft,
            style,
            options,
            self.state.preferences.words_per_minute,
        )?;

        let title = document.title.clone();
        let set_id = self
            .record_set(
                Stage::Article,
                None,
                vec![Payload::Document(Box::new(document))],
            )
            .await?;
        let id = self
            .state
            .store
            .set(Stage::Article, set_id)
            .and_then(|set| set.options.first())
            .map(|a| a.id)
            .ok_or_else(|| DraftwrightError::Storage("saved document not found".into()))?;

        info!(%id, %title, "saved document");
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::ScriptedGenerator;
    use draftwright_shared::{
        Analysis, CtaOption, ImageOption, Keyword, MetaDescriptionOption, ObjectiveOption,
        Outline, OutlineSection, Persona, ProductInfo, SapoOption, TitleOption,
    };

    fn temp_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dw-{label}-{}", uuid::Uuid::now_v7()))
    }

    fn outline(n: usize) -> Payload {
        Payload::Outline(Outline {
            sections: (0..n)
                .map(|i| OutlineSection {
                    heading: format!("Section {i}"),
                    bullets: vec![format!("point {i}")],
                })
                .collect(),
        })
    }

    fn scripted() -> ScriptedGenerator {
        ScriptedGenerator::default()
            .with_options(
                Stage::Persona,
                Some(vec![Payload::Persona(Persona {
                    summary: "Home barista".into(),
                    ..Persona::default()
                })]),
            )
            .with_options(
                Stage::Keywords,
                Some(vec![
                    Payload::Keyword(Keyword {
                        term: "pour over".into(),
                        ..Keyword::default()
                    }),
                    Payload::Keyword(Keyword {
                        term: "v60".into(),
                        ..Keyword::default()
                    }),
                ]),
            )
            .with_options(
                Stage::Analysis,
                Some(vec![Payload::Analysis(Analysis {
                    summary: "Beginners want repeatable cups".into(),
                    ..Analysis::default()
                })]),
            )
            .with_options(
                Stage::Objectives,
                Some(
                    (0..4)
                        .map(|i| {
                            Payload::Objective(ObjectiveOption {
                                description: format!("Objective {i}"),
                                ..ObjectiveOption::default()
                            })
                        })
                        .collect(),
                ),
            )
            .with_options(
                Stage::Titles,
                Some(vec![Payload::Title(TitleOption {
                    title: "Pour Over for Beginners".into(),
                    ..TitleOption::default()
                })]),
            )
            .with_options(
                Stage::MetaDescriptions,
                Some(vec![Payload::MetaDescription(MetaDescriptionOption {
                    description: "Learn pour over.".into(),
                    ..MetaDescriptionOption::default()
                })]),
            )
            .with_options(
                Stage::Sapo,
                Some(vec![Payload::Sapo(SapoOption {
                    content: "Great coffee starts here.".into(),
                    rationale: String::new(),
                })]),
            )
            .with_options(
                Stage::Cta,
                Some(
                    ["Buy the kettle", "Join the class", "Read more"]
                        .into_iter()
                        .map(|c| {
                            Payload::Cta(CtaOption {
                                content: c.into(),
                                rationale: String::new(),
                            })
                        })
                        .collect(),
                ),
            )
            .with_options(Stage::Outline, Some(vec![outline(5)]))
            .with_options(
                Stage::Images,
                Some(
                    (0..4)
                        .map(|i| {
                            Payload::Image(ImageOption {
                                url: format!("https://img/{i}.png"),
                                prompt: format!("prompt {i}"),
                            })
                        })
                        .collect(),
                ),
            )
            .with_part(Some("Part one [IMAGE_1]"))
            .with_part(Some("Part two"))
            .with_part(Some("Part three"))
    }

    async fn select_all_options(ws: &mut Workspace, set_slot: Slot, item_slot: Slot) {
        let set_id = ws.state().selection.single(set_slot).unwrap();
        let ids = ws
            .state()
            .store
            .set(set_slot.stage(), set_id)
            .unwrap()
            .option_ids();
        ws.select(item_slot, Selection::Multi(ids)).await.unwrap();
    }

    /// Drive every stage up to images with the scripted generator.
    async fn run_to_images(ws: &mut Workspace, generator: &mut ScriptedGenerator) {
        ws.record_set(
            Stage::Product,
            None,
            vec![Payload::Product(ProductInfo {
                name: "Gooseneck kettle".into(),
                location: Some("Hanoi".into()),
                ..ProductInfo::default()
            })],
        )
        .await
        .unwrap();

        for stage in [Stage::Persona, Stage::Keywords] {
            ws.run_stage(generator, stage, &SilentProgress).await.unwrap();
        }
        select_all_options(ws, Slot::KeywordSet, Slot::Keywords).await;

        for stage in [
            Stage::Analysis,
            Stage::Objectives,
            Stage::Titles,
            Stage::MetaDescriptions,
            Stage::Sapo,
            Stage::Cta,
        ] {
            ws.run_stage(generator, stage, &SilentProgress).await.unwrap();
        }
        select_all_options(ws, Slot::CtaSet, Slot::Ctas).await;

        for stage in [Stage::Outline, Stage::Images] {
            ws.run_stage(generator, stage, &SilentProgress).await.unwrap();
        }
    }

    #[tokio::test]
    async fn full_workflow_saves_a_document() {
        let mut ws = Workspace::in_memory();
        let mut generator = scripted();
        run_to_images(&mut ws, &mut generator).await;

        let drafts = DraftStore::new(temp_dir("drafts"));
        let options = GenerationOptions::default();
        for part in Part::ALL {
            ws.generate_part(
                &mut generator,
                &drafts,
                part,
                WritingStyle::Default,
                &options,
                &SilentProgress,
            )
            .await
            .unwrap();
        }

        // Feature image is excluded from body images: 3 images -> 1 per part.
        let first = &generator.part_requests[0];
        assert_eq!(first.images, vec!["https://img/1.png".to_string()]);
        assert_eq!(first.placeholders, vec!["[IMAGE_1]".to_string()]);
        assert_eq!(first.ctas, vec!["Buy the kettle".to_string()]);
        assert_eq!(generator.part_requests[2].sections.len(), 3);

        let published = ws.publish(&drafts).unwrap();
        assert!(published.body.starts_with("<img src=\"https://img/0.png\""));
        assert!(!published.body.contains("[IMAGE_1]"));
        assert!(published.body.contains("https://img/3.png"));
        assert!(published.word_count > 0);

        let doc_id = ws
            .save_document(&drafts, WritingStyle::Pas, options)
            .await
            .unwrap();
        let docs = ws.state().store.list_documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, doc_id);
        match &docs[0].payload {
            Payload::Document(d) => {
                assert_eq!(d.title, "Pour Over for Beginners");
                assert_eq!(d.body, published.body);
                assert_eq!(d.ctas.len(), 3);
                assert_eq!(d.writing_style, WritingStyle::Pas);
            }
            other => panic!("expected document, got {other:?}"),
        }
        assert_eq!(ws.state().selection.single(Slot::Article), Some(doc_id));

        std::fs::remove_dir_all(drafts.root()).unwrap();
    }

    #[tokio::test]
    async fn edited_drafts_are_republished() {
        let mut ws = Workspace::in_memory();
        let mut generator = scripted();
        run_to_images(&mut ws, &mut generator).await;

        let drafts = DraftStore::new(temp_dir("drafts"));
        let outline_id = ws.state().selection.single(Slot::Outline).unwrap();
        for part in Part::ALL {
            drafts.save_part(outline_id, part, "original").unwrap();
        }
        assert!(ws.publish(&drafts).unwrap().body.contains("original"));

        drafts.save_part(outline_id, Part::Part2, "rewritten by hand").unwrap();
        let body = ws.publish(&drafts).unwrap().body;
        assert!(body.contains("rewritten by hand"));

        std::fs::remove_dir_all(drafts.root()).unwrap();
    }

    #[tokio::test]
    async fn publish_requires_all_parts() {
        let mut ws = Workspace::in_memory();
        let mut generator = scripted();
        run_to_images(&mut ws, &mut generator).await;

        let drafts = DraftStore::new(temp_dir("drafts"));
        ws.generate_part(
            &mut generator,
            &drafts,
            Part::Part1,
            WritingStyle::Default,
            &GenerationOptions::default(),
            &SilentProgress,
        )
        .await
        .unwrap();

        let err = ws.publish(&drafts).unwrap_err();
        assert_eq!(err.to_string(), "not ready: select part2, part3 first");

        std::fs::remove_dir_all(drafts.root()).unwrap();
    }

    #[tokio::test]
    async fn failed_generation_leaves_state_untouched() {
        let mut ws = Workspace::in_memory();
        let mut generator = ScriptedGenerator::default().with_options(Stage::Persona, None);
        ws.record_set(
            Stage::Product,
            None,
            vec![Payload::Product(ProductInfo {
                name: "Kettle".into(),
                ..ProductInfo::default()
            })],
        )
        .await
        .unwrap();
        let before = ws.state().selection.clone();

        let err = ws
            .run_stage(&mut generator, Stage::Persona, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DraftwrightError::Generation(_)));
        assert_eq!(ws.state().store.len(), 1);
        assert_eq!(ws.state().selection, before);
    }

    #[tokio::test]
    async fn not_ready_stage_does_not_call_generator() {
        let mut ws = Workspace::in_memory();
        let mut generator = ScriptedGenerator::default();
        let err = ws
            .run_stage(&mut generator, Stage::Titles, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DraftwrightError::NotReady { .. }));
        assert!(generator.stage_requests.is_empty());
    }

    #[tokio::test]
    async fn mutations_are_written_through() {
        let dir = temp_dir("state");
        let db = dir.join("state.db");

        let storage = Storage::open(&db).await.unwrap();
        let mut ws = Workspace::open(storage, "app-storage", Preferences::default())
            .await
            .unwrap();
        let set_id = ws
            .record_set(
                Stage::Product,
                None,
                vec![Payload::Product(ProductInfo {
                    name: "Kettle".into(),
                    ..ProductInfo::default()
                })],
            )
            .await
            .unwrap();
        drop(ws);

        let storage = Storage::open(&db).await.unwrap();
        let ws = Workspace::open(storage, "app-storage", Preferences::default())
            .await
            .unwrap();
        assert!(ws.state().store.set(Stage::Product, set_id).is_some());
        assert!(ws.state().selection.single(Slot::Product).is_some());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_state() {
        let dir = temp_dir("state");
        let db = dir.join("state.db");
        drop(Storage::open(&db).await.unwrap());

        let storage = Storage::open_readonly(&db).await.unwrap();
        let mut ws = Workspace::open(storage, "app-storage", Preferences::default())
            .await
            .unwrap();
        let err = ws
            .select(Slot::Product, Selection::Single(ArtifactId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, DraftwrightError::Storage(_)));
        assert!(ws.state().selection.active_slots().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn fresh_workspace_uses_default_preferences() {
        let dir = temp_dir("state");
        let storage = Storage::open(&dir.join("state.db")).await.unwrap();
        let defaults = Preferences {
            words_per_minute: 300,
            ..Preferences::default()
        };
        let ws = Workspace::open(storage, "other-key", defaults).await.unwrap();
        assert_eq!(ws.state().preferences.words_per_minute, 300);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
