//! Workspace state and its reducer.
//!
//! All mutations go through [`WorkspaceState::apply`], which takes a
//! [`Command`] and either applies it completely or returns an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use draftwright_shared::{
    Artifact, ArtifactId, ArtifactSet, CURRENT_SCHEMA_VERSION, DraftwrightError, ParentRef,
    Payload, Preferences, Result, Slot, Stage,
};

use crate::graph::{self, DefaultPolicy};
use crate::selection::{Selection, SelectionState};
use crate::store::ArtifactStore;

/// A state mutation.
#[derive(Debug, Clone)]
pub enum Command {
    /// Record a new artifact set, optionally adopting the stage's default
    /// selection for it.
    RecordSet {
        stage: Stage,
        parent: ParentRef,
        options: Vec<Payload>,
        adopt_defaults: bool,
    },
    /// Write a selection slot and cascade.
    Select { slot: Slot, value: Selection },
    /// Replace the body of a saved document.
    EditDocumentBody { id: ArtifactId, body: String },
    SetPreferences(Preferences),
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    SetRecorded { set_id: ArtifactId, cleared: Vec<Slot> },
    Selected { cleared: Vec<Slot> },
    DocumentEdited { found: bool },
    PreferencesUpdated,
}

/// Store, selections and preferences.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceState {
    pub store: ArtifactStore,
    pub selection: SelectionState,
    pub preferences: Preferences,
}

/// Persisted form of the workspace.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    schema_version: u32,
    store: ArtifactStore,
    selection: SelectionState,
    #[serde(default)]
    preferences: Preferences,
}

impl WorkspaceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one command.
    #[instrument(skip_all)]
    pub fn apply(&mut self, command: Command) -> Result<Outcome> {
        match command {
            Command::RecordSet {
                stage,
                parent,
                options,
                adopt_defaults,
            } => {
                let set_id = self.store.create_artifact_set(stage, parent, options)?;
                let cleared = if adopt_defaults {
                    self.adopt_defaults(stage, set_id)?
                } else {
                    Vec::new()
                };
                Ok(Outcome::SetRecorded { set_id, cleared })
            }
            Command::Select { slot, value } => {
                let cleared = self.selection.set_selection(slot, value)?;
                Ok(Outcome::Selected { cleared })
            }
            Command::EditDocumentBody { id, body } => {
                let found = self.store.edit_document_body(
                    id,
                    body,
                    self.preferences.words_per_minute,
                )?;
                Ok(Outcome::DocumentEdited { found })
            }
            Command::SetPreferences(preferences) => {
                if preferences.words_per_minute == 0 {
                    return Err(DraftwrightError::validation(
                        "words per minute must be greater than zero",
                    ));
                }
                self.preferences = preferences;
                Ok(Outcome::PreferencesUpdated)
            }
        }
    }

    /// Select a freshly recorded set and write the stage's item defaults.
    ///
    /// Selecting the set runs the cascade first; item defaults are written
    /// afterwards so the cascade cannot clear them. A set without options
    /// leaves the item slots cleared.
    fn adopt_defaults(&mut self, stage: Stage, set_id: ArtifactId) -> Result<Vec<Slot>> {
        let descriptor = graph::descriptor(stage);
        let option_ids = self
            .store
            .set(stage, set_id)
            .map(ArtifactSet::option_ids)
            .unwrap_or_default();

        let mut cleared = Vec::new();
        if let Some(set_slot) = descriptor.set_slot {
            cleared = self
                .selection
                .set_selection(set_slot, Selection::Single(set_id))?;
        }

        let Some(&first) = option_ids.first() else {
            debug!(%stage, "empty set, no item defaults");
            return Ok(cleared);
        };

        let item_cleared = match descriptor.policy {
            DefaultPolicy::First => self
                .selection
                .set_selection(descriptor.item_slot, Selection::Single(first))?,
            DefaultPolicy::FirstN(n) => self.selection.set_selection(
                descriptor.item_slot,
                Selection::Multi(option_ids.iter().take(n).copied().collect()),
            )?,
            DefaultPolicy::Nothing => Vec::new(),
            DefaultPolicy::AllWithFeature => {
                let mut c = self
                    .selection
                    .set_selection(descriptor.item_slot, Selection::Multi(option_ids.clone()))?;
                if let Some(feature_slot) = descriptor.feature_slot {
                    c.extend(
                        self.selection
                            .set_selection(feature_slot, Selection::Single(first))?,
                    );
                }
                c
            }
        };

        for slot in item_cleared {
            if !cleared.contains(&slot) {
                cleared.push(slot);
            }
        }
        cleared.sort_by_key(|s| s.position());
        info!(%stage, policy = ?descriptor.policy, "adopted default selection");
        Ok(cleared)
    }

    // -----------------------------------------------------------------------
    // Resolution of selections against the store
    // -----------------------------------------------------------------------

    /// The artifact selected in a single-select item slot. A dangling id
    /// resolves to `None`.
    pub fn selected_artifact(&self, slot: Slot) -> Option<&Artifact> {
        let id = self.selection.single(slot)?;
        let found = self.store.artifact(slot.stage(), id);
        if found.is_none() {
            debug!(%slot, %id, "selected id not found, treating as unset");
        }
        found
    }

    /// The set selected in a set slot.
    pub fn selected_set(&self, slot: Slot) -> Option<&ArtifactSet> {
        let id = self.selection.single(slot)?;
        self.store.set(slot.stage(), id)
    }

    /// Artifacts selected in a multi-select slot, in selection order,
    /// skipping dangling ids.
    pub fn selected_artifacts(&self, slot: Slot) -> Vec<&Artifact> {
        self.selection
            .multi(slot)
            .iter()
            .filter_map(|id| self.store.artifact(slot.stage(), *id))
            .collect()
    }

    /// Ids currently selected in `slot` that resolve in the store.
    pub fn resolved_ids(&self, slot: Slot) -> Vec<ArtifactId> {
        match self.selection.get(slot) {
            Selection::Unset => Vec::new(),
            Selection::Single(id) => {
                let known = self.store.get(slot.stage(), id).is_some();
                if known { vec![id] } else { Vec::new() }
            }
            Selection::Multi(_) => self.selected_artifacts(slot).iter().map(|a| a.id).collect(),
        }
    }

    /// The parent reference a new set of `stage` would be recorded under:
    /// the resolved ids of the entry slot's direct upstream slots.
    pub fn parent_for(&self, stage: Stage) -> ParentRef {
        let entry = graph::descriptor(stage).entry_slot();
        ParentRef::from_ids(
            graph::upstream(entry)
                .iter()
                .flat_map(|slot| self.resolved_ids(*slot)),
        )
    }

    /// The first selected keyword, which is the primary one.
    pub fn primary_keyword(&self) -> Option<&Artifact> {
        self.selected_artifacts(Slot::Keywords).into_iter().next()
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// Serialize the whole workspace as one JSON document.
    pub fn to_snapshot_json(&self) -> Result<String> {
        let snapshot = Snapshot {
            schema_version: CURRENT_SCHEMA_VERSION,
            store: self.store.clone(),
            selection: self.selection.clone(),
            preferences: self.preferences.clone(),
        };
        serde_json::to_string(&snapshot)
            .map_err(|e| DraftwrightError::Storage(format!("snapshot serialization failed: {e}")))
    }

    /// Restore a workspace from a snapshot document.
    pub fn from_snapshot_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| DraftwrightError::Storage(format!("unreadable snapshot: {e}")))?;

        if snapshot.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(DraftwrightError::Storage(format!(
                "snapshot schema_version {} is newer than supported {}",
                snapshot.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }

        Ok(Self {
            store: snapshot.store,
            selection: snapshot.selection,
            preferences: snapshot.preferences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftwright_shared::{CtaOption, ImageOption, ObjectiveOption, TitleOption};

    fn record(state: &mut WorkspaceState, stage: Stage, options: Vec<Payload>) -> ArtifactId {
        let parent = state.parent_for(stage);
        match state
            .apply(Command::RecordSet {
                stage,
                parent,
                options,
                adopt_defaults: true,
            })
            .unwrap()
        {
            Outcome::SetRecorded { set_id, .. } => set_id,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    fn titles(n: usize) -> Vec<Payload> {
        (0..n)
            .map(|i| {
                Payload::Title(TitleOption {
                    title: format!("T{i}"),
                    ..TitleOption::default()
                })
            })
            .collect()
    }

    fn objectives(n: usize) -> Vec<Payload> {
        (0..n)
            .map(|i| {
                Payload::Objective(ObjectiveOption {
                    description: format!("O{i}"),
                    ..ObjectiveOption::default()
                })
            })
            .collect()
    }

    fn images(n: usize) -> Vec<Payload> {
        (0..n)
            .map(|i| {
                Payload::Image(ImageOption {
                    url: format!("https://img/{i}.png"),
                    prompt: String::new(),
                })
            })
            .collect()
    }

    #[test]
    fn title_defaults_to_first_option() {
        let mut state = WorkspaceState::new();
        let set_id = record(&mut state, Stage::Titles, titles(3));
        let set = state.store.set(Stage::Titles, set_id).unwrap();

        assert_eq!(state.selection.single(Slot::TitleSet), Some(set_id));
        assert_eq!(state.selection.single(Slot::Title), Some(set.options[0].id));
    }

    #[test]
    fn objectives_default_to_first_three() {
        let mut state = WorkspaceState::new();
        let set_id = record(&mut state, Stage::Objectives, objectives(5));
        let expected: Vec<ArtifactId> = state.store.set(Stage::Objectives, set_id).unwrap()
            .option_ids()
            .into_iter()
            .take(3)
            .collect();
        assert_eq!(state.selection.multi(Slot::Objectives), expected.as_slice());
    }

    #[test]
    fn cta_defaults_to_nothing() {
        let mut state = WorkspaceState::new();
        let options = vec![Payload::Cta(CtaOption {
            content: "Buy now".into(),
            rationale: String::new(),
        })];
        let set_id = record(&mut state, Stage::Cta, options);
        assert_eq!(state.selection.single(Slot::CtaSet), Some(set_id));
        assert!(state.selection.multi(Slot::Ctas).is_empty());
    }

    #[test]
    fn images_default_to_all_with_first_as_feature() {
        let mut state = WorkspaceState::new();
        let set_id = record(&mut state, Stage::Images, images(4));
        let ids = state.store.set(Stage::Images, set_id).unwrap().option_ids();

        assert_eq!(state.selection.multi(Slot::Images), ids.as_slice());
        assert_eq!(state.selection.single(Slot::FeatureImage), Some(ids[0]));
    }

    #[test]
    fn empty_set_leaves_item_unset() {
        let mut state = WorkspaceState::new();
        let set_id = record(&mut state, Stage::Titles, Vec::new());
        assert_eq!(state.selection.single(Slot::TitleSet), Some(set_id));
        assert_eq!(state.selection.single(Slot::Title), None);
    }

    #[test]
    fn new_set_clears_previous_item_selection() {
        let mut state = WorkspaceState::new();
        record(&mut state, Stage::Images, images(2));
        let second = record(&mut state, Stage::Images, images(1));
        let ids = state.store.set(Stage::Images, second).unwrap().option_ids();
        assert_eq!(state.selection.multi(Slot::Images), ids.as_slice());
    }

    #[test]
    fn dangling_selection_resolves_to_none() {
        let mut state = WorkspaceState::new();
        state
            .apply(Command::Select {
                slot: Slot::Title,
                value: Selection::Single(ArtifactId::new()),
            })
            .unwrap();
        assert!(state.selected_artifact(Slot::Title).is_none());
        assert!(state.resolved_ids(Slot::Title).is_empty());
    }

    #[test]
    fn parent_follows_upstream_selection() {
        let mut state = WorkspaceState::new();
        let obj_set = record(&mut state, Stage::Objectives, objectives(2));
        let obj_ids = state.store.set(Stage::Objectives, obj_set).unwrap().option_ids();

        let parent = state.parent_for(Stage::Titles);
        assert_eq!(parent, ParentRef::from_ids(obj_ids));
        assert!(state.parent_for(Stage::Product).is_root());
    }

    #[test]
    fn snapshot_roundtrip() {
        let mut state = WorkspaceState::new();
        record(&mut state, Stage::Titles, titles(2));
        state.preferences.user_name = "Linh".into();

        let json = state.to_snapshot_json().unwrap();
        let back = WorkspaceState::from_snapshot_json(&json).unwrap();

        assert_eq!(back.selection, state.selection);
        assert_eq!(back.store.len(), 1);
        assert_eq!(back.preferences.user_name, "Linh");
    }

    #[test]
    fn truncated_snapshot_is_storage_error() {
        let mut state = WorkspaceState::new();
        record(&mut state, Stage::Titles, titles(2));
        let json = state.to_snapshot_json().unwrap();

        let err = WorkspaceState::from_snapshot_json(&json[..json.len() / 2]).unwrap_err();
        assert!(matches!(err, DraftwrightError::Storage(_)));
    }

    #[test]
    fn newer_schema_is_rejected() {
        let json = r#"{"schema_version":99,"store":[],"selection":{}}"#;
        let err = WorkspaceState::from_snapshot_json(json).unwrap_err();
        assert!(err.to_string().contains("schema_version 99"));
    }

    #[test]
    fn zero_reading_speed_is_rejected() {
        let mut state = WorkspaceState::new();
        let prefs = Preferences {
            words_per_minute: 0,
            ..Preferences::default()
        };
        assert!(state.apply(Command::SetPreferences(prefs)).is_err());
        assert_eq!(state.preferences.words_per_minute, 225);
    }
}
