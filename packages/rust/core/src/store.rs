//! Append-only store of artifact sets.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use draftwright_shared::{
    Artifact, ArtifactId, ArtifactSet, DraftwrightError, ParentRef, Payload, Result, Stage,
};

/// Result of looking up an id: either a whole set or one of its options.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    Set(&'a ArtifactSet),
    Artifact {
        set: &'a ArtifactSet,
        artifact: &'a Artifact,
    },
}

/// Artifact sets in insertion order, indexed by set id and option id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ArtifactSet>", into = "Vec<ArtifactSet>")]
pub struct ArtifactStore {
    sets: Vec<ArtifactSet>,
    index: HashMap<ArtifactId, (usize, Option<usize>)>,
}

impl From<Vec<ArtifactSet>> for ArtifactStore {
    fn from(sets: Vec<ArtifactSet>) -> Self {
        let mut store = Self {
            sets,
            index: HashMap::new(),
        };
        store.reindex();
        store
    }
}

impl From<ArtifactStore> for Vec<ArtifactSet> {
    fn from(store: ArtifactStore) -> Self {
        store.sets
    }
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (si, set) in self.sets.iter().enumerate() {
            self.index.insert(set.id, (si, None));
            for (oi, option) in set.options.iter().enumerate() {
                self.index.insert(option.id, (si, Some(oi)));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Record a new set. Fresh ids are assigned to the set and each option.
    pub fn create_artifact_set(
        &mut self,
        stage: Stage,
        parent: ParentRef,
        options: Vec<Payload>,
    ) -> Result<ArtifactId> {
        if let Some(wrong) = options.iter().find(|p| p.stage() != stage) {
            return Err(DraftwrightError::validation(format!(
                "cannot record a {} payload in the {stage} stage",
                wrong.stage()
            )));
        }

        let created_at = Utc::now();
        let set = ArtifactSet {
            id: ArtifactId::new(),
            stage,
            created_at,
            parent,
            options: options
                .into_iter()
                .map(|payload| Artifact {
                    id: ArtifactId::new(),
                    created_at,
                    payload,
                })
                .collect(),
        };

        let id = set.id;
        info!(%stage, set_id = %id, options = set.options.len(), "recorded artifact set");

        let si = self.sets.len();
        self.index.insert(id, (si, None));
        for (oi, option) in set.options.iter().enumerate() {
            self.index.insert(option.id, (si, Some(oi)));
        }
        self.sets.push(set);
        Ok(id)
    }

    /// Look up a set or an option of `stage`. Unknown ids and ids of other
    /// stages resolve to `None`.
    pub fn get(&self, stage: Stage, id: ArtifactId) -> Option<Lookup<'_>> {
        let &(si, oi) = self.index.get(&id)?;
        let set = self.sets.get(si)?;
        if set.stage != stage {
            debug!(%stage, %id, actual = %set.stage, "id belongs to another stage");
            return None;
        }
        match oi {
            None => Some(Lookup::Set(set)),
            Some(oi) => set.options.get(oi).map(|artifact| Lookup::Artifact { set, artifact }),
        }
    }

    /// The set with this id, if it belongs to `stage`.
    pub fn set(&self, stage: Stage, id: ArtifactId) -> Option<&ArtifactSet> {
        match self.get(stage, id)? {
            Lookup::Set(set) => Some(set),
            Lookup::Artifact { .. } => None,
        }
    }

    /// The option with this id, if it belongs to `stage`.
    pub fn artifact(&self, stage: Stage, id: ArtifactId) -> Option<&Artifact> {
        match self.get(stage, id)? {
            Lookup::Artifact { artifact, .. } => Some(artifact),
            Lookup::Set(_) => None,
        }
    }

    /// Sets of `stage` produced from `parent`, most recent first.
    pub fn list_by_parent(&self, stage: Stage, parent: &ParentRef) -> Vec<&ArtifactSet> {
        newest_first(
            self.sets
                .iter()
                .filter(|s| s.stage == stage && &s.parent == parent),
        )
    }

    /// Every set of `stage`, most recent first.
    pub fn list_by_stage(&self, stage: Stage) -> Vec<&ArtifactSet> {
        newest_first(self.sets.iter().filter(|s| s.stage == stage))
    }

    /// Saved documents, most recent first.
    pub fn list_documents(&self) -> Vec<&Artifact> {
        self.list_by_stage(Stage::Article)
            .into_iter()
            .flat_map(|s| s.options.iter())
            .filter(|a| matches!(a.payload, Payload::Document(_)))
            .collect()
    }

    /// Replace the body of a saved document. The body is the only mutable
    /// part of any artifact; metrics are recomputed from the new text.
    ///
    /// Returns `false` when no artifact has this id.
    pub fn edit_document_body(
        &mut self,
        id: ArtifactId,
        body: String,
        words_per_minute: u32,
    ) -> Result<bool> {
        let Some(&(si, Some(oi))) = self.index.get(&id) else {
            debug!(%id, "edit of unknown document ignored");
            return Ok(false);
        };
        let Some(artifact) = self.sets.get_mut(si).and_then(|s| s.options.get_mut(oi)) else {
            return Ok(false);
        };
        let Payload::Document(document) = &mut artifact.payload else {
            return Err(DraftwrightError::validation(format!(
                "artifact {id} is not a document"
            )));
        };

        document.word_count = draftwright_markdown::word_count(&body);
        document.reading_minutes =
            draftwright_markdown::reading_time(document.word_count, words_per_minute);
        document.body = body;
        document.edited_at = Some(Utc::now());
        info!(%id, words = document.word_count, "edited document body");
        Ok(true)
    }
}

/// Order sets by `created_at` descending; among equal timestamps the later
/// inserted set comes first.
fn newest_first<'a>(sets: impl DoubleEndedIterator<Item = &'a ArtifactSet>) -> Vec<&'a ArtifactSet> {
    let mut out: Vec<&ArtifactSet> = sets.rev().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}
