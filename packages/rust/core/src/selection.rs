//! Selection state and cascade invalidation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use draftwright_shared::{ArtifactId, DraftwrightError, Result, Slot, SlotKind};

use crate::graph;

/// The value held by one selection slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    Unset,
    Single(ArtifactId),
    Multi(Vec<ArtifactId>),
}

impl Selection {
    /// The cleared value for a slot of the given kind.
    pub fn cleared(kind: SlotKind) -> Self {
        match kind {
            SlotKind::Single => Self::Unset,
            SlotKind::Multi => Self::Multi(Vec::new()),
        }
    }

    /// Ids referenced by this selection, in order.
    pub fn ids(&self) -> &[ArtifactId] {
        match self {
            Self::Unset => &[],
            Self::Single(id) => std::slice::from_ref(id),
            Self::Multi(ids) => ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }
}

/// Per-slot selections. Slots never written read as cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionState {
    slots: BTreeMap<Slot, Selection>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `slot`.
    pub fn get(&self, slot: Slot) -> Selection {
        self.slots
            .get(&slot)
            .cloned()
            .unwrap_or_else(|| Selection::cleared(slot.kind()))
    }

    /// The id held by a single-select slot.
    pub fn single(&self, slot: Slot) -> Option<ArtifactId> {
        match self.slots.get(&slot) {
            Some(Selection::Single(id)) => Some(*id),
            _ => None,
        }
    }

    /// The ids held by a multi-select slot (empty when unset).
    pub fn multi(&self, slot: Slot) -> &[ArtifactId] {
        match self.slots.get(&slot) {
            Some(Selection::Multi(ids)) => ids,
            _ => &[],
        }
    }

    /// Write `value` into `slot`, then clear every downstream slot.
    ///
    /// The cascade runs even when `value` equals the current selection.
    /// Returns the cleared slots in pipeline order.
    pub fn set_selection(&mut self, slot: Slot, value: Selection) -> Result<Vec<Slot>> {
        let value = normalize(slot, value)?;
        debug!(%slot, ?value, "set selection");
        self.slots.insert(slot, value);

        let cleared = graph::downstream(slot).to_vec();
        for s in &cleared {
            self.slots.insert(*s, Selection::cleared(s.kind()));
        }
        Ok(cleared)
    }

    /// Slots currently holding at least one id, in pipeline order.
    pub fn active_slots(&self) -> Vec<Slot> {
        self.slots
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(s, _)| *s)
            .collect()
    }
}

/// Check the value's shape against the slot kind and canonicalize it.
fn normalize(slot: Slot, value: Selection) -> Result<Selection> {
    match (slot.kind(), value) {
        (kind, Selection::Unset) => Ok(Selection::cleared(kind)),
        (SlotKind::Single, Selection::Single(id)) => Ok(Selection::Single(id)),
        (SlotKind::Multi, Selection::Multi(ids)) => {
            let mut seen = Vec::with_capacity(ids.len());
            for id in ids {
                if !seen.contains(&id) {
                    seen.push(id);
                }
            }
            Ok(Selection::Multi(seen))
        }
        (SlotKind::Single, Selection::Multi(_)) => Err(DraftwrightError::validation(format!(
            "{slot} holds a single selection"
        ))),
        (SlotKind::Multi, Selection::Single(_)) => Err(DraftwrightError::validation(format!(
            "{slot} holds a list of selections"
        ))),
    }
}
