//! Static pipeline graph: stage order, slot dependencies, and per-stage
//! default-selection policies.
//!
//! The graph is a declarative table of `slot -> upstream slots`. The
//! downstream (invalidation) closure of every slot is derived from it once
//! and walked in pipeline order on each selection change.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use draftwright_shared::{Slot, Stage};

/// What to select automatically when a new artifact set is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPolicy {
    /// Select the first option.
    First,
    /// Select the first `n` options (multi-select stages).
    FirstN(usize),
    /// Leave the item selection empty; the user opts in.
    Nothing,
    /// Select every option and make the first one the feature image.
    AllWithFeature,
}

/// Static description of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    pub stage: Stage,
    /// Slot holding the chosen artifact set, for stages with set history.
    pub set_slot: Option<Slot>,
    /// Slot holding the chosen option(s).
    pub item_slot: Slot,
    /// Secondary item slot (the feature image).
    pub feature_slot: Option<Slot>,
    pub policy: DefaultPolicy,
}

impl StageDescriptor {
    /// The slot a freshly recorded set is attached to: the set slot when the
    /// stage has one, otherwise the item slot.
    pub fn entry_slot(&self) -> Slot {
        self.set_slot.unwrap_or(self.item_slot)
    }

    /// Every slot owned by this stage, in pipeline order.
    pub fn slots(&self) -> Vec<Slot> {
        self.set_slot
            .into_iter()
            .chain(std::iter::once(self.item_slot))
            .chain(self.feature_slot)
            .collect()
    }
}

const fn single(stage: Stage, item_slot: Slot, policy: DefaultPolicy) -> StageDescriptor {
    StageDescriptor {
        stage,
        set_slot: None,
        item_slot,
        feature_slot: None,
        policy,
    }
}

const fn with_set(
    stage: Stage,
    set_slot: Slot,
    item_slot: Slot,
    policy: DefaultPolicy,
) -> StageDescriptor {
    StageDescriptor {
        stage,
        set_slot: Some(set_slot),
        item_slot,
        feature_slot: None,
        policy,
    }
}

/// Stage descriptors in pipeline order.
pub const STAGES: [StageDescriptor; 12] = [
    single(Stage::Product, Slot::Product, DefaultPolicy::First),
    single(Stage::Persona, Slot::Persona, DefaultPolicy::First),
    with_set(Stage::Keywords, Slot::KeywordSet, Slot::Keywords, DefaultPolicy::Nothing),
    single(Stage::Analysis, Slot::Analysis, DefaultPolicy::First),
    with_set(
        Stage::Objectives,
        Slot::ObjectiveSet,
        Slot::Objectives,
        DefaultPolicy::FirstN(3),
    ),
    with_set(Stage::Titles, Slot::TitleSet, Slot::Title, DefaultPolicy::First),
    with_set(
        Stage::MetaDescriptions,
        Slot::MetaDescriptionSet,
        Slot::MetaDescription,
        DefaultPolicy::First,
    ),
    with_set(Stage::Sapo, Slot::SapoSet, Slot::Sapo, DefaultPolicy::First),
    with_set(Stage::Cta, Slot::CtaSet, Slot::Ctas, DefaultPolicy::Nothing),
    single(Stage::Outline, Slot::Outline, DefaultPolicy::First),
    StageDescriptor {
        stage: Stage::Images,
        set_slot: Some(Slot::ImageSet),
        item_slot: Slot::Images,
        feature_slot: Some(Slot::FeatureImage),
        policy: DefaultPolicy::AllWithFeature,
    },
    single(Stage::Article, Slot::Article, DefaultPolicy::First),
];

/// Look up the descriptor of a stage.
pub fn descriptor(stage: Stage) -> &'static StageDescriptor {
    &STAGES[stage.position()]
}

/// Direct upstream slots whose change invalidates `slot`.
pub fn upstream(slot: Slot) -> &'static [Slot] {
    match slot {
        Slot::Product => &[],
        Slot::Persona => &[Slot::Product],
        Slot::KeywordSet => &[Slot::Persona],
        Slot::Keywords => &[Slot::KeywordSet],
        Slot::Analysis => &[Slot::Keywords],
        Slot::ObjectiveSet => &[Slot::Analysis],
        Slot::Objectives => &[Slot::ObjectiveSet],
        Slot::TitleSet => &[Slot::Objectives, Slot::Keywords],
        Slot::Title => &[Slot::TitleSet],
        Slot::MetaDescriptionSet => &[Slot::Title, Slot::Keywords],
        Slot::MetaDescription => &[Slot::MetaDescriptionSet],
        Slot::SapoSet => &[Slot::MetaDescription],
        Slot::Sapo => &[Slot::SapoSet],
        Slot::CtaSet => &[Slot::Sapo],
        Slot::Ctas => &[Slot::CtaSet],
        Slot::Outline => &[Slot::Ctas, Slot::Keywords, Slot::Analysis, Slot::Persona],
        Slot::ImageSet => &[Slot::Outline],
        Slot::Images => &[Slot::ImageSet],
        Slot::FeatureImage => &[Slot::ImageSet],
        Slot::Article => &[
            Slot::Images,
            Slot::FeatureImage,
            Slot::Title,
            Slot::MetaDescription,
            Slot::Sapo,
            Slot::Ctas,
            Slot::Outline,
        ],
    }
}

/// Slot -> transitive downstream slots, in pipeline order.
static DOWNSTREAM: LazyLock<BTreeMap<Slot, Vec<Slot>>> = LazyLock::new(|| {
    Slot::ALL
        .into_iter()
        .map(|origin| {
            // Upstream slots always precede their dependents in `Slot::ALL`,
            // so one forward pass reaches the whole closure.
            let mut reached: Vec<Slot> = Vec::new();
            for candidate in Slot::ALL.into_iter().skip(origin.position() + 1) {
                if upstream(candidate)
                    .iter()
                    .any(|u| *u == origin || reached.contains(u))
                {
                    reached.push(candidate);
                }
            }
            (origin, reached)
        })
        .collect()
});

/// Every slot that must be cleared when `slot` changes, in pipeline order.
pub fn downstream(slot: Slot) -> &'static [Slot] {
    DOWNSTREAM.get(&slot).map(Vec::as_slice).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_follow_stage_order() {
        for (i, d) in STAGES.iter().enumerate() {
            assert_eq!(d.stage.position(), i);
            for slot in d.slots() {
                assert_eq!(slot.stage(), d.stage, "{slot} belongs to {}", d.stage);
            }
        }
    }

    #[test]
    fn every_slot_is_owned_by_one_stage() {
        let mut owned: Vec<Slot> = STAGES.iter().flat_map(|d| d.slots()).collect();
        owned.sort();
        let mut all = Slot::ALL.to_vec();
        all.sort();
        assert_eq!(owned, all);
    }

    #[test]
    fn upstream_always_precedes() {
        for slot in Slot::ALL {
            for u in upstream(slot) {
                assert!(u.position() < slot.position(), "{u} must precede {slot}");
            }
        }
    }

    #[test]
    fn invalidation_is_monotonic_by_stage() {
        // Changing the item selection of stage k clears every slot of every
        // later stage.
        for d in STAGES.iter() {
            let cleared = downstream(d.item_slot);
            for later in Slot::ALL
                .into_iter()
                .filter(|s| s.stage().position() > d.stage.position())
            {
                assert!(cleared.contains(&later), "{} does not clear {later}", d.item_slot);
            }
        }
    }

    #[test]
    fn persona_change_clears_everything_after_it() {
        let cleared = downstream(Slot::Persona);
        assert!(!cleared.contains(&Slot::Product));
        assert!(!cleared.contains(&Slot::Persona));
        assert_eq!(cleared.len(), Slot::ALL.len() - 2);
        assert_eq!(cleared.first(), Some(&Slot::KeywordSet));
        assert_eq!(cleared.last(), Some(&Slot::Article));
    }

    #[test]
    fn downstream_is_in_pipeline_order() {
        for slot in Slot::ALL {
            let positions: Vec<usize> = downstream(slot).iter().map(|s| s.position()).collect();
            let mut sorted = positions.clone();
            sorted.sort();
            assert_eq!(positions, sorted);
        }
    }

    #[test]
    fn set_change_clears_its_items() {
        assert!(downstream(Slot::ImageSet).contains(&Slot::Images));
        assert!(downstream(Slot::ImageSet).contains(&Slot::FeatureImage));
        assert!(downstream(Slot::TitleSet).contains(&Slot::Title));
    }

    #[test]
    fn sibling_image_slots_do_not_clear_each_other() {
        assert_eq!(downstream(Slot::Images), &[Slot::Article]);
        assert_eq!(downstream(Slot::FeatureImage), &[Slot::Article]);
    }

    #[test]
    fn title_set_depends_on_keywords_and_objectives() {
        assert_eq!(upstream(Slot::TitleSet), &[Slot::Objectives, Slot::Keywords]);
        assert!(upstream(Slot::Product).is_empty());
        assert!(upstream(Slot::Outline).contains(&Slot::Ctas));
    }

    #[test]
    fn default_policies() {
        assert_eq!(descriptor(Stage::Objectives).policy, DefaultPolicy::FirstN(3));
        assert_eq!(descriptor(Stage::Cta).policy, DefaultPolicy::Nothing);
        assert_eq!(descriptor(Stage::Keywords).policy, DefaultPolicy::Nothing);
        assert_eq!(descriptor(Stage::Images).policy, DefaultPolicy::AllWithFeature);
        assert_eq!(descriptor(Stage::Titles).policy, DefaultPolicy::First);
    }
}
