//! # Requirement Propagation
//!
//! The evaluation request descriptor and the backward scan that
//! computes, for every stack position, the attribute mask the data
//! flowing into that position must carry.

use crate::modifier::{EvalMode, Modifier};
use meshpipe_attributes::MeshMask;
use serde::{Deserialize, Serialize};

/// What a caller needs from an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataRequirement {
    /// Per-domain attribute mask required by downstream consumers.
    pub mask: MeshMask,
    /// Whether origin-index mapping back to the base mesh is needed
    /// (painting and selection tools).
    pub need_mapping: bool,
}

impl DataRequirement {
    /// Whether a cached evaluation under `self` also serves
    /// `requested`.
    ///
    /// True iff the requested mask is a subset of the cached one and
    /// the mapping requirement is satisfied.
    pub fn satisfies(&self, requested: &DataRequirement) -> bool {
        requested.mask.is_subset_of(&self.mask) && !(requested.need_mapping && !self.need_mapping)
    }

    /// The union requirement, used when re-evaluating so repeated
    /// narrower requests don't thrash the cache.
    pub fn merge(&self, other: &DataRequirement) -> DataRequirement {
        DataRequirement {
            mask: self.mask | other.mask,
            need_mapping: self.need_mapping || other.need_mapping,
        }
    }
}

/// Backward scan over the effective modifier list.
///
/// `masks[i]` is the attribute mask the input of modifier `i` must
/// carry: the caller's request plus the declared requirements of every
/// enabled modifier at or after position `i`.
pub fn calc_data_masks(
    modifiers: &[&dyn Modifier],
    request: &MeshMask,
    mode: EvalMode,
) -> Vec<MeshMask> {
    let mut masks = vec![MeshMask::EMPTY; modifiers.len()];
    let mut accumulated = *request;
    for i in (0..modifiers.len()).rev() {
        if modifiers[i].is_enabled(mode) {
            accumulated |= modifiers[i].required_data_mask();
        }
        masks[i] = accumulated;
    }
    masks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{ModifierContext, ModifierKind};
    use meshpipe_attributes::{AttrMask, AttributeType};

    struct Needs(MeshMask);

    impl Modifier for Needs {
        fn name(&self) -> &str {
            "needs"
        }

        fn kind(&self) -> ModifierKind {
            ModifierKind::Constructive
        }

        fn required_data_mask(&self) -> MeshMask {
            self.0
        }

        fn apply(
            &self,
            _ctx: &ModifierContext<'_>,
            _mesh: &meshpipe_core::MeshSnapshot,
        ) -> Option<meshpipe_core::MeshSnapshot> {
            None
        }
    }

    #[test]
    fn test_backward_accumulation() {
        let mut uv = MeshMask::EMPTY;
        uv.lmask.insert(AttributeType::Uv);
        let mut orco = MeshMask::EMPTY;
        orco.vmask.insert(AttributeType::Orco);

        let first = Needs(MeshMask::EMPTY);
        let second = Needs(uv);
        let third = Needs(orco);
        let stack: Vec<&dyn Modifier> = vec![&first, &second, &third];

        let masks = calc_data_masks(&stack, &MeshMask::EMPTY, EvalMode::Realtime);
        // Input of the first modifier must already carry what the later
        // ones read.
        assert!(masks[0].lmask.contains(AttributeType::Uv));
        assert!(masks[0].vmask.contains(AttributeType::Orco));
        assert!(masks[1].lmask.contains(AttributeType::Uv));
        assert!(!masks[2].lmask.contains(AttributeType::Uv));
        assert!(masks[2].vmask.contains(AttributeType::Orco));
    }

    #[test]
    fn test_request_seeds_every_position() {
        let mut request = MeshMask::EMPTY;
        request.vmask.insert(AttributeType::GenericFloat);
        let only = Needs(MeshMask::EMPTY);
        let stack: Vec<&dyn Modifier> = vec![&only];
        let masks = calc_data_masks(&stack, &request, EvalMode::Realtime);
        assert!(masks[0].vmask.contains(AttributeType::GenericFloat));
    }

    #[test]
    fn test_satisfies_and_merge() {
        let mut a = DataRequirement::default();
        a.mask.vmask.insert(AttributeType::Orco);
        a.mask.vmask.insert(AttributeType::GenericFloat);

        let mut narrower = DataRequirement::default();
        narrower.mask.vmask.insert(AttributeType::Orco);
        assert!(a.satisfies(&narrower));

        let mut wider = narrower;
        wider.mask.lmask.insert(AttributeType::Uv);
        assert!(!a.satisfies(&wider));

        let merged = a.merge(&wider);
        assert!(a.satisfies(&narrower));
        assert!(merged.satisfies(&wider));
        assert!(merged.satisfies(&a));

        let mapping = DataRequirement {
            mask: MeshMask::EMPTY,
            need_mapping: true,
        };
        assert!(!a.satisfies(&mapping));
        assert!(a.merge(&mapping).need_mapping);
    }

    #[test]
    fn test_attr_mask_unused_bit() {
        // Masks over every defined type fit the bit width.
        let all = AttrMask::ALL;
        for ty in AttributeType::ALL {
            assert!(all.contains(ty));
        }
    }
}
