//! # Requirement Masks
//!
//! Bitmasks over attribute types, one per domain, used to describe which
//! data channels an evaluation consumer needs and which layers survive a
//! restricted copy.

use crate::domain::Domain;
use crate::types::AttributeType;
use serde::{Deserialize, Serialize};

/// A bitmask over [`AttributeType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct AttrMask(u32);

impl AttrMask {
    /// The empty mask.
    pub const EMPTY: AttrMask = AttrMask(0);

    /// Every attribute type set.
    pub const ALL: AttrMask = AttrMask((1 << AttributeType::ALL.len() as u32) - 1);

    /// Mask with a single type set.
    pub const fn of(ty: AttributeType) -> AttrMask {
        AttrMask(1 << ty as u32)
    }

    /// Whether `ty` is set.
    pub fn contains(self, ty: AttributeType) -> bool {
        self.0 & AttrMask::of(ty).0 != 0
    }

    /// Sets `ty`.
    pub fn insert(&mut self, ty: AttributeType) {
        self.0 |= AttrMask::of(ty).0;
    }

    /// Clears `ty`.
    pub fn remove(&mut self, ty: AttributeType) {
        self.0 &= !AttrMask::of(ty).0;
    }

    /// Union of two masks.
    pub const fn union(self, other: AttrMask) -> AttrMask {
        AttrMask(self.0 | other.0)
    }

    /// Whether every bit of `self` is also set in `other`.
    pub fn is_subset_of(self, other: AttrMask) -> bool {
        self.0 & !other.0 == 0
    }

    /// Whether no bits are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for AttrMask {
    type Output = AttrMask;

    fn bitor(self, rhs: AttrMask) -> AttrMask {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for AttrMask {
    fn bitor_assign(&mut self, rhs: AttrMask) {
        self.0 |= rhs.0;
    }
}

/// Per-domain attribute requirement mask.
///
/// Field names follow the domain order: vertex, edge, face, loop,
/// polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct MeshMask {
    /// Vertex-domain mask.
    pub vmask: AttrMask,
    /// Edge-domain mask.
    pub emask: AttrMask,
    /// Tessellated-face-domain mask.
    pub fmask: AttrMask,
    /// Loop-domain mask.
    pub lmask: AttrMask,
    /// Polygon-domain mask.
    pub pmask: AttrMask,
}

impl MeshMask {
    /// The empty mask.
    pub const EMPTY: MeshMask = MeshMask {
        vmask: AttrMask::EMPTY,
        emask: AttrMask::EMPTY,
        fmask: AttrMask::EMPTY,
        lmask: AttrMask::EMPTY,
        pmask: AttrMask::EMPTY,
    };

    /// Positions plus topology: the minimum a snapshot copy must carry.
    pub const BAREMESH: MeshMask = MeshMask {
        vmask: AttrMask::of(AttributeType::Position),
        emask: AttrMask::of(AttributeType::EdgeTopo),
        fmask: AttrMask::EMPTY,
        lmask: AttrMask::of(AttributeType::LoopTopo),
        pmask: AttrMask::of(AttributeType::PolyTopo),
    };

    /// [`Self::BAREMESH`] plus origin-index mapping layers.
    ///
    /// Always appended during constructive evaluation so downstream
    /// consumers can map derived elements back to the base mesh.
    pub const BAREMESH_ORIGINDEX: MeshMask = MeshMask {
        vmask: AttrMask::of(AttributeType::Position)
            .union(AttrMask::of(AttributeType::OriginIndex)),
        emask: AttrMask::of(AttributeType::EdgeTopo)
            .union(AttrMask::of(AttributeType::OriginIndex)),
        fmask: AttrMask::of(AttributeType::OriginIndex),
        lmask: AttrMask::of(AttributeType::LoopTopo),
        pmask: AttrMask::of(AttributeType::PolyTopo)
            .union(AttrMask::of(AttributeType::OriginIndex)),
    };

    /// Union of two masks, domain-wise.
    pub const fn union(self, other: MeshMask) -> MeshMask {
        MeshMask {
            vmask: self.vmask.union(other.vmask),
            emask: self.emask.union(other.emask),
            fmask: self.fmask.union(other.fmask),
            lmask: self.lmask.union(other.lmask),
            pmask: self.pmask.union(other.pmask),
        }
    }

    /// Whether every domain mask of `self` is a subset of `other`'s.
    pub fn is_subset_of(&self, other: &MeshMask) -> bool {
        self.vmask.is_subset_of(other.vmask)
            && self.emask.is_subset_of(other.emask)
            && self.fmask.is_subset_of(other.fmask)
            && self.lmask.is_subset_of(other.lmask)
            && self.pmask.is_subset_of(other.pmask)
    }

    /// The mask for one domain.
    pub fn domain(&self, domain: Domain) -> AttrMask {
        match domain {
            Domain::Vertex => self.vmask,
            Domain::Edge => self.emask,
            Domain::Face => self.fmask,
            Domain::Loop => self.lmask,
            Domain::Polygon => self.pmask,
        }
    }

    /// Mutable access to one domain's mask.
    pub fn domain_mut(&mut self, domain: Domain) -> &mut AttrMask {
        match domain {
            Domain::Vertex => &mut self.vmask,
            Domain::Edge => &mut self.emask,
            Domain::Face => &mut self.fmask,
            Domain::Loop => &mut self.lmask,
            Domain::Polygon => &mut self.pmask,
        }
    }
}

impl std::ops::BitOr for MeshMask {
    type Output = MeshMask;

    fn bitor(self, rhs: MeshMask) -> MeshMask {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for MeshMask {
    fn bitor_assign(&mut self, rhs: MeshMask) {
        *self = self.union(rhs);
    }
}
