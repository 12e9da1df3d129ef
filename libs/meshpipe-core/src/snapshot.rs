//! # Mesh Snapshot
//!
//! The value object handed between evaluation stages: element counts,
//! five per-domain attribute stores, dirty flags, and snapshot-scoped
//! runtime caches.
//!
//! Runtime caches (triangulation, bounding box) live behind reader/
//! writer locks owned by the snapshot itself, so locking is scoped to
//! one object's lifetime instead of a process-wide mutex. Cloning or
//! reference-copying a snapshot starts with empty caches.

use crate::error::DerivedError;
use crate::triangulate::{build_looptris, LoopTri};
use glam::DVec3;
use meshpipe_attributes::{
    AttrMask, AttrValues, AttributeStore, AttributeType, Domain, MeshEdge, MeshLoop, MeshMask,
    MeshPoly,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// =============================================================================
// COUNTS AND DIRTY FLAGS
// =============================================================================

/// Element counts of a snapshot.
///
/// The tessellated-face count is derived (see
/// [`MeshSnapshot::face_count`]) and not part of the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeshCounts {
    /// Number of vertices.
    pub verts: usize,
    /// Number of edges.
    pub edges: usize,
    /// Number of loops (face corners).
    pub loops: usize,
    /// Number of polygons.
    pub polys: usize,
}

/// Dirty bits for derived data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirtyFlags(u8);

impl DirtyFlags {
    /// Vertex/polygon normals are stale.
    pub const NORMALS: DirtyFlags = DirtyFlags(1 << 0);
    /// The legacy tessellated-face store is stale.
    pub const TESS: DirtyFlags = DirtyFlags(1 << 1);

    /// Whether all bits of `other` are set.
    pub fn contains(self, other: DirtyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the bits of `other`.
    pub fn insert(&mut self, other: DirtyFlags) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    pub fn remove(&mut self, other: DirtyFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for DirtyFlags {
    type Output = DirtyFlags;

    fn bitor(self, rhs: DirtyFlags) -> DirtyFlags {
        DirtyFlags(self.0 | rhs.0)
    }
}

// =============================================================================
// RUNTIME CACHES
// =============================================================================

/// Snapshot-scoped caches. Never copied between snapshots.
#[derive(Debug, Default)]
struct SnapshotRuntime {
    looptris: RwLock<Option<Arc<Vec<LoopTri>>>>,
    looptri_rebuilds: AtomicU64,
    bounds: RwLock<Option<(DVec3, DVec3)>>,
}

// =============================================================================
// MESH SNAPSHOT
// =============================================================================

/// Geometry plus attributes produced by one evaluation stage.
#[derive(Debug)]
pub struct MeshSnapshot {
    counts: MeshCounts,
    vert_data: AttributeStore,
    edge_data: AttributeStore,
    face_data: AttributeStore,
    loop_data: AttributeStore,
    poly_data: AttributeStore,
    dirty: DirtyFlags,
    deformed_only: bool,
    auto_smooth: Option<f64>,
    runtime: SnapshotRuntime,
}

impl Clone for MeshSnapshot {
    /// Clones counts, stores, and flags; runtime caches start empty.
    fn clone(&self) -> Self {
        Self {
            counts: self.counts,
            vert_data: self.vert_data.clone(),
            edge_data: self.edge_data.clone(),
            face_data: self.face_data.clone(),
            loop_data: self.loop_data.clone(),
            poly_data: self.poly_data.clone(),
            dirty: self.dirty,
            deformed_only: self.deformed_only,
            auto_smooth: self.auto_smooth,
            runtime: SnapshotRuntime::default(),
        }
    }
}

impl MeshSnapshot {
    /// Creates a snapshot with empty stores for the given counts.
    ///
    /// All derived data starts dirty.
    pub fn from_template(counts: MeshCounts) -> Self {
        Self {
            counts,
            vert_data: AttributeStore::new(Domain::Vertex, counts.verts),
            edge_data: AttributeStore::new(Domain::Edge, counts.edges),
            face_data: AttributeStore::new(Domain::Face, 0),
            loop_data: AttributeStore::new(Domain::Loop, counts.loops),
            poly_data: AttributeStore::new(Domain::Polygon, counts.polys),
            dirty: DirtyFlags::NORMALS | DirtyFlags::TESS,
            deformed_only: false,
            auto_smooth: None,
            runtime: SnapshotRuntime::default(),
        }
    }

    /// Builds a snapshot from topology arrays.
    pub fn from_parts(
        positions: Vec<DVec3>,
        edges: Vec<MeshEdge>,
        loops: Vec<MeshLoop>,
        polys: Vec<MeshPoly>,
    ) -> Result<Self, DerivedError> {
        let counts = MeshCounts {
            verts: positions.len(),
            edges: edges.len(),
            loops: loops.len(),
            polys: polys.len(),
        };
        let mut snapshot = Self::from_template(counts);
        snapshot
            .vert_data
            .add_layer(AttributeType::Position, None, Some(AttrValues::Vec3(positions)))?;
        snapshot
            .edge_data
            .add_layer(AttributeType::EdgeTopo, None, Some(AttrValues::Edge(edges)))?;
        snapshot
            .loop_data
            .add_layer(AttributeType::LoopTopo, None, Some(AttrValues::Loop(loops)))?;
        snapshot
            .poly_data
            .add_layer(AttributeType::PolyTopo, None, Some(AttrValues::Poly(polys)))?;
        Ok(snapshot)
    }

    /// A referencing copy for evaluation: all layers shared, caches
    /// empty, `deformed_only` set.
    ///
    /// Layers flagged `no_copy` by a preceding
    /// [`Self::restrict_copy`] are dropped from the copy.
    pub fn copy_for_eval(&self) -> MeshSnapshot {
        MeshSnapshot {
            counts: self.counts,
            vert_data: self.vert_data.share_layers(AttrMask::ALL),
            edge_data: self.edge_data.share_layers(AttrMask::ALL),
            face_data: self.face_data.share_layers(AttrMask::ALL),
            loop_data: self.loop_data.share_layers(AttrMask::ALL),
            poly_data: self.poly_data.share_layers(AttrMask::ALL),
            dirty: self.dirty,
            deformed_only: true,
            auto_smooth: self.auto_smooth,
            runtime: SnapshotRuntime::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Element counts.
    pub fn counts(&self) -> MeshCounts {
        self.counts
    }

    /// Derived tessellated-face count; zero until
    /// [`Self::tessface_ensure`](crate::tessface) runs.
    pub fn face_count(&self) -> usize {
        self.face_data.element_count()
    }

    /// The store for one domain.
    pub fn store(&self, domain: Domain) -> &AttributeStore {
        match domain {
            Domain::Vertex => &self.vert_data,
            Domain::Edge => &self.edge_data,
            Domain::Face => &self.face_data,
            Domain::Loop => &self.loop_data,
            Domain::Polygon => &self.poly_data,
        }
    }

    /// Mutable store for one domain.
    pub fn store_mut(&mut self, domain: Domain) -> &mut AttributeStore {
        match domain {
            Domain::Vertex => &mut self.vert_data,
            Domain::Edge => &mut self.edge_data,
            Domain::Face => &mut self.face_data,
            Domain::Loop => &mut self.loop_data,
            Domain::Polygon => &mut self.poly_data,
        }
    }

    pub(crate) fn face_data_mut(&mut self) -> &mut AttributeStore {
        &mut self.face_data
    }

    pub(crate) fn replace_face_data(&mut self, store: AttributeStore) {
        self.face_data = store;
    }

    /// Vertex positions.
    pub fn positions(&self) -> Result<&[DVec3], DerivedError> {
        if self.counts.verts == 0 {
            return Ok(&[]);
        }
        self.vert_data
            .layer_values(AttributeType::Position, None)
            .and_then(AttrValues::as_vec3)
            .ok_or_else(|| DerivedError::missing_layer(AttributeType::Position, None))
    }

    /// An owned copy of the vertex positions (the deform buffer seed).
    pub fn vertex_positions(&self) -> Result<Vec<DVec3>, DerivedError> {
        Ok(self.positions()?.to_vec())
    }

    /// Edge topology.
    pub fn edges(&self) -> Result<&[MeshEdge], DerivedError> {
        if self.counts.edges == 0 {
            return Ok(&[]);
        }
        self.edge_data
            .layer_values(AttributeType::EdgeTopo, None)
            .and_then(AttrValues::as_edges)
            .ok_or_else(|| DerivedError::missing_layer(AttributeType::EdgeTopo, None))
    }

    /// Loop topology.
    pub fn loops(&self) -> Result<&[MeshLoop], DerivedError> {
        if self.counts.loops == 0 {
            return Ok(&[]);
        }
        self.loop_data
            .layer_values(AttributeType::LoopTopo, None)
            .and_then(AttrValues::as_loops)
            .ok_or_else(|| DerivedError::missing_layer(AttributeType::LoopTopo, None))
    }

    /// Polygon topology.
    pub fn polys(&self) -> Result<&[MeshPoly], DerivedError> {
        if self.counts.polys == 0 {
            return Ok(&[]);
        }
        self.poly_data
            .layer_values(AttributeType::PolyTopo, None)
            .and_then(AttrValues::as_polys)
            .ok_or_else(|| DerivedError::missing_layer(AttributeType::PolyTopo, None))
    }

    /// Current dirty flags.
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub(crate) fn dirty_mut(&mut self) -> &mut DirtyFlags {
        &mut self.dirty
    }

    /// Marks derived data stale.
    pub fn tag_dirty(&mut self, flags: DirtyFlags) {
        self.dirty.insert(flags);
    }

    /// Whether only vertex positions differ from the source topology.
    pub fn deformed_only(&self) -> bool {
        self.deformed_only
    }

    /// Sets the deformed-only marker (cleared by constructive stages).
    pub fn set_deformed_only(&mut self, deformed_only: bool) {
        self.deformed_only = deformed_only;
    }

    /// Auto-smooth angle in radians, if enabled.
    pub fn auto_smooth(&self) -> Option<f64> {
        self.auto_smooth
    }

    /// Enables or disables auto-smooth.
    pub fn set_auto_smooth(&mut self, angle: Option<f64>) {
        self.auto_smooth = angle;
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Writes a new vertex-position buffer.
    ///
    /// Normals become dirty and the bounding-box cache is dropped;
    /// topology (and therefore the triangulation cache) is unaffected.
    pub fn apply_vert_coords(&mut self, coords: &[DVec3]) -> Result<(), DerivedError> {
        if coords.len() != self.counts.verts {
            return Err(DerivedError::Attribute(
                meshpipe_attributes::AttributeError::count_mismatch(
                    self.counts.verts,
                    coords.len(),
                ),
            ));
        }
        self.vert_data
            .ensure_layer(AttributeType::Position, None)?
            .set_values(AttrValues::Vec3(coords.to_vec()));
        self.dirty.insert(DirtyFlags::NORMALS);
        *self.runtime.bounds.write() = None;
        Ok(())
    }

    /// Flags layers outside `mask` as skipped by copies, per domain.
    pub fn restrict_copy(&mut self, mask: &MeshMask) {
        for domain in Domain::ALL {
            let attr_mask = mask.domain(domain);
            self.store_mut(domain).restrict_copy(attr_mask);
        }
    }

    /// Drops the triangulation cache.
    ///
    /// Call after any in-place change to loop or polygon topology.
    /// Constructive stages that produce new snapshots start with an
    /// empty cache and don't need this.
    pub fn invalidate_tessellation(&mut self) {
        *self.runtime.looptris.write() = None;
        self.dirty.insert(DirtyFlags::TESS);
    }

    // -------------------------------------------------------------------------
    // Derived caches
    // -------------------------------------------------------------------------

    /// The polygon triangulation, rebuilt lazily.
    ///
    /// Readers share the published array; when absent, one writer
    /// rebuilds it while the rest block, with a re-check after the
    /// writer lock is acquired (another thread may have built it
    /// first).
    pub fn looptris(&self) -> Result<Arc<Vec<LoopTri>>, DerivedError> {
        {
            let guard = self.runtime.looptris.read();
            if let Some(tris) = guard.as_ref() {
                return Ok(Arc::clone(tris));
            }
        }

        let mut guard = self.runtime.looptris.write();
        if guard.is_none() {
            let tris = build_looptris(self.loops()?, self.polys()?);
            log::trace!(
                "rebuilt triangulation: {} polys -> {} tris",
                self.counts.polys,
                tris.len()
            );
            self.runtime.looptri_rebuilds.fetch_add(1, Ordering::Relaxed);
            *guard = Some(Arc::new(tris));
        }
        Ok(Arc::clone(guard.as_ref().expect("published above")))
    }

    /// How many times the triangulation was rebuilt for this snapshot.
    pub fn looptri_rebuild_count(&self) -> u64 {
        self.runtime.looptri_rebuilds.load(Ordering::Relaxed)
    }

    /// The axis-aligned bounding box, cached lazily.
    ///
    /// Empty meshes report a zero box.
    pub fn bounds(&self) -> Result<(DVec3, DVec3), DerivedError> {
        {
            let guard = self.runtime.bounds.read();
            if let Some(bounds) = *guard {
                return Ok(bounds);
            }
        }

        let mut guard = self.runtime.bounds.write();
        if guard.is_none() {
            let positions = self.positions()?;
            let bounds = match positions.split_first() {
                Some((&first, rest)) => rest
                    .iter()
                    .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
                None => (DVec3::ZERO, DVec3::ZERO),
            };
            *guard = Some(bounds);
        }
        Ok((*guard).expect("published above"))
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Validates topology references and store counts.
    ///
    /// Checks:
    /// - Store element counts match the snapshot counts
    /// - Edge and loop vertex references are in range
    /// - Polygon loop ranges lie inside the loop store and have at
    ///   least three corners
    ///
    /// Returns true if valid.
    pub fn validate(&self) -> bool {
        if self.vert_data.element_count() != self.counts.verts
            || self.edge_data.element_count() != self.counts.edges
            || self.loop_data.element_count() != self.counts.loops
            || self.poly_data.element_count() != self.counts.polys
        {
            return false;
        }

        let verts = self.counts.verts as u32;
        let Ok(edges) = self.edges() else {
            return false;
        };
        for edge in edges {
            if edge.verts[0] >= verts || edge.verts[1] >= verts {
                return false;
            }
        }

        let Ok(loops) = self.loops() else {
            return false;
        };
        for l in loops {
            if l.vert >= verts {
                return false;
            }
        }

        let Ok(polys) = self.polys() else {
            return false;
        };
        for poly in polys {
            if poly.loop_count < 3 {
                return false;
            }
            let end = poly.loop_start as usize + poly.loop_count as usize;
            if end > self.counts.loops {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulate::poly_to_tri_count;

    /// Unit quad in the XY plane.
    fn quad_snapshot() -> MeshSnapshot {
        let positions = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        let edges = (0..4u32)
            .map(|i| MeshEdge {
                verts: [i, (i + 1) % 4],
            })
            .collect();
        let loops = (0..4u32).map(|i| MeshLoop { vert: i, edge: i }).collect();
        let polys = vec![MeshPoly {
            loop_start: 0,
            loop_count: 4,
        }];
        MeshSnapshot::from_parts(positions, edges, loops, polys).unwrap()
    }

    #[test]
    fn test_from_parts_counts() {
        let snapshot = quad_snapshot();
        assert_eq!(
            snapshot.counts(),
            MeshCounts {
                verts: 4,
                edges: 4,
                loops: 4,
                polys: 1
            }
        );
        assert_eq!(snapshot.face_count(), 0);
        assert!(snapshot.validate());
    }

    #[test]
    fn test_validate_rejects_bad_indices() {
        let positions = vec![DVec3::ZERO];
        let edges = vec![MeshEdge { verts: [0, 5] }];
        let snapshot = MeshSnapshot::from_parts(positions, edges, vec![], vec![]).unwrap();
        assert!(!snapshot.validate());
    }

    #[test]
    fn test_apply_vert_coords_dirties_normals() {
        let mut snapshot = quad_snapshot();
        snapshot.ensure_normals().unwrap();
        assert!(!snapshot.dirty().contains(DirtyFlags::NORMALS));

        let moved: Vec<DVec3> = snapshot
            .positions()
            .unwrap()
            .iter()
            .map(|p| *p + DVec3::X)
            .collect();
        snapshot.apply_vert_coords(&moved).unwrap();
        assert!(snapshot.dirty().contains(DirtyFlags::NORMALS));
        assert_eq!(snapshot.positions().unwrap()[0], DVec3::X);
    }

    #[test]
    fn test_apply_vert_coords_count_mismatch() {
        let mut snapshot = quad_snapshot();
        assert!(snapshot.apply_vert_coords(&[DVec3::ZERO]).is_err());
    }

    #[test]
    fn test_copy_for_eval_shares_buffers() {
        let base = quad_snapshot();
        let copy = base.copy_for_eval();
        assert!(copy.deformed_only());
        assert!(base
            .store(Domain::Vertex)
            .layer(AttributeType::Position, None)
            .unwrap()
            .is_shared());

        // Writing into the copy must not touch the base.
        let mut copy = copy;
        copy.apply_vert_coords(&[DVec3::ONE; 4]).unwrap();
        assert_eq!(base.positions().unwrap()[0], DVec3::ZERO);
        assert_eq!(copy.positions().unwrap()[0], DVec3::ONE);
    }

    #[test]
    fn test_looptris_count_invariant() {
        let snapshot = quad_snapshot();
        let tris = snapshot.looptris().unwrap();
        let counts = snapshot.counts();
        assert_eq!(tris.len(), poly_to_tri_count(counts.polys, counts.loops));
        assert_eq!(tris.len(), 2);
    }

    #[test]
    fn test_looptris_empty_mesh() {
        let snapshot = MeshSnapshot::from_template(MeshCounts::default());
        let tris = snapshot.looptris().unwrap();
        assert!(tris.is_empty());
    }

    #[test]
    fn test_looptris_stable_reference() {
        let snapshot = quad_snapshot();
        let a = snapshot.looptris().unwrap();
        let b = snapshot.looptris().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(snapshot.looptri_rebuild_count(), 1);
    }

    #[test]
    fn test_looptris_single_rebuild_under_contention() {
        let snapshot = quad_snapshot();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let tris = snapshot.looptris().unwrap();
                    assert_eq!(tris.len(), 2);
                });
            }
        });
        assert_eq!(snapshot.looptri_rebuild_count(), 1);
    }

    #[test]
    fn test_invalidate_tessellation_forces_rebuild() {
        let mut snapshot = quad_snapshot();
        let first = snapshot.looptris().unwrap();
        snapshot.invalidate_tessellation();
        let second = snapshot.looptris().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(snapshot.looptri_rebuild_count(), 2);
    }

    #[test]
    fn test_bounds_cached_and_invalidated() {
        let mut snapshot = quad_snapshot();
        let (lo, hi) = snapshot.bounds().unwrap();
        assert_eq!(lo, DVec3::ZERO);
        assert_eq!(hi, DVec3::new(1.0, 1.0, 0.0));

        let moved: Vec<DVec3> = snapshot
            .positions()
            .unwrap()
            .iter()
            .map(|p| *p + DVec3::new(2.0, 0.0, 0.0))
            .collect();
        snapshot.apply_vert_coords(&moved).unwrap();
        let (lo, _) = snapshot.bounds().unwrap();
        assert_eq!(lo, DVec3::new(2.0, 0.0, 0.0));
    }
}
