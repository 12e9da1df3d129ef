//! # Normal Computation
//!
//! Vertex, polygon, and per-loop (split) normals.
//!
//! Polygon normals use Newell's method and are computed in parallel.
//! Vertex normals accumulate adjacent polygon normals weighted by the
//! corner angle. Split normals honor the snapshot's auto-smooth angle:
//! polygons whose normals diverge more than the angle contribute to
//! separate smoothing groups at a shared vertex.

use crate::error::DerivedError;
use crate::snapshot::{DirtyFlags, MeshSnapshot};
use config::constants::DEGENERATE_LENGTH_SQ;
use glam::DVec3;
use meshpipe_attributes::{AttrValues, AttributeType, MeshLoop, MeshPoly};
use rayon::prelude::*;

/// Newell's method over the polygon boundary.
pub(crate) fn newell_normal(positions: &[DVec3], loops: &[MeshLoop], poly: &MeshPoly) -> DVec3 {
    let start = poly.loop_start as usize;
    let count = poly.loop_count as usize;
    let mut normal = DVec3::ZERO;
    for corner in 0..count {
        let current = positions[loops[start + corner].vert as usize];
        let next = positions[loops[start + (corner + 1) % count].vert as usize];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    if normal.length_squared() < DEGENERATE_LENGTH_SQ {
        DVec3::Z
    } else {
        normal.normalize()
    }
}

/// Per-polygon normals, computed in parallel.
pub(crate) fn poly_normals(
    positions: &[DVec3],
    loops: &[MeshLoop],
    polys: &[MeshPoly],
) -> Vec<DVec3> {
    polys
        .par_iter()
        .map(|poly| newell_normal(positions, loops, poly))
        .collect()
}

/// Corner angle at `corner` of `poly`.
fn corner_angle(positions: &[DVec3], loops: &[MeshLoop], poly: &MeshPoly, corner: usize) -> f64 {
    let count = poly.loop_count as usize;
    let start = poly.loop_start as usize;
    let prev = positions[loops[start + (corner + count - 1) % count].vert as usize];
    let here = positions[loops[start + corner].vert as usize];
    let next = positions[loops[start + (corner + 1) % count].vert as usize];
    let a = (prev - here).try_normalize().unwrap_or(DVec3::ZERO);
    let b = (next - here).try_normalize().unwrap_or(DVec3::ZERO);
    a.dot(b).clamp(-1.0, 1.0).acos()
}

/// Angle-weighted vertex normals.
///
/// Vertices without any polygon fall back to their normalized position
/// (stable for point clouds and loose verts).
pub(crate) fn vert_normals(
    positions: &[DVec3],
    loops: &[MeshLoop],
    polys: &[MeshPoly],
    poly_nors: &[DVec3],
) -> Vec<DVec3> {
    let mut normals = vec![DVec3::ZERO; positions.len()];
    for (poly, poly_nor) in polys.iter().zip(poly_nors) {
        let start = poly.loop_start as usize;
        for corner in 0..poly.loop_count as usize {
            let vert = loops[start + corner].vert as usize;
            let weight = corner_angle(positions, loops, poly, corner);
            normals[vert] += *poly_nor * weight;
        }
    }
    for (normal, position) in normals.iter_mut().zip(positions) {
        if normal.length_squared() < DEGENERATE_LENGTH_SQ {
            *normal = position.try_normalize().unwrap_or(DVec3::Z);
        } else {
            *normal = normal.normalize();
        }
    }
    normals
}

impl MeshSnapshot {
    /// Whether vertex/polygon normals need recomputation.
    pub fn normals_dirty(&self) -> bool {
        self.dirty().contains(DirtyFlags::NORMALS)
            || !self
                .store(meshpipe_attributes::Domain::Vertex)
                .has_layer(AttributeType::Normal, None)
            || !self
                .store(meshpipe_attributes::Domain::Polygon)
                .has_layer(AttributeType::Normal, None)
    }

    /// Recomputes vertex and polygon normals if they are dirty, then
    /// clears the dirty bit. Idempotent: a second call without
    /// mutation is a no-op and leaves the buffers bit-identical.
    pub fn ensure_normals(&mut self) -> Result<(), DerivedError> {
        if !self.normals_dirty() {
            return Ok(());
        }

        let (vnors, pnors) = {
            let positions = self.positions()?;
            let loops = self.loops()?;
            let polys = self.polys()?;
            let pnors = poly_normals(positions, loops, polys);
            let vnors = vert_normals(positions, loops, polys, &pnors);
            (vnors, pnors)
        };
        log::trace!("recomputed normals for {} verts", vnors.len());

        self.store_mut(meshpipe_attributes::Domain::Vertex)
            .ensure_layer(AttributeType::Normal, None)?
            .set_values(AttrValues::Vec3(vnors));
        self.store_mut(meshpipe_attributes::Domain::Polygon)
            .ensure_layer(AttributeType::Normal, None)?
            .set_values(AttrValues::Vec3(pnors));
        self.dirty_mut().remove(DirtyFlags::NORMALS);
        Ok(())
    }

    /// Display-ready normals: recompute only when flagged dirty.
    ///
    /// Thin alias kept for call sites that mirror the finalization
    /// step's wording.
    pub fn ensure_normals_for_display(&mut self) -> Result<(), DerivedError> {
        self.ensure_normals()
    }

    /// Computes per-loop split normals into the loop `Normal` layer.
    ///
    /// Refreshes vertex/polygon normals first if needed. Polygons
    /// whose normals diverge from the loop's polygon by more than the
    /// auto-smooth angle are excluded from that loop's smoothing
    /// group; without auto-smooth everything is smooth. The legacy
    /// tessellated-face store is cleared, since it must be rebuilt
    /// against the new loop normals.
    pub fn calc_normals_split(&mut self) -> Result<(), DerivedError> {
        self.ensure_normals()?;

        let loop_nors = {
            let positions = self.positions()?;
            let loops = self.loops()?;
            let polys = self.polys()?;
            let pnors = self
                .store(meshpipe_attributes::Domain::Polygon)
                .layer_values(AttributeType::Normal, None)
                .and_then(AttrValues::as_vec3)
                .ok_or_else(|| DerivedError::missing_layer(AttributeType::Normal, None))?;

            // Sharp threshold; None means everything smooth.
            let cos_threshold = self.auto_smooth().unwrap_or(std::f64::consts::PI).cos();

            let mut vert_to_polys: Vec<Vec<u32>> = vec![Vec::new(); positions.len()];
            for (poly_index, poly) in polys.iter().enumerate() {
                let start = poly.loop_start as usize;
                for corner in 0..poly.loop_count as usize {
                    vert_to_polys[loops[start + corner].vert as usize].push(poly_index as u32);
                }
            }

            let mut loop_nors = vec![DVec3::Z; loops.len()];
            for (poly_index, poly) in polys.iter().enumerate() {
                let own_nor = pnors[poly_index];
                let start = poly.loop_start as usize;
                for corner in 0..poly.loop_count as usize {
                    let loop_index = start + corner;
                    let vert = loops[loop_index].vert as usize;
                    let mut acc = DVec3::ZERO;
                    for &adjacent in &vert_to_polys[vert] {
                        let other = pnors[adjacent as usize];
                        if other.dot(own_nor) >= cos_threshold {
                            acc += other;
                        }
                    }
                    loop_nors[loop_index] = acc.try_normalize().unwrap_or(own_nor);
                }
            }
            loop_nors
        };

        self.store_mut(meshpipe_attributes::Domain::Loop)
            .ensure_layer(AttributeType::Normal, None)?
            .set_values(AttrValues::Vec3(loop_nors));
        self.tessface_clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{MeshCounts, MeshSnapshot};
    use meshpipe_attributes::{Domain, MeshEdge};

    fn quad() -> MeshSnapshot {
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
    fn test_quad_normals_point_up() {
        let mut snapshot = quad();
        snapshot.ensure_normals().unwrap();
        let vnors = snapshot
            .store(Domain::Vertex)
            .layer_values(AttributeType::Normal, None)
            .unwrap()
            .as_vec3()
            .unwrap();
        for normal in vnors {
            assert!((normal.z - 1.0).abs() < 1e-9, "normal {normal:?}");
        }
        let pnors = snapshot
            .store(Domain::Polygon)
            .layer_values(AttributeType::Normal, None)
            .unwrap()
            .as_vec3()
            .unwrap();
        assert!((pnors[0].z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ensure_normals_idempotent() {
        let mut snapshot = quad();
        snapshot.ensure_normals().unwrap();
        assert!(!snapshot.dirty().contains(DirtyFlags::NORMALS));
        let first = snapshot
            .store(Domain::Vertex)
            .layer_values(AttributeType::Normal, None)
            .unwrap()
            .as_vec3()
            .unwrap()
            .to_vec();

        // Second call without mutation: bit-identical, flag untouched.
        snapshot.ensure_normals().unwrap();
        let second = snapshot
            .store(Domain::Vertex)
            .layer_values(AttributeType::Normal, None)
            .unwrap()
            .as_vec3()
            .unwrap();
        assert_eq!(first.as_slice(), second);
        assert!(!snapshot.dirty().contains(DirtyFlags::NORMALS));
    }

    #[test]
    fn test_normals_refresh_after_deform() {
        let mut snapshot = quad();
        snapshot.ensure_normals().unwrap();

        // Tilt the quad so normals must change.
        let moved = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 1.0),
            DVec3::new(1.0, 1.0, 1.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        snapshot.apply_vert_coords(&moved).unwrap();
        assert!(snapshot.normals_dirty());
        snapshot.ensure_normals().unwrap();
        let pnors = snapshot
            .store(Domain::Polygon)
            .layer_values(AttributeType::Normal, None)
            .unwrap()
            .as_vec3()
            .unwrap();
        assert!(pnors[0].z < 1.0);
        assert!(pnors[0].x < 0.0);
    }

    #[test]
    fn test_split_normals_smooth_quad() {
        let mut snapshot = quad();
        snapshot.calc_normals_split().unwrap();
        let lnors = snapshot
            .store(Domain::Loop)
            .layer_values(AttributeType::Normal, None)
            .unwrap()
            .as_vec3()
            .unwrap();
        assert_eq!(lnors.len(), 4);
        for normal in lnors {
            assert!((normal.z - 1.0).abs() < 1e-9);
        }
        // Loop normals invalidate the legacy face store.
        assert!(snapshot.dirty().contains(DirtyFlags::TESS));
    }

    #[test]
    fn test_split_normals_sharp_fold() {
        // Two quads folded 90 degrees along the shared edge.
        let positions = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(1.0, 0.0, 1.0),
            DVec3::new(1.0, 1.0, 1.0),
        ];
        let edges = vec![
            MeshEdge { verts: [0, 1] },
            MeshEdge { verts: [1, 2] },
            MeshEdge { verts: [2, 3] },
            MeshEdge { verts: [3, 0] },
            MeshEdge { verts: [1, 4] },
            MeshEdge { verts: [4, 5] },
            MeshEdge { verts: [5, 2] },
        ];
        let loops = vec![
            MeshLoop { vert: 0, edge: 0 },
            MeshLoop { vert: 1, edge: 1 },
            MeshLoop { vert: 2, edge: 2 },
            MeshLoop { vert: 3, edge: 3 },
            MeshLoop { vert: 1, edge: 4 },
            MeshLoop { vert: 4, edge: 5 },
            MeshLoop { vert: 5, edge: 6 },
            MeshLoop { vert: 2, edge: 1 },
        ];
        let polys = vec![
            MeshPoly {
                loop_start: 0,
                loop_count: 4,
            },
            MeshPoly {
                loop_start: 4,
                loop_count: 4,
            },
        ];
        let mut snapshot = MeshSnapshot::from_parts(positions, edges, loops, polys).unwrap();
        snapshot.set_auto_smooth(Some(config::constants::DEFAULT_AUTO_SMOOTH_ANGLE));
        snapshot.calc_normals_split().unwrap();

        let lnors = snapshot
            .store(Domain::Loop)
            .layer_values(AttributeType::Normal, None)
            .unwrap()
            .as_vec3()
            .unwrap();
        // The fold is sharper than 30 degrees: each face keeps its own
        // flat normal along the shared edge.
        assert!((lnors[1].z - 1.0).abs() < 1e-9);
        assert!((lnors[4].x - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_mesh_normals() {
        let mut snapshot = MeshSnapshot::from_template(MeshCounts::default());
        snapshot.ensure_normals().unwrap();
        assert!(!snapshot.dirty().contains(DirtyFlags::NORMALS));
    }
}
