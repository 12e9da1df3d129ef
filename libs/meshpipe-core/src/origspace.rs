//! # Origin-Space Loop Coordinates
//!
//! Seeds the per-loop origin-space UV layer used by texture-projection
//! consumers. Quads get unit-square corners; other polygons are
//! projected onto their dominant plane and normalized to the unit
//! square.

use crate::error::DerivedError;
use crate::normals::newell_normal;
use crate::snapshot::MeshSnapshot;
use config::constants::EPSILON;
use glam::{DVec2, DVec3};
use meshpipe_attributes::{AttrValues, AttributeType, Domain};

const QUAD_CORNERS: [DVec2; 4] = [
    DVec2::new(0.0, 0.0),
    DVec2::new(1.0, 0.0),
    DVec2::new(1.0, 1.0),
    DVec2::new(0.0, 1.0),
];

/// 2D projection basis perpendicular to `normal`.
fn plane_basis(normal: DVec3) -> (DVec3, DVec3) {
    let u = normal.any_orthonormal_vector();
    let v = normal.cross(u);
    (u, v)
}

impl MeshSnapshot {
    /// Ensures the `OrigSpace` loop layer exists and seeds it.
    ///
    /// Idempotent: an already-present layer is left untouched, matching
    /// the lazy "add once when first requested" contract.
    pub fn init_origspace(&mut self) -> Result<(), DerivedError> {
        if self
            .store(Domain::Loop)
            .has_layer(AttributeType::OrigSpace, None)
        {
            return Ok(());
        }

        let values = {
            let positions = self.positions()?;
            let loops = self.loops()?;
            let polys = self.polys()?;

            let mut values = vec![DVec2::ZERO; loops.len()];
            for poly in polys {
                let start = poly.loop_start as usize;
                let count = poly.loop_count as usize;
                if count == 4 {
                    for (corner, uv) in QUAD_CORNERS.iter().enumerate() {
                        values[start + corner] = *uv;
                    }
                    continue;
                }

                // Project onto the polygon plane, normalize to [0, 1].
                let normal = newell_normal(positions, loops, poly);
                let (u_axis, v_axis) = plane_basis(normal);
                let projected: Vec<DVec2> = (0..count)
                    .map(|corner| {
                        let p = positions[loops[start + corner].vert as usize];
                        DVec2::new(p.dot(u_axis), p.dot(v_axis))
                    })
                    .collect();
                let lo = projected
                    .iter()
                    .fold(projected[0], |acc, p| acc.min(*p));
                let hi = projected
                    .iter()
                    .fold(projected[0], |acc, p| acc.max(*p));
                let span = (hi - lo).max(DVec2::splat(EPSILON));
                for (corner, p) in projected.into_iter().enumerate() {
                    values[start + corner] = (p - lo) / span;
                }
            }
            values
        };

        self.store_mut(Domain::Loop)
            .add_layer(AttributeType::OrigSpace, None, Some(AttrValues::Vec2(values)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshpipe_attributes::{MeshEdge, MeshLoop, MeshPoly};

    #[test]
    fn test_quad_gets_unit_corners() {
        let positions = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(2.0, 2.0, 0.0),
            DVec3::new(0.0, 2.0, 0.0),
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
        let mut snapshot = MeshSnapshot::from_parts(positions, edges, loops, polys).unwrap();
        snapshot.init_origspace().unwrap();

        let values = snapshot
            .store(Domain::Loop)
            .layer_values(AttributeType::OrigSpace, None)
            .unwrap()
            .as_vec2()
            .unwrap();
        assert_eq!(values, &QUAD_CORNERS);
    }

    #[test]
    fn test_triangle_normalized_to_unit_square() {
        let positions = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(4.0, 0.0, 0.0),
            DVec3::new(0.0, 4.0, 0.0),
        ];
        let edges = (0..3u32)
            .map(|i| MeshEdge {
                verts: [i, (i + 1) % 3],
            })
            .collect();
        let loops = (0..3u32).map(|i| MeshLoop { vert: i, edge: i }).collect();
        let polys = vec![MeshPoly {
            loop_start: 0,
            loop_count: 3,
        }];
        let mut snapshot = MeshSnapshot::from_parts(positions, edges, loops, polys).unwrap();
        snapshot.init_origspace().unwrap();

        let values = snapshot
            .store(Domain::Loop)
            .layer_values(AttributeType::OrigSpace, None)
            .unwrap()
            .as_vec2()
            .unwrap();
        for uv in values {
            assert!(uv.x >= -1e-9 && uv.x <= 1.0 + 1e-9);
            assert!(uv.y >= -1e-9 && uv.y <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_init_origspace_idempotent() {
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
        let mut snapshot = MeshSnapshot::from_parts(positions, edges, loops, polys).unwrap();
        snapshot.init_origspace().unwrap();
        snapshot.init_origspace().unwrap();
        assert_eq!(
            snapshot.store(Domain::Loop).instances_of(AttributeType::OrigSpace),
            1
        );
    }
}
