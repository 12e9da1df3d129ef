//! # Tangent Computation
//!
//! Per-loop tangents derived from a UV channel, one `Tangent` layer per
//! requested channel name. Pure function over snapshot data.
//!
//! Precondition: normals must be fresh. Callers run
//! [`MeshSnapshot::ensure_normals`] first; a dirty snapshot yields
//! [`DerivedError::MissingNormals`].

use crate::error::DerivedError;
use crate::snapshot::MeshSnapshot;
use config::constants::EPSILON;
use glam::{DVec2, DVec3, DVec4};
use meshpipe_attributes::{AttrValues, AttributeType, Domain};

/// Computes one tangent layer per requested UV channel.
///
/// Tangents accumulate per vertex over the triangulation, then each
/// loop's tangent is orthogonalized against that loop's normal (the
/// split normal when present, the vertex normal otherwise). The `w`
/// component carries the bitangent handedness (-1 or 1).
pub fn compute_tangents(
    snapshot: &MeshSnapshot,
    uv_names: &[&str],
) -> Result<Vec<(String, Vec<DVec4>)>, DerivedError> {
    if snapshot.normals_dirty() {
        return Err(DerivedError::MissingNormals);
    }

    let positions = snapshot.positions()?;
    let loops = snapshot.loops()?;
    let tris = snapshot.looptris()?;

    let vert_nors = snapshot
        .store(Domain::Vertex)
        .layer_values(AttributeType::Normal, None)
        .and_then(AttrValues::as_vec3)
        .ok_or_else(|| DerivedError::missing_layer(AttributeType::Normal, None))?;
    let loop_nors = snapshot
        .store(Domain::Loop)
        .layer_values(AttributeType::Normal, None)
        .and_then(AttrValues::as_vec3);

    let mut result = Vec::with_capacity(uv_names.len());
    for &name in uv_names {
        let uvs = snapshot
            .store(Domain::Loop)
            .layer_values(AttributeType::Uv, Some(name))
            .and_then(AttrValues::as_vec2)
            .ok_or_else(|| DerivedError::missing_layer(AttributeType::Uv, Some(name)))?;

        let mut tan_acc = vec![DVec3::ZERO; positions.len()];
        let mut bitan_acc = vec![DVec3::ZERO; positions.len()];

        for tri in tris.iter() {
            let l = tri.loops.map(|i| i as usize);
            let v = [
                loops[l[0]].vert as usize,
                loops[l[1]].vert as usize,
                loops[l[2]].vert as usize,
            ];
            let (p0, p1, p2) = (positions[v[0]], positions[v[1]], positions[v[2]]);
            let (uv0, uv1, uv2) = (uvs[l[0]], uvs[l[1]], uvs[l[2]]);

            let e1 = p1 - p0;
            let e2 = p2 - p0;
            let d1: DVec2 = uv1 - uv0;
            let d2: DVec2 = uv2 - uv0;

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (e1 * d2.y - e2 * d1.y) * r;
            let bitangent = (e2 * d1.x - e1 * d2.x) * r;
            for vert in v {
                tan_acc[vert] += tangent;
                bitan_acc[vert] += bitangent;
            }
        }

        let mut layer = vec![DVec4::ZERO; loops.len()];
        for (loop_index, mesh_loop) in loops.iter().enumerate() {
            let vert = mesh_loop.vert as usize;
            let normal = match loop_nors {
                Some(lnors) => lnors[loop_index],
                None => vert_nors[vert],
            };
            let raw = tan_acc[vert];
            let tangent = (raw - normal * normal.dot(raw))
                .try_normalize()
                .unwrap_or_else(|| normal.any_orthonormal_vector());
            let handedness = if normal.cross(tangent).dot(bitan_acc[vert]) < 0.0 {
                -1.0
            } else {
                1.0
            };
            layer[loop_index] = DVec4::new(tangent.x, tangent.y, tangent.z, handedness);
        }
        result.push((name.to_owned(), layer));
    }
    Ok(result)
}

impl MeshSnapshot {
    /// Computes and attaches `Tangent` loop layers for the given UV
    /// channels.
    pub fn ensure_tangents(&mut self, uv_names: &[&str]) -> Result<(), DerivedError> {
        let computed = compute_tangents(self, uv_names)?;
        for (name, values) in computed {
            self.store_mut(Domain::Loop)
                .ensure_layer(AttributeType::Tangent, Some(&name))?
                .set_values(AttrValues::Vec4(values));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshpipe_attributes::{MeshEdge, MeshLoop, MeshPoly};

    fn quad_with_uvs() -> MeshSnapshot {
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
        snapshot
            .store_mut(Domain::Loop)
            .add_layer(
                AttributeType::Uv,
                Some("base"),
                Some(AttrValues::Vec2(vec![
                    DVec2::new(0.0, 0.0),
                    DVec2::new(1.0, 0.0),
                    DVec2::new(1.0, 1.0),
                    DVec2::new(0.0, 1.0),
                ])),
            )
            .unwrap();
        snapshot
    }

    #[test]
    fn test_tangents_require_fresh_normals() {
        let snapshot = quad_with_uvs();
        let err = compute_tangents(&snapshot, &["base"]);
        assert!(matches!(err, Err(DerivedError::MissingNormals)));
    }

    #[test]
    fn test_tangents_follow_u_axis() {
        let mut snapshot = quad_with_uvs();
        snapshot.ensure_normals().unwrap();
        let result = compute_tangents(&snapshot, &["base"]).unwrap();
        assert_eq!(result.len(), 1);
        let (name, tangents) = &result[0];
        assert_eq!(name, "base");
        assert_eq!(tangents.len(), 4);
        for tangent in tangents {
            // U increases along +X for this parameterization.
            assert!((tangent.x - 1.0).abs() < 1e-9, "tangent {tangent:?}");
            assert!((tangent.w - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_missing_uv_channel() {
        let mut snapshot = quad_with_uvs();
        snapshot.ensure_normals().unwrap();
        let err = compute_tangents(&snapshot, &["missing"]);
        assert!(matches!(err, Err(DerivedError::MissingLayer { .. })));
    }

    #[test]
    fn test_ensure_tangents_attaches_layer() {
        let mut snapshot = quad_with_uvs();
        snapshot.ensure_normals().unwrap();
        snapshot.ensure_tangents(&["base"]).unwrap();
        assert!(snapshot
            .store(Domain::Loop)
            .has_layer(AttributeType::Tangent, Some("base")));
    }
}
