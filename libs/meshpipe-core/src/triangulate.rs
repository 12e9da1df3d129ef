//! # Polygon Triangulation
//!
//! Fan triangulation of polygon loop ranges into loop triangles, plus
//! the count invariant helpers used by the snapshot cache.

use meshpipe_attributes::{MeshLoop, MeshPoly};
use serde::{Deserialize, Serialize};

/// One triangle of the polygon triangulation.
///
/// Indices reference the loop domain; `poly` is the source polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopTri {
    /// The three loop indices.
    pub loops: [u32; 3],
    /// Index of the polygon this triangle tessellates.
    pub poly: u32,
}

/// Number of triangles produced by triangulating `poly_count` polygons
/// with `loop_count` total corners.
///
/// Each n-gon yields `n - 2` triangles, so the total is
/// `loop_count - 2 * poly_count`; zero when there are no polygons.
pub fn poly_to_tri_count(poly_count: usize, loop_count: usize) -> usize {
    if poly_count == 0 {
        0
    } else {
        loop_count.saturating_sub(2 * poly_count)
    }
}

/// Fan-triangulates every polygon.
///
/// Convex polygons triangulate exactly; concave ones get a usable if
/// imperfect fan, which matches what the display path expects from this
/// cache.
pub fn build_looptris(loops: &[MeshLoop], polys: &[MeshPoly]) -> Vec<LoopTri> {
    let mut tris = Vec::with_capacity(poly_to_tri_count(polys.len(), loops.len()));
    for (poly_index, poly) in polys.iter().enumerate() {
        let start = poly.loop_start;
        for corner in 1..poly.loop_count.saturating_sub(1) {
            tris.push(LoopTri {
                loops: [start, start + corner, start + corner + 1],
                poly: poly_index as u32,
            });
        }
    }
    tris
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_loops() -> (Vec<MeshLoop>, Vec<MeshPoly>) {
        let loops = (0..4)
            .map(|v| MeshLoop {
                vert: v,
                edge: v,
            })
            .collect();
        let polys = vec![MeshPoly {
            loop_start: 0,
            loop_count: 4,
        }];
        (loops, polys)
    }

    #[test]
    fn test_tri_count_invariant() {
        // Sum over polygons of (loop_count - 2).
        assert_eq!(poly_to_tri_count(0, 0), 0);
        assert_eq!(poly_to_tri_count(1, 3), 1);
        assert_eq!(poly_to_tri_count(1, 4), 2);
        assert_eq!(poly_to_tri_count(2, 7), 3); // tri + quad
        assert_eq!(poly_to_tri_count(3, 12), 6);
    }

    #[test]
    fn test_build_looptris_quad() {
        let (loops, polys) = quad_loops();
        let tris = build_looptris(&loops, &polys);
        assert_eq!(tris.len(), poly_to_tri_count(polys.len(), loops.len()));
        assert_eq!(tris[0].loops, [0, 1, 2]);
        assert_eq!(tris[1].loops, [0, 2, 3]);
        assert_eq!(tris[0].poly, 0);
    }

    #[test]
    fn test_build_looptris_empty() {
        let tris = build_looptris(&[], &[]);
        assert!(tris.is_empty());
    }

    #[test]
    fn test_build_looptris_mixed() {
        let loops: Vec<MeshLoop> = (0..7)
            .map(|v| MeshLoop {
                vert: v,
                edge: v,
            })
            .collect();
        let polys = vec![
            MeshPoly {
                loop_start: 0,
                loop_count: 3,
            },
            MeshPoly {
                loop_start: 3,
                loop_count: 4,
            },
        ];
        let tris = build_looptris(&loops, &polys);
        assert_eq!(tris.len(), 3);
        assert_eq!(tris[1].loops, [3, 4, 5]);
        assert_eq!(tris[1].poly, 1);
        assert_eq!(tris[2].loops, [3, 5, 6]);
    }
}
