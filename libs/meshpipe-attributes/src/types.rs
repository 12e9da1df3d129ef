//! # Attribute Types and Values
//!
//! The sealed set of attribute channel types and their typed value
//! buffers. Every type has a fixed value kind; buffers are homogeneous
//! vectors, never type-erased byte blobs.

use config::constants::{MAX_NAMED_LAYERS, MAX_UV_CHANNELS, ORIGINDEX_NONE};
use glam::{DVec2, DVec3, DVec4};
use serde::{Deserialize, Serialize};

/// Invalid index sentinel for topology references.
///
/// Used to indicate "no connection" (e.g. a loop with no resolved edge).
pub const INVALID_INDEX: u32 = u32::MAX;

// =============================================================================
// TOPOLOGY ELEMENTS
// =============================================================================

/// An edge as a pair of vertex indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeshEdge {
    /// The two vertex indices joined by this edge.
    pub verts: [u32; 2],
}

/// A face corner: one vertex reference plus the edge leaving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshLoop {
    /// Vertex this corner sits on.
    pub vert: u32,
    /// Edge from this corner to the next corner of the polygon.
    pub edge: u32,
}

impl Default for MeshLoop {
    fn default() -> Self {
        Self {
            vert: 0,
            edge: INVALID_INDEX,
        }
    }
}

/// A polygon as a contiguous loop range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeshPoly {
    /// First loop of the polygon.
    pub loop_start: u32,
    /// Number of corners (>= 3 for a valid polygon).
    pub loop_count: u32,
}

/// A legacy tessellated triangle face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeshTri {
    /// The three vertex indices.
    pub verts: [u32; 3],
    /// Index of the polygon this triangle was tessellated from.
    pub poly: u32,
}

// =============================================================================
// ATTRIBUTE TYPES
// =============================================================================

/// The value kind backing an attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrKind {
    /// `DVec2` per element.
    Vec2,
    /// `DVec3` per element.
    Vec3,
    /// `DVec4` per element.
    Vec4,
    /// `f64` per element.
    Float,
    /// `i32` per element.
    Int,
    /// RGBA `[f32; 4]` per element.
    Color,
    /// [`MeshEdge`] per element.
    Edge,
    /// [`MeshLoop`] per element.
    Loop,
    /// [`MeshPoly`] per element.
    Poly,
    /// [`MeshTri`] per element.
    Tri,
}

impl AttrKind {
    /// Whether weighted interpolation is defined for this kind.
    ///
    /// Topology and index kinds are never interpolated; interpolation
    /// requests silently skip them.
    pub fn is_interpolatable(self) -> bool {
        matches!(
            self,
            AttrKind::Vec2 | AttrKind::Vec3 | AttrKind::Vec4 | AttrKind::Float | AttrKind::Color
        )
    }
}

/// An attribute channel type.
///
/// The set is sealed: every type maps to a fixed [`AttrKind`] and a
/// singleton/multi-instance policy. Multi-instance types are
/// disambiguated by layer name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    /// Vertex positions. Required on every snapshot.
    Position,
    /// Vertex, polygon, or loop normals (domain decides the meaning).
    Normal,
    /// Edge topology (vertex pairs).
    EdgeTopo,
    /// Loop topology (vertex + edge reference per corner).
    LoopTopo,
    /// Polygon topology (loop ranges).
    PolyTopo,
    /// Legacy tessellated triangle topology.
    FaceTri,
    /// UV coordinates, one channel per name.
    Uv,
    /// Corner colors, one channel per name.
    Color,
    /// Generic named scalar channel (weights, masks).
    GenericFloat,
    /// Mapping back to the base-mesh element, `ORIGINDEX_NONE` for new
    /// elements.
    OriginIndex,
    /// Original (undeformed) vertex coordinates.
    Orco,
    /// Cloth rest-shape vertex coordinates.
    ClothOrco,
    /// Shape-key vertex coordinates, one channel per key.
    ShapeKey,
    /// Per-loop origin-space UV.
    OrigSpace,
    /// Per-loop tangent (xyz) + handedness (w), one channel per UV name.
    Tangent,
}

impl AttributeType {
    /// All attribute types, in mask-bit order.
    pub const ALL: [AttributeType; 15] = [
        AttributeType::Position,
        AttributeType::Normal,
        AttributeType::EdgeTopo,
        AttributeType::LoopTopo,
        AttributeType::PolyTopo,
        AttributeType::FaceTri,
        AttributeType::Uv,
        AttributeType::Color,
        AttributeType::GenericFloat,
        AttributeType::OriginIndex,
        AttributeType::Orco,
        AttributeType::ClothOrco,
        AttributeType::ShapeKey,
        AttributeType::OrigSpace,
        AttributeType::Tangent,
    ];

    /// The value kind stored by this type.
    pub fn kind(self) -> AttrKind {
        match self {
            AttributeType::Position
            | AttributeType::Normal
            | AttributeType::Orco
            | AttributeType::ClothOrco
            | AttributeType::ShapeKey => AttrKind::Vec3,
            AttributeType::Uv | AttributeType::OrigSpace => AttrKind::Vec2,
            AttributeType::Tangent => AttrKind::Vec4,
            AttributeType::GenericFloat => AttrKind::Float,
            AttributeType::OriginIndex => AttrKind::Int,
            AttributeType::Color => AttrKind::Color,
            AttributeType::EdgeTopo => AttrKind::Edge,
            AttributeType::LoopTopo => AttrKind::Loop,
            AttributeType::PolyTopo => AttrKind::Poly,
            AttributeType::FaceTri => AttrKind::Tri,
        }
    }

    /// Whether several layers of this type may coexist in one store.
    pub fn is_multi_instance(self) -> bool {
        matches!(
            self,
            AttributeType::Uv
                | AttributeType::Color
                | AttributeType::GenericFloat
                | AttributeType::ShapeKey
                | AttributeType::Tangent
        )
    }

    /// Maximum number of layers of this type per store.
    pub fn max_instances(self) -> usize {
        match self {
            AttributeType::Uv | AttributeType::Tangent => MAX_UV_CHANNELS,
            AttributeType::Color | AttributeType::GenericFloat | AttributeType::ShapeKey => {
                MAX_NAMED_LAYERS
            }
            _ => 1,
        }
    }

    /// Whether weighted interpolation is defined for this type.
    pub fn is_interpolatable(self) -> bool {
        self.kind().is_interpolatable()
    }
}

// =============================================================================
// ATTRIBUTE VALUES
// =============================================================================

/// A typed per-element value buffer.
///
/// One variant per [`AttrKind`]; the stride is implied by the kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValues {
    /// `DVec2` values.
    Vec2(Vec<DVec2>),
    /// `DVec3` values.
    Vec3(Vec<DVec3>),
    /// `DVec4` values.
    Vec4(Vec<DVec4>),
    /// `f64` values.
    Float(Vec<f64>),
    /// `i32` values. Default-initialized to `ORIGINDEX_NONE`.
    Int(Vec<i32>),
    /// RGBA values.
    Color(Vec<[f32; 4]>),
    /// Edge topology.
    Edge(Vec<MeshEdge>),
    /// Loop topology.
    Loop(Vec<MeshLoop>),
    /// Polygon topology.
    Poly(Vec<MeshPoly>),
    /// Tessellated triangle topology.
    Tri(Vec<MeshTri>),
}

impl AttrValues {
    /// Creates a default-initialized buffer of `count` elements.
    pub fn with_default(kind: AttrKind, count: usize) -> Self {
        match kind {
            AttrKind::Vec2 => AttrValues::Vec2(vec![DVec2::ZERO; count]),
            AttrKind::Vec3 => AttrValues::Vec3(vec![DVec3::ZERO; count]),
            AttrKind::Vec4 => AttrValues::Vec4(vec![DVec4::ZERO; count]),
            AttrKind::Float => AttrValues::Float(vec![0.0; count]),
            AttrKind::Int => AttrValues::Int(vec![ORIGINDEX_NONE; count]),
            AttrKind::Color => AttrValues::Color(vec![[0.0; 4]; count]),
            AttrKind::Edge => AttrValues::Edge(vec![MeshEdge::default(); count]),
            AttrKind::Loop => AttrValues::Loop(vec![MeshLoop::default(); count]),
            AttrKind::Poly => AttrValues::Poly(vec![MeshPoly::default(); count]),
            AttrKind::Tri => AttrValues::Tri(vec![MeshTri::default(); count]),
        }
    }

    /// The kind of this buffer.
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValues::Vec2(_) => AttrKind::Vec2,
            AttrValues::Vec3(_) => AttrKind::Vec3,
            AttrValues::Vec4(_) => AttrKind::Vec4,
            AttrValues::Float(_) => AttrKind::Float,
            AttrValues::Int(_) => AttrKind::Int,
            AttrValues::Color(_) => AttrKind::Color,
            AttrValues::Edge(_) => AttrKind::Edge,
            AttrValues::Loop(_) => AttrKind::Loop,
            AttrValues::Poly(_) => AttrKind::Poly,
            AttrValues::Tri(_) => AttrKind::Tri,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            AttrValues::Vec2(v) => v.len(),
            AttrValues::Vec3(v) => v.len(),
            AttrValues::Vec4(v) => v.len(),
            AttrValues::Float(v) => v.len(),
            AttrValues::Int(v) => v.len(),
            AttrValues::Color(v) => v.len(),
            AttrValues::Edge(v) => v.len(),
            AttrValues::Loop(v) => v.len(),
            AttrValues::Poly(v) => v.len(),
            AttrValues::Tri(v) => v.len(),
        }
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resets a contiguous element range to default values.
    pub fn reset_range(&mut self, start: usize, count: usize) {
        let end = (start + count).min(self.len());
        match self {
            AttrValues::Vec2(v) => v[start..end].fill(DVec2::ZERO),
            AttrValues::Vec3(v) => v[start..end].fill(DVec3::ZERO),
            AttrValues::Vec4(v) => v[start..end].fill(DVec4::ZERO),
            AttrValues::Float(v) => v[start..end].fill(0.0),
            AttrValues::Int(v) => v[start..end].fill(ORIGINDEX_NONE),
            AttrValues::Color(v) => v[start..end].fill([0.0; 4]),
            AttrValues::Edge(v) => v[start..end].fill(MeshEdge::default()),
            AttrValues::Loop(v) => v[start..end].fill(MeshLoop::default()),
            AttrValues::Poly(v) => v[start..end].fill(MeshPoly::default()),
            AttrValues::Tri(v) => v[start..end].fill(MeshTri::default()),
        }
    }

    /// The `DVec2` slice, if this is a `Vec2` buffer.
    pub fn as_vec2(&self) -> Option<&[DVec2]> {
        match self {
            AttrValues::Vec2(v) => Some(v),
            _ => None,
        }
    }

    /// The mutable `DVec2` vector, if this is a `Vec2` buffer.
    pub fn as_vec2_mut(&mut self) -> Option<&mut Vec<DVec2>> {
        match self {
            AttrValues::Vec2(v) => Some(v),
            _ => None,
        }
    }

    /// The `DVec3` slice, if this is a `Vec3` buffer.
    pub fn as_vec3(&self) -> Option<&[DVec3]> {
        match self {
            AttrValues::Vec3(v) => Some(v),
            _ => None,
        }
    }

    /// The mutable `DVec3` vector, if this is a `Vec3` buffer.
    pub fn as_vec3_mut(&mut self) -> Option<&mut Vec<DVec3>> {
        match self {
            AttrValues::Vec3(v) => Some(v),
            _ => None,
        }
    }

    /// The `DVec4` slice, if this is a `Vec4` buffer.
    pub fn as_vec4(&self) -> Option<&[DVec4]> {
        match self {
            AttrValues::Vec4(v) => Some(v),
            _ => None,
        }
    }

    /// The mutable `DVec4` vector, if this is a `Vec4` buffer.
    pub fn as_vec4_mut(&mut self) -> Option<&mut Vec<DVec4>> {
        match self {
            AttrValues::Vec4(v) => Some(v),
            _ => None,
        }
    }

    /// The `f64` slice, if this is a `Float` buffer.
    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            AttrValues::Float(v) => Some(v),
            _ => None,
        }
    }

    /// The mutable `f64` vector, if this is a `Float` buffer.
    pub fn as_float_mut(&mut self) -> Option<&mut Vec<f64>> {
        match self {
            AttrValues::Float(v) => Some(v),
            _ => None,
        }
    }

    /// The `i32` slice, if this is an `Int` buffer.
    pub fn as_int(&self) -> Option<&[i32]> {
        match self {
            AttrValues::Int(v) => Some(v),
            _ => None,
        }
    }

    /// The mutable `i32` vector, if this is an `Int` buffer.
    pub fn as_int_mut(&mut self) -> Option<&mut Vec<i32>> {
        match self {
            AttrValues::Int(v) => Some(v),
            _ => None,
        }
    }

    /// The RGBA slice, if this is a `Color` buffer.
    pub fn as_color(&self) -> Option<&[[f32; 4]]> {
        match self {
            AttrValues::Color(v) => Some(v),
            _ => None,
        }
    }

    /// The mutable RGBA vector, if this is a `Color` buffer.
    pub fn as_color_mut(&mut self) -> Option<&mut Vec<[f32; 4]>> {
        match self {
            AttrValues::Color(v) => Some(v),
            _ => None,
        }
    }

    /// The edge slice, if this is an `Edge` buffer.
    pub fn as_edges(&self) -> Option<&[MeshEdge]> {
        match self {
            AttrValues::Edge(v) => Some(v),
            _ => None,
        }
    }

    /// The mutable edge vector, if this is an `Edge` buffer.
    pub fn as_edges_mut(&mut self) -> Option<&mut Vec<MeshEdge>> {
        match self {
            AttrValues::Edge(v) => Some(v),
            _ => None,
        }
    }

    /// The loop slice, if this is a `Loop` buffer.
    pub fn as_loops(&self) -> Option<&[MeshLoop]> {
        match self {
            AttrValues::Loop(v) => Some(v),
            _ => None,
        }
    }

    /// The mutable loop vector, if this is a `Loop` buffer.
    pub fn as_loops_mut(&mut self) -> Option<&mut Vec<MeshLoop>> {
        match self {
            AttrValues::Loop(v) => Some(v),
            _ => None,
        }
    }

    /// The polygon slice, if this is a `Poly` buffer.
    pub fn as_polys(&self) -> Option<&[MeshPoly]> {
        match self {
            AttrValues::Poly(v) => Some(v),
            _ => None,
        }
    }

    /// The mutable polygon vector, if this is a `Poly` buffer.
    pub fn as_polys_mut(&mut self) -> Option<&mut Vec<MeshPoly>> {
        match self {
            AttrValues::Poly(v) => Some(v),
            _ => None,
        }
    }

    /// The triangle slice, if this is a `Tri` buffer.
    pub fn as_tris(&self) -> Option<&[MeshTri]> {
        match self {
            AttrValues::Tri(v) => Some(v),
            _ => None,
        }
    }

    /// The mutable triangle vector, if this is a `Tri` buffer.
    pub fn as_tris_mut(&mut self) -> Option<&mut Vec<MeshTri>> {
        match self {
            AttrValues::Tri(v) => Some(v),
            _ => None,
        }
    }
}

/// Writes `dst[dst_index] = Σ weights[k] * src[indices[k]]`.
///
/// Returns false (and leaves `dst` untouched) if the kinds differ or the
/// kind is not interpolatable. With `normalize`, the Vec3 result is
/// renormalized (used for normal layers).
pub(crate) fn interp_element(
    dst: &mut AttrValues,
    src: &AttrValues,
    indices: &[u32],
    weights: &[f64],
    dst_index: usize,
    normalize: bool,
) -> bool {
    match (dst, src) {
        (AttrValues::Vec2(d), AttrValues::Vec2(s)) => {
            let mut acc = DVec2::ZERO;
            for (&i, &w) in indices.iter().zip(weights) {
                acc += s[i as usize] * w;
            }
            d[dst_index] = acc;
            true
        }
        (AttrValues::Vec3(d), AttrValues::Vec3(s)) => {
            let mut acc = DVec3::ZERO;
            for (&i, &w) in indices.iter().zip(weights) {
                acc += s[i as usize] * w;
            }
            if normalize {
                acc = acc.try_normalize().unwrap_or(DVec3::Z);
            }
            d[dst_index] = acc;
            true
        }
        (AttrValues::Vec4(d), AttrValues::Vec4(s)) => {
            let mut acc = DVec4::ZERO;
            for (&i, &w) in indices.iter().zip(weights) {
                acc += s[i as usize] * w;
            }
            d[dst_index] = acc;
            true
        }
        (AttrValues::Float(d), AttrValues::Float(s)) => {
            let mut acc = 0.0;
            for (&i, &w) in indices.iter().zip(weights) {
                acc += s[i as usize] * w;
            }
            d[dst_index] = acc;
            true
        }
        (AttrValues::Color(d), AttrValues::Color(s)) => {
            let mut acc = [0.0f64; 4];
            for (&i, &w) in indices.iter().zip(weights) {
                let c = s[i as usize];
                for (a, &ch) in acc.iter_mut().zip(c.iter()) {
                    *a += ch as f64 * w;
                }
            }
            d[dst_index] = [acc[0] as f32, acc[1] as f32, acc[2] as f32, acc[3] as f32];
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for ty in AttributeType::ALL {
            let values = AttrValues::with_default(ty.kind(), 4);
            assert_eq!(values.kind(), ty.kind());
            assert_eq!(values.len(), 4);
        }
    }

    #[test]
    fn test_int_defaults_to_origindex_none() {
        let values = AttrValues::with_default(AttrKind::Int, 3);
        assert_eq!(values.as_int().unwrap(), &[ORIGINDEX_NONE; 3]);
    }

    #[test]
    fn test_singleton_types_have_one_instance() {
        assert_eq!(AttributeType::Position.max_instances(), 1);
        assert_eq!(AttributeType::OriginIndex.max_instances(), 1);
        assert!(AttributeType::Uv.max_instances() > 1);
        assert!(AttributeType::ShapeKey.max_instances() > 1);
    }

    #[test]
    fn test_topology_kinds_not_interpolatable() {
        assert!(!AttributeType::EdgeTopo.is_interpolatable());
        assert!(!AttributeType::OriginIndex.is_interpolatable());
        assert!(AttributeType::Position.is_interpolatable());
        assert!(AttributeType::Uv.is_interpolatable());
    }

    #[test]
    fn test_interp_element_weighted_sum() {
        let src = AttrValues::Vec3(vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(2.0, 4.0, 6.0),
        ]);
        let mut dst = AttrValues::with_default(AttrKind::Vec3, 1);
        let ok = interp_element(&mut dst, &src, &[0, 1], &[0.5, 0.5], 0, false);
        assert!(ok);
        assert_eq!(dst.as_vec3().unwrap()[0], DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_interp_element_kind_mismatch_is_noop() {
        let src = AttrValues::with_default(AttrKind::Float, 2);
        let mut dst = AttrValues::with_default(AttrKind::Vec3, 1);
        assert!(!interp_element(&mut dst, &src, &[0], &[1.0], 0, false));
        assert_eq!(dst.as_vec3().unwrap()[0], DVec3::ZERO);
    }

    #[test]
    fn test_reset_range() {
        let mut values = AttrValues::Int(vec![7; 5]);
        values.reset_range(1, 2);
        assert_eq!(values.as_int().unwrap(), &[7, ORIGINDEX_NONE, ORIGINDEX_NONE, 7, 7]);
    }
}
