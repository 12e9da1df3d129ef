//! # Element Domains
//!
//! The element kinds attributes can attach to.

use serde::{Deserialize, Serialize};

/// A mesh element domain.
///
/// Each domain carries its own [`AttributeStore`](crate::AttributeStore)
/// with an independent element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Vertices (positions, normals, origin coordinates).
    Vertex,
    /// Edges (vertex pairs).
    Edge,
    /// Tessellated triangle faces (legacy representation, derived).
    Face,
    /// Face corners; one loop per polygon corner (UVs, colors, split normals).
    Loop,
    /// Polygons (loop ranges, polygon normals).
    Polygon,
}

impl Domain {
    /// All domains in canonical order.
    pub const ALL: [Domain; 5] = [
        Domain::Vertex,
        Domain::Edge,
        Domain::Face,
        Domain::Loop,
        Domain::Polygon,
    ];
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Domain::Vertex => "vertex",
            Domain::Edge => "edge",
            Domain::Face => "face",
            Domain::Loop => "loop",
            Domain::Polygon => "polygon",
        };
        f.write_str(name)
    }
}
