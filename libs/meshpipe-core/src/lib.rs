//! # Meshpipe Core
//!
//! Mesh snapshots and their derived data caches.
//!
//! A [`MeshSnapshot`] bundles element counts, five per-domain attribute
//! stores, dirty flags, and snapshot-scoped runtime caches (triangulation
//! and bounding box, each behind its own reader/writer lock). Snapshots
//! are produced by evaluation stages and treated as immutable by
//! consumers; the evaluator mutates them only through the deform and
//! layer-management entry points.
//!
//! ## Derived data
//!
//! - Triangulation: [`MeshSnapshot::looptris`], double-checked lock,
//!   at most one concurrent rebuild per snapshot.
//! - Normals: [`MeshSnapshot::ensure_normals`] (vertex + polygon) and
//!   [`MeshSnapshot::calc_normals_split`] (per-loop split normals).
//! - Tangents: [`compute_tangents`], one layer per UV channel; requires
//!   fresh normals.
//! - Legacy tessellated faces: [`MeshSnapshot::tessface_ensure`].

pub mod error;
pub mod normals;
pub mod origspace;
pub mod snapshot;
pub mod tangents;
pub mod tessface;
pub mod triangulate;

pub use error::DerivedError;
pub use snapshot::{DirtyFlags, MeshCounts, MeshSnapshot};
pub use tangents::compute_tangents;
pub use triangulate::{poly_to_tri_count, LoopTri};
