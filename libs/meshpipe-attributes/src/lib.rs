//! # Meshpipe Attributes
//!
//! Per-element attribute storage for the mesh evaluation pipeline.
//! Every mesh domain (vertices, edges, tessellated faces, loops, polygons)
//! carries one [`AttributeStore`]: a dynamic schema of named, typed data
//! channels ("layers").
//!
//! ## Architecture
//!
//! ```text
//! AttributeStore ── Layer ── Arc<AttrValues> (typed, homogeneous buffer)
//! ```
//!
//! ## Ownership model
//!
//! Layer buffers are shared-ownership handles. Copying a store with
//! [`CopyMode::Reference`] shares the buffer across stores; the first
//! mutable access through [`Layer::values_mut`] clones a shared buffer
//! before writing, so a reader holding the old buffer never observes the
//! mutation.

pub mod domain;
pub mod error;
pub mod layer;
pub mod mask;
pub mod store;
pub mod types;

pub use domain::Domain;
pub use error::AttributeError;
pub use layer::{Layer, LayerMode};
pub use mask::{AttrMask, MeshMask};
pub use store::{AttributeStore, CopyMode};
pub use types::{
    AttrKind, AttrValues, AttributeType, MeshEdge, MeshLoop, MeshPoly, MeshTri, INVALID_INDEX,
};
