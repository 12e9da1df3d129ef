//! # Derived Data Errors
//!
//! Error types for snapshot and derived-cache operations.

use meshpipe_attributes::{AttributeError, AttributeType};
use thiserror::Error;

/// Errors that can occur while building snapshots or derived data.
#[derive(Debug, Error)]
pub enum DerivedError {
    /// Tangents were requested while normals are dirty.
    ///
    /// This is a contract violation: callers run `ensure_normals`
    /// before tangent computation. Reported as an explicit error, never
    /// auto-healed.
    #[error("Normals are dirty; call ensure_normals before computing tangents")]
    MissingNormals,

    /// A required layer is absent
    #[error("Missing layer: {ty:?} (name: {name:?})")]
    MissingLayer {
        ty: AttributeType,
        name: Option<String>,
    },

    /// Topology references are inconsistent
    #[error("Invalid topology: {message}")]
    InvalidTopology { message: String },

    /// Attribute-store failure
    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

impl DerivedError {
    /// Creates a missing-layer error.
    pub fn missing_layer(ty: AttributeType, name: Option<&str>) -> Self {
        Self::MissingLayer {
            ty,
            name: name.map(str::to_owned),
        }
    }

    /// Creates an invalid-topology error.
    pub fn invalid_topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }
}
