//! # Attribute Errors
//!
//! Error types for attribute layer operations.

use crate::types::{AttrKind, AttributeType};
use thiserror::Error;

/// Errors that can occur while manipulating attribute layers.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// A layer with the same (type, name) already exists
    #[error("Duplicate layer: {ty:?} (name: {name:?})")]
    DuplicateLayer {
        ty: AttributeType,
        name: Option<String>,
    },

    /// The provided buffer kind does not match the attribute type
    #[error("Kind mismatch for {ty:?}: expected {expected:?}, got {got:?}")]
    KindMismatch {
        ty: AttributeType,
        expected: AttrKind,
        got: AttrKind,
    },

    /// Element counts of two stores or buffers disagree
    #[error("Element count mismatch: expected {expected}, got {got}")]
    CountMismatch { expected: usize, got: usize },

    /// Instance limit for a multi-instance type reached
    #[error("Too many {ty:?} layers (max: {max})")]
    TooManyLayers { ty: AttributeType, max: usize },

    /// No layer with the given (type, name) exists
    #[error("Layer not found: {ty:?} (name: {name:?})")]
    LayerNotFound {
        ty: AttributeType,
        name: Option<String>,
    },

    /// An element index is outside the store
    #[error("Index out of range: {index} (count: {count})")]
    OutOfRange { index: usize, count: usize },
}

impl AttributeError {
    /// Creates a duplicate-layer error.
    pub fn duplicate(ty: AttributeType, name: Option<&str>) -> Self {
        Self::DuplicateLayer {
            ty,
            name: name.map(str::to_owned),
        }
    }

    /// Creates a layer-not-found error.
    pub fn not_found(ty: AttributeType, name: Option<&str>) -> Self {
        Self::LayerNotFound {
            ty,
            name: name.map(str::to_owned),
        }
    }

    /// Creates a count-mismatch error.
    pub fn count_mismatch(expected: usize, got: usize) -> Self {
        Self::CountMismatch { expected, got }
    }

    /// Creates an out-of-range error.
    pub fn out_of_range(index: usize, count: usize) -> Self {
        Self::OutOfRange { index, count }
    }
}
