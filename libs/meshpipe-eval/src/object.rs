//! # Evaluation Object
//!
//! The per-object evaluation input: base snapshot, explicit modifier
//! stack, and virtual modifiers synthesized from object-level bindings
//! (an armature reference attached directly to the object, not via a
//! stack entry). Virtual modifiers are ordinary entries prepended to
//! the effective list; the walk never special-cases them.

use crate::error::EvalError;
use crate::modifier::Modifier;
use glam::{DMat4, DVec3};
use meshpipe_attributes::{AttrValues, AttributeType, Domain};
use meshpipe_core::MeshSnapshot;

/// One shape-key channel of the base mesh.
#[derive(Debug, Clone)]
pub struct ShapeKeyBlock {
    /// Channel name (stable across renames of the layer).
    pub name: String,
    /// Absolute vertex coordinates of the key.
    pub positions: Vec<DVec3>,
}

/// A mesh object under evaluation.
pub struct MeshObject {
    /// The base mesh definition.
    pub base: MeshSnapshot,
    /// The explicit, ordered modifier stack.
    pub modifiers: Vec<Box<dyn Modifier>>,
    /// Implicit modifiers expanded ahead of the explicit stack.
    pub virtual_modifiers: Vec<Box<dyn Modifier>>,
    /// Object world transform, forwarded to modifier contexts.
    pub transform: DMat4,
    /// Shape-key channels attached to the base mesh.
    pub shape_keys: Vec<ShapeKeyBlock>,
}

impl MeshObject {
    /// Creates an object with an empty stack.
    pub fn new(base: MeshSnapshot) -> Self {
        Self {
            base,
            modifiers: Vec::new(),
            virtual_modifiers: Vec::new(),
            transform: DMat4::IDENTITY,
            shape_keys: Vec::new(),
        }
    }

    /// The effective modifier list: virtual modifiers first, then the
    /// explicit stack.
    pub fn effective_modifiers(&self) -> Vec<&dyn Modifier> {
        self.virtual_modifiers
            .iter()
            .chain(self.modifiers.iter())
            .map(|boxed| &**boxed)
            .collect()
    }

    /// Copies the shape-key channels onto `snapshot` as `ShapeKey`
    /// vertex layers.
    ///
    /// Blocks whose vertex count no longer matches are skipped with a
    /// warning; a stale key must not corrupt evaluation.
    pub fn add_shapekey_layers(&self, snapshot: &mut MeshSnapshot) -> Result<(), EvalError> {
        let verts = snapshot.counts().verts;
        for block in &self.shape_keys {
            if block.positions.len() != verts {
                log::warn!(
                    "shape key '{}' has {} verts, mesh has {}; skipping",
                    block.name,
                    block.positions.len(),
                    verts
                );
                continue;
            }
            snapshot
                .store_mut(Domain::Vertex)
                .ensure_layer(AttributeType::ShapeKey, Some(&block.name))?
                .set_values(AttrValues::Vec3(block.positions.clone()));
        }
        Ok(())
    }
}
