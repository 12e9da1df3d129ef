//! # Attribute Layers
//!
//! A layer is one named, typed data channel within a store. Buffers are
//! held behind shared-ownership handles; see [`Layer::values_mut`] for
//! the copy-on-write contract.

use crate::types::{AttrValues, AttributeType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_UNIQUE_ID: AtomicU64 = AtomicU64::new(1);

fn next_unique_id() -> u64 {
    NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Ownership mode of a layer's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerMode {
    /// Exclusively owned; freed with the store.
    Owned,
    /// Shared with other stores; must be copied before writing.
    Referenced,
    /// Owned evaluation scratch, eligible for element cleanup.
    Temporary,
}

/// A named, typed per-element data channel.
#[derive(Debug, Clone)]
pub struct Layer {
    ty: AttributeType,
    name: Option<String>,
    mode: LayerMode,
    unique_id: u64,
    no_copy: bool,
    values: Arc<AttrValues>,
}

impl Layer {
    pub(crate) fn new(
        ty: AttributeType,
        name: Option<String>,
        mode: LayerMode,
        values: AttrValues,
    ) -> Self {
        Self {
            ty,
            name,
            mode,
            unique_id: next_unique_id(),
            no_copy: false,
            values: Arc::new(values),
        }
    }

    /// The attribute type of this layer.
    pub fn ty(&self) -> AttributeType {
        self.ty
    }

    /// The layer name (multi-instance disambiguator).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// The current ownership mode.
    pub fn mode(&self) -> LayerMode {
        self.mode
    }

    /// Stable identifier assigned at creation; survives renames and
    /// store-to-store copies.
    pub fn unique_id(&self) -> u64 {
        self.unique_id
    }

    /// Whether bulk copies skip this layer.
    pub fn no_copy(&self) -> bool {
        self.no_copy
    }

    /// Marks or unmarks the layer as skipped by bulk copies.
    pub fn set_no_copy(&mut self, no_copy: bool) {
        self.no_copy = no_copy;
    }

    /// Whether the buffer is currently shared with another holder.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.values) > 1
    }

    /// Read access to the buffer.
    pub fn values(&self) -> &AttrValues {
        &self.values
    }

    /// Write access to the buffer.
    ///
    /// If the buffer is shared (mode `Referenced`, or a stale reference
    /// whose other holders have dropped), it is cloned first and the
    /// layer becomes `Owned`. Holders of the previous buffer are
    /// unaffected; mutation of a shared buffer is unrepresentable.
    pub fn values_mut(&mut self) -> &mut AttrValues {
        if self.mode == LayerMode::Referenced {
            self.mode = LayerMode::Owned;
        }
        Arc::make_mut(&mut self.values)
    }

    /// Replaces the whole buffer, dropping the shared handle.
    pub fn set_values(&mut self, values: AttrValues) {
        if self.mode == LayerMode::Referenced {
            self.mode = LayerMode::Owned;
        }
        self.values = Arc::new(values);
    }

    /// A referencing copy: same buffer, mode `Referenced`.
    ///
    /// The `unique_id` is preserved so channel identity (e.g. a shape
    /// key) is stable across snapshot copies.
    pub(crate) fn share(&self) -> Layer {
        Layer {
            ty: self.ty,
            name: self.name.clone(),
            mode: LayerMode::Referenced,
            unique_id: self.unique_id,
            no_copy: false,
            values: Arc::clone(&self.values),
        }
    }

    /// A deep copy with its own buffer, mode `Owned`.
    pub(crate) fn duplicate(&self) -> Layer {
        Layer {
            ty: self.ty,
            name: self.name.clone(),
            mode: LayerMode::Owned,
            unique_id: self.unique_id,
            no_copy: false,
            values: Arc::new((*self.values).clone()),
        }
    }

    /// Converts into an owned layer, consuming self (used by assigning
    /// copies: the donor store gives the buffer up).
    pub(crate) fn into_owned(mut self) -> Layer {
        self.mode = LayerMode::Owned;
        self.no_copy = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttrKind;
    use glam::DVec3;

    #[test]
    fn test_share_preserves_unique_id() {
        let layer = Layer::new(
            AttributeType::Position,
            None,
            LayerMode::Owned,
            AttrValues::with_default(AttrKind::Vec3, 2),
        );
        let shared = layer.share();
        assert_eq!(shared.unique_id(), layer.unique_id());
        assert_eq!(shared.mode(), LayerMode::Referenced);
        assert!(layer.is_shared());
    }

    #[test]
    fn test_values_mut_copies_shared_buffer() {
        let mut layer = Layer::new(
            AttributeType::Position,
            None,
            LayerMode::Owned,
            AttrValues::with_default(AttrKind::Vec3, 1),
        );
        let mut shared = layer.share();

        shared.values_mut().as_vec3_mut().unwrap()[0] = DVec3::ONE;

        // The write went to a private copy.
        assert_eq!(layer.values().as_vec3().unwrap()[0], DVec3::ZERO);
        assert_eq!(shared.values().as_vec3().unwrap()[0], DVec3::ONE);
        assert_eq!(shared.mode(), LayerMode::Owned);
        assert!(!layer.is_shared());
    }

    #[test]
    fn test_unique_ids_distinct() {
        let a = Layer::new(
            AttributeType::Uv,
            Some("a".into()),
            LayerMode::Owned,
            AttrValues::with_default(AttrKind::Vec2, 0),
        );
        let b = Layer::new(
            AttributeType::Uv,
            Some("b".into()),
            LayerMode::Owned,
            AttrValues::with_default(AttrKind::Vec2, 0),
        );
        assert_ne!(a.unique_id(), b.unique_id());
    }
}
