//! # Attribute Store
//!
//! One store per element domain: an ordered sequence of typed layers
//! sharing a single element count. All mutating operations preserve the
//! (type, name) uniqueness invariant.
//!
//! ## Duplicate-layer policy
//!
//! The policy is fixed per operation and never varies by call site:
//! [`AttributeStore::add_layer`] rejects duplicates with
//! [`AttributeError::DuplicateLayer`]; [`AttributeStore::ensure_layer`]
//! is the idempotent path that returns the existing layer.

use crate::domain::Domain;
use crate::error::AttributeError;
use crate::layer::{Layer, LayerMode};
use crate::mask::AttrMask;
use crate::types::{self, AttrValues, AttributeType};

/// How [`AttributeStore::copy_layers`] transfers buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Deep copy; destination owns a fresh buffer.
    Duplicate,
    /// Share the buffer; destination layer is `Referenced`.
    Reference,
    /// Destination takes the buffer; the layer is removed from the
    /// donor store, so the donor cannot reuse it.
    Assign,
}

/// A per-domain dynamic schema of attribute layers.
#[derive(Debug, Clone)]
pub struct AttributeStore {
    domain: Domain,
    element_count: usize,
    layers: Vec<Layer>,
}

impl AttributeStore {
    /// Creates an empty store for `element_count` elements.
    pub fn new(domain: Domain, element_count: usize) -> Self {
        Self {
            domain,
            element_count,
            layers: Vec::new(),
        }
    }

    /// The domain this store describes.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Number of elements each layer holds.
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// The layers, in insertion order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Number of layers of one type.
    pub fn instances_of(&self, ty: AttributeType) -> usize {
        self.layers.iter().filter(|l| l.ty() == ty).count()
    }

    fn find(&self, ty: AttributeType, name: Option<&str>) -> Option<usize> {
        if ty.is_multi_instance() {
            self.layers
                .iter()
                .position(|l| l.ty() == ty && l.name() == name)
        } else {
            // Singleton types ignore the name for lookup.
            self.layers.iter().position(|l| l.ty() == ty)
        }
    }

    /// Whether a layer with this (type, name) exists.
    pub fn has_layer(&self, ty: AttributeType, name: Option<&str>) -> bool {
        self.find(ty, name).is_some()
    }

    /// The layer with this (type, name), if any.
    pub fn layer(&self, ty: AttributeType, name: Option<&str>) -> Option<&Layer> {
        self.find(ty, name).map(|i| &self.layers[i])
    }

    /// Mutable access to the layer with this (type, name), if any.
    ///
    /// Writing through the returned layer triggers copy-on-write when
    /// the buffer is shared.
    pub fn layer_mut(&mut self, ty: AttributeType, name: Option<&str>) -> Option<&mut Layer> {
        self.find(ty, name).map(|i| &mut self.layers[i])
    }

    /// Shorthand for the layer's value buffer.
    pub fn layer_values(&self, ty: AttributeType, name: Option<&str>) -> Option<&AttrValues> {
        self.layer(ty, name).map(Layer::values)
    }

    /// Adds a new `Owned` layer.
    ///
    /// With `values = None` the buffer is default-initialized. Fails if
    /// a layer with the same (type, name) exists.
    pub fn add_layer(
        &mut self,
        ty: AttributeType,
        name: Option<&str>,
        values: Option<AttrValues>,
    ) -> Result<&mut Layer, AttributeError> {
        self.add_layer_with_mode(ty, name, LayerMode::Owned, values)
    }

    /// Adds a new layer with an explicit ownership mode.
    pub fn add_layer_with_mode(
        &mut self,
        ty: AttributeType,
        name: Option<&str>,
        mode: LayerMode,
        values: Option<AttrValues>,
    ) -> Result<&mut Layer, AttributeError> {
        if self.find(ty, name).is_some() {
            return Err(AttributeError::duplicate(ty, name));
        }
        if self.instances_of(ty) >= ty.max_instances() {
            return Err(AttributeError::TooManyLayers {
                ty,
                max: ty.max_instances(),
            });
        }
        let values = match values {
            Some(v) => {
                if v.kind() != ty.kind() {
                    return Err(AttributeError::KindMismatch {
                        ty,
                        expected: ty.kind(),
                        got: v.kind(),
                    });
                }
                if v.len() != self.element_count {
                    return Err(AttributeError::count_mismatch(self.element_count, v.len()));
                }
                v
            }
            None => AttrValues::with_default(ty.kind(), self.element_count),
        };
        self.layers
            .push(Layer::new(ty, name.map(str::to_owned), mode, values));
        Ok(self.layers.last_mut().expect("layer just pushed"))
    }

    /// Returns the existing layer or adds a default-initialized one.
    ///
    /// The idempotent counterpart to [`Self::add_layer`]; only the
    /// instance limit can fail it.
    pub fn ensure_layer(
        &mut self,
        ty: AttributeType,
        name: Option<&str>,
    ) -> Result<&mut Layer, AttributeError> {
        if let Some(i) = self.find(ty, name) {
            return Ok(&mut self.layers[i]);
        }
        self.add_layer(ty, name, None)
    }

    /// Removes the layer with this (type, name).
    ///
    /// Returns true if a layer was removed. Owned buffers are freed;
    /// referenced buffers just drop one holder.
    pub fn remove_layer(&mut self, ty: AttributeType, name: Option<&str>) -> bool {
        match self.find(ty, name) {
            Some(i) => {
                self.layers.remove(i);
                true
            }
            None => false,
        }
    }

    /// Renames a layer, preserving its `unique_id`.
    pub fn rename_layer(
        &mut self,
        ty: AttributeType,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<(), AttributeError> {
        let index = self
            .find(ty, from)
            .ok_or_else(|| AttributeError::not_found(ty, from))?;
        if let Some(existing) = self.find(ty, to) {
            if existing != index {
                return Err(AttributeError::duplicate(ty, to));
            }
        }
        self.layers[index].set_name(to.map(str::to_owned));
        Ok(())
    }

    /// Flags layers outside `mask` as skipped by bulk copies.
    ///
    /// Re-running with a different mask recomputes every flag.
    pub fn restrict_copy(&mut self, mask: AttrMask) {
        for layer in &mut self.layers {
            layer.set_no_copy(!mask.contains(layer.ty()));
        }
    }

    /// Copies layers whose type is in `mask` from `src` into `dst`.
    ///
    /// Layers flagged `no_copy`, layers already present in `dst`, and
    /// layers that would exceed the destination's instance limit are
    /// skipped. Returns the number of layers transferred.
    ///
    /// With [`CopyMode::Assign`] the source layer is removed from the
    /// donor store.
    pub fn copy_layers(
        src: &mut AttributeStore,
        dst: &mut AttributeStore,
        mask: AttrMask,
        mode: CopyMode,
    ) -> Result<usize, AttributeError> {
        if src.element_count != dst.element_count {
            return Err(AttributeError::count_mismatch(
                dst.element_count,
                src.element_count,
            ));
        }
        let mut copied = 0;
        let mut i = 0;
        while i < src.layers.len() {
            let take = {
                let layer = &src.layers[i];
                mask.contains(layer.ty())
                    && !layer.no_copy()
                    && !dst.has_layer(layer.ty(), layer.name())
                    && dst.instances_of(layer.ty()) < layer.ty().max_instances()
            };
            if !take {
                i += 1;
                continue;
            }
            match mode {
                CopyMode::Duplicate => {
                    dst.layers.push(src.layers[i].duplicate());
                    i += 1;
                }
                CopyMode::Reference => {
                    dst.layers.push(src.layers[i].share());
                    i += 1;
                }
                CopyMode::Assign => {
                    let layer = src.layers.remove(i);
                    dst.layers.push(layer.into_owned());
                }
            }
            copied += 1;
        }
        Ok(copied)
    }

    /// A referencing copy of this store: every layer in `mask` (and not
    /// flagged `no_copy`) is shared into a new store.
    ///
    /// The buffers stay shared until a holder writes; see
    /// [`Layer::values_mut`].
    pub fn share_layers(&self, mask: AttrMask) -> AttributeStore {
        let mut out = AttributeStore::new(self.domain, self.element_count);
        for layer in &self.layers {
            if mask.contains(layer.ty()) && !layer.no_copy() {
                out.layers.push(layer.share());
            }
        }
        out
    }

    /// Weighted interpolation of one destination element from source
    /// elements: `dst[dst_index] = Σ weights[k] * src[src_indices[k]]`.
    ///
    /// Runs for every interpolatable source layer that has a matching
    /// (type, name) layer in `self`; other layers are silently skipped.
    /// `sub_weights`, when given, scale the per-source contributions
    /// (per-corner weighting). Normal layers are renormalized after
    /// summation.
    pub fn interpolate_from(
        &mut self,
        src: &AttributeStore,
        src_indices: &[u32],
        weights: &[f64],
        sub_weights: Option<&[f64]>,
        dst_index: usize,
    ) -> Result<(), AttributeError> {
        if src_indices.len() != weights.len() {
            return Err(AttributeError::count_mismatch(
                src_indices.len(),
                weights.len(),
            ));
        }
        if let Some(sub) = sub_weights {
            if sub.len() != weights.len() {
                return Err(AttributeError::count_mismatch(weights.len(), sub.len()));
            }
        }
        if dst_index >= self.element_count {
            return Err(AttributeError::out_of_range(dst_index, self.element_count));
        }
        for &i in src_indices {
            if i as usize >= src.element_count {
                return Err(AttributeError::out_of_range(i as usize, src.element_count));
            }
        }

        let effective: Vec<f64> = match sub_weights {
            Some(sub) => weights.iter().zip(sub).map(|(w, s)| w * s).collect(),
            None => weights.to_vec(),
        };

        for si in 0..src.layers.len() {
            let src_ty = src.layers[si].ty();
            if !src_ty.is_interpolatable() {
                continue;
            }
            if let Some(di) = self.find(src_ty, src.layers[si].name()) {
                let normalize = src_ty == AttributeType::Normal;
                types::interp_element(
                    self.layers[di].values_mut(),
                    src.layers[si].values(),
                    src_indices,
                    &effective,
                    dst_index,
                    normalize,
                );
            }
        }
        Ok(())
    }

    /// Resets the values of a contiguous element range to defaults in
    /// every layer.
    ///
    /// The bookkeeping element count is untouched; the sealed value
    /// kinds own no external resources, so releasing a range means
    /// defaulting it.
    pub fn free_elements(&mut self, index: usize, count: usize) -> Result<(), AttributeError> {
        if index + count > self.element_count {
            return Err(AttributeError::out_of_range(
                index + count,
                self.element_count,
            ));
        }
        for layer in &mut self.layers {
            layer.values_mut().reset_range(index, count);
        }
        Ok(())
    }
}
