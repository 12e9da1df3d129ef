//! # Modifier Stack Evaluation
//!
//! The core walk over the effective modifier list:
//!
//! 1. Virtual modifiers are expanded ahead of the explicit stack.
//! 2. A backward scan computes the per-position requirement masks.
//! 3. A leading run of deform-only modifiers works on a bare position
//!    buffer, never materializing topology; the deform lane snapshots
//!    the base mesh plus the accumulated positions.
//! 4. Remaining modifiers run constructively: the working snapshot is
//!    materialized on demand, restricted to the accumulated mask (plus
//!    the always-included origin-index mapping), and replaced by each
//!    constructive result. Parallel orco lanes run the same transforms
//!    on original-coordinate geometry when a later modifier needs it.
//! 5. Finalization applies pending positions, attaches requested orco
//!    layers, resolves normals (split normals under auto-smooth), and
//!    rebuilds the legacy tessellated faces when asked.
//!
//! Per-modifier problems never abort the run; they are reported through
//! the [`ErrorReporter`] collaborator and the modifier is skipped, so
//! the pipeline always yields a usable mesh.

use crate::error::{EvalError, ModifierIssue};
use crate::masks::{calc_data_masks, DataRequirement};
use crate::modifier::{ErrorReporter, EvalMode, ModifierContext, ModifierKind};
use crate::object::MeshObject;
use crate::orco::{add_orco_layer, create_orco_snapshot};
use glam::DVec3;
use meshpipe_attributes::{AttrValues, AttributeType, Domain, MeshMask};
use meshpipe_core::MeshSnapshot;

/// Knobs for one evaluation run.
#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    /// Active evaluation mode.
    pub mode: EvalMode,
    /// Whether deform-only modifiers run at all (off for consumers
    /// that supply their own deformed coordinates).
    pub apply_deform: bool,
    /// Excludes time-dependent modifiers (lanes evaluated outside the
    /// animated frame).
    pub skip_time_dependent: bool,
    /// Stop after the modifier at this index of the effective list
    /// (cage/preview evaluation).
    pub stop_at: Option<usize>,
    /// Whether modifiers may reuse their internal caches.
    pub use_cache: bool,
    /// Copies the object's shape-key channels onto materialized
    /// snapshots.
    pub build_shapekey_layers: bool,
    /// Whether to produce the deform-only output lane.
    pub want_deform_lane: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            mode: EvalMode::Realtime,
            apply_deform: true,
            skip_time_dependent: false,
            stop_at: None,
            use_cache: true,
            build_shapekey_layers: false,
            want_deform_lane: false,
        }
    }
}

/// The output lanes of one evaluation run.
#[derive(Debug)]
pub struct EvalResult {
    /// The fully evaluated mesh.
    pub final_mesh: MeshSnapshot,
    /// Base topology with only the leading deforms applied, when
    /// requested.
    pub deform: Option<MeshSnapshot>,
}

/// Seeds identity origin-index layers on the mapped domains.
///
/// Constructive modifiers copy these through, so derived elements keep
/// a path back to the base mesh.
pub(crate) fn seed_origin_indices(mesh: &mut MeshSnapshot) -> Result<(), EvalError> {
    for domain in [Domain::Vertex, Domain::Edge, Domain::Polygon] {
        let store = mesh.store_mut(domain);
        if store.has_layer(AttributeType::OriginIndex, None) {
            continue;
        }
        let count = store.element_count();
        let identity: Vec<i32> = (0..count as i32).collect();
        store.add_layer(AttributeType::OriginIndex, None, Some(AttrValues::Int(identity)))?;
    }
    Ok(())
}

fn insert_mapping_bits(mask: &mut MeshMask) {
    mask.vmask.insert(AttributeType::OriginIndex);
    mask.emask.insert(AttributeType::OriginIndex);
    mask.pmask.insert(AttributeType::OriginIndex);
}

/// Runs the modifier stack for `object` under `request`.
///
/// `input_positions` optionally seeds the deform buffer (edit-cage
/// coordinates supplied by the caller).
pub fn calc_modifiers(
    object: &MeshObject,
    request: &DataRequirement,
    input_positions: Option<&[DVec3]>,
    opts: &EvalOptions,
    reporter: &dyn ErrorReporter,
) -> Result<EvalResult, EvalError> {
    reporter.clear();

    let all_modifiers = object.effective_modifiers();
    let limit = match opts.stop_at {
        Some(index) => (index + 1).min(all_modifiers.len()),
        None => all_modifiers.len(),
    };
    let modifiers = &all_modifiers[..limit];

    let need_mapping = request.need_mapping;
    let mut request_mask = request.mask;
    if need_mapping {
        insert_mapping_bits(&mut request_mask);
    }
    let datamasks = calc_data_masks(modifiers, &request_mask, opts.mode);

    let main_ctx = ModifierContext {
        mode: opts.mode,
        use_cache: opts.use_cache,
        orco_pass: false,
        object_transform: object.transform,
        reporter,
    };

    let mut deformed_verts: Option<Vec<DVec3>> = input_positions.map(<[DVec3]>::to_vec);
    let mut deform_lane: Option<MeshSnapshot> = None;
    let mut start = 0;

    // ------------------------------------------------------------------
    // Leading deform phase: positions only, no topology materialized.
    // ------------------------------------------------------------------
    if opts.apply_deform {
        while start < modifiers.len() {
            let md = modifiers[start];
            if !md.is_enabled(opts.mode) {
                reporter.report(md.name(), ModifierIssue::UnsupportedMode.message());
                start += 1;
                continue;
            }
            if opts.skip_time_dependent && md.depends_on_time() {
                start += 1;
                continue;
            }
            if md.kind() != ModifierKind::OnlyDeform {
                break;
            }
            if deformed_verts.is_none() {
                deformed_verts = Some(object.base.vertex_positions()?);
            }
            log::debug!("deform: {}", md.name());
            md.deform(
                &main_ctx,
                None,
                deformed_verts.as_mut().expect("seeded above"),
            );
            start += 1;
        }

        // The leading-deform result is kept for consumers that want the
        // base topology with deformed coordinates (weight paint etc.).
        if opts.want_deform_lane {
            let mut lane = object.base.copy_for_eval();
            if opts.build_shapekey_layers {
                object.add_shapekey_layers(&mut lane)?;
            }
            if let Some(coords) = &deformed_verts {
                lane.apply_vert_coords(coords)?;
            }
            deform_lane = Some(lane);
        }
    } else if deformed_verts.is_none() {
        deformed_verts = Some(object.base.vertex_positions()?);
    }

    // ------------------------------------------------------------------
    // Constructive phase.
    // ------------------------------------------------------------------
    let mut mesh: Option<MeshSnapshot> = None;
    let mut orco_mesh: Option<MeshSnapshot> = None;
    let mut cloth_orco_mesh: Option<MeshSnapshot> = None;
    let mut is_prev_deform = false;

    for i in start..modifiers.len() {
        let md = modifiers[i];

        if !md.is_enabled(opts.mode) {
            reporter.report(md.name(), ModifierIssue::UnsupportedMode.message());
            continue;
        }
        if md.kind() == ModifierKind::OnlyDeform && !opts.apply_deform {
            continue;
        }
        if md.requires_original_data() && mesh.is_some() {
            reporter.report(md.name(), ModifierIssue::BadStackPosition.message());
            log::warn!(
                "skipping '{}': {}",
                md.name(),
                ModifierIssue::BadStackPosition.message()
            );
            continue;
        }
        if need_mapping && !md.supports_mapping() {
            log::debug!("skipping '{}': mapping required but unsupported", md.name());
            continue;
        }
        if opts.skip_time_dependent && md.depends_on_time() {
            continue;
        }

        let required = md.required_data_mask();
        // This modifier reads original coordinates from the working
        // snapshot; attach the layer before it runs.
        if required.vmask.contains(AttributeType::Orco) {
            if let Some(me) = mesh.as_mut() {
                add_orco_layer(me, object, orco_mesh.as_ref(), AttributeType::Orco)?;
            }
        }

        if md.kind() == ModifierKind::OnlyDeform {
            if deformed_verts.is_none() {
                deformed_verts = Some(match &mesh {
                    Some(me) => me.vertex_positions()?,
                    None => object.base.vertex_positions()?,
                });
            }
            // A deform following a deform: push positions into the
            // snapshot and refresh normals before a normal-dependent
            // modifier reads stale ones.
            if is_prev_deform && md.depends_on_normals() {
                if let Some(me) = mesh.as_mut() {
                    me.apply_vert_coords(deformed_verts.as_ref().expect("seeded above"))?;
                    me.ensure_normals()?;
                }
            }
            log::debug!("deform: {}", md.name());
            md.deform(
                &main_ctx,
                mesh.as_ref(),
                deformed_verts.as_mut().expect("seeded above"),
            );
        } else {
            let nextmask = if i + 1 < modifiers.len() {
                datamasks[i + 1]
            } else {
                request_mask
            };

            // Materialize the working snapshot, folding in any pending
            // deform positions.
            match mesh.as_mut() {
                Some(me) => {
                    if let Some(coords) = deformed_verts.take() {
                        me.apply_vert_coords(&coords)?;
                    }
                }
                None => {
                    let mut me = object.base.copy_for_eval();
                    if opts.build_shapekey_layers {
                        object.add_shapekey_layers(&mut me)?;
                    }
                    if let Some(coords) = deformed_verts.take() {
                        me.apply_vert_coords(&coords)?;
                    }
                    seed_origin_indices(&mut me)?;
                    mesh = Some(me);
                }
            }
            let me = mesh.as_mut().expect("materialized above");

            // Restrict what the modifier's input copy carries: the
            // accumulated requirement plus the origin-index mapping.
            let mut copy_mask = datamasks[i].union(MeshMask::BAREMESH_ORIGINDEX);
            if need_mapping {
                insert_mapping_bits(&mut copy_mask);
            }
            me.restrict_copy(&copy_mask);

            if copy_mask.vmask.contains(AttributeType::ClothOrco) {
                add_orco_layer(me, object, cloth_orco_mesh.as_ref(), AttributeType::ClothOrco)?;
            }
            if datamasks[i].lmask.contains(AttributeType::OrigSpace) {
                me.init_origspace()?;
            }

            log::debug!("apply: {}", md.name());
            match md.apply(&main_ctx, me) {
                Some(mut next) => {
                    next.set_deformed_only(false);
                    next.set_auto_smooth(object.base.auto_smooth());
                    mesh = Some(next);
                }
                None => {
                    // Failure is a no-op; the previous snapshot stays.
                    log::debug!("'{}' returned no mesh; keeping previous", md.name());
                }
            }

            // Parallel orco lane: same transform on orco-seeded data.
            if nextmask.vmask.contains(AttributeType::Orco) {
                if orco_mesh.is_none() {
                    orco_mesh = Some(create_orco_snapshot(object, AttributeType::Orco)?);
                }
                let lane = orco_mesh.as_mut().expect("created above");
                let mut lane_mask = MeshMask::BAREMESH_ORIGINDEX
                    .union(required)
                    .union(nextmask);
                lane_mask.vmask.remove(AttributeType::Orco);
                lane.restrict_copy(&lane_mask);

                let orco_ctx = ModifierContext {
                    mode: opts.mode,
                    use_cache: false,
                    orco_pass: true,
                    object_transform: object.transform,
                    reporter,
                };
                if let Some(mut next) = md.apply(&orco_ctx, lane) {
                    next.set_deformed_only(false);
                    *lane = next;
                }
            }

            // Cloth rest-shape lane.
            if nextmask.vmask.contains(AttributeType::ClothOrco) {
                if cloth_orco_mesh.is_none() {
                    cloth_orco_mesh =
                        Some(create_orco_snapshot(object, AttributeType::ClothOrco)?);
                }
                let lane = cloth_orco_mesh.as_mut().expect("created above");
                let mut lane_mask = MeshMask::BAREMESH_ORIGINDEX.union(nextmask);
                lane_mask.vmask.remove(AttributeType::ClothOrco);
                lane.restrict_copy(&lane_mask);

                let orco_ctx = ModifierContext {
                    mode: opts.mode,
                    use_cache: false,
                    orco_pass: true,
                    object_transform: object.transform,
                    reporter,
                };
                if let Some(mut next) = md.apply(&orco_ctx, lane) {
                    next.set_deformed_only(false);
                    *lane = next;
                }
            }
        }

        is_prev_deform = md.kind() == ModifierKind::OnlyDeform;
    }

    // ------------------------------------------------------------------
    // Finalize.
    // ------------------------------------------------------------------
    let mut final_mesh = match mesh {
        Some(mut me) => {
            if let Some(coords) = deformed_verts.take() {
                me.apply_vert_coords(&coords)?;
            }
            me
        }
        None => {
            let mut me = object.base.copy_for_eval();
            if opts.build_shapekey_layers {
                object.add_shapekey_layers(&mut me)?;
            }
            if let Some(coords) = deformed_verts.take() {
                me.apply_vert_coords(&coords)?;
            }
            me
        }
    };

    if request_mask.vmask.contains(AttributeType::Orco) {
        add_orco_layer(&mut final_mesh, object, orco_mesh.as_ref(), AttributeType::Orco)?;
        if let Some(lane) = deform_lane.as_mut() {
            add_orco_layer(lane, object, None, AttributeType::Orco)?;
        }
    }

    let do_loop_normals =
        final_mesh.auto_smooth().is_some() || request_mask.lmask.contains(AttributeType::Normal);
    if do_loop_normals {
        // Split normals invalidate the legacy faces; they are rebuilt
        // lazily against the new loop normals below if requested.
        final_mesh.calc_normals_split()?;
    }
    if request_mask.fmask.contains(AttributeType::FaceTri) {
        final_mesh.tessface_ensure()?;
    }
    if !do_loop_normals {
        final_mesh.ensure_normals_for_display()?;
        // Loop normals left behind by modifiers as temporary data would
        // shadow the display normals; drop them.
        final_mesh
            .store_mut(Domain::Loop)
            .remove_layer(AttributeType::Normal, None);
    }
    final_mesh.bounds()?;

    Ok(EvalResult {
        final_mesh,
        deform: deform_lane,
    })
}
