//! # Original-Coordinate Lanes
//!
//! Helpers for the parallel orco snapshots: geometry seeded with
//! undeformed base positions (or the cloth rest-shape key) that runs
//! through the same constructive modifiers as the main lane, so
//! texture-projection consumers get per-vertex original coordinates
//! regardless of deformation.

use crate::error::EvalError;
use crate::object::MeshObject;
use crate::stack::seed_origin_indices;
use glam::DVec3;
use meshpipe_attributes::{AttrValues, AttributeType, Domain};
use meshpipe_core::MeshSnapshot;

/// Rest-shape key name recognized for the cloth orco lane.
const CLOTH_REST_KEY: &str = "Basis";

/// The coordinate source for an orco lane.
pub(crate) fn orco_coords(
    object: &MeshObject,
    ty: AttributeType,
) -> Result<Vec<DVec3>, EvalError> {
    if ty == AttributeType::ClothOrco {
        if let Some(block) = object
            .shape_keys
            .iter()
            .find(|block| block.name == CLOTH_REST_KEY)
        {
            if block.positions.len() == object.base.counts().verts {
                return Ok(block.positions.clone());
            }
            log::warn!(
                "cloth rest key has {} verts, mesh has {}; using base positions",
                block.positions.len(),
                object.base.counts().verts
            );
        }
    }
    Ok(object.base.vertex_positions()?)
}

/// Builds the seed snapshot for an orco lane.
///
/// Starts from the base mesh, drops coordinate-derived channels (shape
/// keys and stale orco layers), installs the orco positions, and seeds
/// identity origin indices so the lane keeps its mapping through
/// constructive modifiers.
pub(crate) fn create_orco_snapshot(
    object: &MeshObject,
    ty: AttributeType,
) -> Result<MeshSnapshot, EvalError> {
    let mut orco = object.base.copy_for_eval();

    let vert_data = orco.store_mut(Domain::Vertex);
    let key_names: Vec<Option<String>> = vert_data
        .layers()
        .iter()
        .filter(|layer| layer.ty() == AttributeType::ShapeKey)
        .map(|layer| layer.name().map(str::to_owned))
        .collect();
    for name in key_names {
        vert_data.remove_layer(AttributeType::ShapeKey, name.as_deref());
    }
    vert_data.remove_layer(AttributeType::Orco, None);
    vert_data.remove_layer(AttributeType::ClothOrco, None);

    let coords = orco_coords(object, ty)?;
    orco.apply_vert_coords(&coords)?;
    seed_origin_indices(&mut orco)?;
    Ok(orco)
}

/// Installs an orco vertex layer on `mesh`.
///
/// Coordinates come from the parallel orco snapshot when its vertex
/// count matches (the lane ran the same constructive modifiers), else
/// from the base mesh. A count mismatch on both paths skips the layer
/// with a warning instead of corrupting it.
pub(crate) fn add_orco_layer(
    mesh: &mut MeshSnapshot,
    object: &MeshObject,
    orco_mesh: Option<&MeshSnapshot>,
    ty: AttributeType,
) -> Result<(), EvalError> {
    let verts = mesh.counts().verts;
    let coords = match orco_mesh {
        Some(lane) if lane.counts().verts == verts => lane.vertex_positions()?,
        Some(lane) => {
            log::warn!(
                "orco lane has {} verts, mesh has {}; falling back to base",
                lane.counts().verts,
                verts
            );
            orco_coords(object, ty)?
        }
        None => orco_coords(object, ty)?,
    };
    if coords.len() != verts {
        log::warn!("orco coordinates unavailable for {verts} verts; skipping layer");
        return Ok(());
    }
    mesh.store_mut(Domain::Vertex)
        .ensure_layer(ty, None)?
        .set_values(AttrValues::Vec3(coords));
    Ok(())
}
