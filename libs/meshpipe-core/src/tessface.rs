//! # Legacy Tessellated Faces
//!
//! Rebuilds the tessellated-face store from the polygon triangulation
//! for consumers that still walk triangle faces directly. The store
//! carries the triangle topology plus a face origin-index layer mapping
//! each triangle back to the base-mesh polygon it came from.

use crate::error::DerivedError;
use crate::snapshot::{DirtyFlags, MeshSnapshot};
use meshpipe_attributes::{AttrValues, AttributeStore, AttributeType, Domain, MeshTri};

impl MeshSnapshot {
    /// Rebuilds the tessellated-face store if it is stale or absent.
    ///
    /// Returns the resulting face count. A mesh without polygons
    /// yields an empty store.
    pub fn tessface_ensure(&mut self) -> Result<usize, DerivedError> {
        if !self.dirty().contains(DirtyFlags::TESS) && self.face_count() > 0 {
            return Ok(self.face_count());
        }

        let (tris, face_origins) = {
            let looptris = self.looptris()?;
            let loops = self.loops()?;
            // Map each triangle to its base-mesh polygon: through the
            // polygon origin-index layer when one exists, else the
            // polygon index itself.
            let poly_origins = self
                .store(Domain::Polygon)
                .layer_values(AttributeType::OriginIndex, None)
                .and_then(AttrValues::as_int);

            let mut tris = Vec::with_capacity(looptris.len());
            let mut origins = Vec::with_capacity(looptris.len());
            for tri in looptris.iter() {
                tris.push(MeshTri {
                    verts: [
                        loops[tri.loops[0] as usize].vert,
                        loops[tri.loops[1] as usize].vert,
                        loops[tri.loops[2] as usize].vert,
                    ],
                    poly: tri.poly,
                });
                origins.push(match poly_origins {
                    Some(po) => po[tri.poly as usize],
                    None => tri.poly as i32,
                });
            }
            (tris, origins)
        };

        log::trace!("rebuilt tessfaces: {} tris", tris.len());
        let mut face_data = AttributeStore::new(Domain::Face, tris.len());
        face_data.add_layer(AttributeType::FaceTri, None, Some(AttrValues::Tri(tris)))?;
        face_data.add_layer(
            AttributeType::OriginIndex,
            None,
            Some(AttrValues::Int(face_origins)),
        )?;
        let count = face_data.element_count();
        self.replace_face_data(face_data);
        self.dirty_mut().remove(DirtyFlags::TESS);
        Ok(count)
    }

    /// Drops the tessellated-face store and marks it stale.
    ///
    /// Runs whenever loop normals are recomputed: the face
    /// representation must be rebuilt against them lazily.
    pub fn tessface_clear(&mut self) {
        let domain = self.face_data_mut().domain();
        self.replace_face_data(AttributeStore::new(domain, 0));
        self.dirty_mut().insert(DirtyFlags::TESS);
    }
}
