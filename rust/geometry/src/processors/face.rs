// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face processors.
//!
//! Handles ADVANCED_FACE and FACE_SURFACE on planes, and the plain FACE
//! used by faceted B-reps.

use crate::curves::placement;
use crate::router::{FaceContext, FaceProcessor};
use crate::triangulation::{calculate_polygon_normal, triangulate_planar_face, Triangle};
use crate::{Error, Result, Vector3};
use curiosity_core::{DecodedEntity, StepType};

use super::helpers::face_bounds;

// ---------- PlanarFaceProcessor ----------

/// Planar face processor
/// Handles ADVANCED_FACE and FACE_SURFACE whose geometry is a PLANE
pub struct PlanarFaceProcessor;

impl PlanarFaceProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Outward normal of the face surface
    fn surface_normal(&self, face: &DecodedEntity, ctx: &mut FaceContext) -> Result<Vector3<f64>> {
        // ADVANCED_FACE(name, bounds, face_geometry, same_sense)
        let surface_id = face
            .get_ref(2)
            .ok_or_else(|| Error::topology(face.id, "face without surface"))?;
        let surface = ctx.decoder.decode_by_id(surface_id)?;

        if surface.step_type != StepType::Plane {
            return Err(Error::Unsupported {
                kind: "surface",
                type_name: surface.type_name.clone(),
            });
        }

        // PLANE(name, position)
        let position_id = surface
            .get_ref(1)
            .ok_or_else(|| Error::topology(surface_id, "plane without position"))?;
        let frame = placement(ctx.edges, ctx.decoder, position_id)?;

        let same_sense = face.get_bool(3).unwrap_or(true);
        Ok(if same_sense { frame.axis } else { -frame.axis })
    }
}

impl FaceProcessor for PlanarFaceProcessor {
    fn process(&self, face: &DecodedEntity, ctx: &mut FaceContext) -> Result<Vec<Triangle>> {
        let normal = self.surface_normal(face, ctx)?;

        let bounds = match face_bounds(face, ctx)? {
            Some(bounds) => bounds,
            None => {
                tracing::debug!(face = face.id, "face without usable bounds");
                return Ok(Vec::new());
            }
        };

        triangulate_planar_face(&bounds.outer, &bounds.holes, &normal)
    }

    fn supported_types(&self) -> Vec<StepType> {
        vec![StepType::Plane]
    }
}

impl Default for PlanarFaceProcessor {
    fn default() -> Self {
        Self::new()
    }
}

// ---------- PolyFaceProcessor ----------

/// FACE processor
/// Faces without surface geometry; the plane comes from the outer loop
pub struct PolyFaceProcessor;

impl PolyFaceProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl FaceProcessor for PolyFaceProcessor {
    fn process(&self, face: &DecodedEntity, ctx: &mut FaceContext) -> Result<Vec<Triangle>> {
        let bounds = match face_bounds(face, ctx)? {
            Some(bounds) => bounds,
            None => return Ok(Vec::new()),
        };

        match calculate_polygon_normal(&bounds.outer) {
            Some(normal) => triangulate_planar_face(&bounds.outer, &bounds.holes, &normal),
            None => {
                tracing::debug!(face = face.id, "collinear face skipped");
                Ok(Vec::new())
            }
        }
    }

    fn supported_types(&self) -> Vec<StepType> {
        vec![StepType::Face]
    }
}

impl Default for PolyFaceProcessor {
    fn default() -> Self {
        Self::new()
    }
}
