// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curved face processor.
//!
//! Handles ADVANCED_FACE and FACE_SURFACE on cylinders, cones, spheres,
//! tori and B-spline surfaces.

use crate::router::{FaceContext, FaceProcessor};
use crate::surfaces::decode_surface;
use crate::triangulation::Triangle;
use crate::{Error, Result};
use curiosity_core::{DecodedEntity, StepType};

use super::parametric::tessellate_face;

/// Parametric face processor
/// Tessellates in the (u, v) domain of the face's surface
pub struct CurvedFaceProcessor;

impl CurvedFaceProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl FaceProcessor for CurvedFaceProcessor {
    fn process(&self, face: &DecodedEntity, ctx: &mut FaceContext) -> Result<Vec<Triangle>> {
        let surface_id = face
            .get_ref(2)
            .ok_or_else(|| Error::topology(face.id, "face without surface"))?;
        let entity = ctx.decoder.decode_by_id(surface_id)?;
        let surface = decode_surface(ctx.edges, ctx.decoder, &entity)?;

        tessellate_face(surface.as_ref(), face, ctx)
    }

    fn supported_types(&self) -> Vec<StepType> {
        vec![
            StepType::CylindricalSurface,
            StepType::ConicalSurface,
            StepType::SphericalSurface,
            StepType::ToroidalSurface,
            StepType::BSplineSurfaceWithKnots,
        ]
    }
}

impl Default for CurvedFaceProcessor {
    fn default() -> Self {
        Self::new()
    }
}
