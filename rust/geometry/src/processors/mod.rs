// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face Processors
//!
//! Each processor turns one kind of STEP face into triangles. Faces with
//! surface geometry are routed by their surface type:
//!
//! - `face`: faces on planes, FACE with poly loops
//! - `curved`: faces on cylinders, cones, spheres, tori and B-splines
//! - `parametric`: (u, v) domain tessellation behind `curved`
//! - `helpers`: bound and loop extraction shared by all faces

mod curved;
mod face;
mod helpers;
mod parametric;

#[cfg(test)]
mod tests;

pub use curved::CurvedFaceProcessor;
pub use face::{PlanarFaceProcessor, PolyFaceProcessor};
