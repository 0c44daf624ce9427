// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curiosity Geometry Processing
//!
//! Tessellates STEP boundary representations (planar and curved faces) into
//! welded triangle meshes using earcutr triangulation and nalgebra, and
//! analyzes the result.

pub mod analysis;
pub mod curves;
pub mod error;
pub mod importer;
pub mod mesh;
pub mod nurbs;
pub mod processors;
pub mod router;
pub mod surfaces;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use analysis::{analyze, is_watertight, signed_volume, AnalysisResult, NON_MANIFOLD_WARNING};
pub use curves::{EdgeSampler, CHORD_TOLERANCE};
pub use error::{Error, Result};
pub use importer::StepImporter;
pub use mesh::{Mesh, MeshBuilder, WELD_TOLERANCE};
pub use nurbs::{BSplineCurve, BSplineSurface};
pub use processors::{CurvedFaceProcessor, PlanarFaceProcessor, PolyFaceProcessor};
pub use router::{FaceContext, FaceProcessor, GeometryRouter};
pub use surfaces::{decode_surface, ParametricSurface};
pub use triangulation::{triangulate_planar_face, triangulate_polygon, Triangle};
