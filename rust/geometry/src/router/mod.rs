// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry Router - Dynamic dispatch to face processors
//!
//! Walks solids and shells down to their faces and routes each face to the
//! processor registered for its surface type, or for its own type when the
//! face carries no surface.


use crate::curves::EdgeSampler;
use crate::mesh::MeshBuilder;
use crate::processors::{CurvedFaceProcessor, PlanarFaceProcessor, PolyFaceProcessor};
use crate::surfaces::surface_name;
use crate::triangulation::Triangle;
use crate::{Error, Result};
use curiosity_core::{DecodedEntity, EntityDecoder, StepType};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Longest ORIENTED_CLOSED_SHELL / ORIENTED_FACE chain followed
const MAX_ORIENTATION_DEPTH: usize = 16;

/// Shared state handed to face processors
pub struct FaceContext<'c, 'a> {
    pub decoder: &'c mut EntityDecoder<'a>,
    pub edges: &'c mut EdgeSampler,
}

/// Face processor trait
/// Each processor handles faces on some surface types, or faces without one
pub trait FaceProcessor: Send + Sync {
    /// Triangulate a face, wound counter-clockwise around its outward normal
    fn process(&self, face: &DecodedEntity, ctx: &mut FaceContext) -> Result<Vec<Triangle>>;

    /// Surface types (or surface-less face types) this processor handles
    fn supported_types(&self) -> Vec<StepType>;
}

/// Routing key of a surface; rational B-splines are complex instances
fn surface_type(surface: &DecodedEntity) -> StepType {
    if surface.step_type == StepType::Complex && surface.is_a("B_SPLINE_SURFACE_WITH_KNOTS") {
        StepType::BSplineSurfaceWithKnots
    } else {
        surface.step_type
    }
}

/// Geometry router - routes faces to processors
pub struct GeometryRouter {
    processors: FxHashMap<StepType, Arc<dyn FaceProcessor>>,
}

impl GeometryRouter {
    /// Create new router with default processors
    pub fn new() -> Self {
        let mut router = Self {
            processors: FxHashMap::default(),
        };
        router.register(Box::new(PlanarFaceProcessor::new()));
        router.register(Box::new(CurvedFaceProcessor::new()));
        router.register(Box::new(PolyFaceProcessor::new()));
        router
    }

    /// Register a face processor
    pub fn register(&mut self, processor: Box<dyn FaceProcessor>) {
        let processor_arc: Arc<dyn FaceProcessor> = Arc::from(processor);
        for step_type in processor_arc.supported_types() {
            self.processors.insert(step_type, Arc::clone(&processor_arc));
        }
    }

    /// Whether a surface or face type has a processor
    pub fn supports(&self, step_type: StepType) -> bool {
        self.processors.contains_key(&step_type)
    }

    /// Tessellate a shape root (solid, surface model or bare shell)
    /// Returns the number of triangles added
    pub fn process_root(
        &self,
        root_id: u32,
        ctx: &mut FaceContext,
        builder: &mut MeshBuilder,
    ) -> Result<usize> {
        let root = ctx.decoder.decode_by_id(root_id)?;

        match root.step_type {
            // MANIFOLD_SOLID_BREP(name, outer) / FACETED_BREP(name, outer)
            StepType::ManifoldSolidBrep | StepType::FacetedBrep => {
                let shell = root
                    .get_ref(1)
                    .ok_or_else(|| Error::topology(root_id, "solid without outer shell"))?;
                self.process_shell(shell, false, ctx, builder)
            }
            // BREP_WITH_VOIDS(name, outer, voids)
            StepType::BrepWithVoids => {
                let shell = root
                    .get_ref(1)
                    .ok_or_else(|| Error::topology(root_id, "solid without outer shell"))?;
                let mut count = self.process_shell(shell, false, ctx, builder)?;
                for void in root.get_ref_list(2) {
                    count += self.process_shell(void, false, ctx, builder)?;
                }
                Ok(count)
            }
            // SHELL_BASED_SURFACE_MODEL(name, boundary)
            StepType::ShellBasedSurfaceModel => {
                let mut count = 0;
                for shell in root.get_ref_list(1) {
                    count += self.process_shell(shell, false, ctx, builder)?;
                }
                Ok(count)
            }
            StepType::ClosedShell | StepType::OpenShell | StepType::OrientedClosedShell => {
                self.process_shell(root_id, false, ctx, builder)
            }
            _ => Err(Error::Unsupported {
                kind: "shape",
                type_name: root.type_name.clone(),
            }),
        }
    }

    /// Tessellate every face of a shell
    pub fn process_shell(
        &self,
        shell_id: u32,
        reversed: bool,
        ctx: &mut FaceContext,
        builder: &mut MeshBuilder,
    ) -> Result<usize> {
        let mut current = shell_id;
        let mut reversed = reversed;

        for _ in 0..MAX_ORIENTATION_DEPTH {
            let shell = ctx.decoder.decode_by_id(current)?;

            match shell.step_type {
                // CLOSED_SHELL(name, cfs_faces)
                StepType::ClosedShell | StepType::OpenShell => {
                    let mut count = 0;
                    for face in shell.get_ref_list(1) {
                        count += self.process_face(face, reversed, ctx, builder)?;
                    }
                    return Ok(count);
                }
                // ORIENTED_CLOSED_SHELL(name, *, closed_shell_element, orientation)
                StepType::OrientedClosedShell => {
                    current = shell
                        .get_ref(2)
                        .ok_or_else(|| Error::topology(current, "oriented shell without shell"))?;
                    reversed ^= !shell.get_bool(3).unwrap_or(true);
                }
                _ => {
                    return Err(Error::Unsupported {
                        kind: "shell",
                        type_name: shell.type_name.clone(),
                    })
                }
            }
        }

        Err(Error::topology(shell_id, "oriented shell chain is cyclic or too deep"))
    }

    /// Route a face to its processor and add the triangles to the builder
    pub fn process_face(
        &self,
        face_id: u32,
        reversed: bool,
        ctx: &mut FaceContext,
        builder: &mut MeshBuilder,
    ) -> Result<usize> {
        let (face, reversed) = Self::resolve_oriented_face(face_id, reversed, ctx)?;

        let processor = match face.step_type {
            // ADVANCED_FACE(name, bounds, face_geometry, same_sense)
            StepType::AdvancedFace | StepType::FaceSurface => {
                let surface_id = face
                    .get_ref(2)
                    .ok_or_else(|| Error::topology(face.id, "face without surface"))?;
                let surface = ctx.decoder.decode_by_id(surface_id)?;
                self.processors
                    .get(&surface_type(&surface))
                    .ok_or_else(|| Error::Unsupported {
                        kind: "surface",
                        type_name: surface_name(&surface),
                    })?
            }
            other => self.processors.get(&other).ok_or_else(|| Error::Unsupported {
                kind: "face",
                type_name: face.type_name.clone(),
            })?,
        };

        let triangles = processor.process(&face, ctx)?;

        let mut added = 0;
        for [a, b, c] in triangles {
            let kept = if reversed {
                builder.add_triangle(a, c, b)
            } else {
                builder.add_triangle(a, b, c)
            };
            if kept {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Follow ORIENTED_FACE wrappers to the underlying face
    fn resolve_oriented_face(
        face_id: u32,
        reversed: bool,
        ctx: &mut FaceContext,
    ) -> Result<(DecodedEntity, bool)> {
        let mut current = face_id;
        let mut reversed = reversed;

        for _ in 0..MAX_ORIENTATION_DEPTH {
            let face = ctx.decoder.decode_by_id(current)?;
            // ORIENTED_FACE(name, *, face_element, orientation)
            if face.type_name != "ORIENTED_FACE" {
                return Ok((face, reversed));
            }
            current = face
                .get_ref(2)
                .ok_or_else(|| Error::topology(current, "oriented face without face"))?;
            reversed ^= !face.get_bool(3).unwrap_or(true);
        }

        Err(Error::topology(face_id, "oriented face chain is cyclic or too deep"))
    }
}

impl Default for GeometryRouter {
    fn default() -> Self {
        Self::new()
    }
}
