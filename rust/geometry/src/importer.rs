// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP importer - exchange file bytes to a welded triangle mesh

use crate::curves::EdgeSampler;
use crate::mesh::MeshBuilder;
use crate::router::{FaceContext, GeometryRouter};
use crate::{Error, Mesh, Result};
use curiosity_core::{
    build_entity_index, length_unit_scale_mm, parse_header, plane_angle_scale_rad, EntityDecoder,
    EntityScanner, StepType,
};

/// Loads STEP files and tessellates every shape root
pub struct StepImporter {
    router: GeometryRouter,
}

impl StepImporter {
    pub fn new() -> Self {
        Self {
            router: GeometryRouter::new(),
        }
    }

    /// Import raw file bytes
    pub fn import(&self, bytes: &[u8]) -> Result<Mesh> {
        let content =
            std::str::from_utf8(bytes).map_err(|e| Error::Unreadable(e.to_string()))?;
        self.import_str(content)
    }

    /// Import STEP text
    pub fn import_str(&self, content: &str) -> Result<Mesh> {
        let header = parse_header(content)?;
        tracing::debug!(
            schemas = ?header.schemas,
            system = header.originating_system.as_deref().unwrap_or(""),
            "STEP header"
        );

        let index = build_entity_index(content);
        let entity_count = index.len();
        let mut decoder = EntityDecoder::with_index(content, index);

        let scale = length_unit_scale_mm(&mut decoder, content)?;
        let angle_scale = plane_angle_scale_rad(&mut decoder, content)?;
        let roots = find_roots(content);
        if roots.is_empty() {
            return Err(Error::NoGeometry(
                "no solid, surface model or shell found".to_string(),
            ));
        }

        let mut edges = EdgeSampler::new(scale).with_angle_scale(angle_scale);
        let mut builder = MeshBuilder::new();
        let mut ctx = FaceContext {
            decoder: &mut decoder,
            edges: &mut edges,
        };

        for &root in &roots {
            let added = self.router.process_root(root, &mut ctx, &mut builder)?;
            tracing::debug!(root, triangles = added, "tessellated shape root");
        }

        let degenerate = builder.degenerate_count();
        let mesh = builder.build();
        if mesh.faces.is_empty() {
            return Err(Error::NoGeometry(format!(
                "{} shape roots produced no triangles",
                roots.len()
            )));
        }

        tracing::info!(
            entities = entity_count,
            roots = roots.len(),
            scale,
            edges = edges.cached_edges(),
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            degenerate,
            "STEP model tessellated"
        );

        Ok(mesh)
    }
}

impl Default for StepImporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape roots in file order; bare shells only when no solid or surface model exists
fn find_roots(content: &str) -> Vec<u32> {
    let mut scanner = EntityScanner::new(content);
    let mut roots = Vec::new();
    let mut shells = Vec::new();

    while let Some((id, type_name, _, _)) = scanner.next_entity() {
        let step_type = StepType::from_name(type_name);
        if step_type.is_shape_root() {
            roots.push(id);
        } else if matches!(step_type, StepType::ClosedShell | StepType::OpenShell) {
            shells.push(id);
        }
    }

    if roots.is_empty() {
        shells
    } else {
        roots
    }
}
