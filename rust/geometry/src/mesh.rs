// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::{Error, Result};
use nalgebra::Point3;
use rustc_hash::FxHashMap;

/// Grid used to weld coincident vertices (mm)
pub const WELD_TOLERANCE: f64 = 1e-6;

/// Indexed triangle mesh in millimetres
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions
    pub positions: Vec<Point3<f64>>,
    /// Triangles as indices into `positions`
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from raw parts, checking every index
    pub fn from_parts(positions: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Result<Self> {
        let mesh = Self { positions, faces };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Add a vertex, returning its index
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        self.positions.push(position);
        (self.positions.len() - 1) as u32
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.faces.push([i0, i1, i2]);
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Corner positions of a triangle
    #[inline]
    pub fn triangle(&self, face: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[face];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Every face index must address an existing vertex
    pub fn validate(&self) -> Result<()> {
        let count = self.positions.len();
        for (face_index, face) in self.faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&i| i as usize >= count) {
                return Err(Error::InvalidMesh(format!(
                    "face {} references vertex {} but the mesh has {} vertices",
                    face_index, bad, count
                )));
            }
        }
        Ok(())
    }

    /// Axis-aligned bounds (min, max); None for an empty mesh
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;

        for p in &self.positions[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some((min, max))
    }
}

/// Builds a mesh while welding vertices that fall in the same tolerance cell
#[derive(Debug, Default)]
pub struct MeshBuilder {
    mesh: Mesh,
    lookup: FxHashMap<[i64; 3], u32>,
    degenerate: usize,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn key(p: &Point3<f64>) -> [i64; 3] {
        [
            (p.x / WELD_TOLERANCE).round() as i64,
            (p.y / WELD_TOLERANCE).round() as i64,
            (p.z / WELD_TOLERANCE).round() as i64,
        ]
    }

    /// Index of the welded vertex for `p`
    #[inline]
    pub fn vertex(&mut self, p: Point3<f64>) -> u32 {
        let key = Self::key(&p);
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.mesh.add_vertex(p);
        self.lookup.insert(key, index);
        index
    }

    /// Add a triangle by corner positions; collapsed triangles are dropped
    pub fn add_triangle(&mut self, a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> bool {
        let (i0, i1, i2) = (self.vertex(a), self.vertex(b), self.vertex(c));
        if i0 == i1 || i1 == i2 || i0 == i2 {
            self.degenerate += 1;
            return false;
        }
        self.mesh.add_triangle(i0, i1, i2);
        true
    }

    /// Triangles dropped because welding collapsed them
    pub fn degenerate_count(&self) -> usize {
        self.degenerate
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    pub fn build(self) -> Mesh {
        self.mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
        assert!(mesh.bounds().is_none());
    }

    #[test]
    fn test_validate_reports_bad_index() {
        let result = Mesh::from_parts(vec![Point3::origin(); 3], vec![[0, 1, 3]]);
        assert!(matches!(result, Err(Error::InvalidMesh(msg)) if msg.contains("vertex 3")));
    }

    #[test]
    fn test_bounds() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Point3::new(-1.0, 2.0, 0.5));
        mesh.add_vertex(Point3::new(3.0, -4.0, 0.0));
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(-1.0, -4.0, 0.0));
        assert_eq!(max, Point3::new(3.0, 2.0, 0.5));
    }

    #[test]
    fn test_builder_welds_close_vertices() {
        let mut builder = MeshBuilder::new();
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let b_close = Point3::new(1.0 + 1e-9, 0.0, 0.0);

        assert!(builder.add_triangle(a, b, c));
        assert!(builder.add_triangle(b_close, Point3::new(1.0, 1.0, 0.0), c));

        let mesh = builder.build();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces[1][0], 1);
    }

    #[test]
    fn test_builder_drops_collapsed_triangles() {
        let mut builder = MeshBuilder::new();
        let a = Point3::new(0.0, 0.0, 0.0);
        let near_a = Point3::new(1e-8, 0.0, 0.0);
        assert!(!builder.add_triangle(a, near_a, Point3::new(0.0, 1.0, 0.0)));
        assert_eq!(builder.degenerate_count(), 1);
        assert_eq!(builder.triangle_count(), 0);
    }
}
