// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STL (stereolithography)
//!
//! Written as binary:
//!
//! ```text
//! UINT8[80]    header
//! UINT32       triangle count
//! foreach triangle
//!     REAL32[3] normal
//!     REAL32[3] vertex 1..3
//!     UINT16    attribute byte count (0)
//! ```
//!
//! STL has no shared vertices; the reader welds corners whose `f32`
//! positions are bit-identical.

use crate::{check_exportable, finish_import, Error, MeshFormat, Result};
use curiosity_geometry::{Mesh, Point3, Vector3};
use rustc_hash::FxHashMap;

pub(crate) const FORMAT: &str = "STL";

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;
const HEADER_TEXT: &[u8] = b"Curiosity 3D binary STL";

/// Encode a mesh as binary STL
pub fn write_stl(mesh: &Mesh) -> Result<Vec<u8>> {
    check_exportable(mesh, MeshFormat::Stl)?;

    let count = u32::try_from(mesh.triangle_count()).map_err(|_| {
        Error::unrepresentable(
            FORMAT,
            format!("{} facets exceed the u32 facet count", mesh.triangle_count()),
        )
    })?;

    let mut out = Vec::with_capacity(HEADER_SIZE + 4 + mesh.triangle_count() * TRIANGLE_SIZE);
    let mut header = [0u8; HEADER_SIZE];
    header[..HEADER_TEXT.len()].copy_from_slice(HEADER_TEXT);
    out.extend_from_slice(&header);
    out.extend_from_slice(&count.to_le_bytes());

    for face in 0..mesh.triangle_count() {
        let [a, b, c] = mesh.triangle(face);
        let normal = (b - a).cross(&(c - a));
        let normal = normal
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros);

        for value in [normal.x, normal.y, normal.z] {
            out.extend_from_slice(&(value as f32).to_le_bytes());
        }
        for corner in [a, b, c] {
            for value in [corner.x, corner.y, corner.z] {
                let single = value as f32;
                if !single.is_finite() {
                    return Err(Error::unrepresentable(
                        FORMAT,
                        format!("coordinate {} overflows single precision", value),
                    ));
                }
                out.extend_from_slice(&single.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(out)
}

/// Decode binary or ASCII STL
pub fn read_stl(bytes: &[u8]) -> Result<Mesh> {
    if is_binary(bytes) {
        read_binary(bytes)
    } else if starts_with_solid(bytes) {
        read_ascii(bytes)
    } else if bytes.len() >= HEADER_SIZE + 4 {
        // Binary whose size disagrees with its triangle count
        read_binary(bytes)
    } else {
        Err(Error::invalid(FORMAT, "file too small to be valid STL"))
    }
}

/// Size matches the declared triangle count exactly
fn is_binary(bytes: &[u8]) -> bool {
    match declared_count(bytes) {
        Some(count) => {
            let expected = (HEADER_SIZE + 4) as u64 + u64::from(count) * TRIANGLE_SIZE as u64;
            bytes.len() as u64 == expected
        }
        None => false,
    }
}

fn declared_count(bytes: &[u8]) -> Option<u32> {
    let raw = bytes.get(HEADER_SIZE..HEADER_SIZE + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn starts_with_solid(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"solid")
}

fn read_binary(bytes: &[u8]) -> Result<Mesh> {
    let count = declared_count(bytes)
        .ok_or_else(|| Error::invalid(FORMAT, "missing binary header"))? as usize;

    let body = &bytes[HEADER_SIZE + 4..];
    let available = body.len() / TRIANGLE_SIZE;
    if available < count {
        return Err(Error::invalid(
            FORMAT,
            format!("expected {} triangles, found {}", count, available),
        ));
    }

    let mut welder = Welder::with_capacity(count);
    for record in body.chunks_exact(TRIANGLE_SIZE).take(count) {
        // Skip the stored normal
        let a = welder.vertex(read_vertex(&record[12..24]));
        let b = welder.vertex(read_vertex(&record[24..36]));
        let c = welder.vertex(read_vertex(&record[36..48]));
        welder.faces.push([a, b, c]);
    }

    welder.finish()
}

fn read_vertex(buf: &[u8]) -> [f32; 3] {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    [x, y, z]
}

fn read_ascii(bytes: &[u8]) -> Result<Mesh> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::invalid(FORMAT, format!("ASCII STL is not UTF-8: {}", e)))?;

    let mut welder = Welder::with_capacity(0);
    let mut corners: Vec<u32> = Vec::with_capacity(3);
    let mut tokens = text.split_ascii_whitespace();

    while let Some(token) = tokens.next() {
        match token {
            "facet" => corners.clear(),
            "vertex" => {
                let mut coords = [0f32; 3];
                for coord in &mut coords {
                    let value = tokens
                        .next()
                        .ok_or_else(|| Error::invalid(FORMAT, "truncated vertex"))?;
                    *coord = value.parse().map_err(|_| {
                        Error::invalid(FORMAT, format!("invalid coordinate '{}'", value))
                    })?;
                }
                corners.push(welder.vertex(coords));
            }
            "endfacet" => {
                if corners.len() != 3 {
                    return Err(Error::invalid(
                        FORMAT,
                        format!("facet with {} vertices", corners.len()),
                    ));
                }
                welder.faces.push([corners[0], corners[1], corners[2]]);
                corners.clear();
            }
            "endsolid" => break,
            _ => {}
        }
    }

    welder.finish()
}

/// Shares corners with identical single-precision positions
struct Welder {
    index: FxHashMap<[u32; 3], u32>,
    positions: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
}

impl Welder {
    fn with_capacity(triangles: usize) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(triangles / 2, Default::default()),
            positions: Vec::with_capacity(triangles / 2),
            faces: Vec::with_capacity(triangles),
        }
    }

    fn vertex(&mut self, coords: [f32; 3]) -> u32 {
        // -0.0 and 0.0 are the same position
        let key = coords.map(|v| if v == 0.0 { 0u32 } else { v.to_bits() });
        let positions = &mut self.positions;
        *self.index.entry(key).or_insert_with(|| {
            positions.push(Point3::new(
                f64::from(coords[0]),
                f64::from(coords[1]),
                f64::from(coords[2]),
            ));
            (positions.len() - 1) as u32
        })
    }

    fn finish(self) -> Result<Mesh> {
        finish_import(self.positions, self.faces, MeshFormat::Stl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetra() -> Mesh {
        Mesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_binary_layout() {
        let bytes = write_stl(&tetra()).unwrap();
        assert_eq!(bytes.len(), 84 + 4 * 50);
        assert!(bytes.starts_with(HEADER_TEXT));
        assert_eq!(declared_count(&bytes), Some(4));

        // First facet normal points down -z
        let nz = f32::from_le_bytes([bytes[92], bytes[93], bytes[94], bytes[95]]);
        assert_eq!(nz, -1.0);
    }

    #[test]
    fn test_binary_read_welds_corners() {
        let mesh = read_stl(&write_stl(&tetra()).unwrap()).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.faces[0], [0, 1, 2]);
    }

    #[test]
    fn test_ascii() {
        let text = "solid t
  facet normal 0 0 -1
    outer loop
      vertex 0 0 0
      vertex 0 1 0
      vertex 1 0 0
    endloop
  endfacet
  facet normal 0 -1 0
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex -0 0 1e0
    endloop
  endfacet
endsolid t
";
        let mesh = read_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.positions[3], Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_binary_header_starting_with_solid() {
        let mut bytes = write_stl(&tetra()).unwrap();
        bytes[..5].copy_from_slice(b"solid");
        assert_eq!(read_stl(&bytes).unwrap().triangle_count(), 4);
    }

    #[test]
    fn test_truncated_binary() {
        let bytes = write_stl(&tetra()).unwrap();
        let err = read_stl(&bytes[..bytes.len() - 10]).unwrap_err();
        assert!(err.to_string().contains("expected 4 triangles, found 3"));
        assert!(read_stl(b"abc").is_err());
    }

    #[test]
    fn test_single_precision_overflow() {
        let mut mesh = tetra();
        mesh.positions[3].z = 1e300;
        assert!(matches!(
            write_stl(&mesh),
            Err(Error::Unrepresentable { .. })
        ));
    }
}
