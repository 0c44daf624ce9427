// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ
//!
//! Coordinates are written with the shortest text that parses back to the
//! same `f64`.

use crate::{check_exportable, finish_import, Error, MeshFormat, Result};
use curiosity_geometry::{Mesh, Point3};
use std::fmt::Write;

pub(crate) const FORMAT: &str = "OBJ";

/// Encode a mesh as OBJ text
pub fn write_obj(mesh: &Mesh) -> Result<Vec<u8>> {
    check_exportable(mesh, MeshFormat::Obj)?;

    let mut out = String::with_capacity(mesh.vertex_count() * 32 + mesh.triangle_count() * 24);
    out.push_str("# Curiosity 3D\n");
    out.push_str("o model\n");

    // Writing to a String cannot fail
    for p in &mesh.positions {
        let _ = writeln!(out, "v {} {} {}", p.x, p.y, p.z);
    }
    for [a, b, c] in &mesh.faces {
        let _ = writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1);
    }

    Ok(out.into_bytes())
}

/// Decode OBJ text
///
/// Texture and normal references (`f 1/2/3`) are ignored, negative indices
/// count back from the latest vertex, polygons are fan-triangulated.
pub fn read_obj(bytes: &[u8]) -> Result<Mesh> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::invalid(FORMAT, format!("not UTF-8 text: {}", e)))?;

    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<[u32; 3]> = Vec::new();
    let mut polygon: Vec<u32> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let mut parts = line.split_ascii_whitespace();

        match parts.next() {
            Some("v") => {
                let mut coords = [0f64; 3];
                for coord in &mut coords {
                    let value = parts.next().ok_or_else(|| {
                        Error::invalid(FORMAT, format!("line {}: vertex needs x y z", line_no))
                    })?;
                    *coord = value.parse().map_err(|_| {
                        Error::invalid(
                            FORMAT,
                            format!("line {}: invalid coordinate '{}'", line_no, value),
                        )
                    })?;
                }
                positions.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                polygon.clear();
                for reference in parts {
                    polygon.push(resolve_index(reference, positions.len(), line_no)?);
                }
                if polygon.len() < 3 {
                    return Err(Error::invalid(
                        FORMAT,
                        format!("line {}: face with {} vertices", line_no, polygon.len()),
                    ));
                }
                for i in 1..polygon.len() - 1 {
                    faces.push([polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            _ => {}
        }
    }

    finish_import(positions, faces, MeshFormat::Obj)
}

/// `7`, `7/1`, `7//3`, `-1/2/3` to a zero-based vertex index
fn resolve_index(reference: &str, vertex_count: usize, line_no: usize) -> Result<u32> {
    let raw = reference.split('/').next().unwrap_or(reference);
    let invalid = || {
        Error::invalid(
            FORMAT,
            format!("line {}: invalid vertex reference '{}'", line_no, reference),
        )
    };

    let value: i64 = raw.parse().map_err(|_| invalid())?;
    let index = if value > 0 {
        value - 1
    } else if value < 0 {
        vertex_count as i64 + value
    } else {
        return Err(invalid());
    };

    if index < 0 || index >= vertex_count as i64 {
        return Err(invalid());
    }
    u32::try_from(index).map_err(|_| invalid())
}
