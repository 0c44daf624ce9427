// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PLY (Polygon File Format)
//!
//! Written as `binary_little_endian 1.0` with double precision positions and
//! `list uchar int vertex_indices` faces. The writer is hand-rolled because
//! ply-rs writes binary list lengths incorrectly; reading goes through ply-rs
//! and accepts ASCII as well as both binary encodings.

use crate::{check_exportable, finish_import, Error, MeshFormat, Result};
use curiosity_geometry::{Mesh, Point3};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use std::io::{Cursor, Write};

pub(crate) const FORMAT: &str = "PLY";

/// Encode a mesh as binary little-endian PLY
pub fn write_ply(mesh: &Mesh) -> Result<Vec<u8>> {
    check_exportable(mesh, MeshFormat::Ply)?;

    if mesh.vertex_count() > i32::MAX as usize {
        return Err(Error::unrepresentable(
            FORMAT,
            format!("{} vertices exceed int indices", mesh.vertex_count()),
        ));
    }

    let mut out = Vec::with_capacity(256 + mesh.vertex_count() * 24 + mesh.triangle_count() * 13);
    writeln!(out, "ply")?;
    writeln!(out, "format binary_little_endian 1.0")?;
    writeln!(out, "comment Curiosity 3D, units mm")?;
    writeln!(out, "element vertex {}", mesh.vertex_count())?;
    writeln!(out, "property double x")?;
    writeln!(out, "property double y")?;
    writeln!(out, "property double z")?;
    writeln!(out, "element face {}", mesh.triangle_count())?;
    writeln!(out, "property list uchar int vertex_indices")?;
    writeln!(out, "end_header")?;

    for p in &mesh.positions {
        out.extend_from_slice(&p.x.to_le_bytes());
        out.extend_from_slice(&p.y.to_le_bytes());
        out.extend_from_slice(&p.z.to_le_bytes());
    }

    for face in &mesh.faces {
        out.push(3u8);
        for &index in face {
            // Bounded by the vertex count check above
            out.extend_from_slice(&(index as i32).to_le_bytes());
        }
    }

    Ok(out)
}

/// Decode PLY in any encoding
pub fn read_ply(bytes: &[u8]) -> Result<Mesh> {
    let mut reader = Cursor::new(bytes);
    let parser = Parser::<DefaultElement>::new();

    let header = parser
        .read_header(&mut reader)
        .map_err(|e| Error::invalid(FORMAT, format!("failed to parse header: {}", e)))?;
    let payload = parser
        .read_payload(&mut reader, &header)
        .map_err(|e| Error::invalid(FORMAT, format!("failed to read payload: {}", e)))?;

    let mut positions = Vec::new();
    if let Some(vertices) = payload.get("vertex") {
        positions.reserve(vertices.len());
        for (i, element) in vertices.iter().enumerate() {
            let coord = |key: &str| {
                scalar(element, key).ok_or_else(|| {
                    Error::invalid(FORMAT, format!("vertex {} has no numeric {}", i, key))
                })
            };
            positions.push(Point3::new(coord("x")?, coord("y")?, coord("z")?));
        }
    }

    let mut faces = Vec::new();
    if let Some(elements) = payload.get("face") {
        faces.reserve(elements.len());
        for (i, element) in elements.iter().enumerate() {
            let indices = index_list(element)
                .ok_or_else(|| Error::invalid(FORMAT, format!("face {} has no vertex list", i)))?;
            if indices.len() < 3 {
                return Err(Error::invalid(
                    FORMAT,
                    format!("face {} has {} vertices", i, indices.len()),
                ));
            }
            let indices = indices
                .into_iter()
                .map(u32::try_from)
                .collect::<std::result::Result<Vec<u32>, _>>()
                .map_err(|_| Error::invalid(FORMAT, format!("face {} has a negative index", i)))?;
            for k in 1..indices.len() - 1 {
                faces.push([indices[0], indices[k], indices[k + 1]]);
            }
        }
    }

    finish_import(positions, faces, MeshFormat::Ply)
}

fn scalar(element: &DefaultElement, key: &str) -> Option<f64> {
    match element.get(key)? {
        Property::Double(v) => Some(*v),
        Property::Float(v) => Some(f64::from(*v)),
        Property::Int(v) => Some(f64::from(*v)),
        Property::UInt(v) => Some(f64::from(*v)),
        Property::Short(v) => Some(f64::from(*v)),
        Property::UShort(v) => Some(f64::from(*v)),
        Property::Char(v) => Some(f64::from(*v)),
        Property::UChar(v) => Some(f64::from(*v)),
        _ => None,
    }
}

fn index_list(element: &DefaultElement) -> Option<Vec<i64>> {
    for key in ["vertex_indices", "vertex_index"] {
        let list = match element.get(key) {
            Some(Property::ListInt(v)) => v.iter().map(|&i| i64::from(i)).collect(),
            Some(Property::ListUInt(v)) => v.iter().map(|&i| i64::from(i)).collect(),
            Some(Property::ListShort(v)) => v.iter().map(|&i| i64::from(i)).collect(),
            Some(Property::ListUShort(v)) => v.iter().map(|&i| i64::from(i)).collect(),
            Some(Property::ListChar(v)) => v.iter().map(|&i| i64::from(i)).collect(),
            Some(Property::ListUChar(v)) => v.iter().map(|&i| i64::from(i)).collect(),
            _ => continue,
        };
        return Some(list);
    }
    None
}
