// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curiosity Mesh Formats
//!
//! Encoders and readers for the interchange formats offered for download:
//!
//! - **STL** binary (reader also accepts ASCII)
//! - **OBJ** text
//! - **3MF** ZIP package with an XML model
//! - **PLY** binary little-endian (reader accepts every PLY encoding)
//!
//! All formats carry millimetre coordinates.
//!
//! ```no_run
//! use curiosity_formats::{export, import, MeshFormat};
//! # fn demo(mesh: &curiosity_geometry::Mesh) -> curiosity_formats::Result<()> {
//! let bytes = export(mesh, MeshFormat::ThreeMf)?;
//! let back = import(&bytes, MeshFormat::ThreeMf)?;
//! assert_eq!(back.vertex_count(), mesh.vertex_count());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod obj;
pub mod ply;
pub mod stl;
pub mod threemf;

pub use error::{Error, Result};

use curiosity_geometry::Mesh;
use std::fmt;
use std::str::FromStr;

/// Download formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeshFormat {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "stl"))]
    Stl,
    #[cfg_attr(feature = "serde", serde(rename = "obj"))]
    Obj,
    #[cfg_attr(feature = "serde", serde(rename = "3mf"))]
    ThreeMf,
    #[cfg_attr(feature = "serde", serde(rename = "ply"))]
    Ply,
}

impl MeshFormat {
    /// Every format, in selector order
    pub const ALL: [MeshFormat; 4] = [
        MeshFormat::Stl,
        MeshFormat::Obj,
        MeshFormat::ThreeMf,
        MeshFormat::Ply,
    ];

    /// Lower-case tag, also the file extension
    pub fn tag(self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::Obj => "obj",
            MeshFormat::ThreeMf => "3mf",
            MeshFormat::Ply => "ply",
        }
    }

    pub fn extension(self) -> &'static str {
        self.tag()
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            MeshFormat::Stl => "model/stl",
            MeshFormat::Obj => "model/obj",
            MeshFormat::ThreeMf => "model/3mf",
            MeshFormat::Ply => "application/x-ply",
        }
    }

    /// Download button text, e.g. `Download .STL`
    pub fn label(self) -> String {
        format!("Download .{}", self.tag().to_ascii_uppercase())
    }

    /// Parse a tag case-insensitively
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.tag().eq_ignore_ascii_case(tag.trim()))
    }

    /// Display name used in error messages
    pub(crate) fn name(self) -> &'static str {
        match self {
            MeshFormat::Stl => stl::FORMAT,
            MeshFormat::Obj => obj::FORMAT,
            MeshFormat::ThreeMf => threemf::FORMAT,
            MeshFormat::Ply => ply::FORMAT,
        }
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for MeshFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s).ok_or_else(|| Error::UnknownFormat(s.to_string()))
    }
}

/// Encode a mesh
pub fn export(mesh: &Mesh, format: MeshFormat) -> Result<Vec<u8>> {
    let bytes = match format {
        MeshFormat::Stl => stl::write_stl(mesh)?,
        MeshFormat::Obj => obj::write_obj(mesh)?,
        MeshFormat::ThreeMf => threemf::write_3mf(mesh)?,
        MeshFormat::Ply => ply::write_ply(mesh)?,
    };

    tracing::debug!(
        format = format.tag(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        bytes = bytes.len(),
        "mesh encoded"
    );
    Ok(bytes)
}

/// Decode a mesh
pub fn import(bytes: &[u8], format: MeshFormat) -> Result<Mesh> {
    let mesh = match format {
        MeshFormat::Stl => stl::read_stl(bytes)?,
        MeshFormat::Obj => obj::read_obj(bytes)?,
        MeshFormat::ThreeMf => threemf::read_3mf(bytes)?,
        MeshFormat::Ply => ply::read_ply(bytes)?,
    };

    tracing::debug!(
        format = format.tag(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "mesh decoded"
    );
    Ok(mesh)
}

/// Finite coordinates and valid indices, required by every encoder
pub(crate) fn check_exportable(mesh: &Mesh, format: MeshFormat) -> Result<()> {
    if let Some(index) = mesh
        .positions
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
    {
        return Err(Error::unrepresentable(
            format.name(),
            format!("vertex {} has a non-finite coordinate", index),
        ));
    }

    mesh.validate()
        .map_err(|e| Error::unrepresentable(format.name(), e.to_string()))
}

/// Assemble a decoded mesh, rejecting out-of-range indices
pub(crate) fn finish_import(
    positions: Vec<curiosity_geometry::Point3<f64>>,
    faces: Vec<[u32; 3]>,
    format: MeshFormat,
) -> Result<Mesh> {
    Mesh::from_parts(positions, faces).map_err(|e| Error::invalid(format.name(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curiosity_geometry::Point3;

    #[test]
    fn test_tags_and_labels() {
        assert_eq!(MeshFormat::ThreeMf.tag(), "3mf");
        assert_eq!(MeshFormat::Stl.label(), "Download .STL");
        assert_eq!(MeshFormat::ThreeMf.label(), "Download .3MF");
        assert_eq!(MeshFormat::default(), MeshFormat::Stl);
        assert_eq!(MeshFormat::from_tag("PLY"), Some(MeshFormat::Ply));
        assert_eq!("obj".parse::<MeshFormat>().unwrap(), MeshFormat::Obj);
        assert!(matches!(
            "dxf".parse::<MeshFormat>(),
            Err(Error::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_every_format_rejects_non_finite() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_vertex(Point3::new(f64::NAN, 0.0, 0.0));
        mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.add_triangle(0, 1, 2);

        for format in MeshFormat::ALL {
            let err = export(&mesh, format).unwrap_err();
            assert!(
                matches!(err, Error::Unrepresentable { .. }),
                "{format}: {err}"
            );
        }
    }

    #[test]
    fn test_every_format_rejects_bad_indices() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        mesh.add_triangle(0, 1, 2);

        for format in MeshFormat::ALL {
            assert!(matches!(
                export(&mesh, format),
                Err(Error::Unrepresentable { .. })
            ));
        }
    }
}
