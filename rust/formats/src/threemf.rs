// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 3MF (3D Manufacturing Format)
//!
//! A ZIP package holding:
//! - `[Content_Types].xml`
//! - `_rels/.rels`
//! - `3D/3dmodel.model` with one mesh object in millimetres
//!
//! The reader merges every mesh object and converts the model unit to
//! millimetres. Build item transforms, materials and colours are ignored.

use crate::{check_exportable, finish_import, Error, MeshFormat, Result};
use curiosity_geometry::{Mesh, Point3};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub(crate) const FORMAT: &str = "3MF";

const MODEL_PATH: &str = "3D/3dmodel.model";

const NAMESPACE_3MF: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

/// Encode a mesh as a 3MF package
pub fn write_3mf(mesh: &Mesh) -> Result<Vec<u8>> {
    check_exportable(mesh, MeshFormat::ThreeMf)?;

    if let Some((index, face)) = mesh
        .faces
        .iter()
        .enumerate()
        .find(|(_, [a, b, c])| a == b || b == c || a == c)
    {
        return Err(Error::unrepresentable(
            FORMAT,
            format!("triangle {} repeats a vertex: {:?}", index, face),
        ));
    }

    let model_xml = model_xml(mesh)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", RELS_XML.as_bytes()),
        (MODEL_PATH, model_xml.as_slice()),
    ] {
        zip.start_file(name, options)
            .map_err(|e| Error::unrepresentable(FORMAT, format!("failed to add {}: {}", name, e)))?;
        zip.write_all(content)?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| Error::unrepresentable(FORMAT, format!("failed to finish package: {}", e)))?;
    Ok(cursor.into_inner())
}

fn xml_err(e: impl std::fmt::Display) -> Error {
    Error::unrepresentable(FORMAT, format!("XML write failed: {}", e))
}

fn model_xml(mesh: &Mesh) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut writer = Writer::new_with_indent(Cursor::new(&mut buffer), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut model = BytesStart::new("model");
    model.push_attribute(("unit", "millimeter"));
    model.push_attribute(("xml:lang", "en-US"));
    model.push_attribute(("xmlns", NAMESPACE_3MF));
    writer.write_event(Event::Start(model)).map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("resources")))
        .map_err(xml_err)?;

    let mut object = BytesStart::new("object");
    object.push_attribute(("id", "1"));
    object.push_attribute(("type", "model"));
    writer.write_event(Event::Start(object)).map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("mesh")))
        .map_err(xml_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("vertices")))
        .map_err(xml_err)?;
    for p in &mesh.positions {
        let mut vertex = BytesStart::new("vertex");
        vertex.push_attribute(("x", p.x.to_string().as_str()));
        vertex.push_attribute(("y", p.y.to_string().as_str()));
        vertex.push_attribute(("z", p.z.to_string().as_str()));
        writer.write_event(Event::Empty(vertex)).map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("vertices")))
        .map_err(xml_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("triangles")))
        .map_err(xml_err)?;
    for [v1, v2, v3] in &mesh.faces {
        let mut triangle = BytesStart::new("triangle");
        triangle.push_attribute(("v1", v1.to_string().as_str()));
        triangle.push_attribute(("v2", v2.to_string().as_str()));
        triangle.push_attribute(("v3", v3.to_string().as_str()));
        writer.write_event(Event::Empty(triangle)).map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("triangles")))
        .map_err(xml_err)?;

    for name in ["mesh", "object", "resources"] {
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_err)?;
    }

    writer
        .write_event(Event::Start(BytesStart::new("build")))
        .map_err(xml_err)?;
    let mut item = BytesStart::new("item");
    item.push_attribute(("objectid", "1"));
    writer.write_event(Event::Empty(item)).map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("build")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("model")))
        .map_err(xml_err)?;

    Ok(buffer)
}

/// Decode a 3MF package
pub fn read_3mf(bytes: &[u8]) -> Result<Mesh> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::invalid(FORMAT, format!("invalid ZIP archive: {}", e)))?;

    let model_name = if archive.file_names().any(|name| name == MODEL_PATH) {
        MODEL_PATH.to_string()
    } else {
        archive
            .file_names()
            .find(|name| name.to_ascii_lowercase().ends_with(".model"))
            .map(str::to_string)
            .ok_or_else(|| Error::invalid(FORMAT, "package does not contain a model file"))?
    };

    let mut content = String::new();
    archive
        .by_name(&model_name)
        .map_err(|e| Error::invalid(FORMAT, format!("failed to open {}: {}", model_name, e)))?
        .read_to_string(&mut content)?;

    parse_model(&content)
}

/// Millimetres per model unit
fn unit_scale(unit: &str) -> Option<f64> {
    match unit {
        "micron" => Some(0.001),
        "millimeter" => Some(1.0),
        "centimeter" => Some(10.0),
        "inch" => Some(25.4),
        "foot" => Some(304.8),
        "meter" => Some(1000.0),
        _ => None,
    }
}

fn parse_model(content: &str) -> Result<Mesh> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<[u32; 3]> = Vec::new();
    let mut scale = 1.0;
    let mut in_vertices = false;
    let mut in_triangles = false;
    let mut object_offset = 0u32;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            // Only an open container takes children; `<vertices/>` has none
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"vertices" => in_vertices = true,
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"triangles" => {
                in_triangles = true
            }
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"model" => {
                    if let Some(unit) = attribute(e, b"unit")? {
                        scale = unit_scale(&unit).ok_or_else(|| {
                            Error::invalid(FORMAT, format!("unknown unit '{}'", unit))
                        })?;
                    }
                }
                b"mesh" => object_offset = positions.len() as u32,
                b"vertex" if in_vertices => {
                    let x = number::<f64>(e, b"x")?;
                    let y = number::<f64>(e, b"y")?;
                    let z = number::<f64>(e, b"z")?;
                    positions.push(Point3::new(x, y, z));
                }
                b"triangle" if in_triangles => {
                    let v1 = number::<u32>(e, b"v1")?;
                    let v2 = number::<u32>(e, b"v2")?;
                    let v3 = number::<u32>(e, b"v3")?;
                    faces.push([v1, v2, v3].map(|v| v.saturating_add(object_offset)));
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"vertices" => in_vertices = false,
                b"triangles" => in_triangles = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::invalid(FORMAT, format!("XML parse error: {}", e)));
            }
            _ => {}
        }
        buf.clear();
    }

    if scale != 1.0 {
        for p in &mut positions {
            p.coords *= scale;
        }
    }

    finish_import(positions, faces, MeshFormat::ThreeMf)
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| Error::invalid(FORMAT, format!("bad attribute: {}", e)))?;
        if attr.key.local_name().as_ref() == key {
            let value = std::str::from_utf8(&attr.value)
                .map_err(|e| Error::invalid(FORMAT, format!("invalid UTF-8 in attribute: {}", e)))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

fn number<T: std::str::FromStr>(element: &BytesStart<'_>, key: &[u8]) -> Result<T> {
    let name = String::from_utf8_lossy(key);
    let value = attribute(element, key)?
        .ok_or_else(|| Error::invalid(FORMAT, format!("missing attribute {}", name)))?;
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid(FORMAT, format!("invalid {} value '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        Mesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(12.5, 0.0, 0.0),
                Point3::new(0.0, 0.1, 3.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap()
    }

    #[test]
    fn test_package_layout() {
        let bytes = write_3mf(&triangle()).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["3D/3dmodel.model", "[Content_Types].xml", "_rels/.rels"]);
    }

    #[test]
    fn test_model_xml() {
        let xml = String::from_utf8(model_xml(&triangle()).unwrap()).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"unit="millimeter""#));
        assert!(xml.contains(r#"<vertex x="12.5" y="0" z="0"/>"#));
        assert!(xml.contains(r#"<triangle v1="0" v2="1" v3="2"/>"#));
        assert!(xml.contains(r#"<item objectid="1"/>"#));
    }

    #[test]
    fn test_roundtrip_exact() {
        let mesh = triangle();
        let back = read_3mf(&write_3mf(&mesh).unwrap()).unwrap();
        assert_eq!(back, mesh);
    }

    #[test]
    fn test_repeated_index_is_unrepresentable() {
        let mut mesh = triangle();
        mesh.faces.push([1, 1, 2]);
        let err = write_3mf(&mesh).unwrap_err();
        assert!(err.to_string().contains("triangle 1 repeats a vertex"));
    }

    #[test]
    fn test_inch_model_and_multiple_objects() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="inch" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="1" type="model"><mesh>
      <vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/></vertices>
      <triangles><triangle v1="0" v2="1" v3="2"/></triangles>
    </mesh></object>
    <object id="2" type="model"><mesh>
      <vertices><vertex x="0" y="0" z="1"/><vertex x="1" y="0" z="1"/><vertex x="0" y="1" z="1"/></vertices>
      <triangles><triangle v1="0" v2="1" v3="2"/></triangles>
    </mesh></object>
  </resources>
  <build><item objectid="1"/><item objectid="2"/></build>
</model>"#;
        let mesh = parse_model(xml).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(mesh.positions[4], Point3::new(25.4, 0.0, 25.4));
    }

    #[test]
    fn test_empty_containers_do_not_capture_later_elements() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02"
       xmlns:x="http://example.com/extension">
  <resources>
    <object id="1" type="model"><mesh>
      <vertices/>
      <triangles/>
      <x:vertex x="9" y="9" z="9"/>
      <x:triangle v1="0" v2="0" v3="0"/>
    </mesh></object>
    <object id="2" type="model"><mesh>
      <vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/></vertices>
      <triangles><triangle v1="0" v2="1" v3="2"/></triangles>
    </mesh></object>
  </resources>
  <build><item objectid="2"/></build>
</model>"#;
        let mesh = parse_model(xml).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            read_3mf(b"solid nope"),
            Err(Error::InvalidContent { .. })
        ));
    }
}
