// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use curiosity_formats::{export, import};
use curiosity_geometry::StepImporter;
use curiosity_processing::{
    ConversionPipeline, MeshFormat, PipelineError, PipelineState, PrinterConfig, RequestContext,
    UploadedFile,
};
use std::fs;
use std::path::PathBuf;

fn model_bytes(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("tests")
        .join("models")
        .join(name);
    fs::read(&path).unwrap_or_else(|e| panic!("Test model not found at {}: {}", path.display(), e))
}

fn request(file_name: &str, model: &str, format: MeshFormat) -> RequestContext {
    RequestContext::new(
        UploadedFile::new(file_name, model_bytes(model)),
        PrinterConfig::new(0.4, format).unwrap(),
    )
}

#[test]
fn test_cube_scenario() {
    let run =
        ConversionPipeline::new().execute(&request("Cube.STEP", "cube_10mm.step", MeshFormat::Stl));
    assert_eq!(run.final_state(), PipelineState::Done);

    let conversion = run.result.unwrap();
    assert_eq!(conversion.analysis.volume_label(), "1.0 cm³");
    assert_eq!(conversion.analysis.bounding_box_label(), "10x10x10 mm");
    assert!(conversion.analysis.watertight);
    assert_eq!(conversion.analysis.warning(), None);
    assert_eq!(conversion.artifact.file_name, "Cube.stl");
    assert_eq!(conversion.artifact.label(), "Download .STL");
    assert_eq!(conversion.preview.data.len(), 2);
}

#[test]
fn test_stl_artifact_is_the_intermediate_file() {
    let ctx = request("plate.stp", "plate_with_hole.step", MeshFormat::Stl);
    let conversion = ConversionPipeline::new().run(&ctx).unwrap();

    let tessellated = StepImporter::new().import(&ctx.upload.bytes).unwrap();
    let intermediate = export(&tessellated, MeshFormat::Stl).unwrap();
    assert_eq!(conversion.artifact.bytes, intermediate);
}

#[test]
fn test_every_format_exports_the_same_solid() {
    let pipeline = ConversionPipeline::new();
    for format in MeshFormat::ALL {
        let conversion = pipeline
            .run(&request("bracket.step", "l_bracket_faceted.step", format))
            .unwrap();
        assert_eq!(conversion.artifact.format, format);
        assert_eq!(conversion.artifact.file_name, format!("bracket.{}", format.tag()));

        let back = import(&conversion.artifact.bytes, format).unwrap();
        assert_eq!(back.vertex_count(), conversion.mesh.vertex_count());
        assert_relative_eq!(
            curiosity_geometry::analyze(&back).volume,
            conversion.analysis.volume,
            max_relative = 1e-6
        );
    }
}

#[test]
fn test_open_surface_warns_but_exports() {
    let conversion = ConversionPipeline::new()
        .run(&request("box.step", "open_box.step", MeshFormat::ThreeMf))
        .unwrap();
    assert!(!conversion.analysis.watertight);
    assert_eq!(conversion.analysis.warning(), Some("⚠️ Non-Manifold Mesh"));
    assert!(!conversion.artifact.bytes.is_empty());
}

#[test]
fn test_unparseable_step_fails_without_artifact() {
    let ctx = RequestContext::new(
        UploadedFile::new("broken.step", b"ISO-10303-21;\nHEADER;\nENDSEC;\n".to_vec()),
        PrinterConfig::default(),
    );
    let run = ConversionPipeline::new().execute(&ctx);
    assert_eq!(
        run.states,
        vec![PipelineState::Idle, PipelineState::Importing, PipelineState::Failed]
    );
    match run.result {
        Err(PipelineError::Import(message)) => assert!(!message.is_empty()),
        other => panic!("expected import failure, got {:?}", other.map(|c| c.artifact.file_name)),
    }
}

#[test]
fn test_unsupported_surface_message_is_verbatim() {
    let err = ConversionPipeline::new()
        .run(&request("sweep.step", "extruded_face.step", MeshFormat::Stl))
        .unwrap_err();
    assert_eq!(
        err.message(),
        "Unsupported surface type SURFACE_OF_LINEAR_EXTRUSION"
    );
}

#[test]
fn test_cylinder_scenario() {
    let conversion = ConversionPipeline::new()
        .run(&request("Cylinder.step", "cylinder_r5_h10.step", MeshFormat::ThreeMf))
        .unwrap();

    assert!(conversion.analysis.watertight);
    assert_relative_eq!(
        conversion.analysis.volume,
        std::f64::consts::PI * 250.0,
        max_relative = 0.01
    );
    assert_eq!(conversion.analysis.bounding_box_label(), "10x10x10 mm");
    assert_eq!(conversion.artifact.file_name, "Cylinder.3mf");

    let back = import(&conversion.artifact.bytes, MeshFormat::ThreeMf).unwrap();
    assert_eq!(back.triangle_count(), conversion.mesh.triangle_count());
}

