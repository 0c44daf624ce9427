// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tests for face processors.

use super::*;
use crate::curves::EdgeSampler;
use crate::router::{FaceContext, FaceProcessor};
use crate::{Error, Vector3};
use approx::assert_relative_eq;
use curiosity_core::{EntityDecoder, StepType};

fn step(data: &str) -> String {
    format!(
        "ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
        data
    )
}

fn area(triangles: &[[crate::Point3<f64>; 3]]) -> f64 {
    triangles
        .iter()
        .map(|[a, b, c]| (b - a).cross(&(c - a)).norm() / 2.0)
        .sum()
}

/// 10 x 10 square in z = 0 with a 4 x 4 square hole, as lines and edge loops
const SQUARE_WITH_HOLE: &str = "#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=CARTESIAN_POINT('',(10.,0.,0.));
#3=CARTESIAN_POINT('',(10.,10.,0.));
#4=CARTESIAN_POINT('',(0.,10.,0.));
#5=VERTEX_POINT('',#1);
#6=VERTEX_POINT('',#2);
#7=VERTEX_POINT('',#3);
#8=VERTEX_POINT('',#4);
#9=DIRECTION('',(1.,0.,0.));
#10=VECTOR('',#9,1.);
#11=LINE('',#1,#10);
#12=EDGE_CURVE('',#5,#6,#11,.T.);
#13=EDGE_CURVE('',#6,#7,#11,.T.);
#14=EDGE_CURVE('',#8,#7,#11,.T.);
#15=EDGE_CURVE('',#5,#8,#11,.T.);
#16=ORIENTED_EDGE('',*,*,#12,.T.);
#17=ORIENTED_EDGE('',*,*,#13,.T.);
#18=ORIENTED_EDGE('',*,*,#14,.F.);
#19=ORIENTED_EDGE('',*,*,#15,.F.);
#20=EDGE_LOOP('',(#16,#17,#18,#19));
#21=FACE_OUTER_BOUND('',#20,.T.);
#30=CARTESIAN_POINT('',(3.,3.,0.));
#31=CARTESIAN_POINT('',(7.,3.,0.));
#32=CARTESIAN_POINT('',(7.,7.,0.));
#33=CARTESIAN_POINT('',(3.,7.,0.));
#34=POLY_LOOP('',(#30,#33,#32,#31));
#35=FACE_BOUND('',#34,.T.);
#40=DIRECTION('',(0.,0.,1.));
#41=AXIS2_PLACEMENT_3D('',#1,#40,#9);
#42=PLANE('',#41);
#43=ADVANCED_FACE('',(#21,#35),#42,.T.);
#44=ADVANCED_FACE('',(#21,#35),#42,.F.);
#45=CYLINDRICAL_SURFACE('',#41,5.);
#46=ADVANCED_FACE('',(#21),#45,.T.);";

#[test]
fn test_planar_face_with_hole() {
    let content = step(SQUARE_WITH_HOLE);
    let mut decoder = EntityDecoder::new(&content);
    let mut edges = EdgeSampler::new(1.0);
    let mut ctx = FaceContext {
        decoder: &mut decoder,
        edges: &mut edges,
    };

    let processor = PlanarFaceProcessor::new();
    assert_eq!(processor.supported_types(), vec![StepType::Plane]);

    let face = ctx.decoder.decode_by_id(43).unwrap();
    let triangles = processor.process(&face, &mut ctx).unwrap();

    assert_eq!(triangles.len(), 8);
    assert_relative_eq!(area(&triangles), 100.0 - 16.0, epsilon = 1e-9);
    for [a, b, c] in &triangles {
        assert!((b - a).cross(&(c - a)).z > 0.0);
    }
}

#[test]
fn test_face_same_sense_false_flips_winding() {
    let content = step(SQUARE_WITH_HOLE);
    let mut decoder = EntityDecoder::new(&content);
    let mut edges = EdgeSampler::new(1.0);
    let mut ctx = FaceContext {
        decoder: &mut decoder,
        edges: &mut edges,
    };

    let face = ctx.decoder.decode_by_id(44).unwrap();
    let triangles = PlanarFaceProcessor::new().process(&face, &mut ctx).unwrap();
    let down = Vector3::new(0.0, 0.0, -1.0);
    for [a, b, c] in &triangles {
        assert!((b - a).cross(&(c - a)).dot(&down) > 0.0);
    }
}

#[test]
fn test_planar_processor_rejects_other_surfaces() {
    let content = step(SQUARE_WITH_HOLE);
    let mut decoder = EntityDecoder::new(&content);
    let mut edges = EdgeSampler::new(1.0);
    let mut ctx = FaceContext {
        decoder: &mut decoder,
        edges: &mut edges,
    };

    let face = ctx.decoder.decode_by_id(46).unwrap();
    let err = PlanarFaceProcessor::new().process(&face, &mut ctx).unwrap_err();
    assert_eq!(
        err,
        Error::Unsupported {
            kind: "surface",
            type_name: "CYLINDRICAL_SURFACE".to_string()
        }
    );
}

/// Quarter of a cylinder wall r = 5, h = 10 between x = 5 and y = 5
const QUARTER_CYLINDER: &str = "#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=DIRECTION('',(0.,0.,1.));
#3=DIRECTION('',(1.,0.,0.));
#4=AXIS2_PLACEMENT_3D('',#1,#2,#3);
#5=CARTESIAN_POINT('',(0.,0.,10.));
#6=AXIS2_PLACEMENT_3D('',#5,#2,#3);
#7=CIRCLE('',#4,5.);
#8=CIRCLE('',#6,5.);
#10=CARTESIAN_POINT('',(5.,0.,0.));
#11=CARTESIAN_POINT('',(0.,5.,0.));
#12=CARTESIAN_POINT('',(0.,5.,10.));
#13=CARTESIAN_POINT('',(5.,0.,10.));
#14=VERTEX_POINT('',#10);
#15=VERTEX_POINT('',#11);
#16=VERTEX_POINT('',#12);
#17=VERTEX_POINT('',#13);
#18=VECTOR('',#2,10.);
#19=LINE('',#10,#18);
#20=LINE('',#11,#18);
#21=EDGE_CURVE('',#14,#15,#7,.T.);
#22=EDGE_CURVE('',#15,#16,#20,.T.);
#23=EDGE_CURVE('',#17,#16,#8,.T.);
#24=EDGE_CURVE('',#14,#17,#19,.T.);
#25=ORIENTED_EDGE('',*,*,#21,.T.);
#26=ORIENTED_EDGE('',*,*,#22,.T.);
#27=ORIENTED_EDGE('',*,*,#23,.F.);
#28=ORIENTED_EDGE('',*,*,#24,.F.);
#29=EDGE_LOOP('',(#25,#26,#27,#28));
#30=FACE_OUTER_BOUND('',#29,.T.);
#31=CYLINDRICAL_SURFACE('',#4,5.);
#32=ADVANCED_FACE('',(#30),#31,.T.);
#33=ADVANCED_FACE('',(#30),#31,.F.);";

fn curved_face(id: u32) -> Vec<crate::Triangle> {
    let content = step(QUARTER_CYLINDER);
    let mut decoder = EntityDecoder::new(&content);
    let mut edges = EdgeSampler::new(1.0);
    let mut ctx = FaceContext {
        decoder: &mut decoder,
        edges: &mut edges,
    };
    let face = ctx.decoder.decode_by_id(id).unwrap();
    CurvedFaceProcessor::new().process(&face, &mut ctx).unwrap()
}

#[test]
fn test_cylinder_face_follows_surface() {
    let triangles = curved_face(32);
    assert!(!triangles.is_empty());

    let exact = std::f64::consts::FRAC_PI_2 * 5.0 * 10.0;
    assert_relative_eq!(area(&triangles), exact, max_relative = 0.01);

    for [a, b, c] in &triangles {
        for p in [a, b, c] {
            assert_relative_eq!(p.x.hypot(p.y), 5.0, epsilon = 1e-6);
            assert!(p.x >= -1e-9 && p.y >= -1e-9);
        }
        // Wound around the outward radial direction
        let centroid = (a.coords + b.coords + c.coords) / 3.0;
        let radial = Vector3::new(centroid.x, centroid.y, 0.0);
        assert!((b - a).cross(&(c - a)).dot(&radial) > 0.0);
    }
}

#[test]
fn test_cylinder_face_same_sense_false_faces_axis() {
    for [a, b, c] in &curved_face(33) {
        let centroid = (a.coords + b.coords + c.coords) / 3.0;
        let radial = Vector3::new(centroid.x, centroid.y, 0.0);
        assert!((b - a).cross(&(c - a)).dot(&radial) < 0.0);
    }
}

#[test]
fn test_poly_face_concave_outline() {
    // L-shaped outline, scaled from inches
    let content = step(
        "#1=CARTESIAN_POINT('',(0.,0.,1.));
#2=CARTESIAN_POINT('',(3.,0.,1.));
#3=CARTESIAN_POINT('',(3.,1.,1.));
#4=CARTESIAN_POINT('',(1.,1.,1.));
#5=CARTESIAN_POINT('',(1.,2.,1.));
#6=CARTESIAN_POINT('',(0.,2.,1.));
#7=POLY_LOOP('',(#1,#2,#3,#4,#5,#6));
#8=FACE_OUTER_BOUND('',#7,.T.);
#9=FACE('',(#8));",
    );
    let mut decoder = EntityDecoder::new(&content);
    let mut edges = EdgeSampler::new(25.4);
    let mut ctx = FaceContext {
        decoder: &mut decoder,
        edges: &mut edges,
    };

    let face = ctx.decoder.decode_by_id(9).unwrap();
    let triangles = PolyFaceProcessor::new().process(&face, &mut ctx).unwrap();

    assert_eq!(triangles.len(), 4);
    assert_relative_eq!(area(&triangles), 4.0 * 25.4 * 25.4, max_relative = 1e-12);
    assert!(triangles.iter().flatten().all(|p| (p.z - 25.4).abs() < 1e-12));
}

#[test]
fn test_vertex_loop_face_is_empty() {
    let content = step(
        "#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=VERTEX_POINT('',#1);
#3=VERTEX_LOOP('',#2);
#4=FACE_BOUND('',#3,.T.);
#5=FACE('',(#4));",
    );
    let mut decoder = EntityDecoder::new(&content);
    let mut edges = EdgeSampler::new(1.0);
    let mut ctx = FaceContext {
        decoder: &mut decoder,
        edges: &mut edges,
    };

    let face = ctx.decoder.decode_by_id(5).unwrap();
    let triangles = PolyFaceProcessor::new().process(&face, &mut ctx).unwrap();
    assert!(triangles.is_empty());
}
