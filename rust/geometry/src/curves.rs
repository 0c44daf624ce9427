// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge discretisation
//!
//! Turns EDGE_CURVE geometry into polylines. Each edge is sampled once and
//! cached so that the two faces sharing an edge see the same points.

use crate::nurbs::BSplineCurve;
use crate::{Error, Point3, Result, Vector3};
use curiosity_core::{DecodedEntity, EntityDecoder, StepType};
use rustc_hash::FxHashMap;
use std::f64::consts::TAU;
use std::sync::Arc;

/// Maximum distance between a circle and its chords (mm)
pub const CHORD_TOLERANCE: f64 = 0.01;

/// Upper bound on segments for a full circle
const MAX_CIRCLE_SEGMENTS: usize = 4096;

/// Local frame of an AXIS2_PLACEMENT_3D
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub origin: Point3<f64>,
    pub axis: Vector3<f64>,
    pub ref_direction: Vector3<f64>,
}

impl Placement {
    /// Third axis completing the right-handed frame
    pub fn y_axis(&self) -> Vector3<f64> {
        self.axis.cross(&self.ref_direction)
    }

    /// Coordinates of `p` in the frame (ref_direction, y_axis, axis)
    pub fn to_local(&self, p: &Point3<f64>) -> Vector3<f64> {
        let d = p - self.origin;
        Vector3::new(
            d.dot(&self.ref_direction),
            d.dot(&self.y_axis()),
            d.dot(&self.axis),
        )
    }

    /// World point of local coordinates
    pub fn to_world(&self, x: f64, y: f64, z: f64) -> Point3<f64> {
        self.origin + self.ref_direction * x + self.y_axis() * y + self.axis * z
    }
}

/// Samples and caches edge curves in model units scaled to millimetres
pub struct EdgeSampler {
    scale: f64,
    angle_scale: f64,
    cache: FxHashMap<u32, Arc<Vec<Point3<f64>>>>,
}

impl EdgeSampler {
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            angle_scale: 1.0,
            cache: FxHashMap::default(),
        }
    }

    /// Use a plane angle unit other than radians
    pub fn with_angle_scale(mut self, angle_scale: f64) -> Self {
        self.angle_scale = angle_scale;
        self
    }

    /// Length scale applied to every coordinate
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Radians per model plane angle unit
    pub fn angle_scale(&self) -> f64 {
        self.angle_scale
    }

    /// Number of distinct edges sampled so far
    pub fn cached_edges(&self) -> usize {
        self.cache.len()
    }

    /// Scaled CARTESIAN_POINT
    pub fn point(&self, decoder: &mut EntityDecoder, id: u32) -> Result<Point3<f64>> {
        let (x, y, z) = decoder.get_cartesian_point(id)?;
        Ok(Point3::new(x, y, z) * self.scale)
    }

    /// Point of a VERTEX_POINT
    pub fn vertex(&self, decoder: &mut EntityDecoder, id: u32) -> Result<Point3<f64>> {
        let vertex = decoder.decode_expecting(id, &[StepType::VertexPoint], "VERTEX_POINT")?;
        let point_id = vertex
            .get_ref(1)
            .ok_or_else(|| Error::topology(id, "vertex without point"))?;
        self.point(decoder, point_id)
    }

    /// Samples of an EDGE_CURVE from its start vertex to its end vertex
    pub fn edge_curve(
        &mut self,
        decoder: &mut EntityDecoder,
        edge_id: u32,
    ) -> Result<Arc<Vec<Point3<f64>>>> {
        if let Some(points) = self.cache.get(&edge_id) {
            return Ok(Arc::clone(points));
        }

        let edge = decoder.decode_expecting(edge_id, &[StepType::EdgeCurve], "EDGE_CURVE")?;
        // EDGE_CURVE(name, edge_start, edge_end, edge_geometry, same_sense)
        let start_id = edge
            .get_ref(1)
            .ok_or_else(|| Error::topology(edge_id, "edge without start vertex"))?;
        let end_id = edge
            .get_ref(2)
            .ok_or_else(|| Error::topology(edge_id, "edge without end vertex"))?;
        let geometry_id = edge
            .get_ref(3)
            .ok_or_else(|| Error::topology(edge_id, "edge without geometry"))?;
        let same_sense = edge.get_bool(4).unwrap_or(true);

        let start = self.vertex(decoder, start_id)?;
        let end = self.vertex(decoder, end_id)?;
        let curve = self.resolve_curve(decoder, geometry_id)?;

        let points = match curve.step_type {
            StepType::Line => vec![start, end],
            StepType::Polyline => self.polyline(decoder, &curve, start, end, same_sense)?,
            StepType::Circle | StepType::Ellipse => {
                self.conic(decoder, &curve, start, end, same_sense)?
            }
            StepType::BSplineCurveWithKnots => {
                self.bspline(decoder, &curve, start, end, same_sense)?
            }
            StepType::Complex if curve.is_a("B_SPLINE_CURVE_WITH_KNOTS") => {
                self.bspline(decoder, &curve, start, end, same_sense)?
            }
            _ => {
                return Err(Error::Unsupported {
                    kind: "curve",
                    type_name: curve.type_name.clone(),
                })
            }
        };

        let points = Arc::new(points);
        self.cache.insert(edge_id, Arc::clone(&points));
        Ok(points)
    }

    /// Follow SURFACE_CURVE / SEAM_CURVE to their 3D curve
    fn resolve_curve(&self, decoder: &mut EntityDecoder, id: u32) -> Result<DecodedEntity> {
        let mut curve = decoder.decode_by_id(id)?;
        for _ in 0..4 {
            match curve.step_type {
                StepType::SurfaceCurve | StepType::SeamCurve => {
                    let curve_3d = curve
                        .get_ref(1)
                        .ok_or_else(|| Error::topology(curve.id, "surface curve without 3D curve"))?;
                    curve = decoder.decode_by_id(curve_3d)?;
                }
                _ => return Ok(curve),
            }
        }
        Err(Error::topology(id, "surface curve nesting too deep"))
    }

    fn polyline(
        &self,
        decoder: &mut EntityDecoder,
        curve: &DecodedEntity,
        start: Point3<f64>,
        end: Point3<f64>,
        same_sense: bool,
    ) -> Result<Vec<Point3<f64>>> {
        let mut points = curve
            .get_ref_list(1)
            .into_iter()
            .map(|id| self.point(decoder, id))
            .collect::<Result<Vec<_>>>()?;

        if points.len() < 2 {
            return Err(Error::topology(curve.id, "polyline with fewer than 2 points"));
        }
        if !same_sense {
            points.reverse();
        }

        // Snap the ends onto the topological vertices
        let last = points.len() - 1;
        points[0] = start;
        points[last] = end;
        Ok(points)
    }

    /// CIRCLE(name, position, radius) or ELLIPSE(name, position, semi_axis_1, semi_axis_2)
    fn conic(
        &self,
        decoder: &mut EntityDecoder,
        curve: &DecodedEntity,
        start: Point3<f64>,
        end: Point3<f64>,
        same_sense: bool,
    ) -> Result<Vec<Point3<f64>>> {
        let placement_id = curve
            .get_ref(1)
            .ok_or_else(|| Error::topology(curve.id, "conic without placement"))?;
        let frame = placement(self, decoder, placement_id)?;
        let rx = curve
            .get_float(2)
            .ok_or_else(|| Error::topology(curve.id, "conic without radius"))?
            * self.scale;
        let ry = match curve.step_type {
            StepType::Ellipse => {
                curve
                    .get_float(3)
                    .ok_or_else(|| Error::topology(curve.id, "ellipse without second semi axis"))?
                    * self.scale
            }
            _ => rx,
        };

        if rx.is_nan() || ry.is_nan() || rx <= 0.0 || ry <= 0.0 {
            return Err(Error::topology(curve.id, "conic radius must be positive"));
        }

        let angle_of = |p: &Point3<f64>| {
            let local = frame.to_local(p);
            (local.y / ry).atan2(local.x / rx)
        };

        let start_angle = angle_of(&start);
        let end_angle = angle_of(&end);

        // Sweep in the direction of travel; coincident ends close a full loop
        let mut sweep = if same_sense {
            end_angle - start_angle
        } else {
            start_angle - end_angle
        };
        sweep = sweep.rem_euclid(TAU);
        if (start - end).norm() < 1e-9 || sweep < 1e-12 {
            sweep = TAU;
        }

        let segments = circle_segments(rx.max(ry), sweep);
        let direction = if same_sense { 1.0 } else { -1.0 };

        let mut points = Vec::with_capacity(segments + 1);
        points.push(start);
        for i in 1..segments {
            let t = start_angle + direction * sweep * (i as f64 / segments as f64);
            points.push(frame.to_world(rx * t.cos(), ry * t.sin(), 0.0));
        }
        points.push(end);
        Ok(points)
    }

    fn bspline(
        &self,
        decoder: &mut EntityDecoder,
        curve: &DecodedEntity,
        start: Point3<f64>,
        end: Point3<f64>,
        same_sense: bool,
    ) -> Result<Vec<Point3<f64>>> {
        let spline = BSplineCurve::from_entity(self, decoder, curve)?;

        let (t0, t1) = if (start - end).norm() < 1e-9 {
            // Closed edge runs over the whole curve
            let (low, high) = spline.domain();
            if same_sense {
                (low, high)
            } else {
                (high, low)
            }
        } else {
            (spline.parameter_of(&start), spline.parameter_of(&end))
        };

        // Double the segment count until every chord midpoint is within tolerance
        let mut segments = (spline.control_count() - 1).max(2);
        let mut points = Vec::new();
        loop {
            points.clear();
            points.extend(
                (0..=segments).map(|i| spline.point(t0 + (t1 - t0) * (i as f64 / segments as f64))),
            );
            let within = (0..segments).all(|i| {
                let mid = spline.point(t0 + (t1 - t0) * ((i as f64 + 0.5) / segments as f64));
                let chord = Point3::from((points[i].coords + points[i + 1].coords) / 2.0);
                (mid - chord).norm() <= CHORD_TOLERANCE
            });
            if within || segments >= MAX_CIRCLE_SEGMENTS {
                break;
            }
            segments = (segments * 2).min(MAX_CIRCLE_SEGMENTS);
        }

        // Snap the ends onto the topological vertices
        let last = points.len() - 1;
        points[0] = start;
        points[last] = end;
        Ok(points)
    }
}

/// Segment count keeping the chord deviation within CHORD_TOLERANCE
pub fn circle_segments(radius: f64, sweep: f64) -> usize {
    let max_step = if radius <= CHORD_TOLERANCE {
        std::f64::consts::PI
    } else {
        2.0 * (1.0 - CHORD_TOLERANCE / radius).acos()
    };

    let min_segments = if sweep >= TAU - 1e-9 { 3 } else { 1 };
    let segments = (sweep / max_step).ceil() as usize;
    segments.clamp(min_segments, MAX_CIRCLE_SEGMENTS)
}

/// Decode an AXIS2_PLACEMENT_3D into a frame with unit axes
pub fn placement(
    sampler: &EdgeSampler,
    decoder: &mut EntityDecoder,
    id: u32,
) -> Result<Placement> {
    let entity = decoder.decode_expecting(id, &[StepType::Axis2Placement3d], "AXIS2_PLACEMENT_3D")?;
    // AXIS2_PLACEMENT_3D(name, location, axis, ref_direction)
    let origin_id = entity
        .get_ref(1)
        .ok_or_else(|| Error::topology(id, "placement without location"))?;
    let origin = sampler.point(decoder, origin_id)?;

    let axis = match entity.get_ref(2) {
        Some(dir) => direction(decoder, dir)?,
        None => Vector3::z(),
    };

    let ref_hint = match entity.get_ref(3) {
        Some(dir) => direction(decoder, dir)?,
        None => {
            if axis.x.abs() < 0.9 {
                Vector3::x()
            } else {
                Vector3::y()
            }
        }
    };

    // Orthogonalise the reference direction against the axis
    let ref_direction = (ref_hint - axis * ref_hint.dot(&axis))
        .try_normalize(1e-12)
        .ok_or_else(|| Error::topology(id, "reference direction parallel to axis"))?;

    Ok(Placement {
        origin,
        axis,
        ref_direction,
    })
}

/// Unit vector of a DIRECTION
pub fn direction(decoder: &mut EntityDecoder, id: u32) -> Result<Vector3<f64>> {
    let entity = decoder.decode_expecting(id, &[StepType::Direction], "DIRECTION")?;
    let (x, y, z) = entity
        .get(1)
        .and_then(|v| v.as_point3())
        .ok_or_else(|| Error::topology(id, "direction without ratios"))?;
    Vector3::new(x, y, z)
        .try_normalize(1e-12)
        .ok_or_else(|| Error::topology(id, "zero-length direction"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn step(data: &str) -> String {
        format!(
            "ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
            data
        )
    }

    const FRAME: &str = "#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=DIRECTION('',(0.,0.,1.));
#3=DIRECTION('',(1.,0.,0.));
#4=AXIS2_PLACEMENT_3D('',#1,#2,#3);";

    #[test]
    fn test_line_edge() {
        let content = step(
            "#10=CARTESIAN_POINT('',(0.,0.,0.));
#11=CARTESIAN_POINT('',(10.,0.,0.));
#12=VERTEX_POINT('',#10);
#13=VERTEX_POINT('',#11);
#14=DIRECTION('',(1.,0.,0.));
#15=VECTOR('',#14,10.);
#16=LINE('',#10,#15);
#17=EDGE_CURVE('',#12,#13,#16,.T.);",
        );
        let mut decoder = EntityDecoder::new(&content);
        let mut sampler = EdgeSampler::new(2.0);
        let points = sampler.edge_curve(&mut decoder, 17).unwrap();
        assert_eq!(points.as_slice(), &[Point3::origin(), Point3::new(20.0, 0.0, 0.0)]);
        assert_eq!(sampler.cached_edges(), 1);
    }

    #[test]
    fn test_full_circle_respects_tolerance() {
        let content = step(&format!(
            "{}
#10=CIRCLE('',#4,5.);
#11=CARTESIAN_POINT('',(5.,0.,0.));
#12=VERTEX_POINT('',#11);
#13=EDGE_CURVE('',#12,#12,#10,.T.);",
            FRAME
        ));
        let mut decoder = EntityDecoder::new(&content);
        let mut sampler = EdgeSampler::new(1.0);
        let points = sampler.edge_curve(&mut decoder, 13).unwrap();

        assert_eq!(points.first(), points.last());
        let segments = points.len() - 1;
        assert_eq!(segments, circle_segments(5.0, TAU));

        // Chord midpoints stay within tolerance of the circle
        for pair in points.windows(2) {
            let mid = Point3::from((pair[0].coords + pair[1].coords) / 2.0);
            let sagitta = 5.0 - mid.coords.norm();
            assert!(sagitta <= CHORD_TOLERANCE + 1e-9);
        }
        // Counter-clockwise around +Z
        assert!(points[1].y > 0.0);
    }

    #[test]
    fn test_reversed_arc() {
        let content = step(&format!(
            "{}
#10=CIRCLE('',#4,1.);
#11=CARTESIAN_POINT('',(1.,0.,0.));
#12=CARTESIAN_POINT('',(0.,1.,0.));
#13=VERTEX_POINT('',#11);
#14=VERTEX_POINT('',#12);
#15=EDGE_CURVE('',#13,#14,#10,.F.);",
            FRAME
        ));
        let mut decoder = EntityDecoder::new(&content);
        let mut sampler = EdgeSampler::new(1.0);
        let points = sampler.edge_curve(&mut decoder, 15).unwrap();

        // Clockwise from (1,0) to (0,1) passes through negative y
        assert!(points.iter().any(|p| p.y < -0.5));
        assert_relative_eq!(points.last().unwrap().y, 1.0);
    }

    #[test]
    fn test_ellipse_edge() {
        let content = step(&format!(
            "{}
#10=ELLIPSE('',#4,4.,2.);
#11=CARTESIAN_POINT('',(4.,0.,0.));
#12=CARTESIAN_POINT('',(0.,2.,0.));
#13=VERTEX_POINT('',#11);
#14=VERTEX_POINT('',#12);
#15=EDGE_CURVE('',#13,#14,#10,.T.);",
            FRAME
        ));
        let mut decoder = EntityDecoder::new(&content);
        let mut sampler = EdgeSampler::new(1.0);
        let points = sampler.edge_curve(&mut decoder, 15).unwrap();

        assert!(points.len() > 3);
        for p in points.iter() {
            let on_ellipse = (p.x / 4.0).powi(2) + (p.y / 2.0).powi(2);
            assert_relative_eq!(on_ellipse, 1.0, epsilon = 1e-9);
            assert!(p.x >= -1e-12 && p.y >= -1e-12);
        }
    }

    #[test]
    fn test_bspline_edge_within_tolerance() {
        // Quadratic open curve through a bulge above the x axis
        let content = step(
            "#10=CARTESIAN_POINT('',(0.,0.,0.));
#11=CARTESIAN_POINT('',(5.,8.,0.));
#12=CARTESIAN_POINT('',(10.,0.,0.));
#13=VERTEX_POINT('',#10);
#14=VERTEX_POINT('',#12);
#15=B_SPLINE_CURVE_WITH_KNOTS('',2,(#10,#11,#12),.UNSPECIFIED.,.F.,.F.,(3,3),(0.,1.),.UNSPECIFIED.);
#16=EDGE_CURVE('',#14,#13,#15,.F.);",
        );
        let mut decoder = EntityDecoder::new(&content);
        let mut sampler = EdgeSampler::new(1.0);
        let points = sampler.edge_curve(&mut decoder, 16).unwrap();

        // Reversed edge starts at its start vertex
        assert_eq!(points[0], Point3::new(10.0, 0.0, 0.0));
        assert_eq!(*points.last().unwrap(), Point3::origin());
        // Parabola y = 0.16 x (10 - x) peaks at 4 with x = 5
        let peak = points.iter().map(|p| p.y).fold(0.0, f64::max);
        assert!((peak - 4.0).abs() < 0.05);
        for p in points.iter() {
            assert_relative_eq!(p.y, 0.16 * p.x * (10.0 - p.x), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_unsupported_curve() {
        let content = step(&format!(
            "{}
#10=CARTESIAN_POINT('',(1.,0.,0.));
#11=VERTEX_POINT('',#10);
#12=HYPERBOLA('',#4,1.,1.);
#13=EDGE_CURVE('',#11,#11,#12,.T.);",
            FRAME
        ));
        let mut decoder = EntityDecoder::new(&content);
        let mut sampler = EdgeSampler::new(1.0);
        let err = sampler.edge_curve(&mut decoder, 13).unwrap_err();
        assert_eq!(
            err,
            Error::Unsupported {
                kind: "curve",
                type_name: "HYPERBOLA".to_string()
            }
        );
    }

    #[test]
    fn test_segment_count_grows_with_radius() {
        assert!(circle_segments(100.0, TAU) > circle_segments(1.0, TAU));
        assert_eq!(circle_segments(0.001, TAU), 3);
    }
}
