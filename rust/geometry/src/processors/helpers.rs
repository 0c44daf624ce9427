// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared helper functions for face processors.
//!
//! Bound and loop extraction used by every face type.

use crate::mesh::WELD_TOLERANCE;
use crate::router::FaceContext;
use crate::{Error, Point3, Result};
use curiosity_core::{DecodedEntity, StepType};

/// Boundary polygons of one face, in face orientation
pub(super) struct FaceBounds {
    pub(super) outer: Vec<Point3<f64>>,
    pub(super) holes: Vec<Vec<Point3<f64>>>,
}

/// Every usable loop of a face, in face orientation, tagged outer or not
///
/// Reads attribute 1 of ADVANCED_FACE, FACE_SURFACE and FACE.
pub(super) fn face_loops(
    face: &DecodedEntity,
    ctx: &mut FaceContext,
) -> Result<Vec<(bool, Vec<Point3<f64>>)>> {
    let mut loops = Vec::new();

    for bound_id in face.get_ref_list(1) {
        let bound = ctx.decoder.decode_expecting(
            bound_id,
            &[StepType::FaceBound, StepType::FaceOuterBound],
            "FACE_BOUND",
        )?;
        // FACE_BOUND(name, bound, orientation)
        let loop_id = bound
            .get_ref(1)
            .ok_or_else(|| Error::topology(bound_id, "face bound without loop"))?;
        let orientation = bound.get_bool(2).unwrap_or(true);

        let mut points = match loop_polygon(loop_id, ctx)? {
            Some(points) => points,
            None => continue,
        };
        if !orientation {
            points.reverse();
        }

        loops.push((bound.step_type == StepType::FaceOuterBound, points));
    }

    Ok(loops)
}

/// Collect the bounds of a planar face
///
/// Returns None when no bound yields a usable polygon.
pub(super) fn face_bounds(
    face: &DecodedEntity,
    ctx: &mut FaceContext,
) -> Result<Option<FaceBounds>> {
    let mut outer: Option<Vec<Point3<f64>>> = None;
    let mut others: Vec<Vec<Point3<f64>>> = Vec::new();

    for (is_outer, points) in face_loops(face, ctx)? {
        if is_outer && outer.is_none() {
            outer = Some(points);
        } else {
            others.push(points);
        }
    }

    // Without an explicit outer bound the largest loop is the outer one
    let outer = match outer {
        Some(outer) => outer,
        None => {
            let largest = others
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| polygon_area(a).total_cmp(&polygon_area(b)))
                .map(|(i, _)| i);
            match largest {
                Some(i) => others.swap_remove(i),
                None => return Ok(None),
            }
        }
    };

    Ok(Some(FaceBounds {
        outer,
        holes: others,
    }))
}

/// Points of an EDGE_LOOP or POLY_LOOP; None for degenerate loops
fn loop_polygon(loop_id: u32, ctx: &mut FaceContext) -> Result<Option<Vec<Point3<f64>>>> {
    let entity = ctx.decoder.decode_by_id(loop_id)?;

    let points = match entity.step_type {
        StepType::EdgeLoop => edge_loop_points(&entity, ctx)?,
        StepType::PolyLoop => entity
            .get_ref_list(1)
            .into_iter()
            .map(|id| ctx.edges.point(ctx.decoder, id))
            .collect::<Result<Vec<_>>>()?,
        StepType::VertexLoop => return Ok(None),
        _ => {
            return Err(Error::Unsupported {
                kind: "loop",
                type_name: entity.type_name.clone(),
            })
        }
    };

    let points = dedup_ring(points);
    Ok(if points.len() >= 3 { Some(points) } else { None })
}

/// Chain the oriented edges of an EDGE_LOOP into one ring
fn edge_loop_points(edge_loop: &DecodedEntity, ctx: &mut FaceContext) -> Result<Vec<Point3<f64>>> {
    let mut ring = Vec::new();

    for oriented_id in edge_loop.get_ref_list(1) {
        let oriented = ctx.decoder.decode_by_id(oriented_id)?;

        // ORIENTED_EDGE(name, *, *, edge_element, orientation)
        let (edge_id, forward) = match oriented.step_type {
            StepType::OrientedEdge => (
                oriented
                    .get_ref(3)
                    .ok_or_else(|| Error::topology(oriented_id, "oriented edge without edge"))?,
                oriented.get_bool(4).unwrap_or(true),
            ),
            StepType::EdgeCurve => (oriented_id, true),
            _ => {
                return Err(Error::topology(
                    oriented_id,
                    format!("expected ORIENTED_EDGE, found {}", oriented.type_name),
                ))
            }
        };

        let samples = ctx.edges.edge_curve(ctx.decoder, edge_id)?;
        // Drop the last sample; the next edge starts there
        let take = samples.len().saturating_sub(1);
        if forward {
            ring.extend(samples.iter().take(take).copied());
        } else {
            ring.extend(samples.iter().rev().take(take).copied());
        }
    }

    Ok(ring)
}

/// Remove consecutive duplicates (including the closing point)
fn dedup_ring(mut points: Vec<Point3<f64>>) -> Vec<Point3<f64>> {
    points.dedup_by(|a, b| (*a - *b).norm() < WELD_TOLERANCE);
    while points.len() > 1 {
        let (first, last) = (points[0], points[points.len() - 1]);
        if (first - last).norm() < WELD_TOLERANCE {
            points.pop();
        } else {
            break;
        }
    }
    points
}

/// Area of a planar polygon in 3D
pub(super) fn polygon_area(points: &[Point3<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let origin = points[0];
    let mut sum = nalgebra::Vector3::zeros();
    for i in 1..n - 1 {
        sum += (points[i] - origin).cross(&(points[i + 1] - origin));
    }
    sum.norm() / 2.0
}
