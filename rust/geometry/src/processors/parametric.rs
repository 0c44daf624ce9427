// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tessellation of faces on curved surfaces.
//!
//! Boundary loops are mapped into the (u, v) domain of the surface, closed
//! across seams and poles, ear-clipped there and refined until every interior
//! edge is within CHORD_TOLERANCE of the surface. Boundary vertices keep the
//! cached edge samples, so neighbouring faces weld onto the same points.

use crate::curves::CHORD_TOLERANCE;
use crate::router::FaceContext;
use crate::surfaces::{FullDomain, ParametricSurface};
use crate::triangulation::{earcut_polygon, Triangle};
use crate::{Error, Point2, Point3, Result};
use curiosity_core::DecodedEntity;
use rustc_hash::{FxHashMap, FxHashSet};

use super::helpers::face_loops;

/// Parameter values are snapped to this grid so exactly collinear runs stay collinear
const UV_QUANTUM: f64 = 1e-9;

/// Loops enclosing less parameter area than this are degenerate
const AREA_EPSILON: f64 = 1e-12;

const MAX_REFINE_PASSES: usize = 10;

/// Refinement stops adding vertices to a face beyond this count
const MAX_FACE_VERTICES: usize = 250_000;

const MAX_CUT_SEGMENTS: usize = 64;

#[inline]
fn quantize(value: f64) -> f64 {
    (value / UV_QUANTUM).round() * UV_QUANTUM
}

/// `value` shifted by whole periods to lie nearest `reference`
#[inline]
fn nearest(value: f64, reference: f64, period: f64) -> f64 {
    value + ((reference - value) / period).round() * period
}

#[inline]
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[inline]
fn cross(o: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Surface seen through an optional u/v swap
#[derive(Clone, Copy)]
struct Param<'s> {
    surface: &'s dyn ParametricSurface,
    transposed: bool,
}

impl Param<'_> {
    fn point(&self, uv: Point2<f64>) -> Point3<f64> {
        if self.transposed {
            self.surface.point(uv.y, uv.x)
        } else {
            self.surface.point(uv.x, uv.y)
        }
    }
}

/// Domain vertex with the model point it stands for
#[derive(Debug, Clone, Copy)]
struct Vertex {
    uv: Point2<f64>,
    xyz: Point3<f64>,
}

impl Vertex {
    fn new(u: f64, v: f64, xyz: Point3<f64>) -> Self {
        Self {
            uv: Point2::new(quantize(u), quantize(v)),
            xyz,
        }
    }

    fn shifted(&self, du: f64) -> Self {
        Self::new(self.uv.x + du, self.uv.y, self.xyz)
    }
}

/// One face loop in the parameter domain
#[derive(Debug)]
struct UvLoop {
    vertices: Vec<Vertex>,
    /// Net turns around the u and v periods
    turns: (i32, i32),
}

impl UvLoop {
    fn area(&self) -> f64 {
        let n = self.vertices.len();
        (0..n)
            .map(|i| {
                let a = self.vertices[i].uv;
                let b = self.vertices[(i + 1) % n].uv;
                a.x * b.y - b.x * a.y
            })
            .sum::<f64>()
            / 2.0
    }

    fn transpose(&mut self) {
        for vertex in &mut self.vertices {
            vertex.uv = Point2::new(vertex.uv.y, vertex.uv.x);
        }
        self.turns = (self.turns.1, self.turns.0);
    }
}

/// Map a loop of model points into the parameter domain
///
/// Periodic parameters are unwrapped along the loop. A point where u is
/// undefined becomes two vertices on the collapsed row, one per neighbour.
fn map_loop(surface: &dyn ParametricSurface, ring: &[Point3<f64>]) -> Option<UvLoop> {
    let n = ring.len();
    let singular: Vec<bool> = ring.iter().map(|p| surface.is_singular(p)).collect();
    if n < 3 || singular.iter().all(|&s| s) {
        return None;
    }
    let (u_period, v_period) = (surface.u_period(), surface.v_period());

    // Start just after a singular point so no unwrapping runs across one
    let start = (0..n)
        .find(|&i| !singular[i] && singular[(i + n - 1) % n])
        .unwrap_or(0);
    let order: Vec<usize> = (0..n).map(|k| (start + k) % n).collect();

    let mut unwrapped: Vec<Option<Point2<f64>>> = vec![None; n];
    let mut previous: Option<Point2<f64>> = None;
    for &i in &order {
        if singular[i] {
            continue;
        }
        let mut uv = surface.parameters(&ring[i]);
        if let Some(prev) = previous {
            if let Some(period) = u_period {
                uv.x = nearest(uv.x, prev.x, period);
            }
            if let Some(period) = v_period {
                uv.y = nearest(uv.y, prev.y, period);
            }
        }
        unwrapped[i] = Some(uv);
        previous = Some(uv);
    }

    let first = unwrapped[order[0]]?;
    let has_singular = singular.iter().any(|&s| s);

    let mut vertices = Vec::with_capacity(n + 2);
    for (k, &i) in order.iter().enumerate() {
        if let Some(uv) = unwrapped[i] {
            vertices.push(Vertex::new(uv.x, uv.y, ring[i]));
            continue;
        }
        let v = surface.parameters(&ring[i]).y;
        let before = vertices.last().map(|vertex: &Vertex| vertex.uv.x).unwrap_or(first.x);
        let after = order[k + 1..]
            .iter()
            .find_map(|&j| unwrapped[j])
            .unwrap_or(first)
            .x;
        vertices.push(Vertex::new(before, v, ring[i]));
        if (after - before).abs() > UV_QUANTUM {
            vertices.push(Vertex::new(after, v, ring[i]));
        }
    }

    // Turns are read across the closing segment
    let turns = if has_singular {
        (0, 0)
    } else {
        let last = previous.unwrap_or(first);
        let raw = surface.parameters(&ring[order[0]]);
        let count = |period: Option<f64>, closing: f64, prev: f64, start: f64| match period {
            Some(period) => (((nearest(closing, prev, period)) - start) / period).round() as i32,
            None => 0,
        };
        (
            count(u_period, raw.x, last.x, first.x),
            count(v_period, raw.y, last.y, first.y),
        )
    };

    Some(UvLoop { vertices, turns })
}

/// Intermediate vertices along a cut between two domain points
///
/// Both sides of a cut reuse these model points so the faces either side weld.
fn cut_vertices(param: &Param, from: &Vertex, to: &Vertex) -> Vec<Vertex> {
    let at = |t: f64| from.uv + (to.uv - from.uv) * t;

    let mut segments = 1;
    while segments < MAX_CUT_SEGMENTS {
        let within = (0..segments).all(|i| {
            let t0 = i as f64 / segments as f64;
            let t1 = (i + 1) as f64 / segments as f64;
            let a = if i == 0 { from.xyz } else { param.point(at(t0)) };
            let b = if i + 1 == segments { to.xyz } else { param.point(at(t1)) };
            let mid = param.point(at((t0 + t1) / 2.0));
            (mid - Point3::from((a.coords + b.coords) / 2.0)).norm() <= CHORD_TOLERANCE
        });
        if within {
            break;
        }
        segments *= 2;
    }

    (1..segments)
        .map(|i| {
            let uv = at(i as f64 / segments as f64);
            Vertex::new(uv.x, uv.y, param.point(uv))
        })
        .collect()
}

/// Close a single wrapping loop with the collapsed row at `pole`
fn capped_outline(param: &Param, boundary: UvLoop, period: f64, pole: f64) -> Vec<Vertex> {
    let turn = boundary.turns.0 as f64 * period;
    let first = boundary.vertices[0];
    let apex = param.point(Point2::new(first.uv.x, pole));

    let seam_start = first.shifted(turn);
    let seam_end = Vertex::new(first.uv.x + turn, pole, apex);
    let seam = cut_vertices(param, &seam_start, &seam_end);

    let mut outline = boundary.vertices;
    outline.push(seam_start);
    outline.extend(seam.iter().copied());
    outline.push(seam_end);
    outline.push(Vertex::new(first.uv.x, pole, apex));
    outline.extend(seam.iter().rev().map(|vertex| vertex.shifted(-turn)));
    outline
}

/// Join two loops wrapping in opposite directions into one outline
fn joined_outline(
    param: &Param,
    a: UvLoop,
    b: UvLoop,
    period: f64,
    face_id: u32,
) -> Result<Vec<Vertex>> {
    if a.turns.0 != -b.turns.0 {
        return Err(Error::topology(
            face_id,
            "face boundaries wrap around the surface in the same direction",
        ));
    }
    let turn_a = a.turns.0 as f64 * period;
    let turn_b = b.turns.0 as f64 * period;

    let a_end = a.vertices[0].shifted(turn_a);
    let target = a_end.uv.x;

    // Cut across at the vertex of b closest in angle to the start of a
    let j = b
        .vertices
        .iter()
        .enumerate()
        .min_by(|(_, p), (_, q)| {
            let dp = (nearest(p.uv.x, target, period) - target).abs();
            let dq = (nearest(q.uv.x, target, period) - target).abs();
            dp.total_cmp(&dq)
        })
        .map(|(j, _)| j)
        .unwrap_or(0);

    let count = b.vertices.len();
    let mut rotated: Vec<Vertex> = (0..count)
        .map(|k| {
            let i = (j + k) % count;
            if i < j {
                b.vertices[i].shifted(turn_b)
            } else {
                b.vertices[i]
            }
        })
        .collect();
    let shift = nearest(rotated[0].uv.x, target, period) - rotated[0].uv.x;
    for vertex in &mut rotated {
        *vertex = vertex.shifted(shift);
    }
    let b_end = rotated[0].shifted(turn_b);

    let bridge = cut_vertices(param, &a_end, &rotated[0]);

    let mut outline = a.vertices;
    outline.push(a_end);
    outline.extend(bridge.iter().copied());
    outline.extend(rotated);
    outline.push(b_end);
    outline.extend(bridge.iter().rev().map(|vertex| vertex.shifted(turn_b)));
    Ok(outline)
}

/// Shift a hole by whole periods into the u range of the outline
fn shift_into(hole: Vec<Vertex>, outline: &[Vertex], period: Option<f64>) -> Vec<Vertex> {
    let period = match period {
        Some(period) => period,
        None => return hole,
    };
    let low = outline
        .iter()
        .map(|vertex| vertex.uv.x)
        .fold(f64::INFINITY, f64::min);
    let centre = hole.iter().map(|vertex| vertex.uv.x).sum::<f64>() / hole.len() as f64;
    let k = ((centre - low) / period).floor();
    if k == 0.0 {
        return hole;
    }
    hole.iter().map(|vertex| vertex.shifted(-k * period)).collect()
}

/// Outline and holes of a face in the (possibly transposed) parameter domain
struct Domain {
    outline: Vec<Vertex>,
    holes: Vec<Vec<Vertex>>,
    transposed: bool,
}

fn assemble(
    surface: &dyn ParametricSurface,
    mut loops: Vec<UvLoop>,
    same_sense: bool,
    face_id: u32,
) -> Result<Option<Domain>> {
    let wraps_u = loops.iter().any(|l| l.turns.0 != 0);
    let wraps_v = loops.iter().any(|l| l.turns.1 != 0);
    if wraps_u && wraps_v {
        return Err(Error::topology(
            face_id,
            "face boundaries wrap around both surface directions",
        ));
    }

    let transposed = wraps_v;
    if transposed {
        loops.iter_mut().for_each(UvLoop::transpose);
    }
    let param = Param {
        surface,
        transposed,
    };
    let period = if transposed {
        surface.v_period()
    } else {
        surface.u_period()
    };

    let (wrapping, mut others): (Vec<UvLoop>, Vec<UvLoop>) =
        loops.into_iter().partition(|l| l.turns.0 != 0);
    others.retain(|l| l.area().abs() > AREA_EPSILON);

    let outline = match (wrapping.len(), period) {
        (0, _) => {
            let largest = others
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.area().abs().total_cmp(&b.area().abs()))
                .map(|(i, _)| i);
            match largest {
                Some(i) => others.swap_remove(i).vertices,
                None => return Ok(None),
            }
        }
        (1, Some(period)) => {
            let mut wrapping = wrapping;
            let boundary = wrapping.remove(0);
            // Travelling +u, the face interior lies to the left, towards +v
            let upper = (boundary.turns.0 > 0) == same_sense;
            let pole = if transposed {
                None
            } else {
                surface.pole(upper)
            };
            match pole {
                Some(pole) => capped_outline(&param, boundary, period, pole),
                None => {
                    return Err(Error::topology(
                        face_id,
                        "face wraps around the surface with a single open boundary",
                    ))
                }
            }
        }
        (2, Some(period)) => {
            let mut wrapping = wrapping.into_iter();
            match (wrapping.next(), wrapping.next()) {
                (Some(a), Some(b)) => joined_outline(&param, a, b, period, face_id)?,
                _ => return Ok(None),
            }
        }
        _ => {
            return Err(Error::topology(
                face_id,
                "more than two face boundaries wrap around the surface",
            ))
        }
    };

    let holes = others
        .into_iter()
        .map(|l| shift_into(l.vertices, &outline, period))
        .collect();

    Ok(Some(Domain {
        outline,
        holes,
        transposed,
    }))
}

/// Indexed triangulation of a face domain with its model points
struct DomainMesh<'s> {
    param: Param<'s>,
    uv: Vec<Point2<f64>>,
    xyz: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
    /// Outline and hole edges; never split
    boundary: FxHashSet<(usize, usize)>,
}

impl<'s> DomainMesh<'s> {
    fn triangulate(surface: &'s dyn ParametricSurface, domain: &Domain) -> Result<Self> {
        let param = Param {
            surface,
            transposed: domain.transposed,
        };
        let mut mesh = Self {
            param,
            uv: Vec::new(),
            xyz: Vec::new(),
            triangles: Vec::new(),
            boundary: FxHashSet::default(),
        };

        for ring in std::iter::once(&domain.outline).chain(&domain.holes) {
            let start = mesh.uv.len();
            for (k, vertex) in ring.iter().enumerate() {
                mesh.uv.push(vertex.uv);
                mesh.xyz.push(vertex.xyz);
                let next = start + (k + 1) % ring.len();
                mesh.boundary.insert(edge_key(start + k, next));
            }
        }

        let outline: Vec<Point2<f64>> = domain.outline.iter().map(|v| v.uv).collect();
        let holes: Vec<Vec<Point2<f64>>> = domain
            .holes
            .iter()
            .map(|hole| hole.iter().map(|v| v.uv).collect())
            .collect();

        let indices = earcut_polygon(&outline, &holes)?;
        mesh.triangles = indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        if mesh.triangles.is_empty() {
            return Err(Error::TriangulationError(
                "no triangles in parameter domain".to_string(),
            ));
        }

        mesh.restore_dropped_points();
        mesh.orient();
        Ok(mesh)
    }

    /// Vertices strictly inside segment s-e, ordered from s
    fn points_on_segment(&self, s: usize, e: usize, candidates: &[usize]) -> Vec<usize> {
        let (a, b) = (self.uv[s], self.uv[e]);
        let d = b - a;
        let length = d.norm_squared();
        if length == 0.0 {
            return Vec::new();
        }

        let mut found: Vec<(f64, usize)> = candidates
            .iter()
            .filter(|&&c| c != s && c != e)
            .filter_map(|&c| {
                let w = self.uv[c] - a;
                let t = w.dot(&d) / length;
                let off = d.x * w.y - d.y * w.x;
                (t > 1e-9 && t < 1.0 - 1e-9 && off.abs() <= 1e-9 * length).then_some((t, c))
            })
            .collect();
        found.sort_by(|x, y| x.0.total_cmp(&y.0));
        found.into_iter().map(|(_, c)| c).collect()
    }

    /// Put back collinear points that ear clipping skipped
    ///
    /// A skipped point lies on an edge used by a single triangle; that
    /// triangle is fanned through the points on its edge.
    fn restore_dropped_points(&mut self) {
        for _ in 0..4 {
            let mut counts: FxHashMap<(usize, usize), u32> = FxHashMap::default();
            let mut used = vec![false; self.uv.len()];
            for t in &self.triangles {
                for k in 0..3 {
                    used[t[k]] = true;
                    *counts.entry(edge_key(t[k], t[(k + 1) % 3])).or_default() += 1;
                }
            }

            let open: FxHashSet<(usize, usize)> = counts
                .iter()
                .filter(|(edge, &count)| count == 1 && !self.boundary.contains(*edge))
                .map(|(edge, _)| *edge)
                .collect();
            if open.is_empty() {
                return;
            }

            let mut candidates: Vec<usize> = (0..self.uv.len()).filter(|&i| !used[i]).collect();
            candidates.extend(open.iter().flat_map(|&(a, b)| [a, b]));
            candidates.sort_unstable();
            candidates.dedup();

            let mut changed = false;
            let mut next = Vec::with_capacity(self.triangles.len());
            for t in &self.triangles {
                let split = (0..3).find_map(|k| {
                    let (s, e, r) = (t[k], t[(k + 1) % 3], t[(k + 2) % 3]);
                    if !open.contains(&edge_key(s, e)) {
                        return None;
                    }
                    let inner = self.points_on_segment(s, e, &candidates);
                    (!inner.is_empty()).then_some((s, e, r, inner))
                });
                match split {
                    Some((s, e, r, inner)) => {
                        let mut prev = s;
                        for x in inner {
                            next.push([prev, x, r]);
                            prev = x;
                        }
                        next.push([prev, e, r]);
                        changed = true;
                    }
                    None => next.push(*t),
                }
            }
            self.triangles = next;
            if !changed {
                return;
            }
        }
    }

    /// Wind every triangle counter-clockwise in the domain
    fn orient(&mut self) {
        for t in &mut self.triangles {
            if cross(self.uv[t[0]], self.uv[t[1]], self.uv[t[2]]) < 0.0 {
                t.swap(1, 2);
            }
        }
    }

    /// Split interior edges whose chord strays from the surface
    ///
    /// Splits are decided per edge, so both triangles on an edge agree.
    fn refine(&mut self) {
        for _ in 0..MAX_REFINE_PASSES {
            if self.uv.len() >= MAX_FACE_VERTICES {
                tracing::warn!(vertices = self.uv.len(), "face refinement capped");
                return;
            }

            let mut decided: FxHashMap<(usize, usize), Option<usize>> = FxHashMap::default();
            let triangles = std::mem::take(&mut self.triangles);
            for t in &triangles {
                for k in 0..3 {
                    let key = edge_key(t[k], t[(k + 1) % 3]);
                    if self.boundary.contains(&key) || decided.contains_key(&key) {
                        continue;
                    }
                    let mid = Point2::from((self.uv[key.0].coords + self.uv[key.1].coords) / 2.0);
                    let on_surface = self.param.point(mid);
                    let chord = Point3::from((self.xyz[key.0].coords + self.xyz[key.1].coords) / 2.0);
                    let split = if (on_surface - chord).norm() > CHORD_TOLERANCE {
                        self.uv.push(mid);
                        self.xyz.push(on_surface);
                        Some(self.uv.len() - 1)
                    } else {
                        None
                    };
                    decided.insert(key, split);
                }
            }

            if decided.values().all(Option::is_none) {
                self.triangles = triangles;
                return;
            }

            let split_of = |a: usize, b: usize| decided.get(&edge_key(a, b)).copied().flatten();
            let mut next = Vec::with_capacity(triangles.len() * 2);
            for t in &triangles {
                let mids = [
                    split_of(t[0], t[1]),
                    split_of(t[1], t[2]),
                    split_of(t[2], t[0]),
                ];
                match mids.iter().filter(|m| m.is_some()).count() {
                    0 => next.push(*t),
                    1 => {
                        let k = mids.iter().position(Option::is_some).unwrap_or(0);
                        let (x, y, z) = (t[k], t[(k + 1) % 3], t[(k + 2) % 3]);
                        if let Some(m) = mids[k] {
                            next.push([x, m, z]);
                            next.push([m, y, z]);
                        }
                    }
                    2 => {
                        // Rotate so the unsplit edge runs z -> x
                        let k = mids.iter().position(Option::is_none).unwrap_or(0);
                        let (z, x, y) = (t[k], t[(k + 1) % 3], t[(k + 2) % 3]);
                        if let (Some(m1), Some(m2)) = (mids[(k + 1) % 3], mids[(k + 2) % 3]) {
                            next.push([m1, y, m2]);
                            next.push([x, m1, m2]);
                            next.push([x, m2, z]);
                        }
                    }
                    _ => {
                        if let [Some(ab), Some(bc), Some(ca)] = mids {
                            let [a, b, c] = *t;
                            next.push([a, ab, ca]);
                            next.push([ab, b, bc]);
                            next.push([ca, bc, c]);
                            next.push([ab, bc, ca]);
                        }
                    }
                }
            }
            self.triangles = next;
        }
    }

    fn into_triangles(self, flip: bool) -> Vec<Triangle> {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                if flip {
                    [self.xyz[a], self.xyz[c], self.xyz[b]]
                } else {
                    [self.xyz[a], self.xyz[b], self.xyz[c]]
                }
            })
            .collect()
    }
}

/// Grid over a whole closed surface; collapsed rows weld to one point
fn full_domain_triangles(
    surface: &dyn ParametricSurface,
    full: &FullDomain,
    flip: bool,
) -> Vec<Triangle> {
    let (nu, nv) = (full.u_segments.max(3), full.v_segments.max(2));
    let period = surface.u_period().unwrap_or(std::f64::consts::TAU);
    let v_closed = surface.v_period().is_some();
    let (v0, v1) = full.v_range;

    let rows = if v_closed { nv } else { nv + 1 };
    let mut grid: Vec<Vec<Point3<f64>>> = Vec::with_capacity(rows);
    for j in 0..rows {
        let v = v0 + (v1 - v0) * (j as f64 / nv as f64);
        let collapsed = !v_closed && (j == 0 || j == nv);
        let row = (0..nu)
            .map(|i| {
                let u = if collapsed {
                    0.0
                } else {
                    period * (i as f64 / nu as f64)
                };
                surface.point(u, v)
            })
            .collect();
        grid.push(row);
    }

    let at = |i: usize, j: usize| grid[j % rows][i % nu];
    let mut triangles = Vec::with_capacity(nu * nv * 2);
    for j in 0..nv {
        for i in 0..nu {
            let (a, b, c, d) = (at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1));
            if flip {
                triangles.push([a, c, b]);
                triangles.push([a, d, c]);
            } else {
                triangles.push([a, b, c]);
                triangles.push([a, c, d]);
            }
        }
    }
    triangles
}

/// Triangulate a face lying on `surface`
///
/// Triangles are wound counter-clockwise around the face normal, which is the
/// surface normal unless the face's same_sense flag is false.
pub(super) fn tessellate_face(
    surface: &dyn ParametricSurface,
    face: &DecodedEntity,
    ctx: &mut FaceContext,
) -> Result<Vec<Triangle>> {
    // ADVANCED_FACE(name, bounds, face_geometry, same_sense)
    let same_sense = face.get_bool(3).unwrap_or(true);

    let loops: Vec<UvLoop> = face_loops(face, ctx)?
        .iter()
        .filter_map(|(_, ring)| map_loop(surface, ring))
        .collect();

    let domain = match assemble(surface, loops, same_sense, face.id)? {
        Some(domain) => domain,
        None => {
            return Ok(match surface.full_domain() {
                Some(full) => full_domain_triangles(surface, &full, !same_sense),
                None => {
                    tracing::debug!(face = face.id, "curved face without usable bounds");
                    Vec::new()
                }
            })
        }
    };

    let mut mesh = DomainMesh::triangulate(surface, &domain)?;
    mesh.refine();
    tracing::trace!(
        face = face.id,
        vertices = mesh.uv.len(),
        triangles = mesh.triangles.len(),
        "curved face tessellated"
    );

    // Swapping u and v mirrors the domain
    Ok(mesh.into_triangles(!same_sense ^ domain.transposed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::Placement;
    use crate::surfaces::{Cylinder, Sphere};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn frame() -> Placement {
        Placement {
            origin: Point3::origin(),
            axis: Vector3::z(),
            ref_direction: Vector3::x(),
        }
    }

    fn circle(radius: f64, z: f64, segments: usize) -> Vec<Point3<f64>> {
        (0..segments)
            .map(|i| {
                let t = TAU * i as f64 / segments as f64;
                Point3::new(radius * t.cos(), radius * t.sin(), z)
            })
            .collect()
    }

    #[test]
    fn test_nearest_period() {
        assert_relative_eq!(nearest(0.1, TAU, TAU), TAU + 0.1);
        assert_relative_eq!(nearest(-3.0, 3.0, TAU), TAU - 3.0);
    }

    #[test]
    fn test_wrapping_loop_turns() {
        let cylinder = Cylinder {
            frame: frame(),
            radius: 5.0,
        };
        let ring = circle(5.0, 0.0, 32);
        let forward = map_loop(&cylinder, &ring).unwrap();
        assert_eq!(forward.turns, (1, 0));

        let mut reversed = ring.clone();
        reversed.reverse();
        assert_eq!(map_loop(&cylinder, &reversed).unwrap().turns, (-1, 0));
    }

    #[test]
    fn test_pole_splits_into_two_vertices() {
        let sphere = Sphere {
            frame: frame(),
            radius: 1.0,
        };
        // Equator quarter, meridian up to the pole, meridian back down
        let ring = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.5f64.sqrt(), 0.5f64.sqrt()),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.5f64.sqrt(), 0.0, 0.5f64.sqrt()),
        ];
        let mapped = map_loop(&sphere, &ring).unwrap();
        assert_eq!(mapped.turns, (0, 0));
        assert_eq!(mapped.vertices.len(), 6);

        let at_pole: Vec<&Vertex> = mapped
            .vertices
            .iter()
            .filter(|v| (v.uv.y - FRAC_PI_2).abs() < 1e-9)
            .collect();
        assert_eq!(at_pole.len(), 2);
        assert_relative_eq!(at_pole[0].uv.x, FRAC_PI_2, epsilon = 1e-9);
        assert_relative_eq!(at_pole[1].uv.x, 0.0, epsilon = 1e-9);
        assert_eq!(at_pole[0].xyz, at_pole[1].xyz);
    }

    #[test]
    fn test_collinear_boundary_points_are_kept() {
        let cylinder = Cylinder {
            frame: frame(),
            radius: 5.0,
        };
        // Quarter of the cylinder wall, many points along the bottom arc
        let mut ring: Vec<Point3<f64>> = (0..=16)
            .map(|i| {
                let t = FRAC_PI_2 * i as f64 / 16.0;
                Point3::new(5.0 * t.cos(), 5.0 * t.sin(), 0.0)
            })
            .collect();
        ring.push(Point3::new(0.0, 5.0, 10.0));
        ring.push(Point3::new(5.0, 0.0, 10.0));

        let mapped = map_loop(&cylinder, &ring).unwrap();
        let domain = Domain {
            outline: mapped.vertices,
            holes: Vec::new(),
            transposed: false,
        };
        let mesh = DomainMesh::triangulate(&cylinder, &domain).unwrap();

        let mut used = vec![false; ring.len()];
        for t in &mesh.triangles {
            for &i in t {
                used[i] = true;
            }
        }
        assert!(used.iter().all(|&u| u));

        let area: f64 = mesh
            .triangles
            .iter()
            .map(|t| cross(mesh.uv[t[0]], mesh.uv[t[1]], mesh.uv[t[2]]) / 2.0)
            .sum();
        assert_relative_eq!(area, FRAC_PI_2 * 10.0, epsilon = 1e-6);
        assert!(mesh
            .triangles
            .iter()
            .all(|t| cross(mesh.uv[t[0]], mesh.uv[t[1]], mesh.uv[t[2]]) > 0.0));
    }

    #[test]
    fn test_refinement_keeps_boundary_edges() {
        let sphere = Sphere {
            frame: frame(),
            radius: 10.0,
        };
        // Upper hemisphere bounded by its equator only
        let ring = circle(10.0, 0.0, 64);
        let mapped = map_loop(&sphere, &ring).unwrap();
        let domain = assemble(&sphere, vec![mapped], true, 1).unwrap().unwrap();
        let mut mesh = DomainMesh::triangulate(&sphere, &domain).unwrap();
        let boundary_vertices = domain.outline.len();
        mesh.refine();

        // Every interior vertex lies on the sphere, above the equator
        for p in &mesh.xyz[boundary_vertices..] {
            assert_relative_eq!(p.coords.norm(), 10.0, epsilon = 1e-9);
            assert!(p.z > 0.0);
        }
        // Boundary edges are still single, unsplit edges
        let mut counts: FxHashMap<(usize, usize), u32> = FxHashMap::default();
        for t in &mesh.triangles {
            for k in 0..3 {
                *counts.entry(edge_key(t[k], t[(k + 1) % 3])).or_default() += 1;
            }
        }
        for edge in &mesh.boundary {
            assert_eq!(counts.get(edge), Some(&1), "boundary edge {:?}", edge);
        }
    }
}
