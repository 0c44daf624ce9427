// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! B-spline curves and surfaces
//!
//! Evaluation of B_SPLINE_CURVE_WITH_KNOTS and B_SPLINE_SURFACE_WITH_KNOTS,
//! simple or as rational complex instances, plus closest-point parameters
//! used to place boundary samples in the parameter domain.

use crate::curves::EdgeSampler;
use crate::{Error, Point2, Point3, Result, Vector3};
use curiosity_core::{AttributeValue, DecodedEntity, EntityDecoder, StepType};

/// Newton iterations for closest-point parameters
const MAX_NEWTON_STEPS: usize = 24;

/// Knot spans narrower than this are treated as empty
const KNOT_EPSILON: f64 = 1e-12;

/// Expand a knot vector from distinct values and multiplicities
fn expand_knots(values: &[f64], multiplicities: &[usize]) -> Vec<f64> {
    let mut expanded = Vec::with_capacity(multiplicities.iter().sum());
    for (knot, &count) in values.iter().zip(multiplicities) {
        for _ in 0..count {
            expanded.push(*knot);
        }
    }
    expanded
}

/// Index of the knot span containing `t`, clamped to the valid range
fn find_span(knots: &[f64], degree: usize, count: usize, t: f64) -> usize {
    if t >= knots[count] {
        // Last non-empty span
        let mut span = count - 1;
        while span > degree && knots[span] >= knots[count] {
            span -= 1;
        }
        return span;
    }
    if t <= knots[degree] {
        let mut span = degree;
        while span + 1 < count && knots[span + 1] <= knots[degree] {
            span += 1;
        }
        return span;
    }

    let (mut low, mut high) = (degree, count);
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Non-zero basis functions N(span - degree ..= span) at `t` (Cox-de Boor)
fn basis_functions(knots: &[f64], degree: usize, span: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom.abs() < KNOT_EPSILON {
                0.0
            } else {
                n[r] / denom
            };
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }
    n
}

/// Central difference step clamped to a closed interval
fn difference_step(t: f64, (low, high): (f64, f64)) -> (f64, f64) {
    let h = (high - low) * 1e-6;
    ((t - h).max(low), (t + h).min(high))
}

/// Attribute slices of a B-spline definition, simple or complex
struct Definition<'e> {
    /// Degree(s), control points, form, closed flag(s), self-intersect
    base: &'e [AttributeValue],
    /// Multiplicities, knots, knot spec
    knots: &'e [AttributeValue],
    weights: Option<&'e [AttributeValue]>,
}

fn definition<'e>(
    entity: &'e DecodedEntity,
    simple: StepType,
    base_part: &str,
    knots_part: &str,
    rational_part: &str,
    base_len: usize,
) -> Result<Definition<'e>> {
    if entity.step_type == simple {
        // Simple instances lead with the name
        let base = entity
            .attributes
            .get(1..1 + base_len)
            .ok_or_else(|| Error::topology(entity.id, "truncated B-spline definition"))?;
        let knots = entity
            .attributes
            .get(1 + base_len..)
            .ok_or_else(|| Error::topology(entity.id, "B-spline without knots"))?;
        return Ok(Definition {
            base,
            knots,
            weights: None,
        });
    }

    let base = entity
        .part(base_part)
        .ok_or_else(|| Error::topology(entity.id, format!("missing {}", base_part)))?;
    let knots = entity
        .part(knots_part)
        .ok_or_else(|| Error::topology(entity.id, format!("missing {}", knots_part)))?;
    Ok(Definition {
        base,
        knots,
        weights: entity.part(rational_part),
    })
}

fn degree_at(id: u32, values: &[AttributeValue], index: usize) -> Result<usize> {
    let degree = values
        .get(index)
        .and_then(|v| v.as_float())
        .ok_or_else(|| Error::topology(id, "B-spline without degree"))?;
    if degree < 1.0 {
        return Err(Error::topology(id, "B-spline degree must be at least 1"));
    }
    Ok(degree as usize)
}

fn floats_at(id: u32, values: &[AttributeValue], index: usize) -> Result<Vec<f64>> {
    values
        .get(index)
        .and_then(|v| v.as_list())
        .map(|items| items.iter().filter_map(|v| v.as_float()).collect())
        .ok_or_else(|| Error::topology(id, "B-spline list attribute missing"))
}

fn knot_vector(
    id: u32,
    values: &[AttributeValue],
    multiplicities: usize,
    knots: usize,
    degree: usize,
    count: usize,
) -> Result<Vec<f64>> {
    let mults: Vec<usize> = floats_at(id, values, multiplicities)?
        .into_iter()
        .map(|m| m as usize)
        .collect();
    let distinct = floats_at(id, values, knots)?;
    if mults.len() != distinct.len() {
        return Err(Error::topology(id, "knot multiplicities do not match knots"));
    }

    let expanded = expand_knots(&distinct, &mults);
    if expanded.len() != count + degree + 1 {
        return Err(Error::topology(
            id,
            format!(
                "{} knots for {} control points of degree {}",
                expanded.len(),
                count,
                degree
            ),
        ));
    }
    if expanded.windows(2).any(|w| w[1] < w[0]) {
        return Err(Error::topology(id, "knot vector is not ascending"));
    }
    Ok(expanded)
}

// ---------- BSplineCurve ----------

/// Non-uniform (rational) B-spline curve in millimetres
#[derive(Debug, Clone)]
pub struct BSplineCurve {
    degree: usize,
    control: Vec<Point3<f64>>,
    weights: Vec<f64>,
    knots: Vec<f64>,
}

impl BSplineCurve {
    /// Decode a B_SPLINE_CURVE_WITH_KNOTS, simple or rational complex
    pub fn from_entity(
        sampler: &EdgeSampler,
        decoder: &mut EntityDecoder,
        entity: &DecodedEntity,
    ) -> Result<Self> {
        // B_SPLINE_CURVE_WITH_KNOTS(name, degree, control_points_list, curve_form,
        //   closed_curve, self_intersect, knot_multiplicities, knots, knot_spec)
        let def = definition(
            entity,
            StepType::BSplineCurveWithKnots,
            "B_SPLINE_CURVE",
            "B_SPLINE_CURVE_WITH_KNOTS",
            "RATIONAL_B_SPLINE_CURVE",
            5,
        )?;
        let id = entity.id;

        let degree = degree_at(id, def.base, 0)?;
        let control = def
            .base
            .get(1)
            .and_then(|v| v.as_list())
            .ok_or_else(|| Error::topology(id, "B-spline curve without control points"))?
            .iter()
            .filter_map(|v| v.as_entity_ref())
            .map(|point| sampler.point(decoder, point))
            .collect::<Result<Vec<_>>>()?;
        if control.len() <= degree {
            return Err(Error::topology(id, "too few control points for degree"));
        }

        let knots = knot_vector(id, def.knots, 0, 1, degree, control.len())?;
        let weights = match def.weights {
            Some(values) => {
                let weights = floats_at(id, values, 0)?;
                if weights.len() != control.len() {
                    return Err(Error::topology(id, "weights do not match control points"));
                }
                weights
            }
            None => vec![1.0; control.len()],
        };

        Ok(Self {
            degree,
            control,
            weights,
            knots,
        })
    }

    /// Number of control points
    pub fn control_count(&self) -> usize {
        self.control.len()
    }

    /// Valid parameter range
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.control.len()])
    }

    pub fn point(&self, t: f64) -> Point3<f64> {
        let (low, high) = self.domain();
        let t = t.clamp(low, high);
        let span = find_span(&self.knots, self.degree, self.control.len(), t);
        let basis = basis_functions(&self.knots, self.degree, span, t);

        let mut sum = Vector3::zeros();
        let mut weight = 0.0;
        for (k, n) in basis.iter().enumerate() {
            let i = span - self.degree + k;
            let w = n * self.weights[i];
            sum += self.control[i].coords * w;
            weight += w;
        }
        if weight.abs() < KNOT_EPSILON {
            return self.control[span];
        }
        Point3::from(sum / weight)
    }

    /// Parameter of the curve point closest to `p`
    pub fn parameter_of(&self, p: &Point3<f64>) -> f64 {
        let (low, high) = self.domain();
        let samples = (self.control.len() * 8).clamp(16, 512);

        let mut best = low;
        let mut best_distance = f64::INFINITY;
        for i in 0..=samples {
            let t = low + (high - low) * (i as f64 / samples as f64);
            let distance = (self.point(t) - p).norm_squared();
            if distance < best_distance {
                best = t;
                best_distance = distance;
            }
        }

        let mut t = best;
        for _ in 0..MAX_NEWTON_STEPS {
            let (before, after) = difference_step(t, (low, high));
            let tangent = (self.point(after) - self.point(before)) / (after - before);
            let length = tangent.norm_squared();
            if length < KNOT_EPSILON {
                break;
            }
            let step = (p - self.point(t)).dot(&tangent) / length;
            let next = (t + step).clamp(low, high);
            let moved = (next - t).abs();
            t = next;
            if moved < (high - low) * 1e-14 {
                break;
            }
        }
        t
    }
}

// ---------- BSplineSurface ----------

/// Non-uniform (rational) B-spline surface in millimetres
#[derive(Debug, Clone)]
pub struct BSplineSurface {
    u_degree: usize,
    v_degree: usize,
    /// Control net indexed [u][v]
    control: Vec<Vec<Point3<f64>>>,
    weights: Vec<Vec<f64>>,
    u_knots: Vec<f64>,
    v_knots: Vec<f64>,
    /// Coarse grid seeding closest-point searches
    samples: Vec<(Point2<f64>, Point3<f64>)>,
}

impl BSplineSurface {
    /// Decode a B_SPLINE_SURFACE_WITH_KNOTS, simple or rational complex
    pub fn from_entity(
        sampler: &EdgeSampler,
        decoder: &mut EntityDecoder,
        entity: &DecodedEntity,
    ) -> Result<Self> {
        // B_SPLINE_SURFACE_WITH_KNOTS(name, u_degree, v_degree, control_points_list,
        //   surface_form, u_closed, v_closed, self_intersect, u_multiplicities,
        //   v_multiplicities, u_knots, v_knots, knot_spec)
        let def = definition(
            entity,
            StepType::BSplineSurfaceWithKnots,
            "B_SPLINE_SURFACE",
            "B_SPLINE_SURFACE_WITH_KNOTS",
            "RATIONAL_B_SPLINE_SURFACE",
            7,
        )?;
        let id = entity.id;

        let u_degree = degree_at(id, def.base, 0)?;
        let v_degree = degree_at(id, def.base, 1)?;

        let rows = def
            .base
            .get(2)
            .and_then(|v| v.as_list())
            .ok_or_else(|| Error::topology(id, "B-spline surface without control points"))?;
        let mut control = Vec::with_capacity(rows.len());
        for row in rows {
            let row = row
                .as_list()
                .ok_or_else(|| Error::topology(id, "control point row is not a list"))?
                .iter()
                .filter_map(|v| v.as_entity_ref())
                .map(|point| sampler.point(decoder, point))
                .collect::<Result<Vec<_>>>()?;
            control.push(row);
        }

        let u_count = control.len();
        let v_count = control.first().map(|row| row.len()).unwrap_or(0);
        if control.iter().any(|row| row.len() != v_count) {
            return Err(Error::topology(id, "ragged control net"));
        }
        if u_count <= u_degree || v_count <= v_degree {
            return Err(Error::topology(id, "too few control points for degree"));
        }

        let u_knots = knot_vector(id, def.knots, 0, 2, u_degree, u_count)?;
        let v_knots = knot_vector(id, def.knots, 1, 3, v_degree, v_count)?;

        let weights = match def.weights {
            Some(values) => {
                let rows = values
                    .first()
                    .and_then(|v| v.as_list())
                    .ok_or_else(|| Error::topology(id, "weights are not a list"))?;
                let weights: Vec<Vec<f64>> = rows
                    .iter()
                    .map(|row| {
                        row.as_list()
                            .map(|items| items.iter().filter_map(|v| v.as_float()).collect())
                            .unwrap_or_default()
                    })
                    .collect();
                if weights.len() != u_count || weights.iter().any(|row| row.len() != v_count) {
                    return Err(Error::topology(id, "weights do not match control net"));
                }
                weights
            }
            None => vec![vec![1.0; v_count]; u_count],
        };

        let mut surface = Self {
            u_degree,
            v_degree,
            control,
            weights,
            u_knots,
            v_knots,
            samples: Vec::new(),
        };
        surface.samples = surface.sample_grid();
        Ok(surface)
    }

    /// Parameter rectangle ((u_min, u_max), (v_min, v_max))
    pub fn domain(&self) -> ((f64, f64), (f64, f64)) {
        let u_count = self.control.len();
        let v_count = self.control[0].len();
        (
            (self.u_knots[self.u_degree], self.u_knots[u_count]),
            (self.v_knots[self.v_degree], self.v_knots[v_count]),
        )
    }

    pub fn point(&self, u: f64, v: f64) -> Point3<f64> {
        let (u_range, v_range) = self.domain();
        let u = u.clamp(u_range.0, u_range.1);
        let v = v.clamp(v_range.0, v_range.1);
        let u_count = self.control.len();
        let v_count = self.control[0].len();

        let u_span = find_span(&self.u_knots, self.u_degree, u_count, u);
        let v_span = find_span(&self.v_knots, self.v_degree, v_count, v);
        let nu = basis_functions(&self.u_knots, self.u_degree, u_span, u);
        let nv = basis_functions(&self.v_knots, self.v_degree, v_span, v);

        let mut sum = Vector3::zeros();
        let mut weight = 0.0;
        for (a, bu) in nu.iter().enumerate() {
            let i = u_span - self.u_degree + a;
            for (b, bv) in nv.iter().enumerate() {
                let j = v_span - self.v_degree + b;
                let w = bu * bv * self.weights[i][j];
                sum += self.control[i][j].coords * w;
                weight += w;
            }
        }
        if weight.abs() < KNOT_EPSILON {
            return self.control[u_span][v_span];
        }
        Point3::from(sum / weight)
    }

    fn sample_grid(&self) -> Vec<(Point2<f64>, Point3<f64>)> {
        let ((u0, u1), (v0, v1)) = self.domain();
        let nu = (self.control.len() * 4).clamp(8, 64);
        let nv = (self.control[0].len() * 4).clamp(8, 64);

        let mut samples = Vec::with_capacity((nu + 1) * (nv + 1));
        for i in 0..=nu {
            let u = u0 + (u1 - u0) * (i as f64 / nu as f64);
            for j in 0..=nv {
                let v = v0 + (v1 - v0) * (j as f64 / nv as f64);
                samples.push((Point2::new(u, v), self.point(u, v)));
            }
        }
        samples
    }

    /// Parameters of the surface point closest to `p`
    pub fn parameters(&self, p: &Point3<f64>) -> Point2<f64> {
        let (u_range, v_range) = self.domain();

        let mut uv = self
            .samples
            .iter()
            .min_by(|a, b| {
                (a.1 - p)
                    .norm_squared()
                    .total_cmp(&(b.1 - p).norm_squared())
            })
            .map(|(uv, _)| *uv)
            .unwrap_or_else(|| Point2::new(u_range.0, v_range.0));

        // Gauss-Newton on |S(u, v) - p|^2
        for _ in 0..MAX_NEWTON_STEPS {
            let (u_before, u_after) = difference_step(uv.x, u_range);
            let (v_before, v_after) = difference_step(uv.y, v_range);
            let su = (self.point(u_after, uv.y) - self.point(u_before, uv.y)) / (u_after - u_before);
            let sv = (self.point(uv.x, v_after) - self.point(uv.x, v_before)) / (v_after - v_before);
            let residual = p - self.point(uv.x, uv.y);

            let (a, b, c) = (su.dot(&su), su.dot(&sv), sv.dot(&sv));
            let det = a * c - b * b;
            if det.abs() < 1e-18 {
                break;
            }
            let (ru, rv) = (su.dot(&residual), sv.dot(&residual));
            let du = (c * ru - b * rv) / det;
            let dv = (a * rv - b * ru) / det;

            let next = Point2::new(
                (uv.x + du).clamp(u_range.0, u_range.1),
                (uv.y + dv).clamp(v_range.0, v_range.1),
            );
            let moved = (next - uv).norm();
            uv = next;
            if moved < 1e-14 * (1.0 + (u_range.1 - u_range.0) + (v_range.1 - v_range.0)) {
                break;
            }
        }
        uv
    }
}
