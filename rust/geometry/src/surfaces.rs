// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parametric surfaces
//!
//! Analytic surfaces follow the ISO 10303-42 parameterisations in the frame
//! of their AXIS2_PLACEMENT_3D; u is always the angle around the axis.

use crate::curves::{circle_segments, placement, EdgeSampler, Placement};
use crate::nurbs::BSplineSurface;
use crate::{Error, Point2, Point3, Result};
use curiosity_core::{DecodedEntity, EntityDecoder, StepType};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Upper bound on grid segments per direction for closed surfaces
const MAX_GRID_SEGMENTS: usize = 1024;

/// Points closer than this to the axis have no defined angle
const AXIS_TOLERANCE: f64 = 1e-9;

/// Grid layout for a face covering a whole closed surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullDomain {
    pub v_range: (f64, f64),
    pub u_segments: usize,
    pub v_segments: usize,
}

/// Surface with a (u, v) parameterisation
///
/// The natural normal is the cross product of the u and v derivatives.
pub trait ParametricSurface {
    fn point(&self, u: f64, v: f64) -> Point3<f64>;

    /// Parameters of a point on the surface
    fn parameters(&self, p: &Point3<f64>) -> Point2<f64>;

    fn u_period(&self) -> Option<f64> {
        None
    }

    fn v_period(&self) -> Option<f64> {
        None
    }

    /// Whether u is undefined at `p` (apex or pole)
    fn is_singular(&self, _p: &Point3<f64>) -> bool {
        false
    }

    /// v of the row that collapses to a point above (`upper`) or below the domain
    fn pole(&self, _upper: bool) -> Option<f64> {
        None
    }

    /// Grid for faces that cover the whole surface
    fn full_domain(&self) -> Option<FullDomain> {
        None
    }
}

#[inline]
fn radial(local: &nalgebra::Vector3<f64>) -> f64 {
    local.x.hypot(local.y)
}

/// CYLINDRICAL_SURFACE: origin + r (cos u, sin u, 0) + v axis
#[derive(Debug, Clone)]
pub struct Cylinder {
    pub frame: Placement,
    pub radius: f64,
}

impl ParametricSurface for Cylinder {
    fn point(&self, u: f64, v: f64) -> Point3<f64> {
        self.frame
            .to_world(self.radius * u.cos(), self.radius * u.sin(), v)
    }

    fn parameters(&self, p: &Point3<f64>) -> Point2<f64> {
        let local = self.frame.to_local(p);
        Point2::new(local.y.atan2(local.x), local.z)
    }

    fn u_period(&self) -> Option<f64> {
        Some(TAU)
    }
}

/// CONICAL_SURFACE: origin + (r + v tan a) (cos u, sin u, 0) + v axis
#[derive(Debug, Clone)]
pub struct Cone {
    pub frame: Placement,
    pub radius: f64,
    /// Semi-angle in radians
    pub semi_angle: f64,
}

impl Cone {
    fn radius_at(&self, v: f64) -> f64 {
        self.radius + v * self.semi_angle.tan()
    }
}

impl ParametricSurface for Cone {
    fn point(&self, u: f64, v: f64) -> Point3<f64> {
        let r = self.radius_at(v);
        self.frame.to_world(r * u.cos(), r * u.sin(), v)
    }

    fn parameters(&self, p: &Point3<f64>) -> Point2<f64> {
        let local = self.frame.to_local(p);
        Point2::new(local.y.atan2(local.x), local.z)
    }

    fn u_period(&self) -> Option<f64> {
        Some(TAU)
    }

    fn is_singular(&self, p: &Point3<f64>) -> bool {
        radial(&self.frame.to_local(p)) < AXIS_TOLERANCE * self.radius.max(1.0)
    }

    fn pole(&self, upper: bool) -> Option<f64> {
        let tan = self.semi_angle.tan();
        if tan.abs() < 1e-12 {
            return None;
        }
        let apex = -self.radius / tan;
        // The apex lies on the side where the radius shrinks
        if upper == (tan < 0.0) {
            Some(apex)
        } else {
            None
        }
    }
}

/// SPHERICAL_SURFACE: origin + r (cos v cos u, cos v sin u, sin v)
#[derive(Debug, Clone)]
pub struct Sphere {
    pub frame: Placement,
    pub radius: f64,
}

impl ParametricSurface for Sphere {
    fn point(&self, u: f64, v: f64) -> Point3<f64> {
        let r = self.radius * v.cos();
        self.frame
            .to_world(r * u.cos(), r * u.sin(), self.radius * v.sin())
    }

    fn parameters(&self, p: &Point3<f64>) -> Point2<f64> {
        let local = self.frame.to_local(p);
        Point2::new(local.y.atan2(local.x), local.z.atan2(radial(&local)))
    }

    fn u_period(&self) -> Option<f64> {
        Some(TAU)
    }

    fn is_singular(&self, p: &Point3<f64>) -> bool {
        radial(&self.frame.to_local(p)) < AXIS_TOLERANCE * self.radius.max(1.0)
    }

    fn pole(&self, upper: bool) -> Option<f64> {
        Some(if upper { FRAC_PI_2 } else { -FRAC_PI_2 })
    }

    fn full_domain(&self) -> Option<FullDomain> {
        Some(FullDomain {
            v_range: (-FRAC_PI_2, FRAC_PI_2),
            u_segments: circle_segments(self.radius, TAU).min(MAX_GRID_SEGMENTS),
            v_segments: circle_segments(self.radius, PI).max(2).min(MAX_GRID_SEGMENTS),
        })
    }
}

/// TOROIDAL_SURFACE: origin + (R + r cos v) (cos u, sin u, 0) + r sin v axis
#[derive(Debug, Clone)]
pub struct Torus {
    pub frame: Placement,
    pub major_radius: f64,
    pub minor_radius: f64,
}

impl ParametricSurface for Torus {
    fn point(&self, u: f64, v: f64) -> Point3<f64> {
        let r = self.major_radius + self.minor_radius * v.cos();
        self.frame
            .to_world(r * u.cos(), r * u.sin(), self.minor_radius * v.sin())
    }

    fn parameters(&self, p: &Point3<f64>) -> Point2<f64> {
        let local = self.frame.to_local(p);
        let tube = radial(&local) - self.major_radius;
        Point2::new(local.y.atan2(local.x), local.z.atan2(tube))
    }

    fn u_period(&self) -> Option<f64> {
        Some(TAU)
    }

    fn v_period(&self) -> Option<f64> {
        Some(TAU)
    }

    fn full_domain(&self) -> Option<FullDomain> {
        Some(FullDomain {
            v_range: (0.0, TAU),
            u_segments: circle_segments(self.major_radius + self.minor_radius, TAU)
                .min(MAX_GRID_SEGMENTS),
            v_segments: circle_segments(self.minor_radius, TAU).min(MAX_GRID_SEGMENTS),
        })
    }
}

impl ParametricSurface for BSplineSurface {
    fn point(&self, u: f64, v: f64) -> Point3<f64> {
        BSplineSurface::point(self, u, v)
    }

    fn parameters(&self, p: &Point3<f64>) -> Point2<f64> {
        BSplineSurface::parameters(self, p)
    }
}

fn positive_length(sampler: &EdgeSampler, entity: &DecodedEntity, index: usize) -> Result<f64> {
    let value = entity
        .get_float(index)
        .ok_or_else(|| Error::topology(entity.id, "surface without radius"))?
        * sampler.scale();
    if value.is_nan() || value <= 0.0 {
        return Err(Error::topology(entity.id, "surface radius must be positive"));
    }
    Ok(value)
}

/// Decode a curved surface into its parameterisation
///
/// PLANE is handled by the planar path and is not accepted here.
pub fn decode_surface(
    sampler: &EdgeSampler,
    decoder: &mut EntityDecoder,
    entity: &DecodedEntity,
) -> Result<Box<dyn ParametricSurface>> {
    if entity.step_type == StepType::BSplineSurfaceWithKnots
        || (entity.step_type == StepType::Complex && entity.is_a("B_SPLINE_SURFACE_WITH_KNOTS"))
    {
        return Ok(Box::new(BSplineSurface::from_entity(sampler, decoder, entity)?));
    }

    let frame = match entity.step_type {
        StepType::CylindricalSurface
        | StepType::ConicalSurface
        | StepType::SphericalSurface
        | StepType::ToroidalSurface => {
            let position = entity
                .get_ref(1)
                .ok_or_else(|| Error::topology(entity.id, "surface without position"))?;
            placement(sampler, decoder, position)?
        }
        _ => {
            return Err(Error::Unsupported {
                kind: "surface",
                type_name: surface_name(entity),
            })
        }
    };

    Ok(match entity.step_type {
        // CYLINDRICAL_SURFACE(name, position, radius)
        StepType::CylindricalSurface => Box::new(Cylinder {
            frame,
            radius: positive_length(sampler, entity, 2)?,
        }),
        // CONICAL_SURFACE(name, position, radius, semi_angle)
        StepType::ConicalSurface => {
            let radius = entity
                .get_float(2)
                .ok_or_else(|| Error::topology(entity.id, "cone without radius"))?
                * sampler.scale();
            let semi_angle = entity
                .get_float(3)
                .ok_or_else(|| Error::topology(entity.id, "cone without semi-angle"))?
                * sampler.angle_scale();
            if radius < 0.0 || semi_angle.abs() >= FRAC_PI_2 || semi_angle == 0.0 {
                return Err(Error::topology(entity.id, "cone semi-angle out of range"));
            }
            Box::new(Cone {
                frame,
                radius,
                semi_angle,
            })
        }
        // SPHERICAL_SURFACE(name, position, radius)
        StepType::SphericalSurface => Box::new(Sphere {
            frame,
            radius: positive_length(sampler, entity, 2)?,
        }),
        // TOROIDAL_SURFACE(name, position, major_radius, minor_radius)
        _ => Box::new(Torus {
            frame,
            major_radius: positive_length(sampler, entity, 2)?,
            minor_radius: positive_length(sampler, entity, 3)?,
        }),
    })
}

/// Keyword of a surface entity; complex instances report their first part
pub fn surface_name(entity: &DecodedEntity) -> String {
    if entity.step_type == StepType::Complex {
        if entity.is_a("B_SPLINE_SURFACE_WITH_KNOTS") {
            return "B_SPLINE_SURFACE_WITH_KNOTS".to_string();
        }
        return entity
            .parts
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
    }
    entity.type_name.clone()
}
