// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit extraction for STEP files
//!
//! STEP stores units as complex instances:
//! `#9=(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.));`
//! or, for imperial models and degrees, a CONVERSION_BASED_UNIT pointing at
//! a measure-with-unit that relates it to an SI unit.

use crate::decoder::EntityDecoder;
use crate::error::Result;
use crate::parser::EntityScanner;
use crate::schema::{AttributeValue, DecodedEntity, StepType};

/// Conversion chains longer than this are treated as broken
const MAX_UNIT_DEPTH: usize = 4;

/// SI prefix multipliers (ISO 10303-41 si_prefix)
#[inline]
pub fn get_si_prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "EXA" => 1e18,
        "PETA" => 1e15,
        "TERA" => 1e12,
        "GIGA" => 1e9,
        "MEGA" => 1e6,
        "KILO" => 1e3,
        "HECTO" => 1e2,
        "DECA" => 1e1,
        "DECI" => 1e-1,
        "CENTI" => 1e-2,
        "MILLI" => 1e-3,
        "MICRO" => 1e-6,
        "NANO" => 1e-9,
        "PICO" => 1e-12,
        "FEMTO" => 1e-15,
        "ATTO" => 1e-18,
        _ => 1.0,
    }
}

/// Physical quantity of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantity {
    Length,
    PlaneAngle,
}

impl Quantity {
    fn keyword(self) -> &'static str {
        match self {
            Quantity::Length => "LENGTH_UNIT",
            Quantity::PlaneAngle => "PLANE_ANGLE_UNIT",
        }
    }

    /// SI unit name and its value in the target unit (mm or rad)
    fn si_base(self) -> (&'static str, f64) {
        match self {
            Quantity::Length => ("METRE", 1000.0),
            Quantity::PlaneAngle => ("RADIAN", 1.0),
        }
    }
}

/// Scale factor that converts model coordinates to millimetres
///
/// The length unit listed by a GLOBAL_UNIT_ASSIGNED_CONTEXT wins; otherwise the
/// first complex instance carrying LENGTH_UNIT decides. Files without a length
/// unit are taken to be in millimetres.
pub fn length_unit_scale_mm(decoder: &mut EntityDecoder, content: &str) -> Result<f64> {
    let scale = global_unit_scale(decoder, content, Quantity::Length)?;
    tracing::debug!(scale, "length unit");
    Ok(scale)
}

/// Scale factor that converts model plane angles to radians
///
/// Same lookup as [`length_unit_scale_mm`]; files without a plane angle unit
/// are taken to be in radians.
pub fn plane_angle_scale_rad(decoder: &mut EntityDecoder, content: &str) -> Result<f64> {
    let scale = global_unit_scale(decoder, content, Quantity::PlaneAngle)?;
    tracing::debug!(scale, "plane angle unit");
    Ok(scale)
}

fn global_unit_scale(
    decoder: &mut EntityDecoder,
    content: &str,
    quantity: Quantity,
) -> Result<f64> {
    let mut scanner = EntityScanner::new(content);
    let mut first_unit = None;

    while let Some((id, type_name, _, _)) = scanner.next_entity() {
        if !type_name.is_empty() {
            continue;
        }

        let entity = decoder.decode_by_id(id)?;

        if let Some(units) = entity.part("GLOBAL_UNIT_ASSIGNED_CONTEXT") {
            let unit_ids: Vec<u32> = units
                .first()
                .and_then(|v| v.as_list())
                .map(|items| items.iter().filter_map(|v| v.as_entity_ref()).collect())
                .unwrap_or_default();

            for unit_id in unit_ids {
                let unit = match decoder.decode_by_id(unit_id) {
                    Ok(unit) => unit,
                    Err(_) => continue,
                };
                if unit.is_a(quantity.keyword()) {
                    if let Some(scale) = unit_scale(decoder, &unit, quantity, 0) {
                        tracing::debug!(unit = unit_id, scale, "global {}", quantity.keyword());
                        return Ok(scale);
                    }
                }
            }
        }

        if first_unit.is_none() && entity.is_a(quantity.keyword()) {
            first_unit = Some(entity);
        }
    }

    Ok(first_unit
        .and_then(|unit| unit_scale(decoder, &unit, quantity, 0))
        .unwrap_or(1.0))
}

/// Target units per unit for an SI or conversion-based unit
fn unit_scale(
    decoder: &mut EntityDecoder,
    unit: &DecodedEntity,
    quantity: Quantity,
    depth: usize,
) -> Option<f64> {
    if depth > MAX_UNIT_DEPTH {
        return None;
    }

    if let Some(si) = unit.part("SI_UNIT") {
        // SI_UNIT(prefix, name)
        let (name, base) = quantity.si_base();
        if si.get(1).and_then(|v| v.as_enum()) != Some(name) {
            return None;
        }
        let multiplier = si
            .first()
            .and_then(|v| v.as_enum())
            .map(get_si_prefix_multiplier)
            .unwrap_or(1.0);
        return Some(multiplier * base);
    }

    if let Some(conversion) = unit.part("CONVERSION_BASED_UNIT") {
        // CONVERSION_BASED_UNIT(name, conversion_factor)
        let factor_id = conversion.get(1).and_then(AttributeValue::as_entity_ref)?;
        let factor = decoder.decode_by_id(factor_id).ok()?;
        let is_measure = factor.step_type == StepType::LengthMeasureWithUnit
            || factor.type_name.ends_with("MEASURE_WITH_UNIT")
            || factor.is_a("MEASURE_WITH_UNIT");
        if !is_measure {
            return None;
        }

        let (value, base_id) = if factor.step_type == StepType::Complex {
            let measure = factor.part("MEASURE_WITH_UNIT")?;
            (measure.first()?.as_float()?, measure.get(1)?.as_entity_ref()?)
        } else {
            (factor.get_float(0)?, factor.get_ref(1)?)
        };

        let base = decoder.decode_by_id(base_id).ok()?;
        return unit_scale(decoder, &base, quantity, depth + 1).map(|scale| value * scale);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale_of(data: &str) -> f64 {
        let content = format!(
            "ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
            data
        );
        let mut decoder = EntityDecoder::new(&content);
        length_unit_scale_mm(&mut decoder, &content).unwrap()
    }

    #[test]
    fn test_si_prefix_multipliers() {
        assert_eq!(get_si_prefix_multiplier("MILLI"), 0.001);
        assert_eq!(get_si_prefix_multiplier("CENTI"), 0.01);
        assert_eq!(get_si_prefix_multiplier("KILO"), 1000.0);
        assert_eq!(get_si_prefix_multiplier(""), 1.0);
    }

    #[test]
    fn test_millimetre_unit() {
        let scale = scale_of("#1=(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.));");
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn test_metre_unit() {
        let scale = scale_of("#1=(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT($,.METRE.));");
        assert_eq!(scale, 1000.0);
    }

    #[test]
    fn test_inch_conversion_unit() {
        let scale = scale_of(
            "#1=(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.));
#2=LENGTH_MEASURE_WITH_UNIT(LENGTH_MEASURE(25.4),#1);
#3=DIMENSIONAL_EXPONENTS(1.,0.,0.,0.,0.,0.,0.);
#4=(CONVERSION_BASED_UNIT('INCH',#2) LENGTH_UNIT() NAMED_UNIT(#3));
#5=(PLANE_ANGLE_UNIT() NAMED_UNIT(*) SI_UNIT($,.RADIAN.));
#6=(GEOMETRIC_REPRESENTATION_CONTEXT(3) GLOBAL_UNIT_ASSIGNED_CONTEXT((#4,#5)) REPRESENTATION_CONTEXT('',''));",
        );
        assert!((scale - 25.4).abs() < 1e-12);
    }

    #[test]
    fn test_degree_plane_angle_unit() {
        let content = "ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;
#1=(NAMED_UNIT(*) PLANE_ANGLE_UNIT() SI_UNIT($,.RADIAN.));
#2=PLANE_ANGLE_MEASURE_WITH_UNIT(PLANE_ANGLE_MEASURE(0.0174532925199433),#1);
#3=DIMENSIONAL_EXPONENTS(0.,0.,0.,0.,0.,0.,0.);
#4=(CONVERSION_BASED_UNIT('DEGREE',#2) NAMED_UNIT(#3) PLANE_ANGLE_UNIT());
#5=(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.));
#6=(GEOMETRIC_REPRESENTATION_CONTEXT(3) GLOBAL_UNIT_ASSIGNED_CONTEXT((#5,#4)) REPRESENTATION_CONTEXT('',''));
ENDSEC;\nEND-ISO-10303-21;\n";
        let mut decoder = EntityDecoder::new(content);
        let angle = plane_angle_scale_rad(&mut decoder, content).unwrap();
        assert!((angle - std::f64::consts::PI / 180.0).abs() < 1e-12);
        assert_eq!(length_unit_scale_mm(&mut decoder, content).unwrap(), 1.0);
    }

    #[test]
    fn test_missing_angle_unit_defaults_to_radians() {
        let content = "ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n#1=CARTESIAN_POINT('',(0.,0.,0.));\nENDSEC;\nEND-ISO-10303-21;\n";
        let mut decoder = EntityDecoder::new(content);
        assert_eq!(plane_angle_scale_rad(&mut decoder, content).unwrap(), 1.0);
    }

    #[test]
    fn test_missing_unit_defaults_to_millimetres() {
        assert_eq!(scale_of("#1=CARTESIAN_POINT('',(0.,0.,0.));"), 1.0);
    }
}
