// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP schema types
//!
//! Fast type checking using an enum instead of string comparison. Only the
//! entities the tessellator routes on get a variant; everything else decodes
//! as [`StepType::Other`] and keeps its name on the [`DecodedEntity`].

use crate::parser::Token;
use std::fmt;

/// STEP entity types (AP203 / AP214 / AP242 geometry and topology)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepType {
    // Points and placement
    CartesianPoint,
    Direction,
    Vector,
    Axis2Placement3d,

    // Surfaces
    Plane,
    CylindricalSurface,
    ConicalSurface,
    SphericalSurface,
    ToroidalSurface,
    BSplineSurfaceWithKnots,

    // Curves
    Line,
    Circle,
    Ellipse,
    Polyline,
    SurfaceCurve,
    SeamCurve,
    BSplineCurveWithKnots,

    // Topology
    VertexPoint,
    EdgeCurve,
    OrientedEdge,
    EdgeLoop,
    PolyLoop,
    VertexLoop,
    FaceBound,
    FaceOuterBound,
    Face,
    AdvancedFace,
    FaceSurface,
    ClosedShell,
    OpenShell,
    OrientedClosedShell,

    // Solids / shape roots
    ManifoldSolidBrep,
    BrepWithVoids,
    FacetedBrep,
    ShellBasedSurfaceModel,

    // Units
    LengthMeasureWithUnit,

    /// Multi-part instance: `#1=(A() B() C());`
    Complex,
    /// Any entity the tessellator does not route on
    Other,
}

impl StepType {
    /// Map an upper-case STEP keyword to its type
    pub fn from_name(name: &str) -> Self {
        match name {
            "CARTESIAN_POINT" => StepType::CartesianPoint,
            "DIRECTION" => StepType::Direction,
            "VECTOR" => StepType::Vector,
            "AXIS2_PLACEMENT_3D" => StepType::Axis2Placement3d,
            "PLANE" => StepType::Plane,
            "CYLINDRICAL_SURFACE" => StepType::CylindricalSurface,
            "CONICAL_SURFACE" => StepType::ConicalSurface,
            "SPHERICAL_SURFACE" => StepType::SphericalSurface,
            "TOROIDAL_SURFACE" => StepType::ToroidalSurface,
            "B_SPLINE_SURFACE_WITH_KNOTS" => StepType::BSplineSurfaceWithKnots,
            "LINE" => StepType::Line,
            "CIRCLE" => StepType::Circle,
            "ELLIPSE" => StepType::Ellipse,
            "POLYLINE" => StepType::Polyline,
            "SURFACE_CURVE" => StepType::SurfaceCurve,
            "SEAM_CURVE" => StepType::SeamCurve,
            "B_SPLINE_CURVE_WITH_KNOTS" => StepType::BSplineCurveWithKnots,
            "VERTEX_POINT" => StepType::VertexPoint,
            "EDGE_CURVE" => StepType::EdgeCurve,
            "ORIENTED_EDGE" => StepType::OrientedEdge,
            "EDGE_LOOP" => StepType::EdgeLoop,
            "POLY_LOOP" => StepType::PolyLoop,
            "VERTEX_LOOP" => StepType::VertexLoop,
            "FACE_BOUND" => StepType::FaceBound,
            "FACE_OUTER_BOUND" => StepType::FaceOuterBound,
            "FACE" => StepType::Face,
            "ADVANCED_FACE" => StepType::AdvancedFace,
            "FACE_SURFACE" => StepType::FaceSurface,
            "CLOSED_SHELL" => StepType::ClosedShell,
            "OPEN_SHELL" => StepType::OpenShell,
            "ORIENTED_CLOSED_SHELL" => StepType::OrientedClosedShell,
            "MANIFOLD_SOLID_BREP" => StepType::ManifoldSolidBrep,
            "BREP_WITH_VOIDS" => StepType::BrepWithVoids,
            "FACETED_BREP" => StepType::FacetedBrep,
            "SHELL_BASED_SURFACE_MODEL" => StepType::ShellBasedSurfaceModel,
            "LENGTH_MEASURE_WITH_UNIT" => StepType::LengthMeasureWithUnit,
            _ => StepType::Other,
        }
    }

    /// Whether this type is a shape root the importer tessellates
    pub fn is_shape_root(&self) -> bool {
        matches!(
            self,
            StepType::ManifoldSolidBrep
                | StepType::BrepWithVoids
                | StepType::FacetedBrep
                | StepType::ShellBasedSurfaceModel
        )
    }

    /// Whether this type is a face of a shell
    pub fn is_face(&self) -> bool {
        matches!(
            self,
            StepType::AdvancedFace | StepType::FaceSurface | StepType::Face
        )
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Decoded attribute value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeValue {
    /// Entity reference
    EntityRef(u32),
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enum value
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Typed value such as LENGTH_MEASURE(25.4)
    Typed(String, Vec<AttributeValue>),
    /// Null/undefined
    Null,
    /// Derived value (*)
    Derived,
}

impl AttributeValue {
    /// Convert from Token
    pub fn from_token(token: &Token) -> Self {
        match token {
            Token::EntityRef(id) => AttributeValue::EntityRef(*id),
            Token::String(s) => AttributeValue::String(s.to_string()),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(e) => AttributeValue::Enum(e.to_string()),
            Token::List(items) => {
                AttributeValue::List(items.iter().map(Self::from_token).collect())
            }
            Token::TypedValue(type_name, args) => AttributeValue::Typed(
                type_name.to_string(),
                args.iter().map(Self::from_token).collect(),
            ),
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }

    /// Get as entity reference
    #[inline]
    pub fn as_entity_ref(&self) -> Option<u32> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as string
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as enum value (without the dots)
    #[inline]
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Get as boolean (.T. / .F.)
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_enum()? {
            "T" | "TRUE" => Some(true),
            "F" | "FALSE" => Some(false),
            _ => None,
        }
    }

    /// Get as float; unwraps typed measures like LENGTH_MEASURE(1.5)
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Typed(_, args) if args.len() == 1 => args[0].as_float(),
            _ => None,
        }
    }

    /// Get as list
    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Check if null/derived
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null | AttributeValue::Derived)
    }

    /// Parse a coordinate list `(x, y, z)`; 2D points get z = 0
    pub fn as_point3(&self) -> Option<(f64, f64, f64)> {
        let coords = self.as_list()?;
        let x = coords.first()?.as_float()?;
        let y = coords.get(1)?.as_float()?;
        let z = coords.get(2).and_then(|v| v.as_float()).unwrap_or(0.0);
        Some((x, y, z))
    }
}

/// Decoded STEP entity
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntity {
    pub id: u32,
    pub step_type: StepType,
    /// Upper-case keyword as written in the file (empty for complex instances)
    pub type_name: String,
    pub attributes: Vec<AttributeValue>,
    /// Partial entity values of a complex instance, in file order
    pub parts: Vec<(String, Vec<AttributeValue>)>,
}

impl DecodedEntity {
    /// Create new simple entity
    pub fn new(id: u32, type_name: &str, attributes: Vec<AttributeValue>) -> Self {
        Self {
            id,
            step_type: StepType::from_name(type_name),
            type_name: type_name.to_string(),
            attributes,
            parts: Vec::new(),
        }
    }

    /// Create new complex entity
    pub fn complex(id: u32, parts: Vec<(String, Vec<AttributeValue>)>) -> Self {
        Self {
            id,
            step_type: StepType::Complex,
            type_name: String::new(),
            attributes: Vec::new(),
            parts,
        }
    }

    /// Get attribute by index
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    /// Get entity reference attribute
    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(|v| v.as_entity_ref())
    }

    /// Get string attribute
    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|v| v.as_string())
    }

    /// Get float attribute
    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|v| v.as_float())
    }

    /// Get boolean attribute (.T./.F.)
    pub fn get_bool(&self, index: usize) -> Option<bool> {
        self.get(index).and_then(|v| v.as_bool())
    }

    /// Get list attribute
    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index).and_then(|v| v.as_list())
    }

    /// Entity references held in a list attribute
    pub fn get_ref_list(&self, index: usize) -> Vec<u32> {
        self.get_list(index)
            .map(|items| items.iter().filter_map(|v| v.as_entity_ref()).collect())
            .unwrap_or_default()
    }

    /// Attributes of a named part of a complex instance
    pub fn part(&self, name: &str) -> Option<&[AttributeValue]> {
        self.parts
            .iter()
            .find(|(part_name, _)| part_name == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Whether the entity is (or, for complex instances, contains) the given keyword
    pub fn is_a(&self, name: &str) -> bool {
        self.type_name == name || self.part(name).is_some()
    }
}
