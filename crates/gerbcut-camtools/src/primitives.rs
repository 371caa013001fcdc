//! Design-layer primitive model.
//!
//! A [`Layer`] is what the Gerber importer produces and what the geometry
//! normalizer consumes. Coordinates are in the layer's own units.

use gerbcut_core::{LengthUnit, Point};
use serde::{Deserialize, Serialize};

/// Direction of increasing Y in the source coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YAxis {
    #[default]
    Up,
    Down,
}

/// Flash aperture shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aperture {
    Circle {
        diameter: f64,
    },
    Rectangle {
        width: f64,
        height: f64,
    },
    /// Stadium shape; the rounded ends sit on the shorter dimension
    Obround {
        width: f64,
        height: f64,
    },
    RoundedRectangle {
        width: f64,
        height: f64,
        corner_radius: f64,
    },
    /// Regular polygon inscribed in a circle of `diameter`
    RegularPolygon {
        diameter: f64,
        vertices: u32,
        /// Rotation in degrees, counter-clockwise
        rotation: f64,
    },
    /// Aperture macro; has no stroke representation
    Macro {
        name: String,
    },
}

impl Aperture {
    /// Short name used in error messages and logs
    pub fn kind(&self) -> String {
        match self {
            Aperture::Circle { .. } => "circle aperture".to_string(),
            Aperture::Rectangle { .. } => "rectangle aperture".to_string(),
            Aperture::Obround { .. } => "obround aperture".to_string(),
            Aperture::RoundedRectangle { .. } => "rounded rectangle aperture".to_string(),
            Aperture::RegularPolygon { .. } => "polygon aperture".to_string(),
            Aperture::Macro { name } => format!("macro aperture {}", name),
        }
    }
}

/// A single typed design element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Line {
        start: Point,
        end: Point,
    },
    /// Angles in radians, measured counter-clockwise from +X
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        clockwise: bool,
    },
    Flash {
        position: Point,
        aperture: Aperture,
    },
    /// Filled region; holes become separate cut loops
    Polygon {
        outline: Vec<Point>,
        holes: Vec<Vec<Point>>,
    },
    /// Container whose children are normalized in order
    Group(Vec<Primitive>),
    /// Anything the importer could not type
    Other {
        kind: String,
    },
}

impl Primitive {
    /// Short name used in error messages and logs
    pub fn kind(&self) -> String {
        match self {
            Primitive::Line { .. } => "line".to_string(),
            Primitive::Arc { .. } => "arc".to_string(),
            Primitive::Flash { aperture, .. } => format!("flash ({})", aperture.kind()),
            Primitive::Polygon { .. } => "polygon".to_string(),
            Primitive::Group(_) => "group".to_string(),
            Primitive::Other { kind } => kind.clone(),
        }
    }
}

/// One design layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layer {
    pub units: LengthUnit,
    pub y_axis: YAxis,
    pub primitives: Vec<Primitive>,
}

impl Layer {
    pub fn new(units: LengthUnit, primitives: Vec<Primitive>) -> Self {
        Self {
            units,
            y_axis: YAxis::Up,
            primitives,
        }
    }

    pub fn with_y_axis(mut self, y_axis: YAxis) -> Self {
        self.y_axis = y_axis;
        self
    }

    /// Total number of primitives, counting group members
    pub fn primitive_count(&self) -> usize {
        fn count(items: &[Primitive]) -> usize {
            items
                .iter()
                .map(|p| match p {
                    Primitive::Group(children) => count(children),
                    _ => 1,
                })
                .sum()
        }
        count(&self.primitives)
    }
}
