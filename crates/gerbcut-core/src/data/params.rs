//! Cut parameters applied by the protocol encoder.

use super::geometry::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Linear map applied to every coordinate before the offset.
///
/// A point maps to `(a*x + b*y, c*x + d*y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Transform {
    /// Identity matrix
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
    };

    /// Apply the matrix to a point
    pub fn apply(&self, p: Point) -> Point {
        Point::new(self.a * p.x + self.b * p.y, self.c * p.x + self.d * p.y)
    }

    /// Apply the matrix, then translate by `offset`
    pub fn apply_with_offset(&self, p: Point, offset: Point) -> Point {
        let t = self.apply(p);
        Point::new(t.x + offset.x, t.y + offset.y)
    }

    /// All four coefficients are finite
    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite() && self.d.is_finite()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Speed and force for one pass over the design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSetting {
    /// Blade speed, 1..=10
    pub speed: u32,
    /// Blade force, 1..=33
    pub force: u32,
}

impl PassSetting {
    pub const SPEED_MIN: u32 = 1;
    pub const SPEED_MAX: u32 = 10;
    pub const FORCE_MIN: u32 = 1;
    pub const FORCE_MAX: u32 = 33;

    pub const fn new(speed: u32, force: u32) -> Self {
        Self { speed, force }
    }
}

impl fmt::Display for PassSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speed {} / force {}", self.speed, self.force)
    }
}

/// Full parameter set for one encoded job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutParameters {
    /// Translation applied after the transform, in inches
    pub offset: Point,
    /// Padding around the job extent for the frame declaration, in inches
    pub margin: f64,
    /// Coordinate transform
    pub transform: Transform,
    /// One entry per pass; the pass count is the length
    pub passes: Vec<PassSetting>,
    /// Cut the padded frame rectangle on every pass
    pub cut_border: bool,
}

impl CutParameters {
    pub const MIN_PASSES: usize = 1;
    pub const MAX_PASSES: usize = 3;

    /// Number of passes
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }
}

impl Default for CutParameters {
    fn default() -> Self {
        Self {
            offset: Point::new(1.0, 4.5),
            margin: 0.0,
            transform: Transform::IDENTITY,
            passes: vec![PassSetting::new(2, 8), PassSetting::new(2, 30)],
            cut_border: false,
        }
    }
}

/// Stroke ordering strategy for the path sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutMode {
    /// Design order, closed loops start at their smallest vertex
    Standard,
    /// Nearest-neighbour ordering with stroke chaining
    #[default]
    Enhanced,
}

impl fmt::Display for CutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutMode::Standard => write!(f, "standard"),
            CutMode::Enhanced => write!(f, "enhanced"),
        }
    }
}

impl FromStr for CutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" | "closed" => Ok(CutMode::Standard),
            "enhanced" | "optimize" | "optimized" => Ok(CutMode::Enhanced),
            _ => Err(format!("Unknown cut mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_then_offset() {
        let t = Transform {
            a: 0.0,
            b: -1.0,
            c: 1.0,
            d: 0.0,
        };
        let p = t.apply_with_offset(Point::new(2.0, 3.0), Point::new(1.0, 1.0));
        assert_eq!(p, Point::new(-2.0, 3.0));
    }

    #[test]
    fn test_default_values() {
        let params = CutParameters::default();
        assert_eq!(params.offset, Point::new(1.0, 4.5));
        assert_eq!(params.pass_count(), 2);
        assert_eq!(params.passes[1], PassSetting::new(2, 30));
        assert_eq!(params.transform, Transform::IDENTITY);
    }

    #[test]
    fn test_cut_mode_parse() {
        assert_eq!("optimize".parse::<CutMode>().unwrap(), CutMode::Enhanced);
        assert_eq!("Standard".parse::<CutMode>().unwrap(), CutMode::Standard);
        assert!("zigzag".parse::<CutMode>().is_err());
    }
}
