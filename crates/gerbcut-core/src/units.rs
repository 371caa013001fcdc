//! Unit conversion utilities
//!
//! Design geometry is carried in inches; Gerber files may declare
//! millimeters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Length unit declared by a design layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Inches
    Inch,
    /// Millimeters
    #[default]
    Millimeter,
}

impl LengthUnit {
    /// Convert `value` in this unit to inches
    pub fn to_inches(&self, value: f64) -> f64 {
        match self {
            LengthUnit::Inch => value,
            LengthUnit::Millimeter => mm_to_inch(value),
        }
    }

    /// Unit label ("mm" or "in")
    pub fn label(&self) -> &'static str {
        match self {
            LengthUnit::Inch => "in",
            LengthUnit::Millimeter => "mm",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthUnit::Inch => write!(f, "Inch"),
            LengthUnit::Millimeter => write!(f, "Millimeter"),
        }
    }
}

/// Millimeters to inches
pub fn mm_to_inch(value: f64) -> f64 {
    value / MM_PER_INCH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_to_inches() {
        assert!(approx(LengthUnit::Millimeter.to_inches(25.4), 1.0));
        assert!(approx(LengthUnit::Inch.to_inches(0.5), 0.5));
        assert!(approx(mm_to_inch(MM_PER_INCH * 3.0), 3.0));
    }

    #[test]
    fn test_labels() {
        assert_eq!(LengthUnit::Inch.label(), "in");
        assert_eq!(LengthUnit::Millimeter.label(), "mm");
        assert_eq!(LengthUnit::default(), LengthUnit::Millimeter);
    }
}
