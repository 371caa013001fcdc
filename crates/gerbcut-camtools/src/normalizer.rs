//! Geometry Normalizer
//!
//! Maps typed design-layer primitives to strokes in inches with Y up.
//! Arcs are flattened so the chord deviation stays under a tolerance,
//! flashes trace their aperture outline and polygons keep their holes as
//! independent closed strokes.

use crate::primitives::{Aperture, Layer, Primitive, YAxis};
use gerbcut_core::{Design, GeometryError, Point, Stroke};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use tracing::{debug, warn};

/// What to do with a primitive that has no stroke representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Fail the whole layer
    #[default]
    Abort,
    /// Log and continue without the primitive
    Skip,
}

/// Normalizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Maximum distance between an arc and its chords, in inches
    pub chord_tolerance: f64,
    /// Upper bound on segments for a single arc
    pub max_arc_segments: usize,
    pub unsupported: UnsupportedPolicy,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            // half a 508 dpi device step
            chord_tolerance: 1.0 / 1016.0,
            max_arc_segments: 360,
            unsupported: UnsupportedPolicy::Abort,
        }
    }
}

/// Minimum segments for a full circle
const FULL_CIRCLE_MIN_SEGMENTS: usize = 8;

const ANGLE_EPSILON: f64 = 1e-9;

/// Converts a [`Layer`] into a [`Design`]
#[derive(Debug, Default)]
pub struct GeometryNormalizer {
    config: NormalizerConfig,
}

/// Maps source coordinates into inches with Y up
#[derive(Debug, Clone, Copy)]
struct Frame {
    scale: f64,
    y_sign: f64,
}

impl Frame {
    fn point(&self, p: Point) -> Point {
        Point::new(p.x * self.scale, p.y * self.scale * self.y_sign)
    }
}

impl GeometryNormalizer {
    /// Create a new normalizer
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize every primitive of the layer, in order
    pub fn normalize(&self, layer: &Layer) -> Result<Design, GeometryError> {
        let frame = Frame {
            scale: layer.units.to_inches(1.0),
            y_sign: match layer.y_axis {
                YAxis::Up => 1.0,
                YAxis::Down => -1.0,
            },
        };

        let mut strokes = Vec::new();
        let mut skipped = 0usize;
        self.normalize_all(&layer.primitives, frame, &mut strokes, &mut skipped)?;

        debug!(
            "Normalized {} primitives into {} strokes ({} skipped)",
            layer.primitive_count(),
            strokes.len(),
            skipped
        );
        Ok(Design::new(strokes))
    }

    fn normalize_all(
        &self,
        primitives: &[Primitive],
        frame: Frame,
        out: &mut Vec<Stroke>,
        skipped: &mut usize,
    ) -> Result<(), GeometryError> {
        for primitive in primitives {
            if let Primitive::Group(children) = primitive {
                self.normalize_all(children, frame, out, skipped)?;
                continue;
            }
            match self.normalize_one(primitive, frame) {
                Ok(strokes) => out.extend(strokes),
                Err(err) => match self.config.unsupported {
                    UnsupportedPolicy::Abort => return Err(err),
                    UnsupportedPolicy::Skip => {
                        warn!("Skipping primitive: {}", err);
                        *skipped += 1;
                    }
                },
            }
        }
        Ok(())
    }

    fn normalize_one(&self, primitive: &Primitive, frame: Frame) -> Result<Vec<Stroke>, GeometryError> {
        match primitive {
            Primitive::Line { start, end } => {
                let (a, b) = (frame.point(*start), frame.point(*end));
                if a == b {
                    debug!("Dropping zero-length line at {}", a);
                    return Ok(Vec::new());
                }
                Ok(Stroke::open(vec![a, b]).into_iter().collect())
            }
            Primitive::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                clockwise,
            } => {
                if *radius <= 0.0 || !radius.is_finite() {
                    return Err(degenerate("arc", format!("radius {}", radius)));
                }
                let points = self.arc_points(
                    *center,
                    *radius,
                    *start_angle,
                    *end_angle,
                    *clockwise,
                    frame.scale,
                );
                let points = points.into_iter().map(|p| frame.point(p)).collect();
                Ok(Stroke::open(points).into_iter().collect())
            }
            Primitive::Flash { position, aperture } => {
                let outline = self.aperture_outline(*position, aperture, frame.scale)?;
                let points = outline.into_iter().map(|p| frame.point(p)).collect();
                closed_stroke("flash", points).map(|s| vec![s])
            }
            Primitive::Polygon { outline, holes } => {
                let mut strokes = Vec::with_capacity(1 + holes.len());
                let map = |ring: &[Point]| ring.iter().map(|p| frame.point(*p)).collect();
                strokes.push(closed_stroke("polygon", map(outline))?);
                for hole in holes {
                    strokes.push(closed_stroke("polygon hole", map(hole))?);
                }
                Ok(strokes)
            }
            Primitive::Group(children) => {
                let mut out = Vec::new();
                let mut skipped = 0;
                self.normalize_all(children, frame, &mut out, &mut skipped)?;
                Ok(out)
            }
            Primitive::Other { kind } => Err(GeometryError::UnsupportedPrimitive { kind: kind.clone() }),
        }
    }

    /// Number of chords so the arc never strays further than the tolerance
    ///
    /// `scale` converts the radius to inches.
    pub fn segment_count(&self, radius: f64, sweep: f64, scale: f64) -> usize {
        let full_circle = sweep >= TAU - ANGLE_EPSILON;
        let min = if full_circle { FULL_CIRCLE_MIN_SEGMENTS } else { 1 };
        let max = self.config.max_arc_segments.max(min);

        let r = radius * scale;
        let tol = self.config.chord_tolerance;
        if r <= tol || tol <= 0.0 {
            return if tol <= 0.0 { max } else { min };
        }
        // sagitta = r * (1 - cos(theta / 2))
        let max_step = 2.0 * (1.0 - tol / r).acos();
        let n = (sweep / max_step).ceil() as usize;
        n.clamp(min, max)
    }

    /// Flatten an arc into chord end points, in the arc's own units
    ///
    /// `scale` converts those units to inches so the tolerance applies.
    pub fn arc_points(
        &self,
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        clockwise: bool,
        scale: f64,
    ) -> Vec<Point> {
        let sweep = arc_sweep(start_angle, end_angle, clockwise);
        let n = self.segment_count(radius, sweep, scale);
        let direction = if clockwise { -1.0 } else { 1.0 };

        (0..=n)
            .map(|i| {
                let angle = start_angle + direction * sweep * (i as f64 / n as f64);
                Point::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                )
            })
            .collect()
    }

    fn aperture_outline(
        &self,
        at: Point,
        aperture: &Aperture,
        scale: f64,
    ) -> Result<Vec<Point>, GeometryError> {
        match aperture {
            Aperture::Circle { diameter } => {
                positive("circle aperture", &[*diameter])?;
                Ok(self.circle(at, diameter / 2.0, scale))
            }
            Aperture::Rectangle { width, height } => {
                positive("rectangle aperture", &[*width, *height])?;
                let (hw, hh) = (width / 2.0, height / 2.0);
                Ok(vec![
                    Point::new(at.x - hw, at.y - hh),
                    Point::new(at.x + hw, at.y - hh),
                    Point::new(at.x + hw, at.y + hh),
                    Point::new(at.x - hw, at.y + hh),
                ])
            }
            Aperture::Obround { width, height } => {
                positive("obround aperture", &[*width, *height])?;
                let r = width.min(*height) / 2.0;
                Ok(self.rounded_rect(at, *width, *height, r, scale))
            }
            Aperture::RoundedRectangle {
                width,
                height,
                corner_radius,
            } => {
                positive("rounded rectangle aperture", &[*width, *height])?;
                if *corner_radius < 0.0 || !corner_radius.is_finite() {
                    return Err(degenerate(
                        "rounded rectangle aperture",
                        format!("corner radius {}", corner_radius),
                    ));
                }
                let r = corner_radius.min(width.min(*height) / 2.0);
                Ok(self.rounded_rect(at, *width, *height, r, scale))
            }
            Aperture::RegularPolygon {
                diameter,
                vertices,
                rotation,
            } => {
                positive("polygon aperture", &[*diameter])?;
                if *vertices < 3 {
                    return Err(degenerate(
                        "polygon aperture",
                        format!("{} vertices", vertices),
                    ));
                }
                let r = diameter / 2.0;
                let rot = rotation.to_radians();
                Ok((0..*vertices)
                    .map(|i| {
                        let a = rot + TAU * i as f64 / *vertices as f64;
                        Point::new(at.x + r * a.cos(), at.y + r * a.sin())
                    })
                    .collect())
            }
            Aperture::Macro { .. } => Err(GeometryError::UnsupportedPrimitive {
                kind: aperture.kind(),
            }),
        }
    }

    fn circle(&self, center: Point, radius: f64, scale: f64) -> Vec<Point> {
        let n = self.segment_count(radius, TAU, scale);
        (0..n)
            .map(|i| {
                let a = TAU * i as f64 / n as f64;
                Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
            })
            .collect()
    }

    /// Rectangle with quarter-circle corners, starting on the bottom edge
    fn rounded_rect(&self, at: Point, width: f64, height: f64, r: f64, scale: f64) -> Vec<Point> {
        let (hw, hh) = (width / 2.0, height / 2.0);
        if r <= 0.0 {
            return vec![
                Point::new(at.x - hw, at.y - hh),
                Point::new(at.x + hw, at.y - hh),
                Point::new(at.x + hw, at.y + hh),
                Point::new(at.x - hw, at.y + hh),
            ];
        }

        let n = self.segment_count(r, FRAC_PI_2, scale);
        // corner centers counter-clockwise from bottom-right, with the
        // angle each quarter arc starts at
        let corners = [
            (Point::new(at.x + hw - r, at.y - hh + r), -FRAC_PI_2),
            (Point::new(at.x + hw - r, at.y + hh - r), 0.0),
            (Point::new(at.x - hw + r, at.y + hh - r), FRAC_PI_2),
            (Point::new(at.x - hw + r, at.y - hh + r), PI),
        ];

        let mut points: Vec<Point> = Vec::with_capacity(4 * (n + 1));
        for (c, start) in corners {
            for i in 0..=n {
                let a = start + FRAC_PI_2 * (i as f64 / n as f64);
                let p = Point::new(c.x + r * a.cos(), c.y + r * a.sin());
                // an obround has coincident corners on its short sides
                if points.last().is_none_or(|last| last.distance(&p) > 1e-12) {
                    points.push(p);
                }
            }
        }
        if points.len() > 1 && points[0].distance(&points[points.len() - 1]) <= 1e-12 {
            points.pop();
        }
        points
    }
}

/// Angular sweep in radians, always positive
///
/// Coincident start and end angles describe a full circle.
pub fn arc_sweep(start_angle: f64, end_angle: f64, clockwise: bool) -> f64 {
    let raw = if clockwise {
        start_angle - end_angle
    } else {
        end_angle - start_angle
    };
    let sweep = raw.rem_euclid(TAU);
    if sweep < ANGLE_EPSILON || TAU - sweep < ANGLE_EPSILON {
        TAU
    } else {
        sweep
    }
}

fn degenerate(kind: &str, reason: String) -> GeometryError {
    GeometryError::DegeneratePrimitive {
        kind: kind.to_string(),
        reason,
    }
}

fn positive(kind: &str, values: &[f64]) -> Result<(), GeometryError> {
    match values.iter().find(|v| **v <= 0.0 || !v.is_finite()) {
        Some(v) => Err(degenerate(kind, format!("non-positive size {}", v))),
        None => Ok(()),
    }
}

fn closed_stroke(kind: &str, mut points: Vec<Point>) -> Result<Stroke, GeometryError> {
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    let mut distinct: Vec<Point> = Vec::with_capacity(points.len());
    for p in &points {
        if !distinct.contains(p) {
            distinct.push(*p);
        }
    }
    if distinct.len() < 3 {
        return Err(degenerate(
            kind,
            format!("{} distinct vertices", distinct.len()),
        ));
    }
    Stroke::closed(points).ok_or_else(|| degenerate(kind, "too few vertices".to_string()))
}
