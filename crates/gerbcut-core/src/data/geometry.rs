//! Stroke geometry shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A point in design space, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate, increasing upwards
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Lexicographic ordering, x first then y
    pub fn lexicographic_cmp(&self, other: &Point) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }

    /// Both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extent {
    /// Minimum X
    pub min_x: f64,
    /// Minimum Y
    pub min_y: f64,
    /// Maximum X
    pub max_x: f64,
    /// Maximum Y
    pub max_y: f64,
}

impl Extent {
    /// Bounding box of a point set, `None` when the set is empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut extent = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            extent.include(p);
        }
        Some(extent)
    }

    /// Grow the box to contain `p`
    pub fn include(&mut self, p: &Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Box grown by `amount` on every side
    pub fn padded(&self, amount: f64) -> Extent {
        Extent {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }

    /// Width of the box
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the box
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Length of the diagonal
    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.height())
    }

    /// Whether two boxes overlap once each is grown by `gap`
    pub fn overlaps_within(&self, other: &Extent, gap: f64) -> bool {
        self.min_x - gap <= other.max_x
            && other.min_x - gap <= self.max_x
            && self.min_y - gap <= other.max_y
            && other.min_y - gap <= self.max_y
    }

    /// Lower-left corner
    pub fn min(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    /// Upper-right corner
    pub fn max(&self) -> Point {
        Point::new(self.max_x, self.max_y)
    }
}

/// One continuous cut path.
///
/// Closed strokes hold each vertex once; the return to the first vertex is
/// implied by the `closed` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StrokeRecord")]
pub struct Stroke {
    points: Vec<Point>,
    closed: bool,
}

/// Serialized shape of a [`Stroke`], checked on the way in
#[derive(Deserialize)]
struct StrokeRecord {
    points: Vec<Point>,
    closed: bool,
}

impl TryFrom<StrokeRecord> for Stroke {
    type Error = String;

    fn try_from(record: StrokeRecord) -> Result<Self, Self::Error> {
        let count = record.points.len();
        Stroke::new(record.points, record.closed)
            .ok_or_else(|| format!("stroke needs at least 2 points, got {}", count))
    }
}

impl Stroke {
    /// Create a stroke, `None` when fewer than two points are given
    pub fn new(points: Vec<Point>, closed: bool) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        Some(Self { points, closed })
    }

    /// Open path through `points`
    pub fn open(points: Vec<Point>) -> Option<Self> {
        Self::new(points, false)
    }

    /// Closed region outlined by `points`.
    ///
    /// A trailing vertex equal to the first one is dropped.
    pub fn closed(mut points: Vec<Point>) -> Option<Self> {
        if points.len() > 2 && points.first() == points.last() {
            points.pop();
        }
        Self::new(points, true)
    }

    /// The vertices in order
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consume the stroke, returning its vertices
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Whether this stroke outlines a closed region
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// First vertex
    pub fn start(&self) -> Point {
        self.points[0]
    }

    /// Last vertex (for closed strokes the cut ends back at `start`)
    pub fn end(&self) -> Point {
        if self.closed {
            self.points[0]
        } else {
            self.points[self.points.len() - 1]
        }
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the stroke has no vertices
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounding box of the vertices
    pub fn extent(&self) -> Extent {
        // Invariant: at least two points
        Extent::from_points(&self.points).unwrap_or_default()
    }

    /// Every edge cut by this stroke, including the closing edge
    pub fn edges(&self) -> Vec<(Point, Point)> {
        let mut edges: Vec<(Point, Point)> =
            self.points.windows(2).map(|w| (w[0], w[1])).collect();
        if self.closed {
            edges.push((self.points[self.points.len() - 1], self.points[0]));
        }
        edges
    }

    /// Total cut length
    pub fn length(&self) -> f64 {
        self.edges().iter().map(|(a, b)| a.distance(b)).sum()
    }
}

/// Ordered collection of strokes with its bounding extent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "DesignRecord")]
pub struct Design {
    strokes: Vec<Stroke>,
    extent: Extent,
}

/// Serialized shape of a [`Design`]; the extent is recomputed on the way in
#[derive(Deserialize)]
struct DesignRecord {
    strokes: Vec<Stroke>,
}

impl From<DesignRecord> for Design {
    fn from(record: DesignRecord) -> Self {
        Design::new(record.strokes)
    }
}

impl Design {
    /// Build a design, computing its extent
    pub fn new(strokes: Vec<Stroke>) -> Self {
        let extent = strokes
            .iter()
            .map(Stroke::extent)
            .reduce(|acc, e| acc.union(&e))
            .unwrap_or_default();
        Self { strokes, extent }
    }

    /// The strokes in design order
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Consume the design, returning its strokes
    pub fn into_strokes(self) -> Vec<Stroke> {
        self.strokes
    }

    /// Bounding extent of all strokes (zero-sized for an empty design)
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Number of strokes
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    /// Whether the design has no strokes
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Number of closed strokes
    pub fn closed_count(&self) -> usize {
        self.strokes.iter().filter(|s| s.is_closed()).count()
    }
}
