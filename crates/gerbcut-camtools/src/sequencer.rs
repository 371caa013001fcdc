//! Path Sequencer
//!
//! Turns a design into an ordered tool path of pen-up travels and pen-down
//! cuts. `Standard` keeps design order; `Enhanced` reorders strokes with a
//! greedy nearest-entry heuristic and chains strokes that share an end point.

use crate::spatial::EntryIndex;
use gerbcut_core::{CutMode, Design, Point, Stroke, Transform};
use tracing::debug;

/// Path ordering mode
pub type Mode = CutMode;

/// One tool motion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Pen-up move to a point
    Travel(Point),
    /// Pen-down move to a point
    Cut(Point),
    /// Lift the pen where it stands
    PenUp,
}

impl Motion {
    /// Target point, if the motion moves
    pub fn point(&self) -> Option<Point> {
        match self {
            Motion::Travel(p) | Motion::Cut(p) => Some(*p),
            Motion::PenUp => None,
        }
    }
}

/// Ordered motions; starts and ends with the pen up.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolPath {
    motions: Vec<Motion>,
}

impl ToolPath {
    pub fn new(motions: Vec<Motion>) -> Self {
        Self { motions }
    }

    pub fn motions(&self) -> &[Motion] {
        &self.motions
    }

    pub fn len(&self) -> usize {
        self.motions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motions.is_empty()
    }

    /// Remap every coordinate through `transform` then `offset`
    pub fn transformed(&self, transform: &Transform, offset: Point) -> ToolPath {
        let motions = self
            .motions
            .iter()
            .map(|m| match m {
                Motion::Travel(p) => Motion::Travel(transform.apply_with_offset(*p, offset)),
                Motion::Cut(p) => Motion::Cut(transform.apply_with_offset(*p, offset)),
                Motion::PenUp => Motion::PenUp,
            })
            .collect();
        ToolPath { motions }
    }

    /// Total pen-up distance, starting from the origin
    pub fn travel_distance(&self) -> f64 {
        self.distances().0
    }

    /// Total pen-down distance
    pub fn cut_distance(&self) -> f64 {
        self.distances().1
    }

    fn distances(&self) -> (f64, f64) {
        let mut pen = Point::default();
        let (mut travel, mut cut) = (0.0, 0.0);
        for m in &self.motions {
            match m {
                Motion::Travel(p) => {
                    travel += pen.distance(p);
                    pen = *p;
                }
                Motion::Cut(p) => {
                    cut += pen.distance(p);
                    pen = *p;
                }
                Motion::PenUp => {}
            }
        }
        (travel, cut)
    }

    /// Number of pen-down runs that end where they started
    pub fn loop_count(&self) -> usize {
        self.pen_down_runs()
            .iter()
            .filter(|run| run.len() > 2 && run.first() == run.last())
            .count()
    }

    /// Every pen-down run as the list of points it visits, entry first
    pub fn pen_down_runs(&self) -> Vec<Vec<Point>> {
        let mut runs = Vec::new();
        let mut pen = Point::default();
        let mut current: Vec<Point> = Vec::new();
        for m in &self.motions {
            match m {
                Motion::Cut(p) => {
                    if current.is_empty() {
                        current.push(pen);
                    }
                    current.push(*p);
                    pen = *p;
                }
                Motion::Travel(p) => {
                    if !current.is_empty() {
                        runs.push(std::mem::take(&mut current));
                    }
                    pen = *p;
                }
                Motion::PenUp => {
                    if !current.is_empty() {
                        runs.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }

    /// All motion targets in order
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.motions.iter().filter_map(Motion::point)
    }
}

/// Orders strokes into a [`ToolPath`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PathSequencer {
    mode: Mode,
}

impl PathSequencer {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Sequence a design
    pub fn sequence(&self, design: &Design) -> ToolPath {
        let path = match self.mode {
            Mode::Standard => standard(design),
            Mode::Enhanced => enhanced(design),
        };
        debug!(
            "Sequenced {} strokes ({}): {} motions, {:.3} in travel",
            design.len(),
            self.mode,
            path.len(),
            path.travel_distance()
        );
        path
    }
}

fn standard(design: &Design) -> ToolPath {
    let mut motions = Vec::new();
    for stroke in design.strokes() {
        let start = if stroke.is_closed() {
            smallest_vertex(stroke)
        } else {
            0
        };
        motions.push(Motion::Travel(stroke.points()[start]));
        push_cut(&mut motions, stroke, start, false);
        motions.push(Motion::PenUp);
    }
    ToolPath { motions }
}

fn enhanced(design: &Design) -> ToolPath {
    let strokes = design.strokes();
    let mut index = EntryIndex::new(strokes);
    let mut pen = Point::default();
    let mut pen_down = false;
    let mut motions = Vec::new();

    while !index.is_empty() {
        let Some(entry) = index.nearest(pen) else {
            break;
        };
        let stroke = &strokes[entry.stroke];
        index.remove_stroke(entry.stroke, stroke);
        let entry_point = stroke.points()[entry.vertex];

        if !(pen_down && entry_point == pen) {
            if pen_down {
                motions.push(Motion::PenUp);
            }
            motions.push(Motion::Travel(entry_point));
        }

        // open strokes entered at their far end run backwards
        let reversed = !stroke.is_closed() && entry.vertex != 0;
        pen = push_cut(&mut motions, stroke, entry.vertex, reversed);
        pen_down = true;
    }

    if pen_down {
        motions.push(Motion::PenUp);
    }
    ToolPath { motions }
}

/// Index of the lexicographically smallest vertex
fn smallest_vertex(stroke: &Stroke) -> usize {
    stroke
        .points()
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.lexicographic_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Cut a stroke from `start`, returning the pen position afterwards
fn push_cut(motions: &mut Vec<Motion>, stroke: &Stroke, start: usize, reversed: bool) -> Point {
    let pts = stroke.points();
    let n = pts.len();
    if stroke.is_closed() {
        for k in 1..=n {
            motions.push(Motion::Cut(pts[(start + k) % n]));
        }
        pts[start]
    } else if reversed {
        for p in pts.iter().rev().skip(1) {
            motions.push(Motion::Cut(*p));
        }
        pts[0]
    } else {
        for p in &pts[1..] {
            motions.push(Motion::Cut(*p));
        }
        pts[n - 1]
    }
}
