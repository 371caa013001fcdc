//! Feature Merger
//!
//! Simplifies closely spaced or tiny closed features before sequencing.
//!
//! Closed strokes whose outlines come within `min_dist` of each other are
//! clustered transitively, and every cluster is replaced by the convex hull
//! of all its vertices. The hull encloses each member outline; it is not an
//! exact boolean union. A closed stroke that joins no cluster and whose
//! bounding-box diagonal is under `min_size` is dropped as noise.
//! Open strokes always pass through untouched.

use crate::spatial::ExtentIndex;
use geo::{ConvexHull, Coord, EuclideanDistance, LineString, MultiPoint, Polygon};
use gerbcut_core::{Design, Point, Stroke};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Merge thresholds, in inches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureMerger {
    pub min_size: f64,
    pub min_dist: f64,
}

impl Default for FeatureMerger {
    fn default() -> Self {
        Self {
            min_size: 0.014,
            min_dist: 0.009,
        }
    }
}

/// What a merge run changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    /// Clusters replaced by a hull
    pub merged_clusters: usize,
    /// Strokes absorbed into those hulls
    pub absorbed: usize,
    /// Isolated sub-threshold strokes removed
    pub dropped: usize,
}

impl MergeReport {
    pub fn is_unchanged(&self) -> bool {
        self.merged_clusters == 0 && self.dropped == 0
    }
}

/// Disjoint-set forest over stroke indices
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Join two sets; the smaller root wins so roots stay deterministic
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

impl FeatureMerger {
    pub fn new(min_size: f64, min_dist: f64) -> Self {
        Self { min_size, min_dist }
    }

    /// Both thresholds disabled
    pub fn is_identity(&self) -> bool {
        self.min_size <= 0.0 && self.min_dist <= 0.0
    }

    /// Merge a design, discarding the report
    pub fn merge(&self, design: &Design) -> Design {
        self.merge_with_report(design).0
    }

    /// Merge a design and report what changed
    pub fn merge_with_report(&self, design: &Design) -> (Design, MergeReport) {
        if self.is_identity() {
            return (design.clone(), MergeReport::default());
        }

        let strokes = design.strokes();
        let closed: Vec<usize> = strokes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_closed())
            .map(|(i, _)| i)
            .collect();

        let mut sets = UnionFind::new(strokes.len());
        if self.min_dist > 0.0 {
            let polygons: Vec<Polygon<f64>> =
                closed.iter().map(|&i| to_polygon(&strokes[i])).collect();
            let extents: Vec<_> = closed.iter().map(|&i| strokes[i].extent()).collect();
            let index = ExtentIndex::new(extents.iter().copied().enumerate());

            for a in 0..closed.len() {
                // bounding boxes further apart than min_dist cannot qualify
                for b in index.within(&extents[a], self.min_dist) {
                    if b <= a || !extents[a].overlaps_within(&extents[b], self.min_dist) {
                        continue;
                    }
                    if polygons[a].euclidean_distance(&polygons[b]) < self.min_dist {
                        sets.union(closed[a], closed[b]);
                    }
                }
            }
        }

        // cluster members keyed by root, in design order
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); strokes.len()];
        for &i in &closed {
            let root = sets.find(i);
            members[root].push(i);
        }

        let mut report = MergeReport::default();
        let mut out = Vec::with_capacity(strokes.len());
        for (i, stroke) in strokes.iter().enumerate() {
            if !stroke.is_closed() {
                out.push(stroke.clone());
                continue;
            }
            let root = sets.find(i);
            let cluster = &members[root];
            if cluster.len() >= 2 {
                // the hull takes the place of the first member
                if cluster[0] == i {
                    match hull_of(cluster.iter().map(|&m| &strokes[m])) {
                        Some(hull) => {
                            report.merged_clusters += 1;
                            report.absorbed += cluster.len();
                            out.push(hull);
                        }
                        None => out.extend(cluster.iter().map(|&m| strokes[m].clone())),
                    }
                }
                continue;
            }
            if self.min_size > 0.0 && stroke.extent().diagonal() < self.min_size {
                report.dropped += 1;
                continue;
            }
            out.push(stroke.clone());
        }

        debug!(
            "Merged {} clusters ({} strokes), dropped {} small features",
            report.merged_clusters, report.absorbed, report.dropped
        );
        (Design::new(out), report)
    }
}

fn to_polygon(stroke: &Stroke) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = stroke
        .points()
        .iter()
        .map(|p| Coord { x: p.x, y: p.y })
        .collect();
    // LineString is closed by Polygon::new
    Polygon::new(LineString::from(coords), vec![])
}

/// Convex hull of every vertex as a closed stroke
fn hull_of<'a>(strokes: impl Iterator<Item = &'a Stroke>) -> Option<Stroke> {
    let points: Vec<geo::Point<f64>> = strokes
        .flat_map(|s| s.points().iter())
        .map(|p| geo::Point::new(p.x, p.y))
        .collect();
    let hull = MultiPoint::from(points).convex_hull();
    let vertices: Vec<Point> = hull
        .exterior()
        .points()
        .map(|p| Point::new(p.x(), p.y()))
        .collect();
    // the hull ring repeats its first vertex; Stroke::closed drops it
    Stroke::closed(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Stroke {
        Stroke::closed(vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ])
        .unwrap()
    }

    fn contains(stroke: &Stroke, p: Point) -> bool {
        // convex, counter-clockwise
        stroke
            .edges()
            .iter()
            .all(|(a, b)| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) >= -1e-12)
    }

    #[test]
    fn test_disabled_is_identity() {
        let design = Design::new(vec![square(0.0, 0.0, 0.001), square(0.0015, 0.0, 0.001)]);
        let (merged, report) = FeatureMerger::new(0.0, 0.0).merge_with_report(&design);
        assert_eq!(merged, design);
        assert!(report.is_unchanged());
    }

    #[test]
    fn test_near_strokes_merge_into_enclosing_hull() {
        let a = square(0.0, 0.0, 0.5);
        let b = square(0.501, 0.0, 0.5);
        let design = Design::new(vec![a.clone(), b.clone()]);

        let (merged, report) = FeatureMerger::new(0.0, 0.01).merge_with_report(&design);
        assert_eq!(merged.len(), 1);
        assert_eq!(report.merged_clusters, 1);
        assert_eq!(report.absorbed, 2);

        let hull = &merged.strokes()[0];
        assert!(hull.is_closed());
        for p in a.points().iter().chain(b.points()) {
            assert!(contains(hull, *p), "hull misses {}", p);
        }
    }

    #[test]
    fn test_far_strokes_stay_separate() {
        let design = Design::new(vec![square(0.0, 0.0, 0.5), square(0.501, 0.0, 0.5)]);
        let merged = FeatureMerger::new(0.0, 0.0001).merge(&design);
        assert_eq!(merged, design);
    }

    #[test]
    fn test_clusters_are_transitive() {
        let design = Design::new(vec![
            square(0.0, 0.0, 0.1),
            square(5.0, 5.0, 1.0),
            square(0.105, 0.0, 0.1),
            square(0.21, 0.0, 0.1),
        ]);
        let (merged, report) = FeatureMerger::new(0.0, 0.01).merge_with_report(&design);
        assert_eq!(report.merged_clusters, 1);
        assert_eq!(report.absorbed, 3);
        assert_eq!(merged.len(), 2);
        // hull sits where the first member was
        assert!(merged.strokes()[0].extent().width() > 0.3);
        assert_eq!(merged.strokes()[1], square(5.0, 5.0, 1.0));
    }

    #[test]
    fn test_isolated_small_feature_dropped() {
        let tiny = square(3.0, 3.0, 0.005);
        let big = square(0.0, 0.0, 1.0);
        let design = Design::new(vec![tiny, big.clone()]);
        let (merged, report) = FeatureMerger::new(0.014, 0.009).merge_with_report(&design);
        assert_eq!(report.dropped, 1);
        assert_eq!(merged.strokes(), &[big]);
    }

    #[test]
    fn test_small_feature_near_neighbour_is_absorbed() {
        let tiny = square(1.002, 0.0, 0.005);
        let big = square(0.0, 0.0, 1.0);
        let design = Design::new(vec![big, tiny]);
        let (merged, report) = FeatureMerger::new(0.014, 0.009).merge_with_report(&design);
        assert_eq!(report.dropped, 0);
        assert_eq!(report.merged_clusters, 1);
        assert_eq!(merged.len(), 1);
        assert!(merged.extent().max_x >= 1.007 - 1e-12);
    }

    #[test]
    fn test_pad_grid_merges_rows_only() {
        // rows 0.004 apart merge, columns 0.5 apart stay separate
        let mut strokes = Vec::new();
        for col in 0..30 {
            for row in 0..2 {
                strokes.push(square(col as f64 * 0.5, row as f64 * 0.104, 0.1));
            }
        }
        let design = Design::new(strokes);
        let (merged, report) = FeatureMerger::new(0.0, 0.009).merge_with_report(&design);
        assert_eq!(report.merged_clusters, 30);
        assert_eq!(report.absorbed, 60);
        assert_eq!(merged.len(), 30);
        for (col, hull) in merged.strokes().iter().enumerate() {
            let extent = hull.extent();
            assert!((extent.min_x - col as f64 * 0.5).abs() < 1e-12);
            assert!((extent.max_y - 0.204).abs() < 1e-12);
        }
    }

    #[test]
    fn test_open_strokes_pass_through() {
        let line = Stroke::open(vec![Point::new(0.0, 0.0), Point::new(0.001, 0.0)]).unwrap();
        let design = Design::new(vec![line.clone(), square(0.0, 0.0, 0.5)]);
        let merged = FeatureMerger::default().merge(&design);
        assert_eq!(merged.strokes()[0], line);
        assert_eq!(merged.len(), 2);
    }
}
