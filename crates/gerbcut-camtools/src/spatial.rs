//! R*-tree indexes for the merger and sequencer neighbour searches.

use gerbcut_core::{Extent, Point, Stroke};
use rstar::primitives::GeomWithData;
use rstar::{RTree, RTreeObject, AABB};

/// Bounding box of one stroke
#[derive(Debug, Clone)]
struct ExtentEntry {
    index: usize,
    extent: Extent,
}

impl RTreeObject for ExtentEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.extent.min_x, self.extent.min_y],
            [self.extent.max_x, self.extent.max_y],
        )
    }
}

/// Stroke bounding boxes, queried by gap
#[derive(Debug)]
pub(crate) struct ExtentIndex {
    tree: RTree<ExtentEntry>,
}

impl ExtentIndex {
    /// Index `extents` under the given ids
    pub(crate) fn new(extents: impl IntoIterator<Item = (usize, Extent)>) -> Self {
        let entries = extents
            .into_iter()
            .map(|(index, extent)| ExtentEntry { index, extent })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Ids whose boxes come within `gap` of `extent`, ascending
    pub(crate) fn within(&self, extent: &Extent, gap: f64) -> Vec<usize> {
        let envelope = AABB::from_corners(
            [extent.min_x - gap, extent.min_y - gap],
            [extent.max_x + gap, extent.max_y + gap],
        );
        let mut found: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.index)
            .collect();
        found.sort_unstable();
        found
    }
}

/// A candidate entry vertex: (stroke, vertex)
type EntryPoint = GeomWithData<[f64; 2], (usize, usize)>;

/// Where a greedy tool-path search may enter a stroke
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Entry {
    pub stroke: usize,
    pub vertex: usize,
    pub distance: f64,
}

/// Entry vertices of the strokes not yet cut
///
/// Closed strokes can be entered at any vertex, open strokes at either end.
#[derive(Debug)]
pub(crate) struct EntryIndex {
    tree: RTree<EntryPoint>,
}

impl EntryIndex {
    pub(crate) fn new(strokes: &[Stroke]) -> Self {
        let entries = strokes
            .iter()
            .enumerate()
            .flat_map(|(i, stroke)| {
                entry_vertices(stroke)
                    .into_iter()
                    .map(move |v| EntryPoint::new(coords(stroke.points()[v]), (i, v)))
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Closest entry to `pen`. Among equally distant entries the lower stroke
    /// index wins, then the lower vertex index.
    pub(crate) fn nearest(&self, pen: Point) -> Option<Entry> {
        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&coords(pen));
        let (first, first_d2) = candidates.next()?;
        // distances are compared as `Point::distance` does; the slack admits
        // entries whose squared distance rounds differently
        let limit = first_d2 + first_d2 * 1e-9 + f64::EPSILON;

        let mut best = to_entry(first, pen);
        for (candidate, d2) in candidates {
            if d2 > limit {
                break;
            }
            let entry = to_entry(candidate, pen);
            let closer = entry.distance < best.distance
                || (entry.distance == best.distance
                    && (entry.stroke, entry.vertex) < (best.stroke, best.vertex));
            if closer {
                best = entry;
            }
        }
        Some(best)
    }

    /// Drop every entry of `index`
    pub(crate) fn remove_stroke(&mut self, index: usize, stroke: &Stroke) {
        for v in entry_vertices(stroke) {
            let entry = EntryPoint::new(coords(stroke.points()[v]), (index, v));
            self.tree.remove(&entry);
        }
    }
}

fn entry_vertices(stroke: &Stroke) -> Vec<usize> {
    if stroke.is_closed() {
        (0..stroke.len()).collect()
    } else {
        vec![0, stroke.len() - 1]
    }
}

fn coords(p: Point) -> [f64; 2] {
    [p.x, p.y]
}

fn to_entry(point: &EntryPoint, pen: Point) -> Entry {
    let [x, y] = *point.geom();
    let (stroke, vertex) = point.data;
    Entry {
        stroke,
        vertex,
        distance: pen.distance(&Point::new(x, y)),
    }
}
