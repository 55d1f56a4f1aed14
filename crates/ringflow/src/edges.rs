//! Edge point storage shared by all refinement runs of one image.
//!
//! Points live in an image-sized grid for 8-connected lookups. Each point
//! carries two field-line links (`before` against its gradient, `after` along
//! it) and a 64-bit processed mask with one bit per concurrent run.
//!
//! Runs only ever touch their own bit and every bit operation is an atomic
//! read-modify-write on the point's word, so one collection can be shared by
//! reference across worker threads. Upstream seeding must still guarantee that
//! two parallel runs never flood the same connected component; nothing here
//! enforces it.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

const NO_POINT: u32 = u32::MAX;

/// 8-connected neighbour offsets, counter-clockwise from east (image y down).
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// One edge pixel: integer position and local intensity gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgePoint {
    /// Column in pixels.
    pub x: i32,
    /// Row in pixels.
    pub y: i32,
    /// Gradient x component.
    pub dx: f32,
    /// Gradient y component.
    pub dy: f32,
}

impl EdgePoint {
    pub fn new(x: i32, y: i32, dx: f32, dy: f32) -> Self {
        Self { x, y, dx, dy }
    }

    /// Position as floating point pixel coordinates.
    #[inline]
    pub fn position(&self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }

    /// Unit gradient, or `None` for a (near) zero gradient.
    #[inline]
    pub fn unit_gradient(&self) -> Option<[f64; 2]> {
        let (gx, gy) = (self.dx as f64, self.dy as f64);
        let norm = gx.hypot(gy);
        if norm <= f64::EPSILON || !norm.is_finite() {
            return None;
        }
        Some([gx / norm, gy / norm])
    }

    /// Whether the gradient points away from `center`, i.e.
    /// `dot(gradient, center - p) < 0`.
    #[inline]
    pub fn gradient_points_away_from(&self, center: [f64; 2]) -> bool {
        let to_center = [center[0] - self.x as f64, center[1] - self.y as f64];
        (self.dx as f64) * to_center[0] + (self.dy as f64) * to_center[1] < 0.0
    }
}

/// Index of a point inside one [`EdgePointCollection`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EdgePointId(u32);

impl EdgePointId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of one refinement run, in `0..RunId::MAX_RUNS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8")]
pub struct RunId(u8);

impl RunId {
    /// Number of runs that can share a collection at the same time.
    pub const MAX_RUNS: usize = 64;

    /// Returns `None` when `id >= MAX_RUNS`.
    pub fn new(id: usize) -> Option<Self> {
        (id < Self::MAX_RUNS).then_some(Self(id as u8))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// All run ids in ascending order.
    pub fn all() -> impl Iterator<Item = RunId> {
        (0..Self::MAX_RUNS as u8).map(RunId)
    }

    /// Bit owned by this run in every processed mask.
    #[inline]
    pub fn mask(self) -> u64 {
        1u64 << self.0
    }
}

impl TryFrom<u8> for RunId {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id as usize)
            .ok_or_else(|| format!("run id {} is outside 0..{}", id, Self::MAX_RUNS))
    }
}

/// Errors raised while building a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeIndexError {
    /// Position outside the image grid.
    OutOfBounds { x: i32, y: i32 },
    /// The grid cell already holds a point.
    Occupied { existing: EdgePointId },
}

impl std::fmt::Display for EdgeIndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfBounds { x, y } => {
                write!(f, "edge point ({}, {}) is outside the grid", x, y)
            }
            Self::Occupied { existing } => {
                write!(f, "cell already holds edge point #{}", existing.index())
            }
        }
    }
}

impl std::error::Error for EdgeIndexError {}

#[derive(Debug, Clone, Copy)]
struct Links {
    before: u32,
    after: u32,
}

impl Default for Links {
    fn default() -> Self {
        Self {
            before: NO_POINT,
            after: NO_POINT,
        }
    }
}

/// Grid-indexed edge points with field-line links and per-run processed bits.
#[derive(Debug)]
pub struct EdgePointCollection {
    width: u32,
    height: u32,
    points: Vec<EdgePoint>,
    links: Vec<Links>,
    processed: Vec<AtomicU64>,
    grid: Vec<u32>,
}

impl EdgePointCollection {
    /// Empty collection for an image of `width x height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            points: Vec::new(),
            links: Vec::new(),
            processed: Vec::new(),
            grid: vec![NO_POINT; width as usize * height as usize],
        }
    }

    /// Image bounds `[width, height]`.
    pub fn shape(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    fn cell(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Add a point to the grid. Each pixel holds at most one point.
    pub fn insert(&mut self, point: EdgePoint) -> Result<EdgePointId, EdgeIndexError> {
        let cell = self.cell(point.x, point.y).ok_or(EdgeIndexError::OutOfBounds {
            x: point.x,
            y: point.y,
        })?;
        if self.grid[cell] != NO_POINT {
            return Err(EdgeIndexError::Occupied {
                existing: EdgePointId(self.grid[cell]),
            });
        }
        let id = self.points.len() as u32;
        self.points.push(point);
        self.links.push(Links::default());
        self.processed.push(AtomicU64::new(0));
        self.grid[cell] = id;
        Ok(EdgePointId(id))
    }

    /// Point stored under `id`.
    ///
    /// Ids are only handed out by this collection, so an unknown id is a
    /// caller bug and panics on the index.
    #[inline]
    pub fn point(&self, id: EdgePointId) -> &EdgePoint {
        &self.points[id.index()]
    }

    /// Point at pixel `(x, y)`, if any.
    #[inline]
    pub fn at(&self, x: i32, y: i32) -> Option<EdgePointId> {
        let id = self.grid[self.cell(x, y)?];
        (id != NO_POINT).then_some(EdgePointId(id))
    }

    /// Existing 8-connected neighbours of pixel `(x, y)`.
    pub fn neighbors8(&self, x: i32, y: i32) -> impl Iterator<Item = EdgePointId> + '_ {
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(move |&(ox, oy)| self.at(x + ox, y + oy))
    }

    /// Replace the gradient of `id`; its position stays fixed.
    pub fn set_gradient(&mut self, id: EdgePointId, dx: f32, dy: f32) {
        let p = &mut self.points[id.index()];
        p.dx = dx;
        p.dy = dy;
    }

    pub fn set_before(&mut self, id: EdgePointId, target: Option<EdgePointId>) {
        self.links[id.index()].before = target.map_or(NO_POINT, |t| t.0);
    }

    pub fn set_after(&mut self, id: EdgePointId, target: Option<EdgePointId>) {
        self.links[id.index()].after = target.map_or(NO_POINT, |t| t.0);
    }

    /// Next point against the gradient direction of `id`.
    #[inline]
    pub fn before(&self, id: EdgePointId) -> Option<EdgePointId> {
        let raw = self.links[id.index()].before;
        (raw != NO_POINT).then_some(EdgePointId(raw))
    }

    /// Next point along the gradient direction of `id`.
    #[inline]
    pub fn after(&self, id: EdgePointId) -> Option<EdgePointId> {
        let raw = self.links[id.index()].after;
        (raw != NO_POINT).then_some(EdgePointId(raw))
    }

    #[inline]
    pub fn is_processed(&self, id: EdgePointId, run: RunId) -> bool {
        self.processed[id.index()].load(Ordering::Relaxed) & run.mask() != 0
    }

    #[inline]
    pub fn set_processed(&self, id: EdgePointId, run: RunId, value: bool) {
        let word = &self.processed[id.index()];
        if value {
            word.fetch_or(run.mask(), Ordering::Relaxed);
        } else {
            word.fetch_and(!run.mask(), Ordering::Relaxed);
        }
    }

    /// Set the run bit and report whether it was clear before.
    #[inline]
    pub fn mark_if_unprocessed(&self, id: EdgePointId, run: RunId) -> bool {
        let word = &self.processed[id.index()];
        word.fetch_or(run.mask(), Ordering::Relaxed) & run.mask() == 0
    }

    /// Clear the run bit on every point.
    pub fn clear_run(&self, run: RunId) {
        for word in &self.processed {
            word.fetch_and(!run.mask(), Ordering::Relaxed);
        }
    }

    /// Ids of all points currently marked for `run`, in insertion order.
    pub fn marked_points(&self, run: RunId) -> Vec<EdgePointId> {
        self.processed
            .iter()
            .enumerate()
            .filter(|(_, word)| word.load(Ordering::Relaxed) & run.mask() != 0)
            .map(|(i, _)| EdgePointId(i as u32))
            .collect()
    }

    /// Positions of `ids` as floating point coordinates.
    pub fn positions(&self, ids: &[EdgePointId]) -> Vec<[f64; 2]> {
        ids.iter().map(|&id| self.point(id).position()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: usize) -> RunId {
        RunId::new(id).unwrap()
    }

    #[test]
    fn run_id_rejects_out_of_range() {
        assert!(RunId::new(63).is_some());
        assert!(RunId::new(64).is_none());
        assert_eq!(run(5).mask(), 1 << 5);
        assert_eq!(RunId::all().count(), RunId::MAX_RUNS);
        assert_eq!(RunId::all().last(), Some(run(63)));
    }

    #[test]
    fn run_id_deserialization_checks_range() {
        assert_eq!(serde_json::from_str::<RunId>("5").unwrap(), run(5));
        assert!(serde_json::from_str::<RunId>("63").is_ok());
        assert!(serde_json::from_str::<RunId>("64").is_err());
        assert!(serde_json::from_str::<RunId>("255").is_err());
        assert_eq!(serde_json::to_string(&run(9)).unwrap(), "9");
    }

    #[test]
    fn insert_rejects_occupied_and_out_of_bounds() {
        let mut edges = EdgePointCollection::new(8, 8);
        let id = edges.insert(EdgePoint::new(2, 3, 1.0, 0.0)).unwrap();
        assert_eq!(edges.at(2, 3), Some(id));
        assert_eq!(
            edges.insert(EdgePoint::new(2, 3, 0.0, 1.0)),
            Err(EdgeIndexError::Occupied { existing: id })
        );
        assert_eq!(
            edges.insert(EdgePoint::new(8, 0, 0.0, 1.0)),
            Err(EdgeIndexError::OutOfBounds { x: 8, y: 0 })
        );
        assert_eq!(edges.at(-1, 0), None);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn neighbors_are_clipped_to_grid() {
        let mut edges = EdgePointCollection::new(4, 4);
        let corner = edges.insert(EdgePoint::new(0, 0, 1.0, 0.0)).unwrap();
        let right = edges.insert(EdgePoint::new(1, 0, 1.0, 0.0)).unwrap();
        let diag = edges.insert(EdgePoint::new(1, 1, 1.0, 0.0)).unwrap();
        edges.insert(EdgePoint::new(3, 3, 1.0, 0.0)).unwrap();

        let found: Vec<_> = edges.neighbors8(0, 0).collect();
        assert_eq!(found, vec![right, diag]);
        assert!(!edges.neighbors8(1, 1).any(|id| id == diag));
        assert!(edges.neighbors8(1, 1).any(|id| id == corner));
    }

    #[test]
    fn links_are_independent() {
        let mut edges = EdgePointCollection::new(8, 8);
        let a = edges.insert(EdgePoint::new(1, 1, 1.0, 0.0)).unwrap();
        let b = edges.insert(EdgePoint::new(2, 1, 1.0, 0.0)).unwrap();
        let c = edges.insert(EdgePoint::new(3, 1, 1.0, 0.0)).unwrap();
        edges.set_before(a, Some(b));
        edges.set_after(b, Some(c));
        assert_eq!(edges.before(a), Some(b));
        assert_eq!(edges.after(a), None);
        assert_eq!(edges.after(b), Some(c));
        assert_eq!(edges.before(b), None);
        edges.set_before(a, None);
        assert_eq!(edges.before(a), None);
    }

    #[test]
    fn run_bits_do_not_interfere() {
        let mut edges = EdgePointCollection::new(4, 4);
        let id = edges.insert(EdgePoint::new(1, 1, 1.0, 0.0)).unwrap();

        assert!(edges.mark_if_unprocessed(id, run(0)));
        assert!(!edges.mark_if_unprocessed(id, run(0)));
        edges.set_processed(id, run(63), true);
        assert!(edges.is_processed(id, run(0)));
        assert!(edges.is_processed(id, run(63)));
        assert!(!edges.is_processed(id, run(1)));

        edges.set_processed(id, run(0), false);
        assert!(!edges.is_processed(id, run(0)));
        assert!(edges.is_processed(id, run(63)));

        edges.clear_run(run(63));
        assert!(edges.marked_points(run(63)).is_empty());
    }

    #[test]
    fn concurrent_runs_share_words() {
        let mut edges = EdgePointCollection::new(16, 16);
        let ids: Vec<_> = (0..16)
            .map(|x| edges.insert(EdgePoint::new(x, 0, 1.0, 0.0)).unwrap())
            .collect();

        std::thread::scope(|s| {
            for r in 0..RunId::MAX_RUNS {
                let edges = &edges;
                let ids = &ids;
                s.spawn(move || {
                    for &id in ids {
                        edges.set_processed(id, run(r), true);
                    }
                });
            }
        });

        for r in 0..RunId::MAX_RUNS {
            assert_eq!(edges.marked_points(run(r)).len(), ids.len());
        }
    }
}
