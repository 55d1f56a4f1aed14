use serde::{Deserialize, Serialize};

use crate::conic::Ellipse;
use crate::edges::{EdgePoint, EdgePointCollection, EdgePointId};
use crate::field_line::{sample_field_line, FieldLineError};

/// Archived geometry of an accepted candidate.
///
/// Every point is copied by value, so the record outlives the edge
/// collection it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowComponent {
    outer_ellipse: Ellipse,
    outer_points: Vec<EdgePoint>,
    field_lines: Vec<Vec<EdgePoint>>,
    filtered_field_lines: Vec<Vec<EdgePoint>>,
    convex_edge_segment: Vec<EdgePoint>,
    seed: EdgePoint,
    n_circles: usize,
}

fn copy_points(edges: &EdgePointCollection, ids: &[EdgePointId]) -> Vec<EdgePoint> {
    ids.iter().map(|&id| *edges.point(id)).collect()
}

fn sample_all(
    edges: &EdgePointCollection,
    seeds: &[EdgePointId],
    n_circles: usize,
) -> Result<Vec<Vec<EdgePoint>>, FieldLineError> {
    seeds
        .iter()
        .map(|&s| sample_field_line(edges, s, n_circles))
        .collect()
}

impl FlowComponent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        edges: &EdgePointCollection,
        outer_points: &[EdgePointId],
        seeds: &[EdgePointId],
        filtered_seeds: &[EdgePointId],
        outer_ellipse: Ellipse,
        convex_edge_segment: &[EdgePointId],
        seed: EdgePointId,
        n_circles: usize,
    ) -> Result<Self, FieldLineError> {
        Ok(Self {
            outer_ellipse,
            outer_points: copy_points(edges, outer_points),
            field_lines: sample_all(edges, seeds, n_circles)?,
            filtered_field_lines: sample_all(edges, filtered_seeds, n_circles)?,
            convex_edge_segment: copy_points(edges, convex_edge_segment),
            seed: *edges.point(seed),
            n_circles,
        })
    }

    pub fn outer_ellipse(&self) -> &Ellipse {
        &self.outer_ellipse
    }

    pub fn outer_points(&self) -> &[EdgePoint] {
        &self.outer_points
    }

    /// One field line per child seed, each starting with the seed.
    pub fn field_lines(&self) -> &[Vec<EdgePoint>] {
        &self.field_lines
    }

    /// Field lines of the seeds that survived filtering.
    pub fn filtered_field_lines(&self) -> &[Vec<EdgePoint>] {
        &self.filtered_field_lines
    }

    pub fn convex_edge_segment(&self) -> &[EdgePoint] {
        &self.convex_edge_segment
    }

    pub fn seed(&self) -> &EdgePoint {
        &self.seed
    }

    pub fn n_circles(&self) -> usize {
        self.n_circles
    }
}
