//! Field-line walks along the `before`/`after` links of edge points.
//!
//! A field line starts at a seed on the outer boundary and visits one point per
//! ring by hopping `n_circles − 1` times, alternating direction and starting
//! with a `before` hop.

use crate::edges::{EdgePoint, EdgePointCollection, EdgePointId};

/// Direction of one hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    Before,
    After,
}

impl Hop {
    /// Direction of the `step`-th hop (1-based).
    #[inline]
    pub fn for_step(step: usize) -> Self {
        if step % 2 == 1 {
            Hop::Before
        } else {
            Hop::After
        }
    }

    /// +1 for `After`, −1 for `Before`.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Hop::Before => -1.0,
            Hop::After => 1.0,
        }
    }

    #[inline]
    pub(crate) fn follow(
        self,
        edges: &EdgePointCollection,
        id: EdgePointId,
    ) -> Option<EdgePointId> {
        match self {
            Hop::Before => edges.before(id),
            Hop::After => edges.after(id),
        }
    }
}

/// Failure to sample a field line.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldLineError {
    /// The curve ended before all rings were visited.
    CurveExhausted {
        /// Seed the walk started from.
        seed: [i32; 2],
        /// 1-based hop that had no target.
        step: usize,
    },
}

impl std::fmt::Display for FieldLineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CurveExhausted { seed, step } => write!(
                f,
                "field line from ({}, {}) ends at hop {}",
                seed[0], seed[1], step
            ),
        }
    }
}

impl std::error::Error for FieldLineError {}

/// Walk `n_circles − 1` hops from `seed`. Returns the visited points without
/// the seed, or the failing 1-based step.
pub(crate) fn try_walk(
    edges: &EdgePointCollection,
    seed: EdgePointId,
    n_circles: usize,
) -> Result<Vec<EdgePointId>, usize> {
    let mut hops = Vec::with_capacity(n_circles.saturating_sub(1));
    let mut current = seed;
    for step in 1..n_circles {
        current = Hop::for_step(step).follow(edges, current).ok_or(step)?;
        hops.push(current);
    }
    Ok(hops)
}

/// Points visited after the seed, or `None` when a link is missing.
pub fn walk_field_line(
    edges: &EdgePointCollection,
    seed: EdgePointId,
    n_circles: usize,
) -> Option<Vec<EdgePointId>> {
    try_walk(edges, seed, n_circles).ok()
}

/// Copy the seed and its hops by value.
pub fn sample_field_line(
    edges: &EdgePointCollection,
    seed: EdgePointId,
    n_circles: usize,
) -> Result<Vec<EdgePoint>, FieldLineError> {
    let hops = try_walk(edges, seed, n_circles).map_err(|step| {
        let p = edges.point(seed);
        FieldLineError::CurveExhausted {
            seed: [p.x, p.y],
            step,
        }
    })?;
    let mut line = Vec::with_capacity(n_circles.max(1));
    line.push(*edges.point(seed));
    line.extend(hops.into_iter().map(|id| *edges.point(id)));
    Ok(line)
}
