use serde::{Deserialize, Serialize};

use crate::config::GrowingConfig;
use crate::conic::{fit_ellipse_direct, Circle, Ellipse};
use crate::edges::{EdgePointCollection, EdgePointId};

use super::GrowError;

/// Whether the seeds spread enough around the boundary for a direct fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitQuality {
    /// Seeds cover enough of the boundary; the start ellipse is a direct fit.
    Good,
    /// Seeds sit on a short arc; the start shape is a circle and recovery runs.
    Poor,
}

/// Seed pair with the most opposed gradient directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergentPair {
    pub first: EdgePointId,
    pub second: EdgePointId,
    /// Cosine between the two unit gradients.
    pub cos: f64,
}

/// Starting shape for the growth loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialFit {
    pub ellipse: Ellipse,
    pub quality: InitQuality,
}

/// Minimum seed count for any starting shape.
const MIN_SEEDS: usize = 3;

/// Pair of seeds with the minimum gradient cosine. Seeds without a usable
/// gradient are skipped; ties keep the first pair found.
pub fn most_divergent_pair(
    edges: &EdgePointCollection,
    seeds: &[EdgePointId],
) -> Option<DivergentPair> {
    let grads: Vec<(EdgePointId, [f64; 2])> = seeds
        .iter()
        .filter_map(|&id| edges.point(id).unit_gradient().map(|g| (id, g)))
        .collect();

    let mut best: Option<DivergentPair> = None;
    for (i, &(first, g1)) in grads.iter().enumerate() {
        for &(second, g2) in &grads[i + 1..] {
            let cos = g1[0] * g2[0] + g1[1] * g2[1];
            if best.map_or(true, |b| cos < b.cos) {
                best = Some(DivergentPair { first, second, cos });
            }
        }
    }
    best
}

fn quality_of(pair: Option<&DivergentPair>, n_seeds: usize, cfg: &GrowingConfig) -> InitQuality {
    match pair {
        Some(p) if n_seeds >= cfg.min_good_init_points && p.cos <= cfg.init_cos_threshold => {
            InitQuality::Good
        }
        _ => InitQuality::Poor,
    }
}

pub fn classify_init(
    edges: &EdgePointCollection,
    seeds: &[EdgePointId],
    cfg: &GrowingConfig,
) -> InitQuality {
    quality_of(most_divergent_pair(edges, seeds).as_ref(), seeds.len(), cfg)
}

/// Third point for the fallback circle: the seed farthest from both ends of
/// the chord `p1–p2`. When it lies on the chord line it is pushed along its
/// gradient by `chord / perimeter_offset_divisor`.
pub fn perimeter_point(
    edges: &EdgePointCollection,
    seeds: &[EdgePointId],
    p1: [f64; 2],
    p2: [f64; 2],
    cfg: &GrowingConfig,
) -> Option<[f64; 2]> {
    let dist = |a: [f64; 2], b: [f64; 2]| (a[0] - b[0]).hypot(a[1] - b[1]);

    let mut far: Option<(EdgePointId, f64)> = None;
    for &id in seeds {
        let p = edges.point(id).position();
        let d = dist(p, p1).min(dist(p, p2));
        if far.map_or(true, |(_, best)| d > best) {
            far = Some((id, d));
        }
    }
    let (far_id, _) = far?;
    let far_pt = edges.point(far_id);
    let p = far_pt.position();

    let chord = dist(p1, p2);
    let off_line = if chord > 0.0 {
        ((p2[0] - p1[0]) * (p[1] - p1[1]) - (p2[1] - p1[1]) * (p[0] - p1[0])).abs() / chord
    } else {
        dist(p, p1)
    };
    if off_line >= cfg.collinear_eps {
        return Some(p);
    }

    let step = chord / cfg.perimeter_offset_divisor;
    Some(match far_pt.unit_gradient() {
        Some(g) => [p[0] + step * g[0], p[1] + step * g[1]],
        None => p,
    })
}

/// Starting ellipse from the filtered seeds: a direct fit when the seeds are
/// well spread, otherwise the circle through the divergent pair and the
/// perimeter point.
pub fn init_ellipse(
    edges: &EdgePointCollection,
    seeds: &[EdgePointId],
    cfg: &GrowingConfig,
) -> Result<InitialFit, GrowError> {
    if seeds.len() < MIN_SEEDS {
        return Err(GrowError::TooFewSeeds {
            needed: MIN_SEEDS,
            got: seeds.len(),
        });
    }
    let pair = most_divergent_pair(edges, seeds);
    let quality = quality_of(pair.as_ref(), seeds.len(), cfg);

    let ellipse = match quality {
        InitQuality::Good => {
            fit_ellipse_direct(&edges.positions(seeds)).map_err(GrowError::EllipseFit)?
        }
        InitQuality::Poor => {
            let pair = pair.ok_or(GrowError::DegenerateCircle)?;
            let p1 = edges.point(pair.first).position();
            let p2 = edges.point(pair.second).position();
            let p3 = perimeter_point(edges, seeds, p1, p2, cfg).ok_or(GrowError::DegenerateCircle)?;
            Circle::from_three_points(p1, p2, p3)
                .ok_or(GrowError::DegenerateCircle)?
                .to_ellipse()
        }
    };
    Ok(InitialFit { ellipse, quality })
}
