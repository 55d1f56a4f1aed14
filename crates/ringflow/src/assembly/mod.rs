//! Ring point assembly for marker decoding.
//!
//! The outermost ring is the grown boundary itself. Each filtered seed then
//! contributes one point per inner ring by walking its field line. A single
//! point outside the outer ellipse, or on the wrong side of the seed's center
//! line, rejects the candidate; so does a majority of inner-ring gradients
//! that contradict the radial layout of a real marker.

mod center;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::AssemblyConfig;
use crate::conic::Ellipse;
use crate::edges::{EdgePointCollection, EdgePointId};
use crate::field_line::Hop;
use crate::geometry::{is_in_ellipse, is_on_same_side, line_through_center, DirectedPoint};

pub use center::estimate_marker_center;

/// Stable reject code for ring assembly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyReject {
    NoRings,
    CurveExhausted,
    PointOutsideEllipse,
    WrongSideOfCenter,
    InconsistentGradients,
}

impl AssemblyReject {
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoRings => "no_rings",
            Self::CurveExhausted => "curve_exhausted",
            Self::PointOutsideEllipse => "point_outside_ellipse",
            Self::WrongSideOfCenter => "wrong_side_of_center",
            Self::InconsistentGradients => "inconsistent_gradients",
        }
    }
}

impl std::fmt::Display for AssemblyReject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::error::Error for AssemblyReject {}

/// Ring buckets from the outer boundary (index 0) inward; bucket `j` holds the
/// points reached by the `j`-th hop of each field line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingPoints {
    rings: Vec<Vec<DirectedPoint>>,
    gradient_out: usize,
    added: usize,
}

impl RingPoints {
    pub fn rings(&self) -> &[Vec<DirectedPoint>] {
        &self.rings
    }

    pub fn outermost(&self) -> &[DirectedPoint] {
        self.rings.first().map_or(&[], |r| r.as_slice())
    }

    pub fn innermost(&self) -> &[DirectedPoint] {
        self.rings.last().map_or(&[], |r| r.as_slice())
    }

    /// Inner-ring points whose gradient contradicts the radial layout.
    pub fn gradient_out(&self) -> usize {
        self.gradient_out
    }

    /// Inner-ring points checked for gradient consistency.
    pub fn gradient_checked(&self) -> usize {
        self.added
    }
}

/// Signed radial alignment of `p`'s gradient with the direction to `center`.
/// `None` when the gradient or the direction is undefined.
fn radial_alignment(
    edges: &EdgePointCollection,
    id: EdgePointId,
    center: [f64; 2],
    hop: Hop,
) -> Option<f64> {
    let p = edges.point(id);
    let g = p.unit_gradient()?;
    let (tx, ty) = (center[0] - p.x as f64, center[1] - p.y as f64);
    let dist = tx.hypot(ty);
    if dist <= f64::EPSILON {
        return None;
    }
    Some(-hop.sign() * (g[0] * tx + g[1] * ty) / dist)
}

/// Build the ring structure of a candidate.
///
/// Claims are tracked in a pass-local set: a point reached by several field
/// lines is accepted once, and the shared processed masks are never written,
/// so a rejection leaves the collection exactly as it was.
pub fn assemble_rings(
    edges: &EdgePointCollection,
    outer_ellipse: &Ellipse,
    outer_points: &[EdgePointId],
    filtered_seeds: &[EdgePointId],
    n_circles: usize,
    cfg: &AssemblyConfig,
) -> Result<RingPoints, AssemblyReject> {
    if n_circles == 0 {
        return Err(AssemblyReject::NoRings);
    }
    let mut rings: Vec<Vec<DirectedPoint>> = vec![Vec::new(); n_circles];
    rings[0] = outer_points
        .iter()
        .map(|&id| DirectedPoint::from(edges.point(id)))
        .collect();

    let center = outer_ellipse.center();
    let mut claimed: HashSet<EdgePointId> = HashSet::new();
    let mut gradient_out = 0usize;
    let mut added = 0usize;
    let checked_from = n_circles.saturating_sub(2);

    for &seed in filtered_seeds {
        let seed_pos = edges.point(seed).position();
        let center_line = line_through_center(seed_pos, center);
        let mut current = seed;

        for step in 1..n_circles {
            let hop = Hop::for_step(step);
            current = hop
                .follow(edges, current)
                .ok_or(AssemblyReject::CurveExhausted)?;

            if !claimed.insert(current) {
                continue;
            }

            let p = edges.point(current);
            let (x, y) = (p.x as f64, p.y as f64);
            if !is_in_ellipse(outer_ellipse, x, y) {
                tracing::debug!(x = p.x, y = p.y, step, "ring point outside outer ellipse");
                return Err(AssemblyReject::PointOutsideEllipse);
            }
            if !is_on_same_side(seed_pos, [x, y], &center_line) {
                tracing::debug!(x = p.x, y = p.y, step, "ring point across the center line");
                return Err(AssemblyReject::WrongSideOfCenter);
            }

            if step >= checked_from {
                added += 1;
                if radial_alignment(edges, current, center, hop)
                    .is_some_and(|c| c < cfg.gradient_out_cos)
                {
                    gradient_out += 1;
                }
            }
            rings[step].push(DirectedPoint::from(p));
        }
    }

    if added > 0 && gradient_out as f64 / added as f64 > cfg.max_gradient_out_ratio {
        tracing::debug!(gradient_out, added, "inner ring gradients inconsistent");
        return Err(AssemblyReject::InconsistentGradients);
    }

    Ok(RingPoints {
        rings,
        gradient_out,
        added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::{EdgePoint, RunId};
    use crate::geometry::Hull;
    use crate::test_utils::{marker_scene, MarkerScene};

    fn truth() -> Ellipse {
        Ellipse {
            cx: 80.0,
            cy: 80.0,
            a: 40.0,
            b: 30.0,
            angle: 0.25,
        }
    }

    fn assemble(scene: &MarkerScene, n_circles: usize) -> Result<RingPoints, AssemblyReject> {
        assemble_rings(
            &scene.edges,
            &truth(),
            &scene.boundary,
            &scene.seeds,
            n_circles,
            &AssemblyConfig::default(),
        )
    }

    #[test]
    fn consistent_marker_fills_every_ring() {
        let scene = marker_scene(&truth(), 8, 4, 160);
        let rings = assemble(&scene, 4).unwrap();

        assert_eq!(rings.rings().len(), 4);
        assert_eq!(rings.outermost().len(), scene.boundary.len());
        for ring in &rings.rings()[1..] {
            assert_eq!(ring.len(), 8);
        }
        assert_eq!(rings.gradient_out(), 0);
        assert_eq!(rings.gradient_checked(), 16);
        let innermost = rings.innermost();
        assert_eq!(innermost.len(), scene.lines.len());
        for line in &scene.lines {
            let p = DirectedPoint::from(scene.edges.point(line[3]));
            assert!(innermost.contains(&p));
        }
        assert!(scene.edges.marked_points(RunId::new(0).unwrap()).is_empty());
    }

    #[test]
    fn boundary_ring_lies_in_hull() {
        let scene = marker_scene(&truth(), 8, 3, 160);
        let rings = assemble(&scene, 3).unwrap();
        let hull = Hull::around(&truth(), 2.3);
        assert!(rings.outermost().iter().all(|p| hull.contains(p.x, p.y)));
    }

    /// Five seeds, three circles: ten inner points, all gradient-checked.
    fn flipped_scene(n_flipped: usize) -> MarkerScene {
        let mut scene = marker_scene(&truth(), 5, 3, 160);
        let inner: Vec<EdgePointId> = scene
            .lines
            .iter()
            .flat_map(|l| l[1..].iter().copied())
            .collect();
        for &id in &inner[..n_flipped] {
            let p = *scene.edges.point(id);
            scene.edges.set_gradient(id, -p.dx, -p.dy);
        }
        scene
    }

    #[test]
    fn half_inconsistent_gradients_still_pass() {
        let scene = flipped_scene(5);
        let rings = assemble(&scene, 3).unwrap();
        assert_eq!(rings.gradient_checked(), 10);
        assert_eq!(rings.gradient_out(), 5);
    }

    #[test]
    fn majority_inconsistent_gradients_reject() {
        let scene = flipped_scene(6);
        assert_eq!(
            assemble(&scene, 3),
            Err(AssemblyReject::InconsistentGradients)
        );
    }

    #[test]
    fn hop_outside_outer_ellipse_rejects() {
        let mut scene = marker_scene(&truth(), 6, 3, 160);
        let far = scene
            .edges
            .insert(EdgePoint::new(150, 150, 1.0, 1.0))
            .unwrap();
        let seed = scene.seeds[2];
        scene.edges.set_before(seed, Some(far));
        assert_eq!(
            assemble(&scene, 3),
            Err(AssemblyReject::PointOutsideEllipse)
        );
    }

    #[test]
    fn hop_across_center_line_rejects() {
        let mut scene = marker_scene(&truth(), 5, 3, 160);
        // Reflect the first hop of one field line through the center.
        let line = scene.lines[1].clone();
        let p = *scene.edges.point(line[1]);
        let mirrored = scene
            .edges
            .insert(EdgePoint::new(160 - p.x, 160 - p.y, -p.dx, -p.dy))
            .unwrap();
        scene.edges.set_before(line[0], Some(mirrored));
        assert_eq!(assemble(&scene, 3), Err(AssemblyReject::WrongSideOfCenter));
    }

    #[test]
    fn missing_link_rejects_and_zero_rings_is_invalid() {
        let mut scene = marker_scene(&truth(), 6, 3, 160);
        let line = scene.lines[4].clone();
        scene.edges.set_after(line[1], None);
        assert_eq!(assemble(&scene, 3), Err(AssemblyReject::CurveExhausted));
        assert_eq!(assemble(&scene, 0), Err(AssemblyReject::NoRings));
        assert_eq!(AssemblyReject::CurveExhausted.code(), "curve_exhausted");
    }

    #[test]
    fn shared_hop_points_are_taken_once() {
        let mut scene = marker_scene(&truth(), 6, 3, 160);
        // Two field lines converge on the same first hop.
        let target = scene.lines[0][1];
        scene.edges.set_before(scene.lines[3][0], Some(target));
        // Both hops of the diverted line were already claimed by line 0.
        let rings = assemble(&scene, 3).unwrap_or_else(|r| panic!("rejected: {}", r));
        assert_eq!(rings.rings()[1].len(), 5);
        assert_eq!(rings.rings()[2].len(), 5);
        assert_eq!(rings.gradient_checked(), 10);
    }
}
