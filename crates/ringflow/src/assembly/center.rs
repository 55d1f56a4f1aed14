use crate::config::MarkerCenterConfig;
use crate::conic::{fit_ellipse_direct, Ellipse};

use super::RingPoints;

/// Marker center from an ellipse fit to the innermost ring.
///
/// Only large markers qualify: the outer perimeter must exceed
/// `min_perimeter_px` and the innermost ring must hold more than
/// `min_inner_points` points. Returns `None` otherwise or when the fit fails.
pub fn estimate_marker_center(
    outer: &Ellipse,
    rings: &RingPoints,
    cfg: &MarkerCenterConfig,
) -> Option<[f64; 2]> {
    if !cfg.enable || outer.perimeter() <= cfg.min_perimeter_px {
        return None;
    }
    let inner = rings.innermost();
    if rings.rings().len() < 2 || inner.len() <= cfg.min_inner_points {
        return None;
    }
    let pts: Vec<[f64; 2]> = inner.iter().map(|p| [p.x, p.y]).collect();
    match fit_ellipse_direct(&pts) {
        Ok(e) => Some(e.center()),
        Err(err) => {
            tracing::debug!(points = pts.len(), error = %err, "inner ring fit failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::assemble_rings;
    use crate::config::AssemblyConfig;
    use crate::test_utils::marker_scene;
    use approx::assert_relative_eq;

    fn rings_for(outer: &Ellipse, n_seeds: usize) -> RingPoints {
        let scene = marker_scene(outer, n_seeds, 3, 200);
        assemble_rings(
            &scene.edges,
            outer,
            &scene.boundary,
            &scene.seeds,
            3,
            &AssemblyConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn large_marker_center_comes_from_inner_ring() {
        let outer = Ellipse {
            cx: 100.0,
            cy: 96.0,
            a: 50.0,
            b: 42.0,
            angle: 0.1,
        };
        let rings = rings_for(&outer, 24);
        assert_eq!(rings.innermost().len(), 24);

        let c = estimate_marker_center(&outer, &rings, &MarkerCenterConfig::default())
            .expect("center");
        assert_relative_eq!(c[0], outer.cx, epsilon = 0.5);
        assert_relative_eq!(c[1], outer.cy, epsilon = 0.5);
    }

    #[test]
    fn small_or_sparse_markers_have_no_estimate() {
        let small = Ellipse {
            cx: 60.0,
            cy: 60.0,
            a: 25.0,
            b: 20.0,
            angle: 0.0,
        };
        let rings = rings_for(&small, 24);
        assert!(estimate_marker_center(&small, &rings, &MarkerCenterConfig::default()).is_none());

        let large = Ellipse {
            cx: 100.0,
            cy: 100.0,
            a: 50.0,
            b: 45.0,
            angle: 0.0,
        };
        let rings = rings_for(&large, 20);
        assert!(estimate_marker_center(&large, &rings, &MarkerCenterConfig::default()).is_none());

        let disabled = MarkerCenterConfig {
            enable: false,
            ..MarkerCenterConfig::default()
        };
        let rings = rings_for(&large, 24);
        assert!(estimate_marker_center(&large, &rings, &disabled).is_none());
    }
}
