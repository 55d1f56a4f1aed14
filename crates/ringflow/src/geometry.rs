//! Elementary predicates on ellipses, hulls and lines.

use serde::{Deserialize, Serialize};

use crate::conic::Ellipse;
use crate::edges::EdgePoint;

/// A sample position with its gradient, as handed to ring decoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectedPoint {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
}

impl From<&EdgePoint> for DirectedPoint {
    fn from(p: &EdgePoint) -> Self {
        Self {
            x: p.x as f64,
            y: p.y as f64,
            dx: p.dx as f64,
            dy: p.dy as f64,
        }
    }
}

/// Elliptic annulus between an ellipse shrunk and grown by the hull width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hull {
    pub inner: Ellipse,
    pub outer: Ellipse,
}

impl Hull {
    /// Annulus of half-width `delta` around `ellipse`. The inner semi-axes
    /// never drop below a small positive floor.
    pub fn around(ellipse: &Ellipse, delta: f64) -> Self {
        Self {
            inner: ellipse.with_axes_offset(-delta),
            outer: ellipse.with_axes_offset(delta),
        }
    }

    /// Outside-or-on the inner ellipse and inside-or-on the outer one.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.inner.normalized_radius_sq(x, y) >= 1.0 && self.outer.contains(x, y)
    }
}

#[inline]
pub fn is_in_ellipse(ellipse: &Ellipse, x: f64, y: f64) -> bool {
    ellipse.contains(x, y)
}

/// Line `a x + b y + c = 0` through `center` with normal `point − center`.
pub fn line_through_center(point: [f64; 2], center: [f64; 2]) -> [f64; 3] {
    let a = point[0] - center[0];
    let b = point[1] - center[1];
    [a, b, -a * center[0] - b * center[1]]
}

/// Both points strictly on the same side of `line`.
pub fn is_on_same_side(reference: [f64; 2], test: [f64; 2], line: &[f64; 3]) -> bool {
    let eval = |p: [f64; 2]| line[0] * p[0] + line[1] * p[1] + line[2];
    eval(reference) * eval(test) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Ellipse {
        Ellipse {
            cx: 50.0,
            cy: 40.0,
            a: 20.0,
            b: 10.0,
            angle: 0.0,
        }
    }

    #[test]
    fn hull_band_membership() {
        let hull = Hull::around(&base(), 2.0);
        assert!(hull.contains(70.0, 40.0));
        assert!(hull.contains(71.5, 40.0));
        assert!(hull.contains(50.0, 48.5));
        assert!(!hull.contains(50.0, 40.0));
        assert!(!hull.contains(73.0, 40.0));
        assert!(!hull.contains(65.0, 40.0));
    }

    #[test]
    fn wide_hull_keeps_inner_axes_positive() {
        let hull = Hull::around(&base(), 15.0);
        assert!(hull.inner.is_valid());
        assert!(hull.inner.b > 0.0);
        assert!(hull.contains(50.0, 40.5));
    }

    #[test]
    fn center_line_splits_plane() {
        let center = [10.0, 10.0];
        let line = line_through_center([20.0, 10.0], center);
        assert!(is_on_same_side([20.0, 10.0], [11.0, 30.0], &line));
        assert!(!is_on_same_side([20.0, 10.0], [9.0, 10.0], &line));
        // Points on the line belong to neither side.
        assert!(!is_on_same_side([20.0, 10.0], [10.0, -5.0], &line));
    }

    #[test]
    fn ellipse_membership_includes_boundary() {
        assert!(is_in_ellipse(&base(), 70.0, 40.0));
        assert!(!is_in_ellipse(&base(), 70.5, 40.0));
    }
}
