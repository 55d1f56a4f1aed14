//! Ellipse, circle and conic value types.

use nalgebra::{Matrix2, SymmetricEigen, Vector2};
use serde::{Deserialize, Serialize};

/// Errors that can occur during conic fitting.
#[derive(Debug, Clone, PartialEq)]
pub enum ConicError {
    /// Too few points for the requested fit.
    TooFewPoints {
        /// Required minimum number of points.
        needed: usize,
        /// Provided number of points.
        got: usize,
    },
    /// The points do not determine a proper ellipse or circle
    /// (collinear, repeated, or numerically ill-conditioned input).
    Degenerate,
}

impl std::fmt::Display for ConicError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few points: need {}, got {}", needed, got)
            }
            Self::Degenerate => f.write_str("degenerate point configuration"),
        }
    }
}

impl std::error::Error for ConicError {}

/// General conic: A x² + B xy + C y² + D x + E y + F = 0, stored as [A..F].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConicCoeffs(pub [f64; 6]);

impl ConicCoeffs {
    /// Discriminant test B² − 4AC < 0.
    pub fn is_ellipse(&self) -> bool {
        let [a, b, c, ..] = self.0;
        b * b - 4.0 * a * c < 0.0
    }

    /// Geometric parameters, or `None` when the conic is not a real ellipse.
    pub fn to_ellipse(self) -> Option<Ellipse> {
        if !self.is_ellipse() {
            return None;
        }
        let [a, b, c, d, e, f] = self.0;
        let quad = Matrix2::new(a, 0.5 * b, 0.5 * b, c);
        let lin = Vector2::new(0.5 * d, 0.5 * e);
        let center = -quad.try_inverse()? * lin;
        // Conic value at the center.
        let f_center = f + lin.dot(&center);
        if !f_center.is_finite() || f_center.abs() < 1e-300 {
            return None;
        }

        let eig = SymmetricEigen::new(quad);
        // Smaller |eigenvalue| belongs to the major axis.
        let (i_major, i_minor) = if eig.eigenvalues[0].abs() <= eig.eigenvalues[1].abs() {
            (0, 1)
        } else {
            (1, 0)
        };
        let a_sq = -f_center / eig.eigenvalues[i_major];
        let b_sq = -f_center / eig.eigenvalues[i_minor];
        if !(a_sq > 0.0 && b_sq > 0.0) {
            return None;
        }
        let dir = eig.eigenvectors.column(i_major);
        let ellipse = Ellipse {
            cx: center[0],
            cy: center[1],
            a: a_sq.sqrt(),
            b: b_sq.sqrt(),
            angle: normalize_angle(dir[1].atan2(dir[0])),
        };
        ellipse.is_valid().then_some(ellipse)
    }
}

/// Geometric ellipse parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    /// Center x in pixels.
    pub cx: f64,
    /// Center y in pixels.
    pub cy: f64,
    /// Semi-major axis length.
    pub a: f64,
    /// Semi-minor axis length.
    pub b: f64,
    /// Rotation angle of the major axis from +x, in radians (−π/2, π/2].
    pub angle: f64,
}

impl Ellipse {
    /// Positive semi-axes and finite values.
    pub fn is_valid(&self) -> bool {
        self.a > 0.0
            && self.b > 0.0
            && self.a.is_finite()
            && self.b.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.angle.is_finite()
    }

    #[inline]
    pub fn center(&self) -> [f64; 2] {
        [self.cx, self.cy]
    }

    /// Same center and angle with both semi-axes shifted by `delta`.
    /// Axes are clamped to stay strictly positive.
    pub fn with_axes_offset(&self, delta: f64) -> Self {
        Self {
            a: (self.a + delta).max(MIN_SEMI_AXIS),
            b: (self.b + delta).max(MIN_SEMI_AXIS),
            ..*self
        }
    }

    /// Implicit value `(u/a)² + (v/b)²` in the ellipse frame: `< 1` inside,
    /// `1` on the boundary.
    #[inline]
    pub fn normalized_radius_sq(&self, x: f64, y: f64) -> f64 {
        let (sin_t, cos_t) = self.angle.sin_cos();
        let dx = x - self.cx;
        let dy = y - self.cy;
        let u = cos_t * dx + sin_t * dy;
        let v = -sin_t * dx + cos_t * dy;
        (u / self.a).powi(2) + (v / self.b).powi(2)
    }

    /// Inside or on the boundary.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.normalized_radius_sq(x, y) <= 1.0
    }

    /// Perimeter (Ramanujan's second approximation).
    pub fn perimeter(&self) -> f64 {
        let h = ((self.a - self.b) / (self.a + self.b)).powi(2);
        std::f64::consts::PI * (self.a + self.b) * (1.0 + 3.0 * h / (10.0 + (4.0 - 3.0 * h).sqrt()))
    }

    /// `n` points evenly spaced in the parametric angle.
    pub fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        let (sin_t, cos_t) = self.angle.sin_cos();
        (0..n)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / n as f64;
                let (px, py) = (self.a * t.cos(), self.b * t.sin());
                [
                    self.cx + cos_t * px - sin_t * py,
                    self.cy + sin_t * px + cos_t * py,
                ]
            })
            .collect()
    }
}

pub(crate) const MIN_SEMI_AXIS: f64 = 0.001;

/// Circle by center and radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

impl Circle {
    /// Circumscribed circle of three points; `None` when they are collinear.
    pub fn from_three_points(p1: [f64; 2], p2: [f64; 2], p3: [f64; 2]) -> Option<Self> {
        // Work relative to p1 to keep the determinant well scaled.
        let (bx, by) = (p2[0] - p1[0], p2[1] - p1[1]);
        let (cx, cy) = (p3[0] - p1[0], p3[1] - p1[1]);
        let d = 2.0 * (bx * cy - by * cx);
        let scale = (bx * bx + by * by).max(cx * cx + cy * cy);
        if !d.is_finite() || d.abs() <= 1e-12 * scale.max(1.0) {
            return None;
        }
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        let circle = Self {
            cx: p1[0] + ux,
            cy: p1[1] + uy,
            r: ux.hypot(uy),
        };
        (circle.r.is_finite() && circle.r > 0.0).then_some(circle)
    }

    /// The circle as an axis-aligned ellipse with equal axes.
    pub fn to_ellipse(self) -> Ellipse {
        Ellipse {
            cx: self.cx,
            cy: self.cy,
            a: self.r,
            b: self.r,
            angle: 0.0,
        }
    }
}

/// Normalize angle to (−π/2, π/2].
pub(crate) fn normalize_angle(mut angle: f64) -> f64 {
    use std::f64::consts::{FRAC_PI_2, PI};
    while angle > FRAC_PI_2 {
        angle -= PI;
    }
    while angle <= -FRAC_PI_2 {
        angle += PI;
    }
    angle
}

/// General conic coefficients of a geometric ellipse.
#[cfg(test)]
fn ellipse_to_conic(e: &Ellipse) -> ConicCoeffs {
    let (sin_t, cos_t) = e.angle.sin_cos();
    let (ia2, ib2) = (1.0 / (e.a * e.a), 1.0 / (e.b * e.b));
    let a = cos_t * cos_t * ia2 + sin_t * sin_t * ib2;
    let b = 2.0 * cos_t * sin_t * (ia2 - ib2);
    let c = sin_t * sin_t * ia2 + cos_t * cos_t * ib2;
    let d = -2.0 * a * e.cx - b * e.cy;
    let ee = -b * e.cx - 2.0 * c * e.cy;
    let f = a * e.cx * e.cx + b * e.cx * e.cy + c * e.cy * e.cy - 1.0;
    ConicCoeffs([a, b, c, d, ee, f])
}
