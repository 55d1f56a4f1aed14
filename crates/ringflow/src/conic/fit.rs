//! Least-squares ellipse and circle fits.
//!
//! The ellipse fit is the direct constrained fit of Fitzgibbon et al. (1999)
//! in the numerically stable reduced form of Halíř & Flusser (1998). The
//! circle fit is the algebraic (Kåsa) fit. Both run on centroid-shifted,
//! scale-normalized coordinates.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use super::types::{Circle, ConicCoeffs, ConicError, Ellipse};

/// Minimum point count accepted by [`fit_ellipse_direct`].
pub const MIN_ELLIPSE_POINTS: usize = 5;
/// Minimum point count accepted by [`fit_circle`].
pub const MIN_CIRCLE_POINTS: usize = 3;

/// Centroid and isotropic scale mapping the mean distance to √2.
fn normalization(points: &[[f64; 2]]) -> ([f64; 2], f64) {
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let my = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| (p[0] - mx).hypot(p[1] - my))
        .sum::<f64>()
        / n;
    let scale = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    ([mx, my], scale)
}

/// Fit general conic coefficients under the ellipse constraint 4AC − B² = 1.
pub fn fit_conic_direct(points: &[[f64; 2]]) -> Result<ConicCoeffs, ConicError> {
    if points.len() < MIN_ELLIPSE_POINTS {
        return Err(ConicError::TooFewPoints {
            needed: MIN_ELLIPSE_POINTS,
            got: points.len(),
        });
    }
    let (mean, scale) = normalization(points);

    // Scatter blocks of the quadratic [x², xy, y²] and linear [x, y, 1] parts.
    let mut s1 = Matrix3::<f64>::zeros();
    let mut s2 = Matrix3::<f64>::zeros();
    let mut s3 = Matrix3::<f64>::zeros();
    for p in points {
        let x = (p[0] - mean[0]) * scale;
        let y = (p[1] - mean[1]) * scale;
        let quad = Vector3::new(x * x, x * y, y * y);
        let lin = Vector3::new(x, y, 1.0);
        s1 += quad * quad.transpose();
        s2 += quad * lin.transpose();
        s3 += lin * lin.transpose();
    }

    let s3_inv = s3.try_inverse().ok_or(ConicError::Degenerate)?;
    let t = -s3_inv * s2.transpose();
    let m = s1 + s2 * t;
    // Premultiply by the inverse constraint matrix.
    let reduced = Matrix3::new(
        0.5 * m[(2, 0)],
        0.5 * m[(2, 1)],
        0.5 * m[(2, 2)],
        -m[(1, 0)],
        -m[(1, 1)],
        -m[(1, 2)],
        0.5 * m[(0, 0)],
        0.5 * m[(0, 1)],
        0.5 * m[(0, 2)],
    );

    let quad = constrained_eigenvector(&reduced).ok_or(ConicError::Degenerate)?;
    let lin = t * quad;

    let normalized = Matrix3::new(
        quad[0],
        0.5 * quad[1],
        0.5 * lin[0],
        0.5 * quad[1],
        quad[2],
        0.5 * lin[1],
        0.5 * lin[0],
        0.5 * lin[1],
        lin[2],
    );
    let h = Matrix3::new(
        scale,
        0.0,
        -scale * mean[0],
        0.0,
        scale,
        -scale * mean[1],
        0.0,
        0.0,
        1.0,
    );
    let q = h.transpose() * normalized * h;
    let conic = ConicCoeffs([
        q[(0, 0)],
        2.0 * q[(0, 1)],
        q[(1, 1)],
        2.0 * q[(0, 2)],
        2.0 * q[(1, 2)],
        q[(2, 2)],
    ]);
    if conic.0.iter().any(|c| !c.is_finite()) || !conic.is_ellipse() {
        return Err(ConicError::Degenerate);
    }
    Ok(conic)
}

/// Eigenvector of the reduced system whose conic satisfies 4AC − B² > 0.
fn constrained_eigenvector(reduced: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let scale = reduced.norm().max(1e-300);
    let mut best: Option<(f64, Vector3<f64>)> = None;
    for lambda in reduced.complex_eigenvalues().iter() {
        if lambda.im.abs() > 1e-9 * scale {
            continue;
        }
        let shifted = reduced - Matrix3::identity() * lambda.re;
        let svd = shifted.svd(false, true);
        let v_t = svd.v_t?;
        let (i_min, _) = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;
        let v: Vector3<f64> = v_t.row(i_min).transpose();
        let constraint = 4.0 * v[0] * v[2] - v[1] * v[1];
        if constraint > 0.0 && best.map_or(true, |(c, _)| constraint > c) {
            best = Some((constraint, v));
        }
    }
    best.map(|(_, v)| v)
}

/// Fit an ellipse and return its geometric parameters.
pub fn fit_ellipse_direct(points: &[[f64; 2]]) -> Result<Ellipse, ConicError> {
    fit_conic_direct(points)?
        .to_ellipse()
        .ok_or(ConicError::Degenerate)
}

/// Algebraic least-squares circle fit.
pub fn fit_circle(points: &[[f64; 2]]) -> Result<Circle, ConicError> {
    let n = points.len();
    if n < MIN_CIRCLE_POINTS {
        return Err(ConicError::TooFewPoints {
            needed: MIN_CIRCLE_POINTS,
            got: n,
        });
    }
    let (mean, scale) = normalization(points);

    // u² + v² + D u + E v + F = 0
    let mut a = DMatrix::<f64>::zeros(n, 3);
    let mut rhs = DVector::<f64>::zeros(n);
    for (i, p) in points.iter().enumerate() {
        let u = (p[0] - mean[0]) * scale;
        let v = (p[1] - mean[1]) * scale;
        a[(i, 0)] = u;
        a[(i, 1)] = v;
        a[(i, 2)] = 1.0;
        rhs[i] = -(u * u + v * v);
    }

    let svd = a.svd(true, true);
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    if !(s_max > 0.0) || s_min <= 1e-10 * s_max {
        return Err(ConicError::Degenerate);
    }
    let sol = svd.solve(&rhs, 1e-14).map_err(|_| ConicError::Degenerate)?;
    let (d, e, f) = (sol[0], sol[1], sol[2]);
    let r_sq = 0.25 * (d * d + e * e) - f;
    if !(r_sq > 0.0) || !r_sq.is_finite() {
        return Err(ConicError::Degenerate);
    }
    Ok(Circle {
        cx: mean[0] - 0.5 * d / scale,
        cy: mean[1] - 0.5 * e / scale,
        r: r_sq.sqrt() / scale,
    })
}
