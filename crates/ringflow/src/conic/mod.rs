//! Ellipse and circle primitives.
//!
//! Implements:
//! - Direct least-squares ellipse fit (Fitzgibbon et al. 1999, Halíř–Flusser form).
//! - Algebraic circle fit and the circumscribed circle of three points.
//! - Conversion between general conic coefficients and geometric parameters.

mod fit;
mod types;

pub use fit::{
    fit_circle, fit_conic_direct, fit_ellipse_direct, MIN_CIRCLE_POINTS, MIN_ELLIPSE_POINTS,
};
pub use types::{Circle, ConicCoeffs, ConicError, Ellipse};
