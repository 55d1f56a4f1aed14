//! Outer-boundary growth and ellipse refinement.
//!
//! A candidate starts from a handful of filtered field-line seeds on its
//! outer boundary. [`init::init_ellipse`] turns them into a starting ellipse
//! (or a circle when the seeds cover only a short arc), and
//! [`refiner::grow_ellipse`] alternates flood fills inside an elliptic
//! annulus with refits until the boundary stops growing.

pub(crate) mod history;
pub(crate) mod init;
pub(crate) mod refiner;
pub(crate) mod region;

use crate::conic::ConicError;

/// Why a candidate's outer ellipse could not be grown.
#[derive(Debug, Clone, PartialEq)]
pub enum GrowError {
    /// Not enough filtered seeds for any starting shape.
    TooFewSeeds { needed: usize, got: usize },
    /// The fallback circle through the divergent pair is undefined.
    DegenerateCircle,
    /// Circle refit failed during recovery.
    CircleFit(ConicError),
    /// Ellipse fit failed.
    EllipseFit(ConicError),
}

impl GrowError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TooFewSeeds { .. } => "too_few_seeds",
            Self::DegenerateCircle => "degenerate_circle",
            Self::CircleFit(_) => "circle_fit_failed",
            Self::EllipseFit(_) => "ellipse_fit_failed",
        }
    }
}

impl std::fmt::Display for GrowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewSeeds { needed, got } => {
                write!(f, "too few seeds: need {}, got {}", needed, got)
            }
            Self::DegenerateCircle => f.write_str("fallback circle is degenerate"),
            Self::CircleFit(e) => write!(f, "circle fit failed: {}", e),
            Self::EllipseFit(e) => write!(f, "ellipse fit failed: {}", e),
        }
    }
}

impl std::error::Error for GrowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CircleFit(e) | Self::EllipseFit(e) => Some(e),
            _ => None,
        }
    }
}

pub use history::{GrowthSnapshot, RecoveryHistory};
pub use init::{
    classify_init, init_ellipse, most_divergent_pair, perimeter_point, DivergentPair, InitQuality,
    InitialFit,
};
pub use refiner::{grow_ellipse, refine_outer_ellipse, GrownEllipse};
pub use region::{count_hull_inliers, grow_within_hull};
