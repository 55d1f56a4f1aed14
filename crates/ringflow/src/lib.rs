//! ringflow: outer-ellipse growing and ring assembly for concentric ring
//! markers detected through gradient field lines.
//!
//! A candidate arrives as a set of field-line seeds on its outer boundary.
//! The stages are:
//!
//! 1. **Growing** – initialize an ellipse (or a fallback circle when the seeds
//!    span only a short arc) and grow the boundary inside an elliptic annulus,
//!    refitting until it stops growing.
//! 2. **Assembly** – walk every seed's field line inward and collect one point
//!    per ring, rejecting geometrically or photometrically inconsistent lines.
//! 3. **Flow component** – archive the candidate's geometry by value.
//!
//! [`refine_candidate`] runs all stages for one candidate and
//! [`refine_candidates`] runs a batch in parallel, one processed-mask bit per
//! concurrent candidate.

mod assembly;
mod config;
mod conic;
mod edges;
mod field_line;
mod flow_component;
mod geometry;
mod growing;
mod pipeline;

#[cfg(test)]
pub(crate) mod test_utils;

pub use assembly::{assemble_rings, estimate_marker_center, AssemblyReject, RingPoints};
pub use config::{AssemblyConfig, GrowingConfig, MarkerCenterConfig, RefineConfig};
pub use conic::{
    fit_circle, fit_conic_direct, fit_ellipse_direct, Circle, ConicCoeffs, ConicError, Ellipse,
    MIN_CIRCLE_POINTS, MIN_ELLIPSE_POINTS,
};
pub use edges::{EdgeIndexError, EdgePoint, EdgePointCollection, EdgePointId, RunId};
pub use field_line::{sample_field_line, walk_field_line, FieldLineError, Hop};
pub use flow_component::FlowComponent;
pub use geometry::{is_in_ellipse, is_on_same_side, line_through_center, DirectedPoint, Hull};
pub use growing::{
    classify_init, count_hull_inliers, grow_ellipse, grow_within_hull, init_ellipse,
    most_divergent_pair, perimeter_point, refine_outer_ellipse, DivergentPair, GrowError,
    GrownEllipse, GrowthSnapshot, InitQuality, InitialFit, RecoveryHistory,
};
pub use pipeline::{
    refine_candidate, refine_candidates, CandidateReject, CandidateSeeds, RefinedCandidate,
};
