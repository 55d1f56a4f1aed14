//! Per-candidate refinement and the parallel batch runner.
//!
//! A candidate is refined in four stages: outer ellipse growth, ring
//! assembly, flow-component archiving and the optional marker center
//! estimate. Only growth writes to the shared processed masks, and only under
//! the candidate's own run bit.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assembly::{assemble_rings, estimate_marker_center, AssemblyReject, RingPoints};
use crate::config::RefineConfig;
use crate::edges::{EdgePointCollection, EdgePointId, RunId};
use crate::field_line::FieldLineError;
use crate::flow_component::FlowComponent;
use crate::growing::{refine_outer_ellipse, GrowError, GrownEllipse};

/// Seeds handed over by the field-line voting stage for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSeeds {
    /// Boundary point that collected the votes.
    pub seed: EdgePointId,
    /// Every field-line seed that voted for the candidate.
    pub children: Vec<EdgePointId>,
    /// Children surviving the vote filter; these drive growth and assembly.
    pub filtered_children: Vec<EdgePointId>,
    pub convex_edge_segment: Vec<EdgePointId>,
}

/// Accepted candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedCandidate {
    pub outer: GrownEllipse,
    pub rings: RingPoints,
    pub flow: FlowComponent,
    pub marker_center: Option<[f64; 2]>,
}

/// Stage at which a candidate was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateReject {
    Grow(GrowError),
    Assembly(AssemblyReject),
    FieldLine(FieldLineError),
}

impl CandidateReject {
    /// Stable snake_case reject code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Grow(e) => e.code(),
            Self::Assembly(r) => r.code(),
            Self::FieldLine(_) => "field_line_exhausted",
        }
    }

    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Grow(_) => "growing",
            Self::Assembly(_) => "assembly",
            Self::FieldLine(_) => "flow_component",
        }
    }
}

impl std::fmt::Display for CandidateReject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grow(e) => write!(f, "growing: {}", e),
            Self::Assembly(r) => write!(f, "assembly: {}", r),
            Self::FieldLine(e) => write!(f, "flow component: {}", e),
        }
    }
}

impl std::error::Error for CandidateReject {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Grow(e) => Some(e),
            Self::Assembly(r) => Some(r),
            Self::FieldLine(e) => Some(e),
        }
    }
}

impl From<GrowError> for CandidateReject {
    fn from(e: GrowError) -> Self {
        Self::Grow(e)
    }
}

impl From<AssemblyReject> for CandidateReject {
    fn from(r: AssemblyReject) -> Self {
        Self::Assembly(r)
    }
}

impl From<FieldLineError> for CandidateReject {
    fn from(e: FieldLineError) -> Self {
        Self::FieldLine(e)
    }
}

fn release(edges: &EdgePointCollection, points: &[EdgePointId], run: RunId) {
    for &id in points {
        edges.set_processed(id, run, false);
    }
}

/// Refine one candidate under `run`.
///
/// The run bit must be clear on entry. On success exactly the outer boundary
/// points carry it; on rejection no point does.
pub fn refine_candidate(
    edges: &EdgePointCollection,
    candidate: &CandidateSeeds,
    config: &RefineConfig,
    run: RunId,
) -> Result<RefinedCandidate, CandidateReject> {
    let outer = refine_outer_ellipse(edges, &candidate.filtered_children, &config.growing, run)?;

    let finish = || -> Result<(RingPoints, FlowComponent), CandidateReject> {
        let rings = assemble_rings(
            edges,
            &outer.ellipse,
            &outer.points,
            &candidate.filtered_children,
            config.n_circles,
            &config.assembly,
        )?;
        let flow = FlowComponent::new(
            edges,
            &outer.points,
            &candidate.children,
            &candidate.filtered_children,
            outer.ellipse,
            &candidate.convex_edge_segment,
            candidate.seed,
            config.n_circles,
        )?;
        Ok((rings, flow))
    };

    match finish() {
        Ok((rings, flow)) => {
            let marker_center =
                estimate_marker_center(&outer.ellipse, &rings, &config.marker_center);
            Ok(RefinedCandidate {
                outer,
                rings,
                flow,
                marker_center,
            })
        }
        Err(reject) => {
            release(edges, &outer.points, run);
            tracing::debug!(
                run = run.get(),
                stage = reject.stage(),
                reason = reject.code(),
                "candidate rejected after growth"
            );
            Err(reject)
        }
    }
}

/// Refine every candidate, in order.
///
/// Candidates run in parallel waves of at most [`RunId::MAX_RUNS`], each
/// taking the run id of its slot in the wave. Marks are released after every
/// wave, so the collection carries no run bits when this returns.
pub fn refine_candidates(
    edges: &EdgePointCollection,
    candidates: &[CandidateSeeds],
    config: &RefineConfig,
) -> Vec<Result<RefinedCandidate, CandidateReject>> {
    tracing::info!("{} candidates to refine", candidates.len());

    let runs: Vec<RunId> = RunId::all().collect();
    let mut results = Vec::with_capacity(candidates.len());
    for wave in candidates.chunks(RunId::MAX_RUNS) {
        let outcome: Vec<_> = wave
            .par_iter()
            .zip(&runs[..wave.len()])
            .map(|(candidate, &run)| refine_candidate(edges, candidate, config, run))
            .collect();
        for (result, &run) in outcome.iter().zip(&runs) {
            if let Ok(refined) = result {
                release(edges, &refined.outer.points, run);
            }
        }
        results.extend(outcome);
    }

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    tracing::info!("{} of {} candidates accepted", accepted, candidates.len());
    results
}
