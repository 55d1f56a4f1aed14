use crate::config::GrowingConfig;
use crate::conic::{fit_circle, fit_ellipse_direct, Ellipse};
use crate::edges::{EdgePointCollection, EdgePointId, RunId};

use super::history::{GrowthSnapshot, RecoveryHistory};
use super::init::{init_ellipse, InitQuality, InitialFit};
use super::region::{count_hull_inliers, grow_within_hull};
use super::GrowError;

/// Converged outer ellipse and the boundary points supporting it.
#[derive(Debug, Clone, PartialEq)]
pub struct GrownEllipse {
    pub ellipse: Ellipse,
    /// Committed boundary points; exactly these carry the run bit.
    pub points: Vec<EdgePointId>,
    pub init_quality: InitQuality,
    /// Circle recovery rounds run (0 after a good initialization).
    pub recovery_rounds: usize,
    /// Recovery round whose point set was kept; 0 is the initialization.
    pub committed_round: usize,
    /// Grow-and-refit rounds until the boundary stopped growing.
    pub convergence_rounds: usize,
}

/// Initialize from the filtered seeds, then grow.
pub fn refine_outer_ellipse(
    edges: &EdgePointCollection,
    filtered_seeds: &[EdgePointId],
    cfg: &GrowingConfig,
    run: RunId,
) -> Result<GrownEllipse, GrowError> {
    let initial = init_ellipse(edges, filtered_seeds, cfg)?;
    tracing::debug!(
        run = run.get(),
        seeds = filtered_seeds.len(),
        quality = ?initial.quality,
        "outer ellipse initialized"
    );
    grow_ellipse(edges, filtered_seeds, initial, cfg, run)
}

/// Grow the boundary from `filtered_seeds` starting at `initial`.
///
/// After a poor initialization the point set is first grown against refit
/// circles while the hull inlier count keeps rising, and the best round is
/// committed. The set is then grown against refit ellipses until a round adds
/// nothing.
///
/// The run bit must be clear on entry. On success exactly the returned points
/// carry it; on failure no point does.
pub fn grow_ellipse(
    edges: &EdgePointCollection,
    filtered_seeds: &[EdgePointId],
    initial: InitialFit,
    cfg: &GrowingConfig,
    run: RunId,
) -> Result<GrownEllipse, GrowError> {
    let mut points = Vec::with_capacity(filtered_seeds.len() * 3);
    for &id in filtered_seeds {
        if edges.mark_if_unprocessed(id, run) {
            points.push(id);
        }
    }

    let result = grow_marked(edges, &mut points, initial, cfg, run);
    if let Err(e) = &result {
        for &id in &points {
            edges.set_processed(id, run, false);
        }
        tracing::debug!(
            run = run.get(),
            reason = e.code(),
            "outer ellipse growth failed"
        );
    }
    result
}

/// Growth body. Every point this run marks is in `points` when it returns,
/// so the caller can release them on error.
fn grow_marked(
    edges: &EdgePointCollection,
    points: &mut Vec<EdgePointId>,
    initial: InitialFit,
    cfg: &GrowingConfig,
    run: RunId,
) -> Result<GrownEllipse, GrowError> {
    let width = cfg.hull_width_px;
    let (mut recovery_rounds, mut committed_round) = (0, 0);
    if initial.quality == InitQuality::Poor {
        let recovery = recover_circle(edges, points, initial.ellipse, cfg, run)?;
        recovery_rounds = recovery.rounds;
        committed_round = recovery.committed_round;
    }

    let mut ellipse = fit_ellipse_direct(&edges.positions(points)).map_err(GrowError::EllipseFit)?;
    let mut convergence_rounds = 0;
    loop {
        convergence_rounds += 1;
        let added = grow_within_hull(edges, points, &ellipse, width, run);
        tracing::trace!(
            run = run.get(),
            round = convergence_rounds,
            added,
            total = points.len(),
            "ellipse growth round"
        );
        if added == 0 {
            break;
        }
        ellipse = fit_ellipse_direct(&edges.positions(points)).map_err(GrowError::EllipseFit)?;
    }

    Ok(GrownEllipse {
        ellipse,
        points: points.clone(),
        init_quality: initial.quality,
        recovery_rounds,
        committed_round,
        convergence_rounds,
    })
}

/// Outcome of circle recovery.
#[derive(Debug, Clone, Copy)]
struct Recovery {
    rounds: usize,
    committed_round: usize,
}

/// Grow `points` against refit circles while the hull inlier count keeps
/// rising, then roll back to the round with the most inliers. On return
/// `points` holds that round's set and only those points carry the run bit.
fn recover_circle(
    edges: &EdgePointCollection,
    points: &mut Vec<EdgePointId>,
    initial: Ellipse,
    cfg: &GrowingConfig,
    run: RunId,
) -> Result<Recovery, GrowError> {
    let width = cfg.hull_width_px;
    let mut ellipse = initial;
    let mut rounds = 0;
    let mut history = RecoveryHistory::new(GrowthSnapshot {
        points: points.clone(),
        ellipse,
        inliers: points.len(),
    });
    loop {
        if rounds == cfg.max_recovery_rounds {
            tracing::warn!(
                run = run.get(),
                cap = cfg.max_recovery_rounds,
                "circle recovery hit the round cap"
            );
            break;
        }
        rounds += 1;

        let before = count_hull_inliers(edges, points, &ellipse, width);
        let added = grow_within_hull(edges, points, &ellipse, width, run);
        ellipse = fit_circle(&edges.positions(points))
            .map_err(GrowError::CircleFit)?
            .to_ellipse();
        let after = count_hull_inliers(edges, points, &ellipse, width);
        tracing::trace!(
            run = run.get(),
            round = rounds,
            added,
            before,
            after,
            "circle recovery round"
        );
        history.push(GrowthSnapshot {
            points: points.clone(),
            ellipse,
            inliers: after,
        });
        if after <= before {
            break;
        }
    }

    let committed_round = history.best_index();
    let committed = history.commit();
    // Later rounds only ever appended, so `points` covers every mark.
    for &id in points.iter() {
        edges.set_processed(id, run, false);
    }
    for &id in &committed.points {
        edges.set_processed(id, run, true);
    }
    tracing::debug!(
        run = run.get(),
        committed_round,
        rounds,
        kept = committed.points.len(),
        dropped = points.len() - committed.points.len(),
        "circle recovery committed"
    );
    *points = committed.points;
    Ok(Recovery {
        rounds,
        committed_round,
    })
}
