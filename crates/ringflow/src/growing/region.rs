use crate::conic::Ellipse;
use crate::edges::{EdgePointCollection, EdgePointId, RunId};
use crate::geometry::Hull;

/// Extend `points` with every 8-connected edge point reachable from its
/// current members that lies in the hull around `ellipse`, has its gradient
/// pointing away from the center and is not yet marked for `run`.
///
/// Members present at call time are marked and used as flood seeds; accepted
/// points are marked the moment they are appended. Returns the number of
/// appended points.
pub fn grow_within_hull(
    edges: &EdgePointCollection,
    points: &mut Vec<EdgePointId>,
    ellipse: &Ellipse,
    hull_width: f64,
    run: RunId,
) -> usize {
    let hull = Hull::around(ellipse, hull_width);
    let center = ellipse.center();
    let initial = points.len();

    let mut stack: Vec<EdgePointId> = Vec::with_capacity(initial * 2);
    for &id in points.iter() {
        edges.set_processed(id, run, true);
        stack.push(id);
    }

    while let Some(id) = stack.pop() {
        let p = edges.point(id);
        for nb in edges.neighbors8(p.x, p.y) {
            if edges.is_processed(nb, run) {
                continue;
            }
            let q = edges.point(nb);
            if !hull.contains(q.x as f64, q.y as f64) || !q.gradient_points_away_from(center) {
                continue;
            }
            if edges.mark_if_unprocessed(nb, run) {
                points.push(nb);
                stack.push(nb);
            }
        }
    }

    points.len() - initial
}

/// Number of `points` inside the hull around `ellipse`.
pub fn count_hull_inliers(
    edges: &EdgePointCollection,
    points: &[EdgePointId],
    ellipse: &Ellipse,
    hull_width: f64,
) -> usize {
    let hull = Hull::around(ellipse, hull_width);
    points
        .iter()
        .filter(|&&id| {
            let p = edges.point(id);
            hull.contains(p.x as f64, p.y as f64)
        })
        .count()
}
