use crate::conic::Ellipse;
use crate::edges::EdgePointId;

/// One recovery round: the grown point set, the circle refit to it and the
/// number of points inside that circle's hull.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthSnapshot {
    pub points: Vec<EdgePointId>,
    pub ellipse: Ellipse,
    pub inliers: usize,
}

/// Ordered recovery snapshots. Never empty.
#[derive(Debug, Clone)]
pub struct RecoveryHistory {
    snapshots: Vec<GrowthSnapshot>,
}

impl RecoveryHistory {
    pub fn new(initial: GrowthSnapshot) -> Self {
        Self {
            snapshots: vec![initial],
        }
    }

    pub fn push(&mut self, snapshot: GrowthSnapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn snapshots(&self) -> &[GrowthSnapshot] {
        &self.snapshots
    }

    /// Index of the first snapshot with the most inliers.
    pub fn best_index(&self) -> usize {
        let mut best = 0;
        for (i, s) in self.snapshots.iter().enumerate().skip(1) {
            if s.inliers > self.snapshots[best].inliers {
                best = i;
            }
        }
        best
    }

    /// Consume the history and keep the best snapshot.
    pub fn commit(mut self) -> GrowthSnapshot {
        let best = self.best_index();
        self.snapshots.swap_remove(best)
    }
}
