//! Synthetic edge scenes shared by unit tests.
//!
//! A scene is a rasterized ellipse whose pixels carry outward gradients, plus
//! optional field lines running from boundary seeds toward the center.

use std::collections::HashSet;

use crate::conic::Ellipse;
use crate::edges::{EdgeIndexError, EdgePoint, EdgePointCollection, EdgePointId};
use crate::field_line::Hop;

/// Gradient magnitude used for synthetic points.
const GRADIENT_NORM: f64 = 10.0;

pub(crate) struct SceneBuilder {
    edges: EdgePointCollection,
}

impl SceneBuilder {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            edges: EdgePointCollection::new(width, height),
        }
    }

    /// Insert `p`, or return the point already occupying its pixel.
    pub(crate) fn add_point(&mut self, p: EdgePoint) -> EdgePointId {
        match self.edges.insert(p) {
            Ok(id) => id,
            Err(EdgeIndexError::Occupied { existing }) => existing,
            Err(e) => panic!("synthetic point rejected: {}", e),
        }
    }

    pub(crate) fn point(&self, id: EdgePointId) -> &EdgePoint {
        self.edges.point(id)
    }

    pub(crate) fn set_gradient(&mut self, id: EdgePointId, dx: f32, dy: f32) {
        self.edges.set_gradient(id, dx, dy);
    }

    pub(crate) fn flip_gradient(&mut self, id: EdgePointId) {
        let p = *self.edges.point(id);
        self.edges.set_gradient(id, -p.dx, -p.dy);
    }

    pub(crate) fn set_before(&mut self, id: EdgePointId, target: EdgePointId) {
        self.edges.set_before(id, Some(target));
    }

    pub(crate) fn set_after(&mut self, id: EdgePointId, target: EdgePointId) {
        self.edges.set_after(id, Some(target));
    }

    /// 8-connected closed pixel loop along `e`, in parametric order, with
    /// outward unit normals scaled to [`GRADIENT_NORM`].
    pub(crate) fn rasterize_ellipse(&mut self, e: &Ellipse) -> Vec<EdgePointId> {
        let (sin_t, cos_t) = e.angle.sin_cos();
        let n = (std::f64::consts::TAU * e.a.max(e.b) / 0.4).ceil() as usize;
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for i in 0..n {
            let t = std::f64::consts::TAU * i as f64 / n as f64;
            let (u, v) = (e.a * t.cos(), e.b * t.sin());
            let x = e.cx + cos_t * u - sin_t * v;
            let y = e.cy + sin_t * u + cos_t * v;
            let (nu, nv) = (t.cos() / e.a, t.sin() / e.b);
            let (gx, gy) = (cos_t * nu - sin_t * nv, sin_t * nu + cos_t * nv);
            let norm = gx.hypot(gy);
            let id = self.add_point(EdgePoint::new(
                x.round() as i32,
                y.round() as i32,
                (GRADIENT_NORM * gx / norm) as f32,
                (GRADIENT_NORM * gy / norm) as f32,
            ));
            if seen.insert(id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Field line from `seed` toward `center`: hop `j` sits at `1 − 0.2 j` of
    /// the seed radius. `before` hops carry inward gradients and `after` hops
    /// outward ones, which is the radially consistent layout.
    pub(crate) fn add_field_line(
        &mut self,
        seed: EdgePointId,
        center: [f64; 2],
        n_circles: usize,
    ) -> Vec<EdgePointId> {
        assert!(n_circles <= 5, "hops would cross the center");
        let s = *self.point(seed);
        let (vx, vy) = (s.x as f64 - center[0], s.y as f64 - center[1]);
        let r = vx.hypot(vy);
        let mut line = vec![seed];
        let mut prev = seed;
        for step in 1..n_circles {
            let f = 1.0 - 0.2 * step as f64;
            let hop = Hop::for_step(step);
            let g = hop.sign() * GRADIENT_NORM / r;
            let id = self.add_point(EdgePoint::new(
                (center[0] + f * vx).round() as i32,
                (center[1] + f * vy).round() as i32,
                (g * vx) as f32,
                (g * vy) as f32,
            ));
            match hop {
                Hop::Before => self.set_before(prev, id),
                Hop::After => self.set_after(prev, id),
            }
            line.push(id);
            prev = id;
        }
        line
    }

    pub(crate) fn finish(self) -> EdgePointCollection {
        self.edges
    }
}

/// Rasterized boundary with evenly spaced seeds and their field lines.
pub(crate) struct MarkerScene {
    pub(crate) edges: EdgePointCollection,
    pub(crate) boundary: Vec<EdgePointId>,
    pub(crate) seeds: Vec<EdgePointId>,
    /// Per seed: the seed followed by its hops.
    pub(crate) lines: Vec<Vec<EdgePointId>>,
}

pub(crate) fn marker_scene(
    ellipse: &Ellipse,
    n_seeds: usize,
    n_circles: usize,
    size: u32,
) -> MarkerScene {
    let mut scene = SceneBuilder::new(size, size);
    let boundary = scene.rasterize_ellipse(ellipse);
    let seeds: Vec<EdgePointId> = (0..n_seeds)
        .map(|k| boundary[k * boundary.len() / n_seeds])
        .collect();
    let lines = seeds
        .iter()
        .map(|&s| scene.add_field_line(s, ellipse.center(), n_circles))
        .collect();
    MarkerScene {
        edges: scene.finish(),
        boundary,
        seeds,
        lines,
    }
}
