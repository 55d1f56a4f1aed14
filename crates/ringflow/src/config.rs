use std::path::Path;

use crate::conic::MIN_ELLIPSE_POINTS;

/// Controls for outer-boundary growth and the ellipse refinement loop.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GrowingConfig {
    /// Half-width (pixels) of the elliptic annulus used as the growth band.
    pub hull_width_px: f64,
    /// Initialization is good when some seed pair has a gradient cosine at
    /// or below this value.
    pub init_cos_threshold: f64,
    /// Minimum number of filtered seeds for a good initialization.
    pub min_good_init_points: usize,
    /// Cap on circle-based recovery rounds after a poor initialization.
    pub max_recovery_rounds: usize,
    /// Distance (pixels) below which the perimeter point counts as lying on
    /// the chord of the divergent pair.
    pub collinear_eps: f64,
    /// A collinear perimeter point is pushed along its gradient by
    /// `chord / perimeter_offset_divisor`.
    pub perimeter_offset_divisor: f64,
}

impl Default for GrowingConfig {
    fn default() -> Self {
        Self {
            hull_width_px: 2.3,
            init_cos_threshold: 0.25,
            min_good_init_points: 5,
            max_recovery_rounds: 6,
            collinear_eps: 1e-6,
            perimeter_offset_divisor: 50.0,
        }
    }
}

/// Outlier gates applied while assembling ring points.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// An inner-ring point is gradient-inconsistent when its signed radial
    /// alignment falls below this cosine.
    pub gradient_out_cos: f64,
    /// Reject when the inconsistent share of inner-ring points exceeds this.
    pub max_gradient_out_ratio: f64,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            gradient_out_cos: -0.5,
            max_gradient_out_ratio: 0.5,
        }
    }
}

/// Marker center estimate from the innermost ring.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MarkerCenterConfig {
    pub enable: bool,
    /// Only large markers are refined; smaller ones keep the outer center.
    pub min_perimeter_px: f64,
    /// The innermost ring needs strictly more points than this.
    pub min_inner_points: usize,
}

impl Default for MarkerCenterConfig {
    fn default() -> Self {
        Self {
            enable: true,
            min_perimeter_px: 200.0,
            min_inner_points: 20,
        }
    }
}

/// Top-level refinement configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Number of concentric rings sampled per field line (boundary included).
    pub n_circles: usize,
    pub growing: GrowingConfig,
    pub assembly: AssemblyConfig,
    pub marker_center: MarkerCenterConfig,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            n_circles: 3,
            growing: GrowingConfig::default(),
            assembly: AssemblyConfig::default(),
            marker_center: MarkerCenterConfig::default(),
        }
    }
}

impl RefineConfig {
    /// Load and validate a configuration from a JSON file. Missing fields
    /// take their default values.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.n_circles < 2 {
            return Err("n_circles must be >= 2".to_string());
        }

        let g = &self.growing;
        if !g.hull_width_px.is_finite() || g.hull_width_px <= 0.0 {
            return Err("growing.hull_width_px must be finite and > 0".to_string());
        }
        if !(-1.0..=1.0).contains(&g.init_cos_threshold) {
            return Err("growing.init_cos_threshold must be in [-1, 1]".to_string());
        }
        if g.min_good_init_points < MIN_ELLIPSE_POINTS {
            return Err(format!(
                "growing.min_good_init_points must be >= {}",
                MIN_ELLIPSE_POINTS
            ));
        }
        if g.max_recovery_rounds == 0 {
            return Err("growing.max_recovery_rounds must be >= 1".to_string());
        }
        if !g.collinear_eps.is_finite() || g.collinear_eps < 0.0 {
            return Err("growing.collinear_eps must be finite and >= 0".to_string());
        }
        if !g.perimeter_offset_divisor.is_finite() || g.perimeter_offset_divisor <= 0.0 {
            return Err("growing.perimeter_offset_divisor must be finite and > 0".to_string());
        }

        let a = &self.assembly;
        if !(-1.0..=1.0).contains(&a.gradient_out_cos) {
            return Err("assembly.gradient_out_cos must be in [-1, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&a.max_gradient_out_ratio) {
            return Err("assembly.max_gradient_out_ratio must be in [0, 1]".to_string());
        }

        let m = &self.marker_center;
        if !m.min_perimeter_px.is_finite() || m.min_perimeter_px < 0.0 {
            return Err("marker_center.min_perimeter_px must be finite and >= 0".to_string());
        }
        if m.min_inner_points + 1 < MIN_ELLIPSE_POINTS {
            return Err(format!(
                "marker_center.min_inner_points must be >= {}",
                MIN_ELLIPSE_POINTS - 1
            ));
        }

        Ok(())
    }
}
