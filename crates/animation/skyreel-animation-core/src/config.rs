//! Core configuration and the evaluation context threaded through every call.

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::interp::BezierSolver;
use crate::zoom::ZoomScaling;

/// Timeline sizing and feature toggles.
/// Every field has a default so partial documents deserialize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Length of a fresh timeline in frames.
    pub frame_count: i64,
    /// Whether elevation-like parameters are edited through the zoom transform.
    pub zoom_scaling_required: bool,
    /// Elevation (metres) at which the zoom curve bends from linear to logarithmic.
    pub zoom_reference_elevation: f64,
    /// Bisection steps allowed when solving a Bezier segment for a frame.
    pub bezier_max_iterations: u32,
    /// Frame tolerance at which the Bezier solve stops early.
    pub bezier_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_count: 100,
            zoom_scaling_required: true,
            zoom_reference_elevation: 1.0,
            bezier_max_iterations: 64,
            bezier_tolerance: 1e-9,
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON config document.
    pub fn from_json(s: &str) -> Result<Self, AnimationError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn context(&self) -> AnimationContext {
        AnimationContext {
            zoom: ZoomScaling::new(self.zoom_scaling_required, self.zoom_reference_elevation),
            solver: BezierSolver {
                max_iterations: self.bezier_max_iterations,
                tolerance: self.bezier_tolerance,
            },
        }
    }
}

/// Per-animation settings passed explicitly to evaluation and mutation calls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationContext {
    pub zoom: ZoomScaling,
    pub solver: BezierSolver,
}

impl Default for AnimationContext {
    fn default() -> Self {
        Config::default().context()
    }
}

impl AnimationContext {
    #[inline]
    pub fn with_zoom_scaling(mut self, enabled: bool) -> Self {
        self.zoom = ZoomScaling::new(enabled, self.zoom.reference());
        self
    }
}
