//! Zoom scaling: an invertible nonlinear map between stored elevations and
//! a UI-friendly editing range.
//!
//! `scale(x) = sign(x) * ln(1 + |x| / r)` and `unscale(y) = sign(y) * r * (e^|y| - 1)`,
//! with `r` the reference elevation. Both are odd, strictly increasing and
//! defined on all reals; `ln_1p`/`exp_m1` keep the round trip tight near zero.

use crate::config::AnimationContext;
use crate::parameter::ParameterKind;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomScaling {
    enabled: bool,
    reference: f64,
}

impl ZoomScaling {
    /// Non-positive or non-finite references fall back to 1 metre.
    pub fn new(enabled: bool, reference: f64) -> Self {
        let reference = if reference.is_finite() && reference > 0.0 {
            reference
        } else {
            1.0
        };
        Self { enabled, reference }
    }

    pub fn disabled() -> Self {
        Self::new(false, 1.0)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn reference(&self) -> f64 {
        self.reference
    }

    /// Elevation to UI value. Identity when disabled.
    #[inline]
    pub fn scale(&self, elevation: f64) -> f64 {
        if !self.enabled {
            return elevation;
        }
        (elevation.abs() / self.reference).ln_1p().copysign(elevation)
    }

    /// UI value to elevation. Identity when disabled.
    #[inline]
    pub fn unscale(&self, ui_value: f64) -> f64 {
        if !self.enabled {
            return ui_value;
        }
        (self.reference * ui_value.abs().exp_m1()).copysign(ui_value)
    }
}

/// Convert a stored value to what an editing control shows.
/// Only elevation-like kinds go through the zoom transform.
pub fn to_ui_value(kind: ParameterKind, value: f64, ctx: &AnimationContext) -> f64 {
    if kind.descriptor().elevation_like {
        ctx.zoom.scale(value)
    } else {
        value
    }
}

/// Inverse of [`to_ui_value`].
pub fn from_ui_value(kind: ParameterKind, ui_value: f64, ctx: &AnimationContext) -> f64 {
    if kind.descriptor().elevation_like {
        ctx.zoom.unscale(ui_value)
    } else {
        ui_value
    }
}
