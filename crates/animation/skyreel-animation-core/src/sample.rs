//! Samples ("parameter values"): a value pinned to a frame plus the curve
//! descriptor for the segment that leaves it.

use serde::{Deserialize, Serialize};

/// Bezier handle relative to its sample, in (frame, value) space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    pub frame_offset: f64,
    pub value_offset: f64,
}

impl Handle {
    #[inline]
    pub const fn new(frame_offset: f64, value_offset: f64) -> Self {
        Self {
            frame_offset,
            value_offset,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.frame_offset.is_finite() && self.value_offset.is_finite()
    }
}

/// Curve type of a sample. The outgoing segment `(self, next)` uses the
/// left sample's interpolation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Linear,
    Bezier {
        #[serde(default)]
        in_handle: Option<Handle>,
        #[serde(default)]
        out_handle: Option<Handle>,
    },
}

impl Interpolation {
    #[inline]
    pub fn in_handle(&self) -> Option<Handle> {
        match self {
            Self::Linear => None,
            Self::Bezier { in_handle, .. } => *in_handle,
        }
    }

    #[inline]
    pub fn out_handle(&self) -> Option<Handle> {
        match self {
            Self::Linear => None,
            Self::Bezier { out_handle, .. } => *out_handle,
        }
    }

    #[inline]
    pub fn is_bezier(&self) -> bool {
        matches!(self, Self::Bezier { .. })
    }

    /// Stable tag used by the persisted schema.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Bezier { .. } => "bezier",
        }
    }
}

/// A single sample of one parameter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub frame: i64,
    pub value: f64,
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl ParameterValue {
    #[inline]
    pub fn new(frame: i64, value: f64, interpolation: Interpolation) -> Self {
        Self {
            frame,
            value,
            interpolation,
        }
    }

    #[inline]
    pub fn linear(frame: i64, value: f64) -> Self {
        Self::new(frame, value, Interpolation::Linear)
    }

    #[inline]
    pub fn bezier(
        frame: i64,
        value: f64,
        in_handle: Option<Handle>,
        out_handle: Option<Handle>,
    ) -> Self {
        Self::new(
            frame,
            value,
            Interpolation::Bezier {
                in_handle,
                out_handle,
            },
        )
    }

    /// Same value and curve at another frame.
    #[inline]
    pub fn at_frame(mut self, frame: i64) -> Self {
        self.frame = frame;
        self
    }

    /// Stretch handle frame offsets, used when the timeline is rescaled.
    pub fn with_scaled_handles(mut self, factor: f64) -> Self {
        if let Interpolation::Bezier {
            in_handle,
            out_handle,
        } = &mut self.interpolation
        {
            for h in [in_handle, out_handle].into_iter().flatten() {
                h.frame_offset *= factor;
            }
        }
        self
    }

    #[inline]
    pub(crate) fn map_handles<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Option<Handle>, Option<Handle>) -> (Option<Handle>, Option<Handle>),
    {
        if let Interpolation::Bezier {
            in_handle,
            out_handle,
        } = self.interpolation
        {
            let (i, o) = f(in_handle, out_handle);
            self.interpolation = Interpolation::Bezier {
                in_handle: i,
                out_handle: o,
            };
        }
        self
    }
}
