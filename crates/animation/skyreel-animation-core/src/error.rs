//! Error types for the keyframe engine

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, AnimationError>;

/// Failures raised synchronously by engine operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimationError {
    /// Range query with `start > end`
    #[error("Invalid frame range: start {start} is after end {end}")]
    InvalidRange { start: i64, end: i64 },

    /// First/last keyframe requested on an object (or timeline) without keyframes
    #[error("No keyframes in {object}")]
    NoKeyframes { object: String },

    /// Retiming moved the first frame. Indicates a defect in the algorithm, never bad input.
    #[error("Retiming invariant violated: first frame {expected_first} became {actual_first}")]
    RetimingInvariantViolation {
        expected_first: i64,
        actual_first: i64,
    },

    /// Attempt to edit a single member of a codependency group
    #[error("Codependency mismatch: '{parameter}' at frame {frame} belongs to a codependency group")]
    CodependencyMismatch { parameter: String, frame: i64 },

    /// Bezier handle would make the frame coordinate non-monotonic
    #[error("Invalid bezier handle at frame {frame}: {reason}")]
    InvalidBezierHandle { frame: i64, reason: String },

    /// Rescale factor is not a finite positive number
    #[error("Invalid scale factor: {factor}")]
    InvalidScaleFactor { factor: f64 },

    /// Parameter kind not present on the object
    #[error("Parameter '{kind}' not found on {object}")]
    UnknownParameter { object: String, kind: String },

    /// Animatable object not present in the timeline
    #[error("Animatable object not found: {id}")]
    UnknownObject { id: String },

    /// Registry or schema tag that nothing is registered for
    #[error("Unknown tag: {tag}")]
    UnknownTag { tag: String },

    /// Malformed persisted data
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl AnimationError {
    /// Only a retiming invariant violation signals a defect in the engine itself.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RetimingInvariantViolation { .. })
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRange { .. } | Self::NoKeyframes { .. } => "query",
            Self::RetimingInvariantViolation { .. } => "retiming",
            Self::CodependencyMismatch { .. } => "codependency",
            Self::InvalidBezierHandle { .. } | Self::InvalidScaleFactor { .. } => "curve",
            Self::UnknownParameter { .. } | Self::UnknownObject { .. } | Self::UnknownTag { .. } => {
                "lookup"
            }
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for AnimationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
