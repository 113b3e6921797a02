//! Curve evaluator over a sorted sample list.
//!
//! Model:
//! - Outside the sampled range the nearest boundary value is returned (clamped extrapolation).
//! - Inside, the bracketing pair `(a, b)` is located by binary search and the
//!   segment is evaluated with `a`'s interpolation: linear, or a cubic Bezier
//!   in the (frame, value) plane solved for the query frame.
//! - Handle validation keeps every Bezier segment monotonic in frame.

pub mod functions;

use crate::error::AnimationError;
use crate::sample::{Handle, Interpolation, ParameterValue};
use functions::{bezier_segment, linear_segment};

/// Root-finding settings for Bezier segments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BezierSolver {
    pub max_iterations: u32,
    pub tolerance: f64,
}

impl Default for BezierSolver {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            tolerance: 1e-9,
        }
    }
}

/// Where a query frame falls relative to a sample list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Empty,
    /// Outside the sampled range; index of the boundary sample.
    Clamped(usize),
    Exact(usize),
    Between(usize, usize),
}

pub fn find_segment(samples: &[ParameterValue], frame: f64) -> Segment {
    if samples.is_empty() {
        return Segment::Empty;
    }
    let idx = samples.partition_point(|s| (s.frame as f64) <= frame);
    if idx == 0 {
        return Segment::Clamped(0);
    }
    let prev = idx - 1;
    if samples[prev].frame as f64 == frame {
        return Segment::Exact(prev);
    }
    if idx == samples.len() {
        return Segment::Clamped(prev);
    }
    Segment::Between(prev, idx)
}

/// Evaluate the curve at `frame`. `None` only when there are no samples.
pub fn evaluate(samples: &[ParameterValue], frame: f64, solver: &BezierSolver) -> Option<f64> {
    match find_segment(samples, frame) {
        Segment::Empty => None,
        Segment::Clamped(i) | Segment::Exact(i) => Some(samples[i].value),
        Segment::Between(i0, i1) => {
            let (a, b) = (&samples[i0], &samples[i1]);
            debug_assert!(a.frame < b.frame, "samples must be strictly increasing");
            Some(match a.interpolation {
                Interpolation::Linear => linear_segment(a, b, frame),
                Interpolation::Bezier { .. } => bezier_segment(a, b, frame, solver),
            })
        }
    }
}

fn handle_error(frame: i64, reason: impl Into<String>) -> AnimationError {
    AnimationError::InvalidBezierHandle {
        frame,
        reason: reason.into(),
    }
}

fn check_out_handle(
    sample: &ParameterValue,
    next: Option<&ParameterValue>,
) -> Result<(), AnimationError> {
    let Some(h) = sample.interpolation.out_handle() else {
        return Ok(());
    };
    if !h.is_finite() {
        return Err(handle_error(sample.frame, "out handle is not finite"));
    }
    if h.frame_offset < 0.0 {
        return Err(handle_error(sample.frame, "out handle points backwards"));
    }
    if let Some(next) = next {
        let span = (next.frame - sample.frame) as f64;
        if h.frame_offset > span {
            return Err(handle_error(
                sample.frame,
                format!("out handle crosses next sample at frame {}", next.frame),
            ));
        }
    }
    Ok(())
}

fn check_in_handle(
    sample: &ParameterValue,
    prev: Option<&ParameterValue>,
) -> Result<(), AnimationError> {
    let Some(h) = sample.interpolation.in_handle() else {
        return Ok(());
    };
    if !h.is_finite() {
        return Err(handle_error(sample.frame, "in handle is not finite"));
    }
    if h.frame_offset > 0.0 {
        return Err(handle_error(sample.frame, "in handle points forwards"));
    }
    if let Some(prev) = prev {
        let span = (sample.frame - prev.frame) as f64;
        if -h.frame_offset > span {
            return Err(handle_error(
                sample.frame,
                format!("in handle crosses previous sample at frame {}", prev.frame),
            ));
        }
    }
    Ok(())
}

/// Check `sample` as if it sat between `prev` and `next`, including the
/// neighbours' handles that face it.
pub fn validate_neighbourhood(
    prev: Option<&ParameterValue>,
    sample: &ParameterValue,
    next: Option<&ParameterValue>,
) -> Result<(), AnimationError> {
    if !sample.value.is_finite() {
        return Err(AnimationError::Serialization {
            reason: format!("value at frame {} is not finite", sample.frame),
        });
    }
    check_in_handle(sample, prev)?;
    check_out_handle(sample, next)?;
    if let Some(prev) = prev {
        check_out_handle(prev, Some(sample))?;
    }
    if let Some(next) = next {
        check_in_handle(next, Some(sample))?;
    }
    Ok(())
}

/// Validate a full sample list: strictly increasing frames, finite values,
/// and handles that keep every segment monotonic in frame.
pub fn validate_curve(samples: &[ParameterValue]) -> Result<(), AnimationError> {
    for (i, s) in samples.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| &samples[p]);
        if let Some(prev) = prev {
            if prev.frame >= s.frame {
                return Err(AnimationError::Serialization {
                    reason: format!(
                        "samples must be strictly increasing (frame {} follows {})",
                        s.frame, prev.frame
                    ),
                });
            }
        }
        validate_neighbourhood(prev, s, samples.get(i + 1))?;
    }
    Ok(())
}

/// Pull handle frame offsets back inside their segments. Used after frames
/// are relocated (rescale, retiming) so stretched handles never cross.
pub fn clamp_handles(samples: &mut [ParameterValue]) {
    let frames: Vec<i64> = samples.iter().map(|s| s.frame).collect();
    for (i, s) in samples.iter_mut().enumerate() {
        let before = i.checked_sub(1).map(|p| (frames[i] - frames[p]) as f64);
        let after = frames.get(i + 1).map(|n| (n - frames[i]) as f64);
        *s = s.map_handles(|inn, out| {
            let inn = inn.map(|h| Handle {
                frame_offset: h.frame_offset.clamp(-before.unwrap_or(f64::INFINITY), 0.0),
                ..h
            });
            let out = out.map(|h| Handle {
                frame_offset: h.frame_offset.clamp(0.0, after.unwrap_or(f64::INFINITY)),
                ..h
            });
            (inn, out)
        });
    }
}
