//! Segment interpolation helpers:
//! - lerp (linear segments)
//! - bezier_segment (cubic in the (frame, value) plane, solved for the frame axis)

use super::BezierSolver;
use crate::sample::{Handle, ParameterValue};

const ZERO_HANDLE: Handle = Handle::new(0.0, 0.0);

/// Linear interpolation of scalars.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Cubic Bezier basis function
#[inline]
fn cubic_bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// Invert a monotonic cubic `x(t)` by bisection, returning `t` in [0, 1].
/// Monotonicity is guaranteed by handle validation, so a single root exists.
pub fn solve_bezier_parameter(xs: [f64; 4], target: f64, solver: &BezierSolver) -> f64 {
    let span = xs[3] - xs[0];
    if span <= 0.0 {
        return 0.0;
    }
    let mut lo = 0.0f64;
    let mut hi = 1.0f64;
    let mut mid = ((target - xs[0]) / span).clamp(0.0, 1.0);
    for _ in 0..solver.max_iterations {
        let x = cubic_bezier(xs[0], xs[1], xs[2], xs[3], mid);
        if (x - target).abs() <= solver.tolerance {
            break;
        }
        if x < target {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
    }
    mid
}

/// Linear segment value at a (possibly fractional) frame between `a` and `b`.
#[inline]
pub fn linear_segment(a: &ParameterValue, b: &ParameterValue, frame: f64) -> f64 {
    let span = (b.frame - a.frame) as f64;
    lerp(a.value, b.value, (frame - a.frame as f64) / span)
}

/// Bezier segment value. Control points are `a`, `a + a.out`, `b + b.in`, `b`;
/// missing handles are zero-length, which collapses the curve onto the chord.
pub fn bezier_segment(
    a: &ParameterValue,
    b: &ParameterValue,
    frame: f64,
    solver: &BezierSolver,
) -> f64 {
    let out = a.interpolation.out_handle().unwrap_or(ZERO_HANDLE);
    let inn = b.interpolation.in_handle().unwrap_or(ZERO_HANDLE);

    let (x0, y0) = (a.frame as f64, a.value);
    let (x3, y3) = (b.frame as f64, b.value);
    let xs = [x0, x0 + out.frame_offset, x3 + inn.frame_offset, x3];
    let t = solve_bezier_parameter(xs, frame, solver);
    cubic_bezier(y0, y0 + out.value_offset, y3 + inn.value_offset, y3, t)
}
