//! Constant-speed retiming of a position-like codependency group.
//!
//! Distances are Euclidean over the raw sample values, so a path mixing
//! degrees and metres is measured in mixed units. Existing content depends
//! on that metric; do not normalise it here.

use std::ops::RangeInclusive;

use crate::codependency::CodependencyGroup;
use crate::config::AnimationContext;
use crate::error::{AnimationError, Result};
use crate::events::{Cause, EventBuffer};
use crate::interp;
use crate::parameter::{ParameterKind, ParameterSet};
use crate::sample::ParameterValue;

/// Old frame to new frame, one entry per keyframe in ascending order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetimePlan {
    pub moves: Vec<(i64, i64)>,
}

impl RetimePlan {
    fn identity(frames: &[i64]) -> Self {
        Self {
            moves: frames.iter().map(|&f| (f, f)).collect(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.moves.iter().all(|(a, b)| a == b)
    }

    pub fn new_frames(&self) -> impl Iterator<Item = i64> + '_ {
        self.moves.iter().map(|&(_, to)| to)
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Compute new frames for `frames` (ascending, unique) so the sampled path
/// `positions` is traversed at constant speed. First and last frames stay put.
pub fn plan_retime<F>(frames: &[i64], positions: F) -> Result<RetimePlan>
where
    F: Fn(i64) -> [f64; 3],
{
    let n = frames.len();
    if n < 3 {
        return Ok(RetimePlan::identity(frames));
    }
    debug_assert!(frames.windows(2).all(|w| w[0] < w[1]));

    // cumulative[i]: path length from frames[0] to frames[i + 1]
    let mut cumulative = Vec::with_capacity(n - 1);
    let mut total = 0.0;
    for pair in frames.windows(2) {
        let mut prev = positions(pair[0]);
        for f in pair[0] + 1..=pair[1] {
            let cur = positions(f);
            total += distance(prev, cur);
            prev = cur;
        }
        cumulative.push(total);
    }
    if !(total > 0.0 && total.is_finite()) {
        log::warn!("retime skipped: path over frames {}..={} has no length", frames[0], frames[n - 1]);
        return Ok(RetimePlan::identity(frames));
    }

    let first = frames[0];
    let last = frames[n - 1];
    let span = (first - last + 1).abs() as f64;
    let mut placed = frames.to_vec();
    for i in 1..n - 1 {
        placed[i] = first + (span * cumulative[i - 1] / total).round() as i64;
    }

    for i in 1..n {
        if placed[i - 1] >= placed[i] {
            placed[i] = placed[i - 1] + 1;
        }
    }
    if placed[n - 1] != last {
        placed[n - 1] = last;
        for i in (0..n - 1).rev() {
            if placed[i] >= placed[i + 1] {
                placed[i] = placed[i + 1] - 1;
            }
        }
    }
    if placed[0] != first {
        return Err(AnimationError::RetimingInvariantViolation {
            expected_first: first,
            actual_first: placed[0],
        });
    }

    Ok(RetimePlan {
        moves: frames.iter().copied().zip(placed).collect(),
    })
}

/// Retime the keyframes of `group` inside `range`, measuring the path traced
/// by the three `position` members. Samples keep their values and are only
/// relocated; the whole result is validated before the first write.
pub fn retime_group(
    params: &mut ParameterSet,
    group: &CodependencyGroup,
    position: [ParameterKind; 3],
    range: RangeInclusive<i64>,
    ctx: &AnimationContext,
    cause: &Cause,
    events: &mut EventBuffer,
) -> Result<RetimePlan> {
    if range.start() > range.end() {
        return Err(AnimationError::InvalidRange {
            start: *range.start(),
            end: *range.end(),
        });
    }
    if let Some(k) = position.iter().find(|k| !group.contains(**k)) {
        return Err(AnimationError::UnknownParameter {
            object: "codependency group".to_string(),
            kind: k.tag().to_string(),
        });
    }
    group.check_consistency(params)?;

    let frames: Vec<i64> = group
        .frames(params)
        .into_iter()
        .filter(|f| range.contains(f))
        .collect();

    let plan = {
        let axes = position.map(|k| params.get(k));
        let [Some(a), Some(b), Some(c)] = axes else {
            return Err(AnimationError::UnknownParameter {
                object: "codependency group".to_string(),
                kind: position[0].tag().to_string(),
            });
        };
        plan_retime(&frames, |f| [a.value_at(f, ctx), b.value_at(f, ctx), c.value_at(f, ctx)])?
    };
    if plan.is_identity() {
        return Ok(plan);
    }

    // Relocated samples per member, in plan order.
    let mut relocated: Vec<(ParameterKind, Vec<ParameterValue>)> = Vec::new();
    for &kind in group.members() {
        let Some(p) = params.get(kind) else { continue };
        let mut moved: Vec<ParameterValue> = plan
            .moves
            .iter()
            .filter_map(|&(from, to)| p.sample_at(from).map(|s| s.at_frame(to)))
            .collect();
        interp::clamp_handles(&mut moved);
        let old: Vec<i64> = plan.moves.iter().map(|&(from, _)| from).collect();
        interp::validate_curve(&p.preview(&old, &moved))?;
        relocated.push((kind, moved));
    }

    for &(from, to) in &plan.moves {
        if from != to {
            group.remove_keyframe(params, from, cause, events);
        }
    }
    for (i, &(from, to)) in plan.moves.iter().enumerate() {
        let row: Vec<(ParameterKind, ParameterValue)> =
            relocated.iter().map(|(k, samples)| (*k, samples[i])).collect();
        let unchanged = from == to
            && row
                .iter()
                .all(|(k, s)| params.get(*k).and_then(|p| p.sample_at(to)) == Some(s));
        if !unchanged {
            group.insert_validated(params, &row, cause, events);
        }
    }
    log::debug!("retimed {} keyframes in {:?}", plan.moves.len(), range);
    Ok(plan)
}
