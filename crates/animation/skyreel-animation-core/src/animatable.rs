//! Animatable objects (camera, layers) and their keyframe-level edits.
//!
//! Every edit raises one root `Changed(Animatable)` event; parameter and
//! keyframe events produced by the edit carry it as their cause. Keyframes are
//! never stored: they are the union of the parameters' sample frames.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::codependency::CodependencyGroup;
use crate::config::AnimationContext;
use crate::error::{AnimationError, Result};
use crate::events::{Cause, ChangeKind, EventBuffer, Payload};
use crate::ids::AnimatableId;
use crate::interp;
use crate::parameter::{Parameter, ParameterKind, ParameterRef, ParameterSet};
use crate::retime::{self, RetimePlan};
use crate::sample::{Interpolation, ParameterValue};
use crate::view::{ViewSink, ViewState};

/// Shared, lockable object as held by a timeline.
pub type AnimatableHandle = Arc<RwLock<Animatable>>;

/// `frame * factor` rounded, or `InvalidScaleFactor` when the factor is not a
/// finite positive number or the result does not fit in an `i64`.
pub(crate) fn scaled_frame(frame: i64, factor: f64) -> Result<i64> {
    let scaled = (frame as f64 * factor).round();
    // `i64::MAX as f64` is 2^63, one past the largest representable frame.
    let fits = scaled >= i64::MIN as f64 && scaled < i64::MAX as f64;
    if factor.is_finite() && factor > 0.0 && fits {
        Ok(scaled as i64)
    } else {
        Err(AnimationError::InvalidScaleFactor { factor })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimatableKind {
    Camera,
    Layer,
}

impl AnimatableKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Layer => "layer",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Animatable {
    id: AnimatableId,
    name: String,
    kind: AnimatableKind,
    parameters: ParameterSet,
    groups: Vec<CodependencyGroup>,
}

impl Animatable {
    /// Camera with the six position parameters grouped, plus roll and field
    /// of view. Clipping starts disabled.
    pub fn camera(name: impl Into<String>) -> Self {
        let id = AnimatableId::new();
        let mut kinds = ParameterKind::CAMERA_POSITION.to_vec();
        kinds.extend([ParameterKind::Roll, ParameterKind::FieldOfView]);
        Self {
            id,
            name: name.into(),
            kind: AnimatableKind::Camera,
            parameters: ParameterSet::with_kinds(id, &kinds),
            groups: vec![CodependencyGroup::new(ParameterKind::CAMERA_POSITION)],
        }
    }

    /// Image/overlay layer with a single opacity channel.
    pub fn layer(name: impl Into<String>) -> Self {
        let id = AnimatableId::new();
        Self {
            id,
            name: name.into(),
            kind: AnimatableKind::Layer,
            parameters: ParameterSet::with_kinds(id, &[ParameterKind::Opacity]),
            groups: Vec::new(),
        }
    }

    /// Re-key a freshly built object, e.g. with an id read from disk.
    pub fn with_id(mut self, id: AnimatableId) -> Self {
        self.id = id;
        let mut rebuilt = ParameterSet::new();
        for p in self.parameters.iter() {
            let mut fresh = Parameter::new(id, p.kind());
            let mut scratch = EventBuffer::default();
            fresh.set_enabled(p.is_enabled(), &None, &mut scratch);
            for s in p.samples() {
                fresh.insert_checked(*s, &None, &mut scratch);
            }
            rebuilt.insert(fresh);
        }
        self.parameters = rebuilt;
        self
    }

    #[inline]
    pub fn id(&self) -> AnimatableId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn kind(&self) -> AnimatableKind {
        self.kind
    }

    #[inline]
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    #[inline]
    pub fn groups(&self) -> &[CodependencyGroup] {
        &self.groups
    }

    pub fn parameter(&self, kind: ParameterKind) -> Result<&Parameter> {
        self.parameters.get(kind).ok_or_else(|| self.unknown(kind))
    }

    fn unknown(&self, kind: ParameterKind) -> AnimationError {
        AnimationError::UnknownParameter {
            object: self.name.clone(),
            kind: kind.tag().to_string(),
        }
    }

    fn group_index(&self, kind: ParameterKind) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(kind))
    }

    pub fn group_of(&self, kind: ParameterKind) -> Option<&CodependencyGroup> {
        self.group_index(kind).map(|i| &self.groups[i])
    }

    pub fn clipping_enabled(&self) -> bool {
        self.parameters.contains(ParameterKind::NearClip)
    }

    // ---- keyframe view ----

    pub fn keyframes(&self) -> BTreeSet<i64> {
        self.parameters.iter().flat_map(|p| p.frames()).collect()
    }

    pub fn first_keyframe(&self) -> Result<i64> {
        self.keyframes().first().copied().ok_or_else(|| self.no_keyframes())
    }

    pub fn last_keyframe(&self) -> Result<i64> {
        self.keyframes().last().copied().ok_or_else(|| self.no_keyframes())
    }

    fn no_keyframes(&self) -> AnimationError {
        AnimationError::NoKeyframes {
            object: self.name.clone(),
        }
    }

    pub fn keyframe_before(&self, frame: i64) -> Option<i64> {
        self.keyframes().range(..frame).next_back().copied()
    }

    pub fn keyframe_after(&self, frame: i64) -> Option<i64> {
        self.keyframes().range(frame + 1..).next().copied()
    }

    // ---- evaluation ----

    pub fn value_at(&self, kind: ParameterKind, frame: i64, ctx: &AnimationContext) -> Result<f64> {
        Ok(self.parameter(kind)?.value_at(frame, ctx))
    }

    pub fn values_between(
        &self,
        kind: ParameterKind,
        start: i64,
        end: i64,
        ctx: &AnimationContext,
    ) -> Result<Vec<f64>> {
        self.parameter(kind)?.values_between(start, end, ctx)
    }

    /// Evaluate every enabled parameter at `frame` into a view state.
    pub fn evaluate(&self, frame: i64, ctx: &AnimationContext) -> ViewState {
        let mut state = ViewState::new();
        for p in self.parameters.iter().filter(|p| p.is_enabled()) {
            (p.kind().descriptor().apply)(&mut state, p.value_at(frame, ctx));
        }
        state
    }

    pub fn apply(&self, frame: i64, ctx: &AnimationContext, sink: &mut dyn ViewSink) {
        self.evaluate(frame, ctx).flush(&self.name, sink);
    }

    // ---- edits ----

    /// Run an edit under a fresh root event. On failure the edit's events are
    /// discarded, so a failed call leaves `events` as it found it. An edit
    /// that changed nothing leaves no root behind either.
    fn edit<T>(
        &mut self,
        events: &mut EventBuffer,
        f: impl FnOnce(&mut Self, &Cause, &mut EventBuffer) -> Result<T>,
    ) -> Result<T> {
        let mark = events.len();
        let before = self.keyframes();
        let root = Some(events.raise(ChangeKind::Changed, Payload::Animatable(self.id), &None));
        match f(self, &root, events) {
            Ok(out) => {
                self.raise_keyframe_diff(&before, &root, events);
                if events.len() == mark + 1 {
                    events.truncate(mark);
                }
                Ok(out)
            }
            Err(e) => {
                events.truncate(mark);
                Err(e)
            }
        }
    }

    fn raise_keyframe_diff(&self, before: &BTreeSet<i64>, cause: &Cause, events: &mut EventBuffer) {
        let after = self.keyframes();
        for &frame in before.difference(&after) {
            events.raise(
                ChangeKind::Removed,
                Payload::KeyFrame {
                    object: self.id,
                    frame,
                },
                cause,
            );
        }
        for &frame in after.difference(before) {
            events.raise(
                ChangeKind::Added,
                Payload::KeyFrame {
                    object: self.id,
                    frame,
                },
                cause,
            );
        }
    }

    /// Insert samples for several parameters at one frame. Grouped parameters
    /// fan out to their whole group; samples are placed at `frame` regardless
    /// of their own frame field.
    pub fn insert_keyframe(
        &mut self,
        frame: i64,
        values: &[(ParameterKind, ParameterValue)],
        ctx: &AnimationContext,
        events: &mut EventBuffer,
    ) -> Result<()> {
        for (kind, _) in values {
            self.parameter(*kind)?;
        }
        self.edit(events, |this, cause, events| {
            this.write_keyframe(frame, values, ctx, cause, events)
        })
    }

    fn write_keyframe(
        &mut self,
        frame: i64,
        values: &[(ParameterKind, ParameterValue)],
        ctx: &AnimationContext,
        cause: &Cause,
        events: &mut EventBuffer,
    ) -> Result<()> {
        // Staged on a copy so a rejected sample leaves no partial edit.
        let mut staged = self.parameters.clone();
        for group in &self.groups {
            let explicit: Vec<_> = values
                .iter()
                .filter(|(k, _)| group.contains(*k))
                .copied()
                .collect();
            if !explicit.is_empty() {
                group.insert_keyframe(&mut staged, frame, &explicit, ctx, cause, events)?;
            }
        }
        for (kind, sample) in values {
            if self.group_index(*kind).is_some() {
                continue;
            }
            let p = staged.get_mut(*kind).ok_or_else(|| self.unknown(*kind))?;
            let sample = sample.at_frame(frame);
            if p.sample_at(frame) == Some(&sample) {
                continue;
            }
            p.insert_sample(sample, cause, events)?;
        }
        self.parameters = staged;
        log::debug!("{}: keyed {} parameter(s) at frame {}", self.name, values.len(), frame);
        Ok(())
    }

    /// Set one parameter's value at `frame`. Returns the sample it replaced.
    pub fn insert_value(
        &mut self,
        kind: ParameterKind,
        frame: i64,
        value: f64,
        interpolation: Interpolation,
        ctx: &AnimationContext,
        events: &mut EventBuffer,
    ) -> Result<Option<ParameterValue>> {
        let prior = self.parameter(kind)?.sample_at(frame).copied();
        let sample = ParameterValue::new(frame, value, interpolation);
        self.insert_keyframe(frame, &[(kind, sample)], ctx, events)?;
        Ok(prior)
    }

    /// Remove one parameter's sample. Grouped parameters cannot be edited
    /// alone; use [`Animatable::remove_keyframe`] for those.
    pub fn remove_sample(
        &mut self,
        kind: ParameterKind,
        frame: i64,
        events: &mut EventBuffer,
    ) -> Result<Option<ParameterValue>> {
        if !self.parameter(kind)?.has_sample(frame) {
            return Ok(None);
        }
        if self.group_index(kind).is_some() {
            return Err(AnimationError::CodependencyMismatch {
                parameter: kind.tag().to_string(),
                frame,
            });
        }
        self.edit(events, |this, cause, events| {
            Ok(this
                .parameters
                .get_mut(kind)
                .and_then(|p| p.remove_sample(frame, cause, events)))
        })
    }

    /// Remove `frame` from every parameter. Returns false when nothing was keyed there.
    pub fn remove_keyframe(&mut self, frame: i64, events: &mut EventBuffer) -> Result<bool> {
        if !self.keyframes().contains(&frame) {
            return Ok(false);
        }
        self.edit(events, |this, cause, events| {
            for i in 0..this.groups.len() {
                this.groups[i].remove_keyframe(&mut this.parameters, frame, cause, events);
            }
            for p in this.parameters.iter_mut() {
                p.remove_sample(frame, cause, events);
            }
            log::debug!("{}: removed keyframe {}", this.name, frame);
            Ok(true)
        })
    }

    /// Relocate every sample at `from` to `to`, replacing samples already there.
    pub fn move_keyframe(&mut self, from: i64, to: i64, events: &mut EventBuffer) -> Result<()> {
        if from == to || !self.keyframes().contains(&from) {
            return Ok(());
        }
        let mut rewritten = Vec::new();
        for p in self.parameters.iter() {
            let Some(s) = p.sample_at(from) else { continue };
            let mut next = p.preview(&[from], &[s.at_frame(to)]);
            interp::clamp_handles(&mut next);
            interp::validate_curve(&next)?;
            rewritten.push((p.kind(), next));
        }
        self.edit(events, |this, cause, events| {
            for (kind, samples) in rewritten {
                if let Some(p) = this.parameters.get_mut(kind) {
                    p.replace_samples(samples, cause, events);
                }
            }
            log::debug!("{}: moved keyframe {} -> {}", this.name, from, to);
            Ok(())
        })
    }

    /// Key every enabled parameter at `frame` with its current value.
    /// Existing samples at `frame` are kept as they are.
    pub fn key_all(&mut self, frame: i64, ctx: &AnimationContext, events: &mut EventBuffer) -> Result<()> {
        let values: Vec<(ParameterKind, ParameterValue)> = self
            .parameters
            .iter()
            .filter(|p| p.is_enabled())
            .map(|p| {
                let sample = p
                    .sample_at(frame)
                    .copied()
                    .unwrap_or_else(|| ParameterValue::linear(frame, p.value_at(frame, ctx)));
                (p.kind(), sample)
            })
            .collect();
        self.edit(events, |this, cause, events| {
            this.write_keyframe(frame, &values, ctx, cause, events)
        })
    }

    pub fn set_parameter_enabled(
        &mut self,
        kind: ParameterKind,
        enabled: bool,
        events: &mut EventBuffer,
    ) -> Result<()> {
        self.parameter(kind)?;
        self.edit(events, |this, cause, events| {
            if let Some(p) = this.parameters.get_mut(kind) {
                p.set_enabled(enabled, cause, events);
            }
            Ok(())
        })
    }

    /// Toggle the near/far clip parameters on a camera. The position group is
    /// replaced, never resized: enabling builds an eight-member group keyed at
    /// every frame of the old one; disabling drops the clip parameters and
    /// their samples.
    pub fn set_clipping_enabled(
        &mut self,
        enabled: bool,
        ctx: &AnimationContext,
        events: &mut EventBuffer,
    ) -> Result<()> {
        if self.kind != AnimatableKind::Camera {
            return Err(self.unknown(ParameterKind::NearClip));
        }
        if self.clipping_enabled() == enabled {
            return Ok(());
        }
        let Some(index) = self.group_index(ParameterKind::EyeLat) else {
            return Err(self.unknown(ParameterKind::EyeLat));
        };
        self.edit(events, |this, cause, events| {
            let old = this.groups[index].clone();
            if enabled {
                let mut staged = this.parameters.clone();
                for kind in ParameterKind::CLIPPING {
                    staged.insert(Parameter::new(this.id, kind));
                    events.raise(
                        ChangeKind::Added,
                        Payload::Parameter(ParameterRef {
                            object: this.id,
                            kind,
                        }),
                        cause,
                    );
                }
                let mut members = ParameterKind::CAMERA_POSITION.to_vec();
                members.extend(ParameterKind::CLIPPING);
                let group = CodependencyGroup::new(members);
                group.migrate_from(&old, &mut staged, ctx, cause, events)?;
                this.parameters = staged;
                this.groups[index] = group;
            } else {
                for kind in ParameterKind::CLIPPING {
                    if this.parameters.remove(kind).is_some() {
                        events.raise(
                            ChangeKind::Removed,
                            Payload::Parameter(ParameterRef {
                                object: this.id,
                                kind,
                            }),
                            cause,
                        );
                    }
                }
                this.groups[index] = CodependencyGroup::new(ParameterKind::CAMERA_POSITION);
            }
            log::debug!("{}: clipping {}", this.name, if enabled { "enabled" } else { "disabled" });
            Ok(())
        })
    }

    /// Rescale every sample frame by `factor` (rounded). When two samples of a
    /// parameter land on one frame the later original frame wins. Handle frame
    /// offsets stretch by the same factor. A factor that would push any frame
    /// outside the `i64` range is rejected before anything moves.
    pub fn scale(&mut self, factor: f64, events: &mut EventBuffer) -> Result<()> {
        scaled_frame(0, factor)?;
        if self.keyframes().is_empty() {
            return Ok(());
        }
        let mut rewritten = Vec::with_capacity(self.parameters.len());
        for p in self.parameters.iter() {
            let mut next: Vec<ParameterValue> = Vec::with_capacity(p.samples().len());
            for s in p.samples() {
                let frame = scaled_frame(s.frame, factor)?;
                let scaled = s.at_frame(frame).with_scaled_handles(factor);
                match next.last_mut() {
                    Some(last) if last.frame == frame => {
                        log::warn!(
                            "{}: {} sample at frame {} collides after scaling; keeping frame {}",
                            self.name,
                            p.kind(),
                            frame,
                            s.frame
                        );
                        *last = scaled;
                    }
                    _ => next.push(scaled),
                }
            }
            interp::clamp_handles(&mut next);
            rewritten.push((p.kind(), next));
        }
        self.edit(events, |this, cause, events| {
            for (kind, samples) in rewritten {
                if let Some(p) = this.parameters.get_mut(kind) {
                    p.replace_samples(samples, cause, events);
                }
            }
            log::debug!("{}: scaled by {}", this.name, factor);
            Ok(())
        })
    }

    /// Retime the camera's eye path inside `range` to constant speed.
    pub fn smooth_eye_speed(
        &mut self,
        range: RangeInclusive<i64>,
        ctx: &AnimationContext,
        events: &mut EventBuffer,
    ) -> Result<RetimePlan> {
        let Some(index) = self.group_index(ParameterKind::EyeLat) else {
            return Err(self.unknown(ParameterKind::EyeLat));
        };
        self.edit(events, |this, cause, events| {
            let group = this.groups[index].clone();
            retime::retime_group(
                &mut this.parameters,
                &group,
                ParameterKind::EYE_POSITION,
                range,
                ctx,
                cause,
                events,
            )
        })
    }

    /// Group consistency and per-parameter ordering.
    pub fn check_invariants(&self) -> Result<()> {
        for p in self.parameters.iter() {
            interp::validate_curve(p.samples())?;
        }
        for g in &self.groups {
            g.check_consistency(&self.parameters)?;
        }
        Ok(())
    }

    // ---- persistence support ----

    pub(crate) fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    /// Enable clipping without events or migration, for loading.
    pub(crate) fn install_clipping(&mut self) {
        if self.kind != AnimatableKind::Camera || self.clipping_enabled() {
            return;
        }
        for kind in ParameterKind::CLIPPING {
            self.parameters.insert(Parameter::new(self.id, kind));
        }
        if let Some(index) = self.group_index(ParameterKind::EyeLat) {
            let mut members = ParameterKind::CAMERA_POSITION.to_vec();
            members.extend(ParameterKind::CLIPPING);
            self.groups[index] = CodependencyGroup::new(members);
        }
    }

    /// Synthesise missing group samples. Returns how many were added.
    pub(crate) fn repair_groups(&mut self, ctx: &AnimationContext) -> Result<usize> {
        let mut total = 0;
        for g in &self.groups {
            total += g.repair(&mut self.parameters, ctx)?;
        }
        Ok(total)
    }
}
