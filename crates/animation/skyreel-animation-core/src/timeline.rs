//! Timeline: the set of animated objects, their shared context, and the
//! event bus edits are published on.
//!
//! Each object sits behind its own read/write lock. An edit holds the write
//! lock for its whole fan-out, so readers on other threads never see a
//! half-applied codependency insert; events are delivered after the lock is
//! released.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::animatable::{scaled_frame, Animatable, AnimatableHandle};
use crate::config::{AnimationContext, Config};
use crate::error::{AnimationError, Result};
use crate::events::{ChangeEvent, ChangeKind, EventBuffer, EventBus, Payload, Subscription};
use crate::ids::{AnimatableId, IdAllocator};
use crate::parameter::ParameterKind;
use crate::retime::RetimePlan;
use crate::sample::{Interpolation, ParameterValue};
use crate::view::ViewSink;

pub struct Timeline {
    ctx: AnimationContext,
    frame_count: i64,
    objects: Vec<AnimatableHandle>,
    /// Id of `objects[i]`, readable without taking that object's lock.
    object_ids: Vec<AnimatableId>,
    ids: Arc<IdAllocator>,
    bus: EventBus,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("frame_count", &self.frame_count)
            .field("objects", &self.objects.len())
            .field("bus", &self.bus)
            .finish()
    }
}

impl Timeline {
    pub fn new(config: &Config) -> Self {
        let ids = Arc::new(IdAllocator::new());
        Self {
            ctx: config.context(),
            frame_count: config.frame_count.max(1),
            objects: Vec::new(),
            object_ids: Vec::new(),
            bus: EventBus::new(Arc::clone(&ids)),
            ids,
        }
    }

    #[inline]
    pub fn context(&self) -> &AnimationContext {
        &self.ctx
    }

    pub fn set_zoom_scaling(&mut self, enabled: bool) {
        self.ctx = self.ctx.with_zoom_scaling(enabled);
    }

    #[inline]
    pub fn frame_count(&self) -> i64 {
        self.frame_count
    }

    // ---- subscriptions ----

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.bus.unsubscribe(subscription)
    }

    fn buffer(&self) -> EventBuffer {
        EventBuffer::new(Arc::clone(&self.ids))
    }

    // ---- objects ----

    #[inline]
    pub fn objects(&self) -> &[AnimatableHandle] {
        &self.objects
    }

    fn index_of(&self, id: AnimatableId) -> Result<usize> {
        self.object_ids
            .iter()
            .position(|&o| o == id)
            .ok_or_else(|| AnimationError::UnknownObject { id: id.to_string() })
    }

    /// Shared handle to one object; readers may hold it across threads.
    /// Lookup takes no lock, so it never waits on an edit to another object.
    pub fn object(&self, id: AnimatableId) -> Result<AnimatableHandle> {
        Ok(Arc::clone(&self.objects[self.index_of(id)?]))
    }

    /// Take ownership of `object`. Raises `Added(Animatable)` and one
    /// `Added(KeyFrame)` per keyframe it already carries, caused by the add.
    pub fn add_object(&mut self, object: Animatable) -> AnimatableId {
        let id = object.id();
        let mut events = self.buffer();
        let root = Some(events.raise(ChangeKind::Added, Payload::Animatable(id), &None));
        for frame in object.keyframes() {
            events.raise(ChangeKind::Added, Payload::KeyFrame { object: id, frame }, &root);
        }
        log::debug!("timeline: added {} '{}'", object.kind().tag(), object.name());
        self.objects.push(Arc::new(RwLock::new(object)));
        self.object_ids.push(id);
        self.bus.publish(events.events());
        id
    }

    /// Mirror of [`Timeline::add_object`]: keyframe removals are caused by the
    /// object's removal.
    pub fn remove_object(&mut self, id: AnimatableId) -> Result<AnimatableHandle> {
        let index = self.index_of(id)?;
        self.object_ids.remove(index);
        let handle = self.objects.remove(index);
        let mut events = self.buffer();
        let root = Some(events.raise(ChangeKind::Removed, Payload::Animatable(id), &None));
        for frame in handle.read().keyframes() {
            events.raise(ChangeKind::Removed, Payload::KeyFrame { object: id, frame }, &root);
        }
        self.bus.publish(events.events());
        Ok(handle)
    }

    /// Run `op` on one object under its write lock, then publish what it raised.
    pub fn edit<T, F>(&self, id: AnimatableId, op: F) -> Result<T>
    where
        F: FnOnce(&mut Animatable, &AnimationContext, &mut EventBuffer) -> Result<T>,
    {
        let handle = self.object(id)?;
        let mut events = self.buffer();
        let out = {
            let mut object = handle.write();
            let out = op(&mut *object, &self.ctx, &mut events)?;
            debug_assert!(
                object.check_invariants().is_ok(),
                "edit broke invariants: {:?}",
                object.check_invariants()
            );
            out
        };
        self.bus.publish(events.events());
        Ok(out)
    }

    // ---- routed edits ----

    pub fn insert_value(
        &self,
        id: AnimatableId,
        kind: ParameterKind,
        frame: i64,
        value: f64,
        interpolation: Interpolation,
    ) -> Result<Option<ParameterValue>> {
        self.edit(id, |o, ctx, ev| o.insert_value(kind, frame, value, interpolation, ctx, ev))
    }

    pub fn insert_keyframe(
        &self,
        id: AnimatableId,
        frame: i64,
        values: &[(ParameterKind, ParameterValue)],
    ) -> Result<()> {
        self.edit(id, |o, ctx, ev| o.insert_keyframe(frame, values, ctx, ev))
    }

    pub fn remove_sample(
        &self,
        id: AnimatableId,
        kind: ParameterKind,
        frame: i64,
    ) -> Result<Option<ParameterValue>> {
        self.edit(id, |o, _, ev| o.remove_sample(kind, frame, ev))
    }

    pub fn remove_keyframe(&self, id: AnimatableId, frame: i64) -> Result<bool> {
        self.edit(id, |o, _, ev| o.remove_keyframe(frame, ev))
    }

    pub fn move_keyframe(&self, id: AnimatableId, from: i64, to: i64) -> Result<()> {
        self.edit(id, |o, _, ev| o.move_keyframe(from, to, ev))
    }

    pub fn key_all(&self, id: AnimatableId, frame: i64) -> Result<()> {
        self.edit(id, |o, ctx, ev| o.key_all(frame, ctx, ev))
    }

    pub fn set_clipping_enabled(&self, id: AnimatableId, enabled: bool) -> Result<()> {
        self.edit(id, |o, ctx, ev| o.set_clipping_enabled(enabled, ctx, ev))
    }

    pub fn set_parameter_enabled(
        &self,
        id: AnimatableId,
        kind: ParameterKind,
        enabled: bool,
    ) -> Result<()> {
        self.edit(id, |o, _, ev| o.set_parameter_enabled(kind, enabled, ev))
    }

    pub fn scale_object(&self, id: AnimatableId, factor: f64) -> Result<()> {
        self.edit(id, |o, _, ev| o.scale(factor, ev))
    }

    pub fn smooth_eye_speed(&self, id: AnimatableId, start: i64, end: i64) -> Result<RetimePlan> {
        self.edit(id, |o, ctx, ev| o.smooth_eye_speed(start..=end, ctx, ev))
    }

    // ---- keyframe index ----

    /// Union of every object's keyframes.
    pub fn keyframes(&self) -> BTreeSet<i64> {
        self.objects
            .iter()
            .flat_map(|o| o.read().keyframes())
            .collect()
    }

    pub fn frame_of_first_keyframe(&self) -> Result<i64> {
        self.keyframes()
            .first()
            .copied()
            .ok_or_else(|| AnimationError::NoKeyframes {
                object: "timeline".to_string(),
            })
    }

    pub fn frame_of_last_keyframe(&self) -> Result<i64> {
        self.keyframes()
            .last()
            .copied()
            .ok_or_else(|| AnimationError::NoKeyframes {
                object: "timeline".to_string(),
            })
    }

    // ---- rescale ----

    /// Scale every object and the frame count by `factor`.
    pub fn scale(&mut self, factor: f64) -> Result<()> {
        let frame_count = scaled_frame(self.frame_count, factor)?.max(1);
        for id in self.object_ids.clone() {
            self.scale_object(id, factor)?;
        }
        self.frame_count = frame_count;
        log::debug!("timeline: scaled by {factor}, {} frames", self.frame_count);
        Ok(())
    }

    /// Change the frame count; with `rescale` every keyframe is moved by
    /// `new / old` so relative spacing is kept.
    pub fn set_frame_count(&mut self, frame_count: i64, rescale: bool) -> Result<()> {
        if frame_count <= 0 {
            return Err(AnimationError::InvalidRange {
                start: 0,
                end: frame_count,
            });
        }
        if rescale && frame_count != self.frame_count {
            let factor = frame_count as f64 / self.frame_count as f64;
            for id in self.object_ids.clone() {
                self.scale_object(id, factor)?;
            }
        }
        self.frame_count = frame_count;
        Ok(())
    }

    // ---- evaluation ----

    pub fn value_at(&self, id: AnimatableId, kind: ParameterKind, frame: i64) -> Result<f64> {
        self.object(id)?.read().value_at(kind, frame, &self.ctx)
    }

    pub fn values_between(
        &self,
        id: AnimatableId,
        kind: ParameterKind,
        start: i64,
        end: i64,
    ) -> Result<Vec<f64>> {
        self.object(id)?
            .read()
            .values_between(kind, start, end, &self.ctx)
    }

    /// Evaluate every object at `frame` and push the result into `sink`.
    pub fn apply_frame(&self, frame: i64, sink: &mut dyn ViewSink) {
        for object in &self.objects {
            object.read().apply(frame, &self.ctx, sink);
        }
    }

    pub(crate) fn set_frame_count_raw(&mut self, frame_count: i64) {
        self.frame_count = frame_count.max(1);
    }

    /// Insert a loaded object without raising events.
    pub(crate) fn push_loaded(&mut self, object: Animatable) {
        self.object_ids.push(object.id());
        self.objects.push(Arc::new(RwLock::new(object)));
    }
}
