//! Change events with cause chains, plus the buffer/bus pair that delivers them.
//!
//! Mutations append to an [`EventBuffer`] while the object's write lock is
//! held; the owning [`crate::timeline::Timeline`] hands the buffer to its
//! [`EventBus`] once the lock is released. Delivery is synchronous, on the
//! publishing thread, in subscription order. Listeners must not mutate the
//! timeline that is publishing to them.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::ids::{AnimatableId, EventId, IdAllocator, SubscriptionId};
use crate::parameter::ParameterRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// What an event is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Payload {
    Parameter(ParameterRef),
    KeyFrame { object: AnimatableId, frame: i64 },
    Animatable(AnimatableId),
}

impl Payload {
    /// Object the payload belongs to.
    pub fn object(&self) -> AnimatableId {
        match self {
            Payload::Parameter(r) => r.object,
            Payload::KeyFrame { object, .. } => *object,
            Payload::Animatable(id) => *id,
        }
    }
}

/// The event that caused another one, if any.
pub type Cause = Option<Arc<ChangeEvent>>;

#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    id: EventId,
    kind: ChangeKind,
    payload: Payload,
    cause: Cause,
}

impl ChangeEvent {
    #[inline]
    pub fn id(&self) -> EventId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[inline]
    pub fn cause(&self) -> Option<&ChangeEvent> {
        self.cause.as_deref()
    }

    /// Innermost event of the chain; `self` when uncaused.
    pub fn root_cause(&self) -> &ChangeEvent {
        let mut cur = self;
        while let Some(next) = cur.cause.as_deref() {
            cur = next;
        }
        cur
    }

    #[inline]
    pub fn shares_root_with(&self, other: &ChangeEvent) -> bool {
        self.root_cause().id == other.root_cause().id
    }

    #[inline]
    pub fn is_keyframe(&self) -> bool {
        matches!(self.payload, Payload::KeyFrame { .. })
    }
}

/// Events produced by one logical operation, in the order they happened.
#[derive(Debug)]
pub struct EventBuffer {
    ids: Arc<IdAllocator>,
    events: Vec<Arc<ChangeEvent>>,
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(Arc::new(IdAllocator::new()))
    }
}

impl EventBuffer {
    pub fn new(ids: Arc<IdAllocator>) -> Self {
        Self {
            ids,
            events: Vec::new(),
        }
    }

    /// Record an event and return it so it can cause further events.
    pub fn raise(&mut self, kind: ChangeKind, payload: Payload, cause: &Cause) -> Arc<ChangeEvent> {
        let event = Arc::new(ChangeEvent {
            id: self.ids.alloc_event(),
            kind,
            payload,
            cause: cause.clone(),
        });
        self.events.push(Arc::clone(&event));
        event
    }

    #[inline]
    pub fn events(&self) -> &[Arc<ChangeEvent>] {
        &self.events
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop events recorded after `len`; used to discard a failed operation.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }
}

pub type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Revocable handle returned by [`EventBus::subscribe`].
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping the handle keeps the listener subscribed with no way to revoke it"]
pub struct Subscription {
    id: SubscriptionId,
}

impl Subscription {
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Subscription registry. Listeners are held by the bus, never by the model.
pub struct EventBus {
    ids: Arc<IdAllocator>,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl EventBus {
    pub fn new(ids: Arc<IdAllocator>) -> Self {
        Self {
            ids,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = self.ids.alloc_subscription();
        self.listeners.write().push((id, Arc::new(listener)));
        Subscription { id }
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != subscription.id);
        listeners.len() != before
    }

    #[inline]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver `events` to every listener. The listener list is snapshotted
    /// first so no lock is held while user code runs.
    pub fn publish(&self, events: &[Arc<ChangeEvent>]) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for event in events {
            log::trace!(
                "publish {:?} {:?} (root {:?})",
                event.kind,
                event.payload,
                event.root_cause().id
            );
            for listener in &listeners {
                listener(event);
            }
        }
    }
}
