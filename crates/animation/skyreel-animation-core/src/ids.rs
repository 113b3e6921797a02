//! Identifiers and simple allocators for core entities.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnimationError;

/// Stable identity of an animatable object (camera, layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimatableId(Uuid);

impl AnimatableId {
    /// Generate a new random id
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id from a UUID string like "d7a6b716-10b0-40bb-a894-8bc13a992737"
    pub fn from_string(id: impl AsRef<str>) -> Result<Self, AnimationError> {
        Uuid::parse_str(id.as_ref())
            .map(Self)
            .map_err(|_| AnimationError::Serialization {
                reason: format!("Invalid animatable ID: {}", id.as_ref()),
            })
    }

    #[inline]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AnimatableId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AnimatableId {
    #[inline]
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for AnimatableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Monotonic allocator for EventId and SubscriptionId.
/// Shared between a timeline's event buffers and its bus, so counters are atomic.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_event: AtomicU64,
    next_subscription: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_event(&self) -> EventId {
        EventId(self.next_event.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn alloc_subscription(&self) -> SubscriptionId {
        SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed))
    }
}
