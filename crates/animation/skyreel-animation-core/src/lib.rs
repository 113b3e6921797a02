//! Skyreel Animation Core (renderer-agnostic)
//!
//! Keyframe and curve engine for camera and layer animation: per-parameter
//! sample lists, linear and Bezier evaluation, codependency groups that keep
//! composite quantities keyed together, constant-speed retiming, timeline
//! rescaling, and change events with cause chains. Rendering is reached only
//! through the [`ViewSink`] trait.

pub mod animatable;
pub mod codependency;
pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod interp;
pub mod parameter;
pub mod registry;
pub mod retime;
pub mod sample;
pub mod stored_animation;
pub mod timeline;
pub mod view;
pub mod zoom;

// Re-exports for consumers (editors, renderers)
pub use animatable::{Animatable, AnimatableHandle, AnimatableKind};
pub use codependency::CodependencyGroup;
pub use config::{AnimationContext, Config};
pub use error::{AnimationError, Result};
pub use events::{Cause, ChangeEvent, ChangeKind, EventBuffer, EventBus, Payload, Subscription};
pub use ids::{AnimatableId, EventId, SubscriptionId};
pub use interp::BezierSolver;
pub use parameter::{Bounds, Parameter, ParameterKind, ParameterRef, ParameterSet, Unit};
pub use registry::ObjectRegistry;
pub use retime::{plan_retime, retime_group, RetimePlan};
pub use sample::{Handle, Interpolation, ParameterValue};
pub use stored_animation::{
    parse_stored_animation_json, parse_stored_animation_json_with, to_stored_animation_json,
    StoredAnimation,
};
pub use timeline::Timeline;
pub use view::{Position, RecordingSink, ViewSink, ViewState};
pub use zoom::{from_ui_value, to_ui_value, ZoomScaling};
