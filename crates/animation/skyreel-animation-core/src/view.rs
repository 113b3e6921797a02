//! Renderer boundary. The engine evaluates parameters into a [`ViewState`]
//! and flushes it to whatever implements [`ViewSink`].

use serde::{Deserialize, Serialize};

/// Geographic position in degrees and metres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

impl Position {
    pub const fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
        }
    }
}

/// Consumer of evaluated values, called once per rendered frame.
pub trait ViewSink {
    fn apply_orientation(&mut self, eye: Position, look_at: Position);
    fn set_roll(&mut self, degrees: f64);
    fn set_field_of_view(&mut self, degrees: f64);
    fn set_clip_distances(&mut self, near: f64, far: f64);

    fn set_layer_opacity(&mut self, _layer: &str, _opacity: f64) {}
}

/// Values of one object at one frame, filled by the per-kind apply functions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    pub eye: Position,
    pub look_at: Position,
    orientation_touched: bool,
    pub roll: Option<f64>,
    pub field_of_view: Option<f64>,
    pub near_clip: Option<f64>,
    pub far_clip: Option<f64>,
    pub opacity: Option<f64>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has_orientation(&self) -> bool {
        self.orientation_touched
    }

    /// Push accumulated values. `name` identifies layers to the sink.
    pub fn flush(&self, name: &str, sink: &mut dyn ViewSink) {
        if self.orientation_touched {
            sink.apply_orientation(self.eye, self.look_at);
        }
        if let Some(roll) = self.roll {
            sink.set_roll(roll);
        }
        if let Some(fov) = self.field_of_view {
            sink.set_field_of_view(fov);
        }
        if let (Some(near), Some(far)) = (self.near_clip, self.far_clip) {
            sink.set_clip_distances(near, far);
        }
        if let Some(opacity) = self.opacity {
            sink.set_layer_opacity(name, opacity);
        }
    }
}

pub(crate) fn set_eye_lat(s: &mut ViewState, v: f64) {
    s.eye.latitude = v;
    s.orientation_touched = true;
}

pub(crate) fn set_eye_lon(s: &mut ViewState, v: f64) {
    s.eye.longitude = v;
    s.orientation_touched = true;
}

pub(crate) fn set_eye_elevation(s: &mut ViewState, v: f64) {
    s.eye.elevation = v;
    s.orientation_touched = true;
}

pub(crate) fn set_look_at_lat(s: &mut ViewState, v: f64) {
    s.look_at.latitude = v;
    s.orientation_touched = true;
}

pub(crate) fn set_look_at_lon(s: &mut ViewState, v: f64) {
    s.look_at.longitude = v;
    s.orientation_touched = true;
}

pub(crate) fn set_look_at_elevation(s: &mut ViewState, v: f64) {
    s.look_at.elevation = v;
    s.orientation_touched = true;
}

pub(crate) fn set_roll(s: &mut ViewState, v: f64) {
    s.roll = Some(v);
}

pub(crate) fn set_field_of_view(s: &mut ViewState, v: f64) {
    s.field_of_view = Some(v);
}

pub(crate) fn set_near_clip(s: &mut ViewState, v: f64) {
    s.near_clip = Some(v);
}

pub(crate) fn set_far_clip(s: &mut ViewState, v: f64) {
    s.far_clip = Some(v);
}

pub(crate) fn set_opacity(s: &mut ViewState, v: f64) {
    s.opacity = Some(v);
}

/// Sink that records every call, for previews and tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingSink {
    pub orientation: Option<(Position, Position)>,
    pub roll: Option<f64>,
    pub field_of_view: Option<f64>,
    pub clip_distances: Option<(f64, f64)>,
    pub layer_opacity: Vec<(String, f64)>,
}

impl ViewSink for RecordingSink {
    fn apply_orientation(&mut self, eye: Position, look_at: Position) {
        self.orientation = Some((eye, look_at));
    }

    fn set_roll(&mut self, degrees: f64) {
        self.roll = Some(degrees);
    }

    fn set_field_of_view(&mut self, degrees: f64) {
        self.field_of_view = Some(degrees);
    }

    fn set_clip_distances(&mut self, near: f64, far: f64) {
        self.clip_distances = Some((near, far));
    }

    fn set_layer_opacity(&mut self, layer: &str, opacity: f64) {
        self.layer_opacity.push((layer.to_string(), opacity));
    }
}
