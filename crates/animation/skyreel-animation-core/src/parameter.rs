//! Parameters: named animatable scalar channels owning a sorted sample list.

use serde::{Deserialize, Serialize};

use crate::config::AnimationContext;
use crate::error::AnimationError;
use crate::events::{Cause, ChangeKind, EventBuffer, Payload};
use crate::ids::AnimatableId;
use crate::interp;
use crate::sample::ParameterValue;
use crate::view::{self, ViewState};

/// Every channel the engine knows how to animate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParameterKind {
    EyeLat,
    EyeLon,
    EyeElevation,
    LookAtLat,
    LookAtLon,
    LookAtElevation,
    Roll,
    FieldOfView,
    NearClip,
    FarClip,
    Opacity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Degrees,
    Metres,
    Ratio,
}

/// Closed interval a parameter's values are clamped into.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Static, per-kind data plus the pure function that pushes a value into a view.
pub struct KindDescriptor {
    pub tag: &'static str,
    pub name: &'static str,
    pub unit: Unit,
    pub default_value: f64,
    pub bounds: Option<Bounds>,
    /// Edited through the zoom transform when zoom scaling is on.
    pub elevation_like: bool,
    pub apply: fn(&mut ViewState, f64),
}

impl std::fmt::Debug for KindDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindDescriptor")
            .field("tag", &self.tag)
            .field("unit", &self.unit)
            .field("default_value", &self.default_value)
            .field("bounds", &self.bounds)
            .finish()
    }
}

const LATITUDE: Bounds = Bounds::new(-90.0, 90.0);
const LONGITUDE: Bounds = Bounds::new(-180.0, 180.0);

static EYE_LAT: KindDescriptor = KindDescriptor {
    tag: "eyeLat",
    name: "Eye latitude",
    unit: Unit::Degrees,
    default_value: 0.0,
    bounds: Some(LATITUDE),
    elevation_like: false,
    apply: view::set_eye_lat,
};
static EYE_LON: KindDescriptor = KindDescriptor {
    tag: "eyeLon",
    name: "Eye longitude",
    unit: Unit::Degrees,
    default_value: 0.0,
    bounds: Some(LONGITUDE),
    elevation_like: false,
    apply: view::set_eye_lon,
};
static EYE_ELEVATION: KindDescriptor = KindDescriptor {
    tag: "eyeElevation",
    name: "Eye elevation",
    unit: Unit::Metres,
    default_value: 10_000_000.0,
    bounds: Some(Bounds::new(0.0, 1.0e8)),
    elevation_like: true,
    apply: view::set_eye_elevation,
};
static LOOK_AT_LAT: KindDescriptor = KindDescriptor {
    tag: "lookAtLat",
    name: "Look-at latitude",
    unit: Unit::Degrees,
    default_value: 0.0,
    bounds: Some(LATITUDE),
    elevation_like: false,
    apply: view::set_look_at_lat,
};
static LOOK_AT_LON: KindDescriptor = KindDescriptor {
    tag: "lookAtLon",
    name: "Look-at longitude",
    unit: Unit::Degrees,
    default_value: 0.0,
    bounds: Some(LONGITUDE),
    elevation_like: false,
    apply: view::set_look_at_lon,
};
static LOOK_AT_ELEVATION: KindDescriptor = KindDescriptor {
    tag: "lookAtElevation",
    name: "Look-at elevation",
    unit: Unit::Metres,
    default_value: 0.0,
    bounds: Some(Bounds::new(-1.2e4, 1.0e8)),
    elevation_like: true,
    apply: view::set_look_at_elevation,
};
static ROLL: KindDescriptor = KindDescriptor {
    tag: "roll",
    name: "Roll",
    unit: Unit::Degrees,
    default_value: 0.0,
    bounds: Some(Bounds::new(-180.0, 180.0)),
    elevation_like: false,
    apply: view::set_roll,
};
static FIELD_OF_VIEW: KindDescriptor = KindDescriptor {
    tag: "fieldOfView",
    name: "Field of view",
    unit: Unit::Degrees,
    default_value: 45.0,
    bounds: Some(Bounds::new(1.0, 179.0)),
    elevation_like: false,
    apply: view::set_field_of_view,
};
static NEAR_CLIP: KindDescriptor = KindDescriptor {
    tag: "nearClip",
    name: "Near clip distance",
    unit: Unit::Metres,
    default_value: 1.0,
    bounds: Some(Bounds::new(0.0, f64::MAX)),
    elevation_like: true,
    apply: view::set_near_clip,
};
static FAR_CLIP: KindDescriptor = KindDescriptor {
    tag: "farClip",
    name: "Far clip distance",
    unit: Unit::Metres,
    default_value: 1.0e9,
    bounds: Some(Bounds::new(0.0, f64::MAX)),
    elevation_like: true,
    apply: view::set_far_clip,
};
static OPACITY: KindDescriptor = KindDescriptor {
    tag: "opacity",
    name: "Opacity",
    unit: Unit::Ratio,
    default_value: 1.0,
    bounds: Some(Bounds::new(0.0, 1.0)),
    elevation_like: false,
    apply: view::set_opacity,
};

impl ParameterKind {
    pub const ALL: [ParameterKind; 11] = [
        Self::EyeLat,
        Self::EyeLon,
        Self::EyeElevation,
        Self::LookAtLat,
        Self::LookAtLon,
        Self::LookAtElevation,
        Self::Roll,
        Self::FieldOfView,
        Self::NearClip,
        Self::FarClip,
        Self::Opacity,
    ];

    pub const CAMERA_POSITION: [ParameterKind; 6] = [
        Self::EyeLat,
        Self::EyeLon,
        Self::EyeElevation,
        Self::LookAtLat,
        Self::LookAtLon,
        Self::LookAtElevation,
    ];

    pub const EYE_POSITION: [ParameterKind; 3] = [Self::EyeLat, Self::EyeLon, Self::EyeElevation];

    pub const CLIPPING: [ParameterKind; 2] = [Self::NearClip, Self::FarClip];

    pub fn descriptor(self) -> &'static KindDescriptor {
        match self {
            Self::EyeLat => &EYE_LAT,
            Self::EyeLon => &EYE_LON,
            Self::EyeElevation => &EYE_ELEVATION,
            Self::LookAtLat => &LOOK_AT_LAT,
            Self::LookAtLon => &LOOK_AT_LON,
            Self::LookAtElevation => &LOOK_AT_ELEVATION,
            Self::Roll => &ROLL,
            Self::FieldOfView => &FIELD_OF_VIEW,
            Self::NearClip => &NEAR_CLIP,
            Self::FarClip => &FAR_CLIP,
            Self::Opacity => &OPACITY,
        }
    }

    #[inline]
    pub fn tag(self) -> &'static str {
        self.descriptor().tag
    }

    pub fn from_tag(tag: &str) -> Result<Self, AnimationError> {
        Self::ALL
            .into_iter()
            .find(|k| k.tag() == tag)
            .ok_or_else(|| AnimationError::UnknownTag {
                tag: tag.to_string(),
            })
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Stable identity of a parameter: kinds are unique within an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterRef {
    pub object: AnimatableId,
    pub kind: ParameterKind,
}

/// A named channel with its samples, strictly increasing by frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    owner: AnimatableId,
    kind: ParameterKind,
    enabled: bool,
    default_value: f64,
    bounds: Option<Bounds>,
    samples: Vec<ParameterValue>,
}

impl Parameter {
    pub fn new(owner: AnimatableId, kind: ParameterKind) -> Self {
        let d = kind.descriptor();
        Self {
            owner,
            kind,
            enabled: true,
            default_value: d.default_value,
            bounds: d.bounds,
            samples: Vec::new(),
        }
    }

    #[inline]
    pub fn owner(&self) -> AnimatableId {
        self.owner
    }

    #[inline]
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    #[inline]
    pub fn reference(&self) -> ParameterRef {
        ParameterRef {
            object: self.owner,
            kind: self.kind,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.kind.descriptor().name
    }

    #[inline]
    pub fn unit(&self) -> Unit {
        self.kind.descriptor().unit
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    #[inline]
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    #[inline]
    pub fn samples(&self) -> &[ParameterValue] {
        &self.samples
    }

    pub fn frames(&self) -> impl Iterator<Item = i64> + '_ {
        self.samples.iter().map(|s| s.frame)
    }

    pub fn sample_at(&self, frame: i64) -> Option<&ParameterValue> {
        self.position(frame).ok().map(|i| &self.samples[i])
    }

    #[inline]
    pub fn has_sample(&self, frame: i64) -> bool {
        self.position(frame).is_ok()
    }

    #[inline]
    fn position(&self, frame: i64) -> Result<usize, usize> {
        self.samples.binary_search_by_key(&frame, |s| s.frame)
    }

    pub fn set_enabled(&mut self, enabled: bool, cause: &Cause, events: &mut EventBuffer) {
        if self.enabled != enabled {
            self.enabled = enabled;
            events.raise(ChangeKind::Changed, Payload::Parameter(self.reference()), cause);
        }
    }

    /// Value at `frame`; clamps to the boundary samples outside the sampled
    /// range and falls back to the default with no samples. Never fails.
    pub fn value_at(&self, frame: i64, ctx: &AnimationContext) -> f64 {
        interp::evaluate(&self.samples, frame as f64, &ctx.solver).unwrap_or(self.default_value)
    }

    /// One value per integer frame in `[start, end]`.
    pub fn values_between(
        &self,
        start: i64,
        end: i64,
        ctx: &AnimationContext,
    ) -> Result<Vec<f64>, AnimationError> {
        if start > end {
            return Err(AnimationError::InvalidRange { start, end });
        }
        Ok((start..=end).map(|f| self.value_at(f, ctx)).collect())
    }

    /// Latest sample strictly before `frame`.
    pub fn sample_before(&self, frame: i64) -> Option<&ParameterValue> {
        let idx = self.samples.partition_point(|s| s.frame < frame);
        idx.checked_sub(1).map(|i| &self.samples[i])
    }

    /// Earliest sample strictly after `frame`.
    pub fn sample_after(&self, frame: i64) -> Option<&ParameterValue> {
        let idx = self.samples.partition_point(|s| s.frame <= frame);
        self.samples.get(idx)
    }

    fn clamped(&self, mut sample: ParameterValue) -> ParameterValue {
        if let Some(bounds) = self.bounds {
            if !bounds.contains(sample.value) {
                let clamped = bounds.clamp(sample.value);
                log::warn!(
                    "{} value {} at frame {} clamped to {}",
                    self.kind,
                    sample.value,
                    sample.frame,
                    clamped
                );
                sample.value = clamped;
            }
        }
        sample
    }

    /// Validate `sample` against the neighbours it would have once inserted.
    pub fn check_insert(&self, sample: &ParameterValue) -> Result<(), AnimationError> {
        let (prev, next) = match self.position(sample.frame) {
            Ok(i) => (i.checked_sub(1), i + 1),
            Err(i) => (i.checked_sub(1), i),
        };
        interp::validate_neighbourhood(
            prev.map(|p| &self.samples[p]),
            sample,
            self.samples.get(next),
        )
    }

    /// Insert or replace the sample at `sample.frame`. Returns the replaced sample.
    pub fn insert_sample(
        &mut self,
        sample: ParameterValue,
        cause: &Cause,
        events: &mut EventBuffer,
    ) -> Result<Option<ParameterValue>, AnimationError> {
        self.check_insert(&sample)?;
        Ok(self.insert_checked(sample, cause, events))
    }

    /// Insertion without handle validation; callers have validated the final list.
    pub(crate) fn insert_checked(
        &mut self,
        sample: ParameterValue,
        cause: &Cause,
        events: &mut EventBuffer,
    ) -> Option<ParameterValue> {
        let sample = self.clamped(sample);
        let prior = match self.position(sample.frame) {
            Ok(i) => Some(std::mem::replace(&mut self.samples[i], sample)),
            Err(i) => {
                self.samples.insert(i, sample);
                None
            }
        };
        let kind = if prior.is_some() {
            ChangeKind::Changed
        } else {
            ChangeKind::Added
        };
        events.raise(kind, Payload::Parameter(self.reference()), cause);
        prior
    }

    /// Remove the sample at `frame`; no-op (and no event) when absent.
    pub fn remove_sample(
        &mut self,
        frame: i64,
        cause: &Cause,
        events: &mut EventBuffer,
    ) -> Option<ParameterValue> {
        let i = self.position(frame).ok()?;
        let removed = self.samples.remove(i);
        events.raise(ChangeKind::Removed, Payload::Parameter(self.reference()), cause);
        Some(removed)
    }

    /// The sample list as it would be after removing `removes` and inserting `inserts`.
    pub fn preview(&self, removes: &[i64], inserts: &[ParameterValue]) -> Vec<ParameterValue> {
        let mut out: Vec<ParameterValue> = self
            .samples
            .iter()
            .filter(|s| !removes.contains(&s.frame))
            .copied()
            .collect();
        for s in inserts {
            match out.binary_search_by_key(&s.frame, |x| x.frame) {
                Ok(i) => out[i] = *s,
                Err(i) => out.insert(i, *s),
            }
        }
        out
    }

    /// Swap in a complete, already sorted list. Raises one `Changed` event.
    pub(crate) fn replace_samples(
        &mut self,
        samples: Vec<ParameterValue>,
        cause: &Cause,
        events: &mut EventBuffer,
    ) {
        debug_assert!(samples.windows(2).all(|w| w[0].frame < w[1].frame));
        if samples == self.samples {
            return;
        }
        self.samples = samples.into_iter().map(|s| self.clamped(s)).collect();
        events.raise(ChangeKind::Changed, Payload::Parameter(self.reference()), cause);
    }

    /// Load persisted samples without raising events. The list must form a valid curve.
    pub(crate) fn load_samples(
        &mut self,
        mut samples: Vec<ParameterValue>,
    ) -> Result<(), AnimationError> {
        samples.sort_by_key(|s| s.frame);
        interp::validate_curve(&samples)?;
        self.samples = samples.into_iter().map(|s| self.clamped(s)).collect();
        Ok(())
    }

    /// Pull handles back inside their segments after frames were synthesised.
    pub(crate) fn clamp_handles(&mut self) {
        interp::clamp_handles(&mut self.samples);
    }
}

/// The parameters of one animatable object, at most one per kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kinds(owner: AnimatableId, kinds: &[ParameterKind]) -> Self {
        let mut set = Self::new();
        for &k in kinds {
            set.insert(Parameter::new(owner, k));
        }
        set
    }

    #[inline]
    pub fn get(&self, kind: ParameterKind) -> Option<&Parameter> {
        self.params.iter().find(|p| p.kind == kind)
    }

    #[inline]
    pub fn get_mut(&mut self, kind: ParameterKind) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.kind == kind)
    }

    #[inline]
    pub fn contains(&self, kind: ParameterKind) -> bool {
        self.get(kind).is_some()
    }

    /// Add a parameter, replacing one of the same kind.
    pub fn insert(&mut self, param: Parameter) -> Option<Parameter> {
        match self.params.iter().position(|p| p.kind == param.kind) {
            Some(i) => Some(std::mem::replace(&mut self.params[i], param)),
            None => {
                self.params.push(param);
                None
            }
        }
    }

    pub fn remove(&mut self, kind: ParameterKind) -> Option<Parameter> {
        let i = self.params.iter().position(|p| p.kind == kind)?;
        Some(self.params.remove(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.iter_mut()
    }

    pub fn kinds(&self) -> impl Iterator<Item = ParameterKind> + '_ {
        self.params.iter().map(|p| p.kind)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Handle;

    fn param(kind: ParameterKind) -> Parameter {
        Parameter::new(AnimatableId::new(), kind)
    }

    #[test]
    fn tags_round_trip() {
        for k in ParameterKind::ALL {
            assert_eq!(ParameterKind::from_tag(k.tag()).unwrap(), k);
        }
        assert!(ParameterKind::from_tag("zoom").is_err());
    }

    #[test]
    fn insert_replaces_and_keeps_order() {
        let mut p = param(ParameterKind::Roll);
        let mut ev = EventBuffer::default();
        p.insert_sample(ParameterValue::linear(10, 1.0), &None, &mut ev).unwrap();
        p.insert_sample(ParameterValue::linear(0, 2.0), &None, &mut ev).unwrap();
        let prior = p
            .insert_sample(ParameterValue::linear(10, 3.0), &None, &mut ev)
            .unwrap();
        assert_eq!(prior, Some(ParameterValue::linear(10, 1.0)));
        assert_eq!(p.frames().collect::<Vec<_>>(), vec![0, 10]);
        let kinds: Vec<_> = ev.events().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Added, ChangeKind::Added, ChangeKind::Changed]
        );
    }

    #[test]
    fn remove_absent_is_silent() {
        let mut p = param(ParameterKind::Roll);
        let mut ev = EventBuffer::default();
        assert_eq!(p.remove_sample(4, &None, &mut ev), None);
        assert!(ev.is_empty());
    }

    #[test]
    fn values_are_clamped_into_bounds() {
        let mut p = param(ParameterKind::Opacity);
        let mut ev = EventBuffer::default();
        p.insert_sample(ParameterValue::linear(0, 1.7), &None, &mut ev).unwrap();
        assert_eq!(p.sample_at(0).unwrap().value, 1.0);
    }

    #[test]
    fn empty_parameter_uses_default() {
        let p = param(ParameterKind::FieldOfView);
        assert_eq!(p.value_at(17, &AnimationContext::default()), 45.0);
    }

    #[test]
    fn inverted_range_fails() {
        let p = param(ParameterKind::Roll);
        let err = p.values_between(5, 1, &AnimationContext::default()).unwrap_err();
        assert_eq!(err, AnimationError::InvalidRange { start: 5, end: 1 });
    }

    #[test]
    fn insert_rejects_handle_crossing_new_neighbour() {
        let mut p = param(ParameterKind::Roll);
        let mut ev = EventBuffer::default();
        p.insert_sample(
            ParameterValue::bezier(0, 0.0, None, Some(Handle::new(8.0, 0.0))),
            &None,
            &mut ev,
        )
        .unwrap();
        p.insert_sample(ParameterValue::linear(20, 1.0), &None, &mut ev).unwrap();
        let err = p
            .insert_sample(ParameterValue::linear(5, 0.5), &None, &mut ev)
            .unwrap_err();
        assert!(matches!(err, AnimationError::InvalidBezierHandle { frame: 0, .. }));
        assert_eq!(p.samples().len(), 2);
    }

    #[test]
    fn neighbours_are_strict() {
        let mut p = param(ParameterKind::Roll);
        let mut ev = EventBuffer::default();
        for f in [0, 10, 20] {
            p.insert_sample(ParameterValue::linear(f, 0.0), &None, &mut ev).unwrap();
        }
        assert_eq!(p.sample_before(10).map(|s| s.frame), Some(0));
        assert_eq!(p.sample_after(10).map(|s| s.frame), Some(20));
        assert_eq!(p.sample_before(0), None);
        assert_eq!(p.sample_after(20), None);
    }
}
