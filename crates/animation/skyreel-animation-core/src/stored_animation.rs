//! Persisted animation schema and its mapping onto a [`Timeline`].
//!
//! Version 2 writes every field. Version 1 files may omit `interpolation`
//! (linear), handles (none), `clipping` and the clip parameters (clipping
//! disabled), `enabled` (true) and `id` (a fresh id is generated).

use serde::{Deserialize, Serialize};

use crate::animatable::{Animatable, AnimatableKind};
use crate::config::Config;
use crate::error::{AnimationError, Result};
use crate::events::EventBuffer;
use crate::ids::AnimatableId;
use crate::parameter::{Parameter, ParameterKind};
use crate::registry::ObjectRegistry;
use crate::sample::{Handle, Interpolation, ParameterValue};
use crate::timeline::Timeline;

pub const CURRENT_VERSION: u32 = 2;

fn legacy_version() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredAnimation {
    #[serde(default = "legacy_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<i64>,
    #[serde(default)]
    pub objects: Vec<StoredObject>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clipping: Option<bool>,
    #[serde(default)]
    pub parameters: Vec<StoredParameter>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredParameter {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub samples: Vec<StoredSample>,
}

/// `(frame, value, interpolation?, in_handle?, out_handle?)`; handles are
/// `[frame_offset, value_offset]` pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredSample {
    pub frame: i64,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpolation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_handle: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_handle: Option<[f64; 2]>,
}

impl StoredSample {
    fn to_value(&self) -> Result<ParameterValue> {
        let handle = |h: Option<[f64; 2]>| h.map(|[f, v]| Handle::new(f, v));
        let interpolation = match self.interpolation.as_deref() {
            None | Some("linear") => Interpolation::Linear,
            Some("bezier") => Interpolation::Bezier {
                in_handle: handle(self.in_handle),
                out_handle: handle(self.out_handle),
            },
            Some(other) => {
                return Err(AnimationError::UnknownTag {
                    tag: other.to_string(),
                })
            }
        };
        Ok(ParameterValue::new(self.frame, self.value, interpolation))
    }

    fn from_value(s: &ParameterValue) -> Self {
        let pair = |h: Option<Handle>| h.map(|h| [h.frame_offset, h.value_offset]);
        Self {
            frame: s.frame,
            value: s.value,
            interpolation: Some(s.interpolation.tag().to_string()),
            in_handle: pair(s.interpolation.in_handle()),
            out_handle: pair(s.interpolation.out_handle()),
        }
    }
}

impl StoredParameter {
    fn from_parameter(p: &Parameter) -> Self {
        Self {
            kind: p.kind().tag().to_string(),
            enabled: Some(p.is_enabled()),
            samples: p.samples().iter().map(StoredSample::from_value).collect(),
        }
    }
}

impl StoredObject {
    fn from_animatable(a: &Animatable) -> Self {
        Self {
            id: Some(a.id().to_string()),
            name: a.name().to_string(),
            kind: a.kind().tag().to_string(),
            clipping: (a.kind() == AnimatableKind::Camera).then(|| a.clipping_enabled()),
            parameters: a
                .parameters()
                .iter()
                .map(StoredParameter::from_parameter)
                .collect(),
        }
    }

    fn build(&self, registry: &ObjectRegistry, config: &Config) -> Result<Animatable> {
        let ctx = config.context();
        let mut object = registry.create(&self.kind, &self.name)?;
        if let Some(id) = &self.id {
            object = object.with_id(AnimatableId::from_string(id)?);
        }

        let mut kinds = Vec::with_capacity(self.parameters.len());
        for sp in &self.parameters {
            kinds.push(ParameterKind::from_tag(&sp.kind)?);
        }
        let wants_clipping = self.clipping.unwrap_or(false)
            || kinds.iter().any(|k| ParameterKind::CLIPPING.contains(k));
        if wants_clipping {
            object.install_clipping();
        }

        let mut scratch = EventBuffer::default();
        for (sp, kind) in self.parameters.iter().zip(kinds) {
            let samples = sp
                .samples
                .iter()
                .map(StoredSample::to_value)
                .collect::<Result<Vec<_>>>()?;
            let name = object.name().to_string();
            let param = object.parameters_mut().get_mut(kind).ok_or_else(|| {
                AnimationError::UnknownParameter {
                    object: name,
                    kind: kind.tag().to_string(),
                }
            })?;
            param.set_enabled(sp.enabled.unwrap_or(true), &None, &mut scratch);
            param.load_samples(samples)?;
        }

        let repaired = object.repair_groups(&ctx)?;
        if repaired > 0 {
            log::warn!(
                "{}: synthesised {} missing codependent sample(s) while loading",
                object.name(),
                repaired
            );
        }
        object.check_invariants()?;
        Ok(object)
    }
}

impl Timeline {
    /// Rebuild a timeline from stored data. Objects are constructed through
    /// `registry`; no events are raised.
    pub fn from_stored(
        stored: &StoredAnimation,
        config: &Config,
        registry: &ObjectRegistry,
    ) -> Result<Timeline> {
        if stored.version > CURRENT_VERSION {
            return Err(AnimationError::Serialization {
                reason: format!(
                    "unsupported animation version {} (newest known is {})",
                    stored.version, CURRENT_VERSION
                ),
            });
        }
        let mut timeline = Timeline::new(config);
        if let Some(count) = stored.frame_count {
            timeline.set_frame_count_raw(count);
        }
        for so in &stored.objects {
            timeline.push_loaded(so.build(registry, config)?);
        }
        log::debug!(
            "loaded v{} animation with {} object(s)",
            stored.version,
            stored.objects.len()
        );
        Ok(timeline)
    }

    /// Snapshot the timeline in the current schema.
    pub fn to_stored(&self) -> StoredAnimation {
        StoredAnimation {
            version: CURRENT_VERSION,
            frame_count: Some(self.frame_count()),
            objects: self
                .objects()
                .iter()
                .map(|o| StoredObject::from_animatable(&o.read()))
                .collect(),
        }
    }
}

/// Parse stored JSON with the default config and the built-in registry.
pub fn parse_stored_animation_json(s: &str) -> Result<Timeline> {
    parse_stored_animation_json_with(s, &Config::default(), &ObjectRegistry::builtin())
}

pub fn parse_stored_animation_json_with(
    s: &str,
    config: &Config,
    registry: &ObjectRegistry,
) -> Result<Timeline> {
    let stored: StoredAnimation = serde_json::from_str(s)?;
    Timeline::from_stored(&stored, config, registry)
}

pub fn to_stored_animation_json(timeline: &Timeline) -> Result<String> {
    Ok(serde_json::to_string_pretty(&timeline.to_stored())?)
}
