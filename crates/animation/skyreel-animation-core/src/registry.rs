//! Tag to constructor registry used when rebuilding objects from stored data.

use crate::animatable::{Animatable, AnimatableKind};
use crate::error::{AnimationError, Result};

/// Builds a fresh object given its display name.
pub type Constructor = fn(&str) -> Animatable;

#[derive(Clone, Debug, Default)]
pub struct ObjectRegistry {
    constructors: hashbrown::HashMap<String, Constructor>,
}

fn camera(name: &str) -> Animatable {
    Animatable::camera(name)
}

fn layer(name: &str) -> Animatable {
    Animatable::layer(name)
}

impl ObjectRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `camera` and `layer` constructors.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(AnimatableKind::Camera.tag(), camera);
        registry.register(AnimatableKind::Layer.tag(), layer);
        registry
    }

    /// Register a constructor; an existing entry for `tag` is overwritten.
    pub fn register(&mut self, tag: impl Into<String>, constructor: Constructor) {
        self.constructors.insert(tag.into(), constructor);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn create(&self, tag: &str, name: &str) -> Result<Animatable> {
        let constructor = self
            .constructors
            .get(tag)
            .ok_or_else(|| AnimationError::UnknownTag {
                tag: tag.to_string(),
            })?;
        Ok(constructor(name))
    }
}
