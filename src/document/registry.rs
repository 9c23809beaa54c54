//! Section factories.
//!
//! The host registers one factory per section name; the engine never knows
//! concrete section shapes. Sections without a factory stay raw
//! [`toml::Value`]s.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use toml::Value;

use crate::paths::VirtualPath;

/// A materialized, shareable section value.
pub type SectionValue = Arc<dyn Any + Send + Sync>;

type Factory = Box<dyn Fn(&Value) -> Result<SectionValue, SectionError> + Send + Sync>;

/// Error produced while turning a raw section into its typed value.
#[derive(Debug, thiserror::Error)]
pub enum SectionError {
    /// The raw table does not deserialize into the registered type.
    #[error("section `{section}` is invalid: {source}")]
    Deserialize {
        section: String,
        #[source]
        source: toml::de::Error,
    },

    /// A custom factory rejected the raw value.
    #[error("section `{section}` is invalid: {reason}")]
    Invalid { section: String, reason: String },
}

/// Mapping from section name to factory.
#[derive(Default)]
pub struct SectionRegistry {
    factories: HashMap<String, Factory>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom factory for `name`. A later registration replaces an
    /// earlier one.
    pub fn register<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&Value) -> Result<T, SectionError> + Send + Sync + 'static,
    {
        self.factories.insert(
            name.into(),
            Box::new(move |raw| factory(raw).map(|value| Arc::new(value) as SectionValue)),
        );
        self
    }

    /// Register `T` as the shape of `name`, deserialized with serde.
    pub fn register_deserialize<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: DeserializeOwned + Any + Send + Sync,
    {
        let name = name.into();
        let section = name.clone();
        self.register(name, move |raw: &Value| {
            raw.clone().try_into::<T>().map_err(|source| SectionError::Deserialize {
                section: section.clone(),
                source,
            })
        })
    }

    /// Build the runtime value of section `name` from its raw table.
    pub fn materialize(&self, name: &str, raw: &Value) -> Result<SectionValue, SectionError> {
        match self.factories.get(name) {
            Some(factory) => factory(raw),
            None => Ok(Arc::new(raw.clone())),
        }
    }
}

impl fmt::Debug for SectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionRegistry")
            .field("sections", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A fully resolved, immutable section handed to callers.
#[derive(Clone)]
pub struct ResolvedSection {
    name: String,
    document: VirtualPath,
    location: Option<String>,
    raw: Value,
    value: SectionValue,
}

impl ResolvedSection {
    pub fn new(
        name: impl Into<String>,
        document: VirtualPath,
        location: Option<String>,
        raw: Value,
        value: SectionValue,
    ) -> Self {
        Self {
            name: name.into(),
            document,
            location,
            raw,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the document the section was resolved against.
    pub fn document(&self) -> &VirtualPath {
        &self.document
    }

    /// Sub-path of the override the value came from, if any.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// The raw table as declared.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn value(&self) -> &SectionValue {
        &self.value
    }

    /// Borrow the typed value, if it was materialized as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for ResolvedSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSection")
            .field("name", &self.name)
            .field("document", &self.document)
            .field("location", &self.location)
            .field("raw", &self.raw)
            .finish()
    }
}
