//! Configured plugin instances and their wiring.
//!
//! A [`PluginInstance`] is a uniquely identified node in the dependency
//! graph: it names a registered type, carries the raw config value validated
//! at start time, and a [`Wiring`] map from the type's requirement names to
//! target instance ids. Instances are immutable after registration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Where an instance runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// In the engine's process, sharing the live service registry.
    Main,
    /// On an isolated worker, reached through the RPC channels.
    Worker,
}

impl ExecutionMode {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Worker => "worker",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An insertion-ordered mapping from requirement name to target instance id.
///
/// The wiring is a mapping, not a multimap: inserting the same requirement
/// name twice is rejected. Iteration follows insertion order so resolver
/// output stays deterministic.
///
/// # Example
///
/// ```
/// use tapestry_core::Wiring;
///
/// let mut wiring = Wiring::new();
/// wiring.insert("logger", "sys-logger").expect("first insert");
/// wiring.insert("db", "primary-db").expect("second insert");
/// assert_eq!(wiring.get("logger"), Some("sys-logger"));
/// assert!(wiring.insert("logger", "other").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wiring {
    entries: Vec<(String, String)>,
}

impl Wiring {
    /// Creates an empty wiring map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a wiring map from `(requirement, target)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateWiring`] if a requirement name repeats.
    pub fn from_pairs<N, T>(pairs: impl IntoIterator<Item = (N, T)>) -> Result<Self, CoreError>
    where
        N: Into<String>,
        T: Into<String>,
    {
        let mut wiring = Self::new();
        for (name, target) in pairs {
            wiring.insert(name, target)?;
        }
        Ok(wiring)
    }

    /// Adds a `requirement → target` entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateWiring`] if the name is already mapped.
    pub fn insert(
        &mut self,
        requirement: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<(), CoreError> {
        let requirement = requirement.into();
        if self.get(&requirement).is_some() {
            return Err(CoreError::DuplicateWiring { requirement });
        }
        self.entries.push((requirement, target.into()));
        Ok(())
    }

    /// Returns the target instance id for a requirement name.
    #[must_use]
    pub fn get(&self, requirement: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == requirement)
            .map(|(_, target)| target.as_str())
    }

    /// Iterates `(requirement, target)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, target)| (name.as_str(), target.as_str()))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no entries are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A configured, uniquely identified node in the plugin graph.
///
/// # Example
///
/// ```
/// use tapestry_core::{ExecutionMode, PluginInstance, Wiring};
/// use serde_json::json;
///
/// let mut wiring = Wiring::new();
/// wiring.insert("logger", "sys-logger").expect("wire logger");
///
/// let instance = PluginInstance::new("primary-db", "postgres", json!({"dsn": "..."}))
///     .with_wiring(wiring)
///     .with_mode(ExecutionMode::Worker);
/// assert_eq!(instance.id(), "primary-db");
/// assert_eq!(instance.mode(), ExecutionMode::Worker);
/// ```
#[derive(Debug, Clone)]
pub struct PluginInstance {
    id: String,
    type_id: String,
    config: Value,
    wiring: Wiring,
    mode: ExecutionMode,
}

impl PluginInstance {
    /// Creates an instance of the given type with an empty wiring, running
    /// in main mode.
    #[must_use]
    pub fn new(id: impl Into<String>, type_id: impl Into<String>, config: Value) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            config,
            wiring: Wiring::new(),
            mode: ExecutionMode::Main,
        }
    }

    /// Replaces the wiring map.
    #[must_use]
    pub fn with_wiring(mut self, wiring: Wiring) -> Self {
        self.wiring = wiring;
        self
    }

    /// Sets the execution mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the instance id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the referenced type id.
    #[must_use]
    pub fn type_id(&self) -> &str {
        self.type_id.as_str()
    }

    /// Returns the raw config value.
    #[must_use]
    pub const fn config(&self) -> &Value {
        &self.config
    }

    /// Returns the wiring map.
    #[must_use]
    pub const fn wiring(&self) -> &Wiring {
        &self.wiring
    }

    /// Returns the execution mode.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }
}
