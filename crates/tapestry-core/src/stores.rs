//! Definition and instance stores.
//!
//! The stores own identity and lock state, nothing else: they never invoke
//! `setup` or `teardown`. The [`DefinitionStore`] enforces the one-way lock
//! over type registration; the [`InstanceStore`] keeps registration order so
//! the resolver's output is deterministic for a given input sequence.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::definition::Plugin;
use crate::error::CoreError;
use crate::instance::PluginInstance;

/// Store of registered plugin types, lockable against further registration.
///
/// # Example
///
/// ```
/// use tapestry_core::DefinitionStore;
///
/// let mut store = DefinitionStore::new();
/// store.lock();
/// assert!(store.is_locked());
/// ```
#[derive(Default)]
pub struct DefinitionStore {
    types: Vec<Arc<dyn Plugin>>,
    index: HashMap<String, usize>,
    locked: bool,
}

impl DefinitionStore {
    /// Creates an empty, unlocked store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RegistryLocked`] once the store is locked, or
    /// [`CoreError::DuplicateType`] if the id is taken.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), CoreError> {
        let type_id = plugin.id().to_owned();
        if self.locked {
            return Err(CoreError::RegistryLocked { type_id });
        }
        if self.index.contains_key(&type_id) {
            return Err(CoreError::DuplicateType { type_id });
        }
        self.index.insert(type_id, self.types.len());
        self.types.push(plugin);
        Ok(())
    }

    /// Locks the store. Idempotent; once set, never cleared.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Returns whether the store is locked.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Looks up a type by id.
    #[must_use]
    pub fn get(&self, type_id: &str) -> Option<&Arc<dyn Plugin>> {
        self.index.get(type_id).map(|&at| &self.types[at])
    }

    /// Returns whether a type with the given id is registered.
    #[must_use]
    pub fn contains(&self, type_id: &str) -> bool {
        self.index.contains_key(type_id)
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` when no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for DefinitionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionStore")
            .field("types", &self.index.keys().collect::<Vec<_>>())
            .field("locked", &self.locked)
            .finish()
    }
}

/// Store of registered plugin instances, in registration order.
#[derive(Debug, Clone, Default)]
pub struct InstanceStore {
    instances: Vec<PluginInstance>,
    index: HashMap<String, usize>,
}

impl InstanceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance.
    ///
    /// The caller is responsible for checking that the referenced type
    /// exists; the store only owns instance identity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateInstance`] if the id is taken.
    pub fn register(&mut self, instance: PluginInstance) -> Result<(), CoreError> {
        let instance_id = instance.id().to_owned();
        if self.index.contains_key(&instance_id) {
            return Err(CoreError::DuplicateInstance { instance_id });
        }
        self.index.insert(instance_id, self.instances.len());
        self.instances.push(instance);
        Ok(())
    }

    /// Looks up an instance by id.
    #[must_use]
    pub fn get(&self, instance_id: &str) -> Option<&PluginInstance> {
        self.index.get(instance_id).map(|&at| &self.instances[at])
    }

    /// Returns whether an instance with the given id is registered.
    #[must_use]
    pub fn contains(&self, instance_id: &str) -> bool {
        self.index.contains_key(instance_id)
    }

    /// Iterates instances in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginInstance> {
        self.instances.iter()
    }

    /// Returns the number of registered instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` when no instances are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
