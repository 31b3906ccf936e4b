//! Plugin type definitions and the setup surface.
//!
//! A [`Plugin`] implementation is a reusable *type*: it declares a config
//! schema, an ordered list of named [`Requirement`]s, lifecycle hooks, and
//! (for isolated execution) an entry-point locator the worker host resolves
//! to the same type on its side of the channel.
//!
//! `setup` receives a [`SetupContext`] and may publish its service by
//! registering it, by returning it via [`SetupOutcome::Produced`], or both.
//! When both happen the registered value wins and the returned one is
//! ignored.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::CoreError;
use crate::schema::{Contract, Schema};
use crate::service::{Service, ServiceError};

/// A named dependency slot declared by a plugin type, typed by a contract.
#[derive(Clone)]
pub struct Requirement {
    name: String,
    contract: Arc<dyn Contract>,
}

impl Requirement {
    /// Creates a requirement with the given name and contract handle.
    #[must_use]
    pub fn new(name: impl Into<String>, contract: Arc<dyn Contract>) -> Self {
        Self {
            name: name.into(),
            contract,
        }
    }

    /// Returns the requirement name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the contract handle for the required service shape.
    #[must_use]
    pub fn contract(&self) -> &Arc<dyn Contract> {
        &self.contract
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// What `setup` did about its service.
pub enum SetupOutcome {
    /// The service was registered through the context; nothing was returned.
    Registered,
    /// The service is returned for the engine to register.
    Produced(Arc<dyn Service>),
    /// The instance exposes no service.
    NoService,
}

impl fmt::Debug for SetupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => f.write_str("Registered"),
            Self::Produced(_) => f.write_str("Produced(..)"),
            Self::NoService => f.write_str("NoService"),
        }
    }
}

/// The context handed to `setup`.
///
/// On the host this is backed by the live service registry; on a worker it
/// is a capture shim whose `get_service` fails fast because workers reach
/// their dependencies through the uplink, never through a local registry.
pub trait SetupContext {
    /// Publishes a service under the given instance id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateService`] if the id is already taken.
    fn register_service(
        &mut self,
        instance_id: &str,
        service: Arc<dyn Service>,
    ) -> Result<(), CoreError>;

    /// Fetches a previously registered service.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownService`] if no such service exists (on
    /// workers, always).
    fn get_service(&self, instance_id: &str) -> Result<Arc<dyn Service>, CoreError>;
}

/// The resolved dependency handles for one instance, keyed by requirement
/// name in declaration order.
#[derive(Clone, Default)]
pub struct Dependencies {
    entries: Vec<(String, Arc<dyn Service>)>,
}

impl Dependencies {
    /// Creates an empty dependency set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a dependency handle under the given requirement name.
    pub fn insert(&mut self, name: impl Into<String>, service: Arc<dyn Service>) {
        self.entries.push((name.into(), service));
    }

    /// Returns the handle for a requirement name, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Service>> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, service)| service)
    }

    /// Returns the handle for a requirement name, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] naming the missing requirement, suitable
    /// for propagation out of `setup`.
    pub fn require(&self, name: &str) -> Result<&Arc<dyn Service>, ServiceError> {
        self.get(name).ok_or_else(|| {
            ServiceError::new(
                "MissingDependency",
                format!("no dependency named '{name}' was provided"),
            )
        })
    }

    /// Returns the number of dependencies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no dependencies are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, _)| name))
            .finish()
    }
}

/// A reusable plugin type: schema, requirements, and lifecycle hooks.
///
/// Types are immutable after registration in a
/// [`DefinitionStore`](crate::stores::DefinitionStore) and shared between
/// the engine and worker hosts, so implementations must be `Send + Sync`.
pub trait Plugin: Send + Sync {
    /// The type id, unique within a definition store.
    fn id(&self) -> &str;

    /// The schema used to validate instance configs at start time.
    fn config_schema(&self) -> &dyn Schema;

    /// The ordered dependency slots this type declares. Empty by default.
    fn requirements(&self) -> &[Requirement] {
        &[]
    }

    /// Locator the worker host resolves to this type's setup code.
    ///
    /// Required only when an instance of this type runs isolated.
    fn entry_point(&self) -> Option<&str> {
        None
    }

    /// Brings one instance of this type to life.
    ///
    /// Receives the validated config, the resolved dependency handles, and
    /// the instance id. May publish a service via `ctx`, return one, or
    /// neither.
    ///
    /// # Errors
    ///
    /// A [`ServiceError`] aborts startup (on the host) or the worker.
    fn setup(
        &self,
        ctx: &mut dyn SetupContext,
        config: Value,
        deps: &Dependencies,
        instance_id: &str,
    ) -> Result<SetupOutcome, ServiceError>;

    /// Releases resources held by one instance. No-op by default.
    ///
    /// # Errors
    ///
    /// Errors are logged and suppressed by the engine so that every
    /// instance gets a chance to shut down.
    fn teardown(&self, instance_id: &str) -> Result<(), ServiceError> {
        let _ = instance_id;
        Ok(())
    }
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("id", &self.id()).finish()
    }
}
