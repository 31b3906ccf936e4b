//! The orchestrator: registration surface and graph projection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use tapestry_core::{
    CoreError, DefinitionStore, ExecutionMode, InstanceStore, Plugin, PluginInstance,
    ServiceRegistry,
};
use tapestry_graph::{Node, WiringGraph};

use crate::config::EngineConfig;
use crate::error::RuntimeError;
use crate::worker::{WorkerRecord, WorkerSpawner, WorkerState};

/// Tracing target for engine control-path operations.
pub(crate) const ENGINE_TARGET: &str = "tapestry_runtime::engine";

/// Options for [`Orchestrator::start`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartOptions {
    dry_run: bool,
}

impl StartOptions {
    /// Creates the default options (full start).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve and diagram the graph without running any setup.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns whether this is a dry run.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Options for [`Orchestrator::stop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopOptions {
    dry_run: bool,
}

impl StopOptions {
    /// Creates the default options (full stop).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log the reverse order without tearing anything down.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns whether this is a dry run.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// The plugin orchestration engine.
///
/// One orchestrator owns a definition store, an instance store, a live
/// service registry, and the records of any workers it has spawned. Several
/// orchestrators coexist in one process without interference; there is no
/// global state.
pub struct Orchestrator {
    pub(crate) definitions: DefinitionStore,
    pub(crate) instances: InstanceStore,
    pub(crate) registry: Arc<ServiceRegistry>,
    pub(crate) spawner: Arc<dyn WorkerSpawner>,
    pub(crate) config: EngineConfig,
    pub(crate) workers: HashMap<String, WorkerRecord>,
    pub(crate) started: Vec<String>,
}

impl Orchestrator {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new(spawner: Arc<dyn WorkerSpawner>) -> Self {
        Self::with_config(spawner, EngineConfig::default())
    }

    /// Creates an engine with explicit timing knobs.
    #[must_use]
    pub fn with_config(spawner: Arc<dyn WorkerSpawner>, config: EngineConfig) -> Self {
        Self {
            definitions: DefinitionStore::new(),
            instances: InstanceStore::new(),
            registry: Arc::new(ServiceRegistry::new()),
            spawner,
            config,
            workers: HashMap::new(),
            started: Vec::new(),
        }
    }

    /// Returns the engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the live service registry.
    ///
    /// Hosts may pre-seed externally supplied services here before
    /// `start()`; instances can wire against those ids without the targets
    /// being part of the plugin graph.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Registers a plugin type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RegistryLocked`] after [`lock_definitions`]
    /// (wrapped in [`RuntimeError::Core`]) or [`CoreError::DuplicateType`]
    /// for a repeated id.
    ///
    /// [`lock_definitions`]: Orchestrator::lock_definitions
    pub fn register_definition(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), RuntimeError> {
        self.definitions.register(plugin).map_err(Into::into)
    }

    /// Locks the type store. Idempotent; never cleared for the life of the
    /// engine. Instance registration remains open.
    pub fn lock_definitions(&mut self) {
        self.definitions.lock();
    }

    /// Registers a plugin instance.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] when the referenced type is not
    /// registered, or [`CoreError::DuplicateInstance`] for a repeated id
    /// (both wrapped in [`RuntimeError::Core`]).
    pub fn register_plugin(&mut self, instance: PluginInstance) -> Result<(), RuntimeError> {
        if !self.definitions.contains(instance.type_id()) {
            return Err(CoreError::UnknownType {
                instance_id: instance.id().to_owned(),
                type_id: instance.type_id().to_owned(),
            }
            .into());
        }
        self.instances.register(instance).map_err(Into::into)
    }

    /// Computes the deterministic start order without starting anything.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Graph`] when the wiring contains a cycle.
    pub fn resolve_order(&self) -> Result<Vec<String>, RuntimeError> {
        Ok(self.wiring_graph().resolve()?)
    }

    /// Renders the current instance set as a Mermaid diagram.
    #[must_use]
    pub fn mermaid(&self) -> String {
        self.wiring_graph().mermaid()
    }

    /// Returns the lifecycle state of a worker, applying queued events
    /// first. `None` for unknown ids, main-mode instances, and workers
    /// whose records were already removed by `stop()`.
    pub fn worker_state(&mut self, instance_id: &str) -> Option<WorkerState> {
        let record = self.workers.get_mut(instance_id)?;
        record.refresh_state();
        Some(record.state())
    }

    /// Projects the instance store into a wiring graph.
    pub(crate) fn wiring_graph(&self) -> WiringGraph {
        let mut graph = WiringGraph::new();
        for instance in self.instances.iter() {
            let mut node = Node::new(instance.id(), instance.type_id())
                .isolated(instance.mode() == ExecutionMode::Worker);
            for (requirement, target) in instance.wiring().iter() {
                node = node.with_edge(requirement, target);
            }
            // Instance ids are unique by store invariant, so insertion
            // cannot collide.
            if let Err(error) = graph.add_node(node) {
                warn!(target: ENGINE_TARGET, %error, "skipping graph node");
            }
        }
        graph
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("definitions", &self.definitions.len())
            .field("instances", &self.instances.len())
            .field("workers", &self.workers.len())
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl Drop for Orchestrator {
    /// Process-exit safety hook: any worker still alive is forcibly
    /// terminated so channels and child executions are released even when
    /// `stop()` was never called.
    fn drop(&mut self) {
        for (instance_id, mut record) in self.workers.drain() {
            if record.state() != WorkerState::Terminated {
                warn!(
                    target: ENGINE_TARGET,
                    %instance_id,
                    "engine dropped with live worker; forcing termination"
                );
            }
            record.force_terminate();
        }
    }
}
