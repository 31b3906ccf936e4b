//! The worker-side host program.
//!
//! A worker host receives a [`WorkerBundle`](crate::WorkerBundle) plus the
//! worker ends of the downlink and uplink channels. It resolves the entry
//! point to the exported plugin type, builds per-requirement uplink stubs as
//! the worker's `deps`, runs `setup` against a capture context, announces
//! `WORKER_READY`, and then serves downlink calls until teardown.
//!
//! [`ThreadSpawner`](crate::ThreadSpawner) drives [`run`] on an OS thread;
//! a subprocess transport would call the same function from its `main`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use tapestry_core::{Dependencies, Plugin, Service, SetupOutcome};
use tapestry_rpc::{Channel, Frame, UplinkClient, serve};

use crate::context::CaptureContext;
use crate::error::RuntimeError;
use crate::worker::WorkerBundle;

/// Tracing target for worker host operations.
const HOST_TARGET: &str = "tapestry_runtime::worker_host";

/// Resolves entry-point locators to the plugin types a module exports.
///
/// This is the in-process analogue of dynamic module loading: the locator
/// is an opaque string and the resolver returns every exported type, from
/// which the host picks the one matching the bundle's type id.
pub trait EntryPointResolver: Send + Sync {
    /// Resolves `entry_point` to its exported plugin types.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownEntryPoint`] when no module is known
    /// under the locator.
    fn resolve(&self, entry_point: &str) -> Result<Vec<Arc<dyn Plugin>>, RuntimeError>;
}

/// A static table of entry points and their exported plugin types.
///
/// # Example
///
/// ```ignore
/// let mut catalog = ModuleCatalog::new();
/// catalog.insert("modules/database", vec![database_plugin]);
/// let spawner = ThreadSpawner::new(Arc::new(catalog));
/// ```
#[derive(Default)]
pub struct ModuleCatalog {
    modules: HashMap<String, Vec<Arc<dyn Plugin>>>,
}

impl ModuleCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the exports of one module. Replaces any previous entry.
    pub fn insert(&mut self, entry_point: impl Into<String>, exports: Vec<Arc<dyn Plugin>>) {
        self.modules.insert(entry_point.into(), exports);
    }
}

impl EntryPointResolver for ModuleCatalog {
    fn resolve(&self, entry_point: &str) -> Result<Vec<Arc<dyn Plugin>>, RuntimeError> {
        self.modules
            .get(entry_point)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownEntryPoint {
                entry_point: entry_point.to_owned(),
            })
    }
}

/// Resolves an entry point and locates the export whose id matches
/// `type_id`.
///
/// # Errors
///
/// Returns [`RuntimeError::UnknownEntryPoint`] for an unknown locator or
/// [`RuntimeError::SpawnFailed`] when none of the exports carries the
/// requested type id.
pub fn resolve_export(
    resolver: &dyn EntryPointResolver,
    entry_point: &str,
    type_id: &str,
    instance_id: &str,
) -> Result<Arc<dyn Plugin>, RuntimeError> {
    let exports = resolver.resolve(entry_point)?;
    exports
        .into_iter()
        .find(|plugin| plugin.id() == type_id)
        .ok_or_else(|| RuntimeError::SpawnFailed {
            instance_id: instance_id.to_owned(),
            message: format!("entry point '{entry_point}' exports no type '{type_id}'"),
        })
}

/// Runs one worker to completion.
///
/// Setup failures are logged and end the worker without a ready signal;
/// dropping the channels is what surfaces the crash to the host, which
/// fails any outstanding proxy calls. Teardown is driven by the downlink
/// serve loop.
pub fn run(
    plugin: &Arc<dyn Plugin>,
    bundle: &WorkerBundle,
    downlink: Box<dyn Channel>,
    uplink: Box<dyn Channel>,
    rpc_timeout: Duration,
) {
    let uplink: Arc<dyn Channel> = Arc::from(uplink);
    let uplink_client = UplinkClient::connect(uplink, rpc_timeout);

    let mut deps = Dependencies::new();
    for requirement in plugin.requirements() {
        let stub: Arc<dyn Service> = Arc::new(uplink_client.stub(requirement.name()));
        deps.insert(requirement.name(), stub);
    }

    let mut ctx = CaptureContext::new();
    debug!(
        target: HOST_TARGET,
        instance_id = bundle.instance_id(),
        type_id = bundle.type_id(),
        "running worker setup"
    );
    let outcome = match plugin.setup(
        &mut ctx,
        bundle.config().clone(),
        &deps,
        bundle.instance_id(),
    ) {
        Ok(outcome) => outcome,
        Err(error) => {
            warn!(
                target: HOST_TARGET,
                instance_id = bundle.instance_id(),
                %error,
                "worker setup failed; shutting down"
            );
            return;
        }
    };

    // A service registered through the context wins over a returned one.
    let service = match (ctx.into_captured(), outcome) {
        (Some(captured), _) => Some(captured),
        (None, SetupOutcome::Produced(produced)) => Some(produced),
        (None, SetupOutcome::Registered | SetupOutcome::NoService) => None,
    };

    if downlink
        .send(Frame::WorkerReady {
            instance_id: bundle.instance_id().to_owned(),
        })
        .is_err()
    {
        return;
    }

    serve(&*downlink, service.as_ref(), || {
        plugin.teardown(bundle.instance_id())
    });
    debug!(
        target: HOST_TARGET,
        instance_id = bundle.instance_id(),
        "worker serve loop ended"
    );
}
