//! Worker spawning, records, and the per-worker state machine.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use serde_json::Value;
use tracing::warn;

use tapestry_rpc::{Channel, ClientEvent, DownlinkClient};

use crate::config::DEFAULT_RPC_TIMEOUT;
use crate::error::RuntimeError;
use crate::worker_host::{self, EntryPointResolver};

/// Tracing target for worker lifecycle operations.
const WORKER_TARGET: &str = "tapestry_runtime::worker";

/// The parameter bundle handed to a worker host at spawn time.
///
/// The config value has already passed schema validation on the host.
#[derive(Debug, Clone)]
pub struct WorkerBundle {
    instance_id: String,
    type_id: String,
    entry_point: String,
    config: Value,
}

impl WorkerBundle {
    /// Creates a bundle for one isolated instance.
    #[must_use]
    pub fn new(
        instance_id: impl Into<String>,
        type_id: impl Into<String>,
        entry_point: impl Into<String>,
        config: Value,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            type_id: type_id.into(),
            entry_point: entry_point.into(),
            config,
        }
    }

    /// Returns the instance id the worker will run.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        self.instance_id.as_str()
    }

    /// Returns the plugin type id to locate among the entry point's exports.
    #[must_use]
    pub fn type_id(&self) -> &str {
        self.type_id.as_str()
    }

    /// Returns the entry-point locator.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        self.entry_point.as_str()
    }

    /// Returns the validated config value.
    #[must_use]
    pub const fn config(&self) -> &Value {
        &self.config
    }
}

/// Launches worker hosts with a parameter bundle and two attached channels.
///
/// `downlink` and `uplink` are the worker-side channel ends; ownership
/// transfers to the worker. The returned handle must be able to forcibly
/// terminate whatever was launched.
#[cfg_attr(test, mockall::automock)]
pub trait WorkerSpawner: Send + Sync {
    /// Launches a worker host.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SpawnFailed`] (or
    /// [`RuntimeError::UnknownEntryPoint`]) when the worker cannot be
    /// launched; spawn failures abort engine startup.
    fn spawn(
        &self,
        bundle: WorkerBundle,
        downlink: Box<dyn Channel>,
        uplink: Box<dyn Channel>,
    ) -> Result<Box<dyn WorkerHandle>, RuntimeError>;
}

/// A handle capable of forcibly terminating a launched worker.
pub trait WorkerHandle: Send {
    /// Forcibly terminates the worker. Must be safe to call more than once.
    fn terminate(&mut self);
}

/// Lifecycle states of a worker record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Spawned; `WORKER_READY` not yet observed.
    Spawning,
    /// Setup finished; the worker is serving calls.
    Ready,
    /// A `TEARDOWN` request has been sent.
    TearingDown,
    /// The worker is gone: torn down, killed, or crashed.
    Terminated,
}

impl WorkerState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spawning => "spawning",
            Self::Ready => "ready",
            Self::TearingDown => "tearing_down",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime record for one live worker.
///
/// Holds the host ends of both channels so forced termination can release
/// them, the downlink client used for calls and the teardown handshake, and
/// the event stream that carries readiness and disconnection.
pub struct WorkerRecord {
    instance_id: String,
    client: DownlinkClient,
    events: Receiver<ClientEvent>,
    downlink: Arc<dyn Channel>,
    uplink: Arc<dyn Channel>,
    handle: Box<dyn WorkerHandle>,
    state: WorkerState,
}

impl WorkerRecord {
    pub(crate) fn new(
        instance_id: impl Into<String>,
        client: DownlinkClient,
        events: Receiver<ClientEvent>,
        downlink: Arc<dyn Channel>,
        uplink: Arc<dyn Channel>,
        handle: Box<dyn WorkerHandle>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            client,
            events,
            downlink,
            uplink,
            handle,
            state: WorkerState::Spawning,
        }
    }

    /// Returns the instance this worker runs.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        self.instance_id.as_str()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> WorkerState {
        self.state
    }

    pub(crate) const fn client(&self) -> &DownlinkClient {
        &self.client
    }

    /// Applies any queued downlink events to the state machine.
    pub(crate) fn refresh_state(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                ClientEvent::Ready { .. } => {
                    if self.state == WorkerState::Spawning {
                        self.state = WorkerState::Ready;
                    }
                }
                ClientEvent::Disconnected => self.state = WorkerState::Terminated,
            }
        }
    }

    pub(crate) fn begin_teardown(&mut self) {
        self.state = WorkerState::TearingDown;
    }

    /// Hard-terminates the worker: releases both channels, kills the
    /// underlying execution, and marks the record terminated.
    pub(crate) fn force_terminate(&mut self) {
        self.downlink.close();
        self.uplink.close();
        self.handle.terminate();
        self.state = WorkerState::Terminated;
    }
}

impl fmt::Debug for WorkerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRecord")
            .field("instance_id", &self.instance_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Spawner that runs worker hosts on OS threads over in-process channels.
///
/// Entry points are resolved through the catalog *before* the thread is
/// launched, so unresolvable workers fail startup synchronously.
pub struct ThreadSpawner {
    resolver: Arc<dyn EntryPointResolver>,
    rpc_timeout: std::time::Duration,
}

impl ThreadSpawner {
    /// Creates a spawner resolving entry points through `resolver`.
    #[must_use]
    pub fn new(resolver: Arc<dyn EntryPointResolver>) -> Self {
        Self {
            resolver,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    /// Overrides the uplink call deadline used by spawned workers.
    #[must_use]
    pub const fn with_rpc_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }
}

impl WorkerSpawner for ThreadSpawner {
    fn spawn(
        &self,
        bundle: WorkerBundle,
        downlink: Box<dyn Channel>,
        uplink: Box<dyn Channel>,
    ) -> Result<Box<dyn WorkerHandle>, RuntimeError> {
        let plugin = worker_host::resolve_export(
            self.resolver.as_ref(),
            bundle.entry_point(),
            bundle.type_id(),
            bundle.instance_id(),
        )?;

        let instance_id = bundle.instance_id().to_owned();
        let rpc_timeout = self.rpc_timeout;
        let thread = thread::Builder::new()
            .name(format!("worker-{instance_id}"))
            .spawn(move || worker_host::run(&plugin, &bundle, downlink, uplink, rpc_timeout))
            .map_err(|error| RuntimeError::SpawnFailed {
                instance_id,
                message: error.to_string(),
            })?;

        Ok(Box::new(ThreadWorkerHandle {
            thread: Some(thread),
        }))
    }
}

/// Handle for a thread-backed worker.
struct ThreadWorkerHandle {
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle for ThreadWorkerHandle {
    fn terminate(&mut self) {
        // OS threads cannot be killed. The engine has already closed both
        // channel ends, which ends the serve loop; detaching here keeps a
        // stuck teardown from ever blocking `stop`.
        if let Some(thread) = self.thread.take() {
            if thread.is_finished() {
                let _ = thread.join();
            } else {
                warn!(
                    target: WORKER_TARGET,
                    "worker thread still running at termination; detaching"
                );
            }
        }
    }
}
