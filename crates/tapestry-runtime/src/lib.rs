//! Lifecycle engine for the Tapestry plugin orchestration runtime.
//!
//! The [`Orchestrator`] is the process-facing surface: register plugin types
//! and instances, then `start()` brings the graph up in dependency order and
//! `stop()` brings it down in reverse. Each instance runs either in-process
//! (its service lands directly in the registry) or on an isolated worker
//! (the registry holds an RPC proxy and a per-worker uplink server answers
//! the worker's dependency calls).
//!
//! Worker execution is abstracted behind [`WorkerSpawner`]; the crate ships
//! [`ThreadSpawner`], which runs the worker host program on an OS thread
//! over in-process channels and resolves entry points through a
//! [`ModuleCatalog`]. Subprocess transports implement the same traits.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tapestry_runtime::{ModuleCatalog, Orchestrator, StartOptions, StopOptions, ThreadSpawner};
//!
//! let catalog = Arc::new(ModuleCatalog::new());
//! let spawner = Arc::new(ThreadSpawner::new(catalog));
//! let mut engine = Orchestrator::new(spawner);
//! // engine.register_definition(...); engine.register_plugin(...);
//! engine.start(StartOptions::default())?;
//! engine.stop(StopOptions::default());
//! # Ok::<(), tapestry_runtime::RuntimeError>(())
//! ```

mod config;
mod context;
mod engine;
mod error;
mod shutdown;
mod startup;
mod uplink_server;
mod worker;
pub mod worker_host;

pub use config::EngineConfig;
pub use context::{CaptureContext, RegistryContext};
pub use engine::{Orchestrator, StartOptions, StopOptions};
pub use error::RuntimeError;
pub use worker::{
    ThreadSpawner, WorkerBundle, WorkerHandle, WorkerRecord, WorkerSpawner, WorkerState,
};
pub use worker_host::{EntryPointResolver, ModuleCatalog};
