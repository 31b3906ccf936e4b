//! Error types for engine operations.

use thiserror::Error;

use tapestry_core::{CoreError, ServiceError};
use tapestry_graph::GraphError;

/// Errors raised by the lifecycle engine.
///
/// Structural, config, wiring, and cycle errors are fatal to `start()`:
/// already-started instances are torn down in reverse before the error is
/// returned. Per-call RPC failures never appear here; they surface on the
/// individual caller.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A registration or lookup failed in one of the stores.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The wiring graph could not be resolved.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// An instance's config was rejected by its type's schema.
    #[error("invalid config for instance '{instance_id}': {reason}")]
    ConfigInvalid {
        /// The instance whose config failed validation.
        instance_id: String,
        /// The validator's description of the failure.
        reason: String,
    },

    /// An instance omits wiring for a requirement its type declares.
    #[error("instance '{instance_id}' is missing wiring for requirement '{requirement}'")]
    WiringMissing {
        /// The under-wired instance.
        instance_id: String,
        /// The requirement with no target.
        requirement: String,
    },

    /// The worker for an isolated instance could not be launched.
    #[error("failed to spawn worker for instance '{instance_id}': {message}")]
    SpawnFailed {
        /// The instance being spawned.
        instance_id: String,
        /// Description of the spawn failure.
        message: String,
    },

    /// A main-mode instance's setup hook failed.
    #[error("setup failed for instance '{instance_id}': {source}")]
    SetupFailed {
        /// The instance whose setup failed.
        instance_id: String,
        /// The failure reported by the hook.
        #[source]
        source: ServiceError,
    },

    /// No module is known under the requested entry point.
    #[error("unknown entry point '{entry_point}'")]
    UnknownEntryPoint {
        /// The locator that could not be resolved.
        entry_point: String,
    },

    /// An isolated instance references a type that declares no entry point.
    #[error("type '{type_id}' declares no entry point but instance '{instance_id}' runs isolated")]
    MissingEntryPoint {
        /// The isolated instance.
        instance_id: String,
        /// The type without an entry point.
        type_id: String,
    },
}
