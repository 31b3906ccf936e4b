//! Error types for RPC calls.

use std::time::Duration;

use thiserror::Error;

use tapestry_core::ServiceError;

use crate::channel::ChannelError;

/// Errors surfaced to RPC callers.
///
/// Per-call errors do not tear the system down; they are returned to the
/// caller and the endpoint keeps serving other correlation ids.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    /// The call exceeded its deadline. The pending entry has been removed.
    #[error("call '{method}' timed out after {timeout:?}")]
    Timeout {
        /// The method that was being invoked.
        method: String,
        /// The deadline that expired.
        timeout: Duration,
    },

    /// The remote side answered with an error; the payload preserves the
    /// original `{name, message, stack}`.
    #[error("remote error: {0}")]
    Remote(ServiceError),

    /// The remote endpoint disappeared while the call was outstanding.
    #[error("remote endpoint is gone")]
    WorkerGone,

    /// The underlying channel refused the operation.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl From<RpcError> for ServiceError {
    /// Flattens an RPC failure into the uniform service error shape so
    /// proxies can satisfy the `Service` trait. Remote errors pass through
    /// untouched to preserve reconstruction fidelity.
    fn from(error: RpcError) -> Self {
        match error {
            RpcError::Remote(remote) => remote,
            RpcError::Timeout { .. } => ServiceError::new("RpcTimeout", error.to_string()),
            RpcError::WorkerGone => {
                ServiceError::new("WorkerGone", "the endpoint backing this call is gone")
            }
            RpcError::Channel(channel) => ServiceError::new("ChannelClosed", channel.to_string()),
        }
    }
}
