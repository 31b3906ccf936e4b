//! Worker-side uplink client and per-requirement stubs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use tapestry_core::{Service, ServiceError};

use crate::channel::Channel;
use crate::error::RpcError;
use crate::frame::Frame;
use crate::pending::PendingCalls;

/// Tracing target for uplink client operations.
const UPLINK_TARGET: &str = "tapestry_rpc::uplink";

/// Issues dependency calls from a worker back to its host.
///
/// The uplink addresses services by *requirement name*; the host resolves
/// the name through the owning instance's wiring. Correlation ids and
/// timeouts follow the same discipline as the downlink. Cloning shares the
/// pending map and channel.
#[derive(Clone)]
pub struct UplinkClient {
    channel: Arc<dyn Channel>,
    pending: Arc<PendingCalls>,
    alive: Arc<AtomicBool>,
    timeout: Duration,
}

impl UplinkClient {
    /// Attaches a client to the worker end of an uplink channel.
    #[must_use]
    pub fn connect(channel: Arc<dyn Channel>, timeout: Duration) -> Self {
        let pending = Arc::new(PendingCalls::new());
        let alive = Arc::new(AtomicBool::new(true));

        let dispatch_channel = Arc::clone(&channel);
        let dispatch_pending = Arc::clone(&pending);
        let dispatch_alive = Arc::clone(&alive);
        thread::spawn(move || dispatch(&*dispatch_channel, &dispatch_pending, &dispatch_alive));

        Self {
            channel,
            pending,
            alive,
            timeout,
        }
    }

    /// Invokes `method` on the dependency wired under `service_name`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Timeout`] after the deadline,
    /// [`RpcError::Remote`] when the host answers with an error (missing
    /// wiring, unknown service, or a failure in the backing service), or
    /// [`RpcError::WorkerGone`] if the channel dies.
    pub fn call(
        &self,
        service_name: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RpcError> {
        if !self.alive.load(Ordering::Acquire) {
            return Err(RpcError::WorkerGone);
        }
        let (id, slot) = self.pending.register();
        // Re-check after registering so an entry never outlives a dead
        // dispatcher's drain.
        if !self.alive.load(Ordering::Acquire) {
            self.pending.discard(id);
            return Err(RpcError::WorkerGone);
        }
        debug!(target: UPLINK_TARGET, id, service_name, method, "sending uplink call");
        if let Err(error) = self.channel.send(Frame::UplinkCall {
            id,
            service_name: service_name.to_owned(),
            method: method.to_owned(),
            args,
        }) {
            self.pending.discard(id);
            return Err(error.into());
        }
        self.pending.await_reply(id, &slot, method, self.timeout)
    }

    /// Builds the stub handle for one requirement name.
    #[must_use]
    pub fn stub(&self, service_name: impl Into<String>) -> UplinkStub {
        UplinkStub {
            client: self.clone(),
            service_name: service_name.into(),
        }
    }
}

impl std::fmt::Debug for UplinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UplinkClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Routes incoming uplink replies until the channel closes.
fn dispatch(channel: &dyn Channel, pending: &PendingCalls, alive: &AtomicBool) {
    loop {
        match channel.recv() {
            Ok(Frame::UplinkResponse { id, result }) => {
                if !pending.complete(id, Ok(result)) {
                    debug!(target: UPLINK_TARGET, id, "dropping reply for unknown id");
                }
            }
            Ok(Frame::UplinkError { id, error }) => {
                if !pending.complete(id, Err(RpcError::Remote(error))) {
                    debug!(target: UPLINK_TARGET, id, "dropping error for unknown id");
                }
            }
            Ok(frame) => {
                debug!(target: UPLINK_TARGET, ?frame, "ignoring unexpected frame");
            }
            Err(_) => {
                alive.store(false, Ordering::Release);
                pending.fail_all(&RpcError::WorkerGone);
                break;
            }
        }
    }
}

/// A dependency handle forwarding every method to `UPLINK_CALL`.
///
/// One stub is built per requirement name at worker startup; together they
/// form the worker's `deps` set.
pub struct UplinkStub {
    client: UplinkClient,
    service_name: String,
}

impl UplinkStub {
    /// Returns the requirement name this stub forwards to.
    #[must_use]
    pub fn service_name(&self) -> &str {
        self.service_name.as_str()
    }
}

impl Service for UplinkStub {
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, ServiceError> {
        self.client
            .call(&self.service_name, method, args)
            .map_err(ServiceError::from)
    }
}
