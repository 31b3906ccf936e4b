//! Host-side downlink client and the proxy it backs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde_json::Value;
use tracing::{debug, warn};

use tapestry_core::{Service, ServiceError};

use crate::channel::Channel;
use crate::error::RpcError;
use crate::frame::Frame;
use crate::pending::PendingCalls;

/// Tracing target for downlink client operations.
const CLIENT_TARGET: &str = "tapestry_rpc::client";

/// Out-of-band notifications from a worker's downlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The worker finished setup and is serving calls.
    Ready {
        /// The instance the worker is running.
        instance_id: String,
    },
    /// The channel closed; every outstanding call has been failed.
    Disconnected,
}

/// Issues correlated calls into a worker over the downlink channel.
///
/// `connect` starts a dispatcher thread that routes `RESPONSE`, `ERROR`, and
/// `TEARDOWN_COMPLETE` frames to their pending calls, forwards
/// `WORKER_READY` and channel closure as [`ClientEvent`]s, and fails every
/// outstanding call with [`RpcError::WorkerGone`] when the channel dies.
///
/// Cloning is cheap; clones share the pending map and the channel.
#[derive(Clone)]
pub struct DownlinkClient {
    channel: Arc<dyn Channel>,
    pending: Arc<PendingCalls>,
    alive: Arc<AtomicBool>,
    timeout: Duration,
}

impl DownlinkClient {
    /// Attaches a client to the host end of a downlink channel.
    ///
    /// Returns the client and the receiver for out-of-band events.
    #[must_use]
    pub fn connect(channel: Arc<dyn Channel>, timeout: Duration) -> (Self, Receiver<ClientEvent>) {
        let pending = Arc::new(PendingCalls::new());
        let alive = Arc::new(AtomicBool::new(true));
        let (events_tx, events_rx) = unbounded();

        let dispatch_channel = Arc::clone(&channel);
        let dispatch_pending = Arc::clone(&pending);
        let dispatch_alive = Arc::clone(&alive);
        thread::spawn(move || {
            dispatch(
                &*dispatch_channel,
                &dispatch_pending,
                &dispatch_alive,
                &events_tx,
            );
        });

        (
            Self {
                channel,
                pending,
                alive,
                timeout,
            },
            events_rx,
        )
    }

    /// Invokes `method` on the worker's service.
    ///
    /// Calls issued before the worker signals readiness queue in the channel
    /// and complete once the worker starts serving.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Timeout`] after the configured deadline,
    /// [`RpcError::Remote`] for a worker-side failure, or
    /// [`RpcError::WorkerGone`] if the channel dies while the call is
    /// outstanding.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        if !self.alive.load(Ordering::Acquire) {
            return Err(RpcError::WorkerGone);
        }
        let (id, slot) = self.pending.register();
        // Re-check after registering: a dispatcher that died in between has
        // already drained the map, and this entry would otherwise leak.
        if !self.alive.load(Ordering::Acquire) {
            self.pending.discard(id);
            return Err(RpcError::WorkerGone);
        }
        debug!(target: CLIENT_TARGET, id, method, "sending call");
        if let Err(error) = self.channel.send(Frame::Call {
            id,
            method: method.to_owned(),
            args,
        }) {
            self.pending.discard(id);
            return Err(error.into());
        }
        self.pending.await_reply(id, &slot, method, self.timeout)
    }

    /// Performs the cooperative teardown handshake.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Timeout`] if the worker does not complete within
    /// `timeout` (callers escalate to forced termination), or
    /// [`RpcError::Remote`] when the worker's teardown hook failed.
    pub fn teardown(&self, timeout: Duration) -> Result<(), RpcError> {
        if !self.alive.load(Ordering::Acquire) {
            return Err(RpcError::WorkerGone);
        }
        let (id, slot) = self.pending.register();
        debug!(target: CLIENT_TARGET, id, "sending teardown");
        if let Err(error) = self.channel.send(Frame::Teardown { id }) {
            self.pending.discard(id);
            return Err(error.into());
        }
        self.pending
            .await_reply(id, &slot, "teardown", timeout)
            .map(|_| ())
    }

    /// Returns the per-call deadline.
    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        self.timeout
    }

    #[cfg(test)]
    pub(crate) fn outstanding(&self) -> usize {
        self.pending.len()
    }
}

impl std::fmt::Debug for DownlinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownlinkClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Routes incoming downlink frames until the channel closes.
fn dispatch(
    channel: &dyn Channel,
    pending: &PendingCalls,
    alive: &AtomicBool,
    events: &Sender<ClientEvent>,
) {
    loop {
        match channel.recv() {
            Ok(Frame::Response { id, result }) => {
                if !pending.complete(id, Ok(result)) {
                    debug!(target: CLIENT_TARGET, id, "dropping response for unknown id");
                }
            }
            Ok(Frame::Error { id, error }) => {
                if !pending.complete(id, Err(RpcError::Remote(error))) {
                    debug!(target: CLIENT_TARGET, id, "dropping error for unknown id");
                }
            }
            Ok(Frame::TeardownComplete { id, error }) => {
                let reply = match error {
                    None => Ok(Value::Null),
                    Some(error) => Err(RpcError::Remote(error)),
                };
                pending.complete(id, reply);
            }
            Ok(Frame::WorkerReady { instance_id }) => {
                debug!(target: CLIENT_TARGET, %instance_id, "worker ready");
                let _ = events.send(ClientEvent::Ready { instance_id });
            }
            Ok(frame) => {
                debug!(target: CLIENT_TARGET, ?frame, "ignoring unexpected frame");
            }
            Err(_) => {
                warn!(target: CLIENT_TARGET, "downlink closed; failing outstanding calls");
                // Publish death before draining so late registrations either
                // land in the drain or observe the flag.
                alive.store(false, Ordering::Release);
                pending.fail_all(&RpcError::WorkerGone);
                let _ = events.send(ClientEvent::Disconnected);
                break;
            }
        }
    }
}

/// A `Service` backed by RPC into a worker.
///
/// This is the ghost object the engine registers in place of the worker's
/// real service: every method call becomes a `CALL` frame and blocks on the
/// correlated reply.
pub struct RemoteService {
    client: DownlinkClient,
}

impl RemoteService {
    /// Wraps a downlink client as a service proxy.
    #[must_use]
    pub const fn new(client: DownlinkClient) -> Self {
        Self { client }
    }
}

impl Service for RemoteService {
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, ServiceError> {
        self.client.call(method, args).map_err(ServiceError::from)
    }
}
