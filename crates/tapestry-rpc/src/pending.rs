//! Pending-call bookkeeping shared by the downlink and uplink clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use serde_json::Value;

use crate::error::RpcError;

/// The outcome delivered to a parked caller.
pub(crate) type CallReply = Result<Value, RpcError>;

/// Correlation-id mint plus the map of outstanding calls.
///
/// Ids are unique within the owning endpoint for the life of the process.
/// Every entry is removed exactly once: by the dispatcher on completion, by
/// the caller on timeout, or by `fail_all` when the channel dies.
pub(crate) struct PendingCalls {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, Sender<CallReply>>>,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Mints a fresh correlation id and parks a rendezvous slot for it.
    pub(crate) fn register(&self) -> (u64, Receiver<CallReply>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = bounded(1);
        self.lock().insert(id, tx);
        (id, rx)
    }

    /// Delivers a reply to the caller parked under `id`.
    ///
    /// Returns `false` when the id is unknown (already timed out or never
    /// issued); such replies are dropped.
    pub(crate) fn complete(&self, id: u64, reply: CallReply) -> bool {
        let Some(tx) = self.lock().remove(&id) else {
            return false;
        };
        // The caller may have given up between removal and delivery; a
        // failed send is equivalent to a dropped reply.
        let _ = tx.send(reply);
        true
    }

    /// Removes an entry without delivering anything.
    pub(crate) fn discard(&self, id: u64) {
        self.lock().remove(&id);
    }

    /// Fails every outstanding call with the given error.
    pub(crate) fn fail_all(&self, error: &RpcError) {
        let entries: Vec<Sender<CallReply>> = {
            let mut map = self.lock();
            map.drain().map(|(_, tx)| tx).collect()
        };
        for tx in entries {
            let _ = tx.send(Err(error.clone()));
        }
    }

    /// Blocks on the rendezvous slot, enforcing the per-call deadline.
    ///
    /// On expiry the pending entry is removed before returning, so a late
    /// reply finds no receiver and is dropped by the dispatcher.
    pub(crate) fn await_reply(
        &self,
        id: u64,
        slot: &Receiver<CallReply>,
        method: &str,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        match slot.recv_timeout(timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => {
                self.discard(id);
                Err(RpcError::Timeout {
                    method: method.to_owned(),
                    timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(RpcError::WorkerGone),
        }
    }

    /// Number of outstanding calls.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Sender<CallReply>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
