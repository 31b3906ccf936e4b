//! The duplex channel abstraction and its in-process implementation.
//!
//! A [`Channel`] is one end of a duplex link carrying [`Frame`] values. The
//! protocol layers are written against the trait so the transport can be OS
//! threads (the [`channel_pair`] implementation here), subprocess pipes, or
//! sockets. Closing either end closes the pair: blocked `recv` calls on
//! both sides return [`ChannelError::Closed`].
//!
//! Message queues are unbounded; the protocol applies no backpressure.

use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use thiserror::Error;

use crate::frame::Frame;

/// Errors raised by channel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The channel has been closed, locally or by the peer.
    #[error("channel is closed")]
    Closed,
}

/// One end of a duplex frame channel.
pub trait Channel: Send + Sync {
    /// Enqueues a frame for the peer.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the channel has been closed.
    fn send(&self, frame: Frame) -> Result<(), ChannelError>;

    /// Blocks until a frame arrives from the peer.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] once the channel is closed and no
    /// frame is available.
    fn recv(&self) -> Result<Frame, ChannelError>;

    /// Closes the channel, unblocking `recv` on both ends.
    fn close(&self);
}

/// In-process channel end backed by unbounded crossbeam queues.
///
/// Produced in pairs by [`channel_pair`]; each end is owned exclusively by
/// its side after the transfer to the worker.
pub struct MessageChannel {
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
    closed: Receiver<()>,
    close_guard: Arc<Mutex<Option<Sender<()>>>>,
}

/// Creates a connected pair of in-process channel ends.
///
/// # Example
///
/// ```
/// use tapestry_rpc::{Channel, Frame, channel_pair};
///
/// let (host_end, worker_end) = channel_pair();
/// host_end.send(Frame::Teardown { id: 1 }).expect("send");
/// let frame = worker_end.recv().expect("recv");
/// assert!(matches!(frame, Frame::Teardown { id: 1 }));
/// ```
#[must_use]
pub fn channel_pair() -> (MessageChannel, MessageChannel) {
    let (a_tx, a_rx) = unbounded();
    let (b_tx, b_rx) = unbounded();
    // A single guard sender shared by both ends: dropping it disconnects the
    // cloned `closed` receivers, waking any blocked recv on either side.
    let (close_tx, close_rx) = crossbeam_channel::bounded::<()>(0);
    let close_guard = Arc::new(Mutex::new(Some(close_tx)));

    let left = MessageChannel {
        tx: a_tx,
        rx: b_rx,
        closed: close_rx.clone(),
        close_guard: Arc::clone(&close_guard),
    };
    let right = MessageChannel {
        tx: b_tx,
        rx: a_rx,
        closed: close_rx,
        close_guard,
    };
    (left, right)
}

impl MessageChannel {
    fn is_closed(&self) -> bool {
        self.close_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Channel for MessageChannel {
    fn send(&self, frame: Frame) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.tx.send(frame).map_err(|_| ChannelError::Closed)
    }

    fn recv(&self) -> Result<Frame, ChannelError> {
        select! {
            recv(self.rx) -> frame => frame.map_err(|_| ChannelError::Closed),
            recv(self.closed) -> _ => Err(ChannelError::Closed),
        }
    }

    fn close(&self) {
        self.close_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl std::fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("closed", &self.is_closed())
            .finish()
    }
}
