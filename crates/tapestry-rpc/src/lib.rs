//! Correlation-id RPC over duplex message channels.
//!
//! This crate implements the bidirectional request/response protocol that
//! makes inter-plugin calls location-transparent. Two links share the same
//! discipline but carry different frames:
//!
//! - the **downlink** carries method calls from the host into a worker's
//!   service ([`DownlinkClient`] on the host, [`serve`] on the worker), plus
//!   the teardown handshake and the unsolicited `WORKER_READY` signal;
//! - the **uplink** carries dependency calls from a worker back to the host
//!   ([`UplinkClient`] and its per-requirement [`UplinkStub`]s on the
//!   worker; the host-side uplink server lives in the runtime crate because
//!   it needs the live service registry).
//!
//! Every outstanding request holds a fresh correlation id in a pending map
//! and is parked on a rendezvous channel. A per-endpoint dispatcher thread
//! routes incoming frames by id; expiry of the per-call timer removes the
//! pending entry and rejects the call, so the map never leaks. Responses on
//! a channel arrive in the order the remote produced them, but calls impose
//! no ordering on each other.
//!
//! The transport is abstract: anything implementing [`Channel`] works. The
//! in-process [`channel_pair`] backs worker threads; byte-oriented
//! transports can serialise [`Frame`] values, which carry exact wire field
//! names for interoperability.

mod channel;
mod client;
mod error;
mod frame;
mod pending;
mod server;
mod uplink;

pub use channel::{Channel, ChannelError, MessageChannel, channel_pair};
pub use client::{ClientEvent, DownlinkClient, RemoteService};
pub use error::RpcError;
pub use frame::Frame;
pub use server::serve;
pub use uplink::{UplinkClient, UplinkStub};
