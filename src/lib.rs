//! A small message-relay fabric: clients open a long-lived bidirectional
//! stream to a central server and exchange opaque content strings with other
//! connected peers. The server never stores messages; it routes each
//! submitted message to one currently connected peer chosen uniformly at
//! random, then forwards that peer's acknowledgment back to the original
//! sender.
//!
//! The core lives in three tightly coupled pieces: [`router`] (the
//! concurrent registry of peer sinks), [`usecases`] (Register/Relay/Ack/
//! Unregister composed over the router), and [`client::state_machine`] (the
//! client's send/react/retransmit loop). Everything else — the wire codec,
//! the server's session loop, CLI parsing, and the observability sidecar — is
//! glue around those three.

#![warn(missing_docs)]

pub mod client;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod router;
pub mod server;
pub mod sidecar;
pub mod sink;
pub mod usecases;
