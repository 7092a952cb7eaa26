//! UDP datagram transport for the DTLS session engine.
//!
//! The session engine treats the transport as an external collaborator: a
//! simple, thread-safe send/receive interface. This crate provides the
//! [`OutboundTransport`] contract the engine drives outbound sends through,
//! plus a Tokio-based UDP implementation for running a real endpoint.

pub mod transport;
pub mod udp;

pub use transport::{OutboundTransport, Transport, TransportError, TransportResult};
pub use udp::UdpTransport;
