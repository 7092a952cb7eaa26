//! Transport trait abstraction over the UDP datagram layer.
//!
//! The DTLS session engine (`dtls-core`) never opens a socket itself; it is
//! handed an [`OutboundTransport`] for fire-and-forget sends (including
//! sends the crypto adapter makes mid-handshake, such as alerts and
//! retransmits) and, separately, a full [`Transport`] for the inbound
//! receive loop an application wires up around the engine.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;

/// Transport layer errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// I/O error from the underlying socket.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The transport has been shut down.
    #[error("transport is closed")]
    Closed,

    /// Binding the local address failed.
    #[error("failed to bind to address: {0}")]
    BindFailed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Fire-and-forget outbound sink, injected into the session engine.
///
/// Per the engine's single-operation contract: `send` never blocks the
/// caller on delivery and must be safe to call from any thread, since the
/// crypto adapter may invoke it synchronously while driving a handshake
/// step or a decrypt call (to emit an alert).
pub trait OutboundTransport: Send + Sync {
    /// Send `datagram` to `peer`, without waiting for delivery.
    fn send(&self, datagram: &[u8], peer: SocketAddr);
}

/// Full async transport used to drive the inbound receive loop.
///
/// This is the "external collaborator" named in the engine's scope: the
/// engine consumes only [`OutboundTransport`]; an application wires a
/// `Transport` impl's `recv_from` loop to `SessionEngine::handle_inbound`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `buf` to `addr`, returning the number of bytes sent.
    async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> TransportResult<usize>;

    /// Receive a single datagram into `buf`, returning its length and source.
    async fn recv_from(&self, buf: &mut [u8]) -> TransportResult<(usize, SocketAddr)>;

    /// The local address this transport is bound to.
    fn local_addr(&self) -> TransportResult<SocketAddr>;
}
