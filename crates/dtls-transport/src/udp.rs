//! Tokio UDP socket implementation of [`Transport`] and [`OutboundTransport`].

use crate::transport::{OutboundTransport, Transport, TransportError, TransportResult};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// A bound UDP socket shared between the inbound receive loop and the
/// engine's outbound sends.
///
/// Cloning is cheap: it shares the same underlying socket via `Arc`, which
/// is what lets the same transport be handed to the engine as an
/// [`OutboundTransport`] while an application drives its own `recv_from`
/// loop on another clone.
#[derive(Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind a new UDP socket to `addr`.
    pub async fn bind(addr: SocketAddr) -> TransportResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| TransportError::BindFailed(e.to_string()))?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> TransportResult<usize> {
        Ok(self.socket.send_to(buf, addr).await?)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> TransportResult<(usize, SocketAddr)> {
        Ok(self.socket.recv_from(buf).await?)
    }

    fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl OutboundTransport for UdpTransport {
    fn send(&self, datagram: &[u8], peer: SocketAddr) {
        let socket = Arc::clone(&self.socket);
        let datagram = datagram.to_vec();
        tokio::spawn(async move {
            if let Err(e) = socket.send_to(&datagram, peer).await {
                tracing::debug!(%peer, error = %e, "dropped outbound datagram");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_receive_roundtrip() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b_addr = b.local_addr().unwrap();

        a.send_to(b"hello", b_addr).await.unwrap();

        let mut buf = [0u8; 16];
        let (n, from) = b.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(from, a.local_addr().unwrap());
    }

    #[tokio::test]
    async fn outbound_send_is_fire_and_forget() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b_addr = b.local_addr().unwrap();

        OutboundTransport::send(&a, b"ping", b_addr);

        let mut buf = [0u8; 16];
        let (n, _) = tokio::time::timeout(std::time::Duration::from_secs(1), b.recv_from(&mut buf))
            .await
            .expect("datagram should arrive")
            .unwrap();
        assert_eq!(&buf[..n], b"ping");
    }
}
