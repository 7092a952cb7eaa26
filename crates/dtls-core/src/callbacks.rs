//! Lifecycle Callbacks contract (spec §6): purely observational hooks the
//! engine fires as sessions move through their lifecycle. Never affects
//! engine behavior. See `tracing` call sites throughout `engine.rs` for the
//! operator-facing half of the same events.

use std::net::SocketAddr;
use std::time::SystemTime;

use crate::error::CryptoError;

/// Why a handshake ended, passed to [`LifecycleCallbacks::handshake_finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeReason {
    /// The handshake completed and the session is now `Established`.
    Succeeded,
    /// The crypto adapter reported a fatal error (including
    /// `HelloVerifyRequired`, which callers should not treat as alarming).
    Failed,
    /// The handshake's expiry timer fired before completion.
    Expired,
}

/// Why a session ended, passed to [`LifecycleCallbacks::session_finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionReason {
    /// The peer sent `close_notify`.
    Closed,
    /// A decrypt or encrypt call failed fatally.
    Failed,
    /// The idle timer fired with no inbound traffic for `expire_after`.
    Expired,
}

/// Observational hooks fired by [`crate::engine::SessionEngine`]. All
/// methods default to doing nothing, so callers override only what they
/// need, e.g. a caller that only cares about metrics overrides
/// `session_finished` and leaves the rest no-op.
pub trait LifecycleCallbacks: Send + Sync {
    /// A new `Handshaking` state was created for `addr`.
    fn handshake_started(&self, addr: SocketAddr) {
        let _ = addr;
    }

    /// A handshake for `addr` ended, one way or another.
    fn handshake_finished(
        &self,
        addr: SocketAddr,
        start: SystemTime,
        finish: SystemTime,
        reason: HandshakeReason,
        err: Option<&CryptoError>,
    ) {
        let _ = (addr, start, finish, reason, err);
    }

    /// A session for `addr` became `Established`, either via a completed
    /// handshake or [`crate::engine::SessionEngine::load_session`].
    fn session_started(&self, addr: SocketAddr, cipher_suite: &str, reloaded: bool) {
        let _ = (addr, cipher_suite, reloaded);
    }

    /// An `Established` session for `addr` ended.
    fn session_finished(&self, addr: SocketAddr, reason: SessionReason, err: Option<&CryptoError>) {
        let _ = (addr, reason, err);
    }

    /// A single inbound datagram was dropped without being processed into
    /// application data (load failure, decrypt/encrypt failure).
    fn message_dropped(&self, addr: SocketAddr) {
        let _ = addr;
    }
}

/// Default [`LifecycleCallbacks`] impl: logs every event through `tracing`
/// and nothing else. Wired in when a caller doesn't supply its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLifecycleCallbacks;

impl LifecycleCallbacks for TracingLifecycleCallbacks {
    fn handshake_started(&self, addr: SocketAddr) {
        tracing::debug!(%addr, "handshake started");
    }

    fn handshake_finished(
        &self,
        addr: SocketAddr,
        start: SystemTime,
        finish: SystemTime,
        reason: HandshakeReason,
        err: Option<&CryptoError>,
    ) {
        let elapsed = finish.duration_since(start).unwrap_or_default();
        match reason {
            HandshakeReason::Succeeded => {
                tracing::info!(%addr, ?elapsed, "handshake succeeded");
            }
            HandshakeReason::Failed => {
                tracing::debug!(%addr, ?elapsed, error = ?err, "handshake failed");
            }
            HandshakeReason::Expired => {
                tracing::debug!(%addr, ?elapsed, "handshake expired");
            }
        }
    }

    fn session_started(&self, addr: SocketAddr, cipher_suite: &str, reloaded: bool) {
        tracing::info!(%addr, cipher_suite, reloaded, "session started");
    }

    fn session_finished(&self, addr: SocketAddr, reason: SessionReason, err: Option<&CryptoError>) {
        match reason {
            SessionReason::Closed => tracing::debug!(%addr, "session closed"),
            SessionReason::Failed => tracing::warn!(%addr, error = ?err, "session failed"),
            SessionReason::Expired => tracing::debug!(%addr, "session expired"),
        }
    }

    fn message_dropped(&self, addr: SocketAddr) {
        tracing::trace!(%addr, "message dropped");
    }
}
