//! The Crypto Adapter contract (spec §6): the sole seam between the session
//! engine and an actual DTLS primitive.
//!
//! The engine never hard-codes a particular DTLS library. A compliant
//! mbedTLS/openssl-backed implementation is expected in a real deployment;
//! this crate ships only a `test-util`-gated in-memory mock (see
//! [`crate::mock`]) used by its own test suite and the workspace's
//! `tests` crate.

use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

use crate::cid::Cid;
use crate::error::CryptoError;

/// Which end of the handshake this engine instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Initiates the handshake (sends `ClientHello`).
    Client,
    /// Responds to the handshake, may demand a `HelloVerifyRequest` cookie.
    Server,
}

/// Outcome of [`HandshakeContext::step`].
pub enum HandshakeOutcome<E> {
    /// The handshake has not yet completed; the context should be retained
    /// and its `read_timeout` used to schedule the next retransmit/expiry.
    Pending,
    /// The handshake completed; the caller replaces the `Handshaking` state
    /// with an `Established` one built from the returned context.
    Completed(E),
}

/// A handshake in progress for one peer.
///
/// Produced by [`CryptoAdapter::new_context`]. Consumed (by value) on
/// completion or on removal, mirroring the fact that a finished or aborted
/// handshake context does not survive the transition.
pub trait HandshakeContext {
    /// The adapter's established-session context type this handshake
    /// produces on completion.
    type Established: EstablishedContext;

    /// Drive the handshake state machine with an inbound datagram (or an
    /// empty slice, for a self-triggered retransmit). `send` is invoked zero
    /// or more times with outbound datagrams the primitive wants delivered
    /// (flight retransmits, `HelloVerifyRequest`, alerts) before `step`
    /// returns.
    fn step(
        &mut self,
        datagram: &[u8],
        send: &mut dyn FnMut(&[u8]),
    ) -> Result<HandshakeOutcome<Self::Established>, CryptoError>;

    /// How long to wait before re-entering `step` with an empty datagram to
    /// drive a DTLS flight retransmit. Zero means "no retransmit is due
    /// right now"; the engine falls back to `expire_after` in that case.
    fn read_timeout(&self) -> Duration;

    /// When this handshake attempt began.
    fn start_timestamp(&self) -> SystemTime;

    /// Release any resources held by the underlying primitive without
    /// producing a session (fatal error, expiry, or `close_all`).
    fn close(self);
}

/// An established, post-handshake session for one peer.
///
/// Produced either by [`HandshakeContext::step`] completing, or by
/// [`CryptoAdapter::load_session`] resurrecting a persisted one.
pub trait EstablishedContext {
    /// Decrypt one inbound record. `send` lets the primitive emit alerts
    /// (e.g. in response to a malformed record) without the engine needing
    /// to understand the alert protocol. Returns the decrypted application
    /// plaintext, which is empty for records that carry no application data
    /// (handshake-layer housekeeping post-establishment, heartbeats, etc).
    fn decrypt(
        &mut self,
        datagram: &[u8],
        send: &mut dyn FnMut(&[u8]),
    ) -> Result<Vec<u8>, CryptoError>;

    /// Encrypt one outbound application record.
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Serialize this session to an opaque blob suitable for
    /// [`CryptoAdapter::load_session`], and release the primitive's
    /// resources. Called exactly once, as the last step of store-and-close.
    fn save_and_close(self) -> Vec<u8>;

    /// Release the primitive's resources without persisting anything
    /// (own-CID empty, or a plain close_notify/close_all with nothing to
    /// store).
    fn close(self);

    /// This session's own Connection ID, if CID is enabled and one was
    /// negotiated.
    fn own_cid(&self) -> Option<&[u8]>;

    /// The peer's Connection ID, if CID is enabled and one was negotiated.
    fn peer_cid(&self) -> Option<&[u8]>;

    /// The negotiated cipher suite, for lifecycle reporting.
    fn cipher_suite(&self) -> &str;

    /// The peer's certificate subject, if certificate-based auth is in use
    /// (PSK deployments leave this `None`).
    fn peer_certificate_subject(&self) -> Option<&str>;

    /// True if this context was produced by [`CryptoAdapter::load_session`]
    /// rather than a fresh handshake.
    fn reloaded(&self) -> bool;
}

/// The engine's sole dependency on an actual DTLS implementation.
///
/// `Handshake` and `Established` are associated types rather than `dyn`
/// trait objects so a real backend monomorphizes without an extra layer of
/// indirection per record; `SessionEngine<A>` is generic over exactly this
/// trait (see `dtls-core::engine`).
pub trait CryptoAdapter {
    /// Handshake-context type this adapter produces.
    type Handshake: HandshakeContext<Established = Self::Established>;
    /// Established-context type this adapter produces.
    type Established: EstablishedContext;

    /// Fixed CID length for every context this adapter produces, or `0` if
    /// CID is disabled. Derived once at engine construction time from the
    /// configured CID supplier (spec §6: "used once at startup to determine
    /// `cidSize`").
    fn cid_size(&self) -> usize;

    /// Which role (client/server) this adapter was configured for.
    fn role(&self) -> Role;

    /// Begin a fresh handshake for a newly-seen peer address.
    fn new_context(&self, addr: SocketAddr) -> Self::Handshake;

    /// Reconstruct an established session from a persisted blob, as part of
    /// [`crate::engine::SessionEngine::load_session`].
    fn load_session(
        &self,
        cid: &[u8],
        blob: &[u8],
        addr: SocketAddr,
    ) -> Result<Self::Established, CryptoError>;

    /// Extract the CID from a datagram that appears to carry one, without
    /// fully parsing or decrypting it. Returns `None` if `datagram` isn't
    /// recognizable as a CID-carrying record, or CID is disabled
    /// (`cid_size == 0`).
    fn peek_cid(&self, cid_size: usize, datagram: &[u8]) -> Option<Cid>;
}
