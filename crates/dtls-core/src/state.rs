//! Per-peer state (spec §3): a tagged variant instead of the source's
//! abstract-class-with-two-subclasses split (spec §9 "tagged state instead
//! of inheritance"). Shared behavior (timer bookkeeping) lives as plain
//! methods on the enum rather than a shared base type.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::SystemTime;

use crate::timer::TimerId;

/// A handshake in progress for one peer.
pub struct HandshakingState<H> {
    /// The crypto adapter's handshake context.
    pub ctx: H,
    /// The peer's address (redundant with the table key, kept so a state
    /// can be inspected without the key in hand, e.g. from a timer event).
    pub addr: SocketAddr,
    /// The single outstanding timer for this state (retransmit or expiry).
    pub timer: TimerId,
    /// When this handshake attempt began.
    pub start: SystemTime,
}

/// An established, post-handshake session for one peer.
pub struct EstablishedState<E> {
    /// The crypto adapter's established context.
    pub ctx: E,
    /// The peer's address.
    pub addr: SocketAddr,
    /// The single outstanding idle-expiration timer.
    pub timer: TimerId,
    /// Application-level key/value annotations, mutable only while
    /// `Established` (spec §3 invariant).
    pub auth_context: HashMap<String, String>,
    /// When this session was established.
    pub start: SystemTime,
    /// Read-through snapshot of the context's own-CID at the time it was
    /// last observed, kept so the table doesn't need to call back into the
    /// crypto context just to answer "what's this peer's CID" for routing
    /// diagnostics.
    pub own_cid: Vec<u8>,
    /// Read-through snapshot of the peer's CID.
    pub peer_cid: Vec<u8>,
    /// Read-through snapshot of the negotiated cipher suite.
    pub cipher_suite: String,
}

/// Per-peer state, keyed by address in the session table. At most one
/// exists per peer address (spec §3 invariant); exactly one timer is
/// pending at a time for whichever variant is current.
pub enum PeerState<H, E> {
    /// Handshake not yet complete.
    Handshaking(HandshakingState<H>),
    /// Post-handshake session, decrypting/encrypting application data.
    Established(EstablishedState<E>),
}

impl<H, E> PeerState<H, E> {
    /// The single timer currently pending for this state.
    pub fn timer(&self) -> TimerId {
        match self {
            PeerState::Handshaking(s) => s.timer,
            PeerState::Established(s) => s.timer,
        }
    }

    /// The peer address this state belongs to.
    pub fn addr(&self) -> SocketAddr {
        match self {
            PeerState::Handshaking(s) => s.addr,
            PeerState::Established(s) => s.addr,
        }
    }
}
