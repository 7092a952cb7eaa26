//! Session Table (spec §3, §4.1): peer-address to per-peer-state map, plus
//! the CID-extraction helper used to classify inbound datagrams that don't
//! match an existing entry.

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::cid::Cid;
use crate::crypto::CryptoAdapter;
use crate::state::PeerState;

/// The session table proper: exactly one [`PeerState`] per peer address
/// (spec §3 invariant 1), owned exclusively by the engine and never locked
/// (spec §5: confinement, not mutual exclusion).
pub struct SessionTable<H, E> {
    sessions: HashMap<SocketAddr, PeerState<H, E>>,
}

impl<H, E> Default for SessionTable<H, E> {
    fn default() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }
}

impl<H, E> SessionTable<H, E> {
    /// Look up the state for `addr`, if any.
    pub fn get(&self, addr: &SocketAddr) -> Option<&PeerState<H, E>> {
        self.sessions.get(addr)
    }

    /// Look up the state for `addr` mutably, if any.
    pub fn get_mut(&mut self, addr: &SocketAddr) -> Option<&mut PeerState<H, E>> {
        self.sessions.get_mut(addr)
    }

    /// Insert or overwrite the state at `addr`, returning whatever was there
    /// before. Spec §9's open question on `load_session` colliding with an
    /// existing entry is answered here: callers that care about leaking the
    /// previous state must close it themselves using the returned value.
    pub fn insert(&mut self, addr: SocketAddr, state: PeerState<H, E>) -> Option<PeerState<H, E>> {
        self.sessions.insert(addr, state)
    }

    /// Remove and return the state at `addr`, if any.
    pub fn remove(&mut self, addr: &SocketAddr) -> Option<PeerState<H, E>> {
        self.sessions.remove(addr)
    }

    /// Number of peers currently tracked.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True if no peers are currently tracked.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drain every entry, in arbitrary order, for `close_all`.
    pub fn drain(&mut self) -> std::collections::hash_map::Drain<'_, SocketAddr, PeerState<H, E>> {
        self.sessions.drain()
    }
}

/// Extract the CID from a datagram that doesn't match any existing table
/// entry (`handle_inbound` classification step 3, spec §4.1). Returns
/// `None` when CID is disabled, or the datagram isn't recognizable as a
/// CID-carrying record.
pub fn peek_cid<A: CryptoAdapter>(adapter: &A, datagram: &[u8]) -> Option<Cid> {
    let cid_size = adapter.cid_size();
    if cid_size == 0 {
        return None;
    }
    adapter.peek_cid(cid_size, datagram)
}
