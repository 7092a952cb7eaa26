//! Session Engine (spec §4.1): the public surface of the crate.
//!
//! `SessionEngine<A>` multiplexes inbound UDP datagrams into per-peer state
//! machines, drives handshakes, routes by CID when a peer's source address
//! changes, and persists/restores sessions. Every method here is
//! synchronous and non-blocking (spec §5): the only asynchrony lives in the
//! [`crate::timer::TimerScheduler`] and the [`crate::driver::EngineDriver`]
//! that drains its event channel on the engine's single confinement thread.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use dtls_transport::OutboundTransport;

use crate::callbacks::{HandshakeReason, LifecycleCallbacks, SessionReason};
use crate::cid::Cid;
use crate::config::{EngineConfig, SslConfig};
use crate::context::{DecryptedPacket, SessionContext};
use crate::crypto::{CryptoAdapter, EstablishedContext, HandshakeContext, HandshakeOutcome};
use crate::error::{CryptoError, EngineError};
use crate::persistence::{SessionStore, SessionWithContext};
use crate::state::{EstablishedState, HandshakingState, PeerState};
use crate::table::{peek_cid, SessionTable};
use crate::timer::{TimerEvent, TimerKind, TimerScheduler};

/// Outcome of [`SessionEngine::handle_inbound`] (spec §4.1).
pub enum ReceiveResult {
    /// Progressed a handshake, consumed an alert, or produced no plaintext.
    Handled,
    /// Application plaintext, with its peer and a session-context snapshot.
    Decrypted(DecryptedPacket),
    /// The `Established` state failed to decrypt; it has been removed.
    DecryptFailed,
    /// No state exists for this address; the datagram is post-handshake and
    /// carries a CID the caller should look up in external storage before
    /// calling [`SessionEngine::load_session`].
    CidSessionMissing(Cid),
}

/// The per-peer DTLS session lifecycle engine.
///
/// Generic over the [`CryptoAdapter`] implementation only; the store,
/// callbacks, transport, and scheduler collaborators are type-erased
/// (`Arc<dyn ...>`) since none of them carry adapter-specific associated
/// types.
pub struct SessionEngine<A: CryptoAdapter> {
    adapter: A,
    cid_size: usize,
    config: EngineConfig,
    ssl_config: SslConfig,
    sessions: SessionTable<A::Handshake, A::Established>,
    store: Arc<dyn SessionStore>,
    callbacks: Arc<dyn LifecycleCallbacks>,
    transport: Arc<dyn OutboundTransport>,
    scheduler: Arc<dyn TimerScheduler>,
}

impl<A: CryptoAdapter> SessionEngine<A> {
    /// Build a new engine. `cid_size` is read once from `adapter` (spec §6:
    /// "used once at startup to determine `cidSize`"). `ssl_config` is one of
    /// the configuration options spec §6 lists at engine construction
    /// (`sslConfig`); the engine itself never inspects it, but keeps it
    /// reachable for callers that need to recover the role/cipher-suite list
    /// they configured the adapter with.
    pub fn new(
        adapter: A,
        config: EngineConfig,
        ssl_config: SslConfig,
        store: Arc<dyn SessionStore>,
        callbacks: Arc<dyn LifecycleCallbacks>,
        transport: Arc<dyn OutboundTransport>,
        scheduler: Arc<dyn TimerScheduler>,
    ) -> Self {
        let cid_size = adapter.cid_size();
        Self {
            adapter,
            cid_size,
            config,
            ssl_config,
            sessions: SessionTable::default(),
            store,
            callbacks,
            transport,
            scheduler,
        }
    }

    /// The PSK/role/cipher-suite configuration this engine was built with
    /// (spec §6 `sslConfig`). Opaque to the engine beyond what
    /// [`CryptoAdapter`] exposes; kept so a caller that only has the engine
    /// in hand (not the config it built the adapter from) can still recover
    /// it, e.g. to log which role a node is running as.
    pub fn ssl_config(&self) -> &SslConfig {
        &self.ssl_config
    }

    /// Number of peers currently tracked, for diagnostics and tests (spec §8
    /// property 6: "`numberOfSessions == 0`" after `close_all`).
    pub fn number_of_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// The timer currently pending for `addr`, if any. Exposed so a driver
    /// (or a test) can construct the matching [`TimerEvent`] once its
    /// [`TimerScheduler`] reports one has fired, without the engine needing
    /// to expose its table's internals any further.
    pub fn current_timer(&self, addr: SocketAddr) -> Option<crate::timer::TimerId> {
        self.sessions.get(&addr).map(|s| s.timer())
    }

    /// The effective CID (own-CID if non-empty, else peer-CID) of the
    /// `Established` session at `addr`, if any, the same value a
    /// `Decrypted` result's [`SessionContext::cid`] would carry. Exposed for
    /// callers that need to key their store lookups without waiting for a
    /// `Decrypted` result.
    pub fn session_cid(&self, addr: SocketAddr) -> Option<Vec<u8>> {
        match self.sessions.get(&addr)? {
            PeerState::Established(s) if !s.own_cid.is_empty() => Some(s.own_cid.clone()),
            PeerState::Established(s) => Some(s.peer_cid.clone()),
            PeerState::Handshaking(_) => None,
        }
    }

    fn send_fn(&self, addr: SocketAddr) -> impl FnMut(&[u8]) + '_ {
        let transport = Arc::clone(&self.transport);
        move |datagram: &[u8]| transport.send(datagram, addr)
    }

    /// Classify and dispatch one inbound datagram (spec §4.1 classification
    /// order).
    pub fn handle_inbound(&mut self, addr: SocketAddr, buf: &[u8]) -> ReceiveResult {
        match self.sessions.remove(&addr) {
            Some(PeerState::Handshaking(state)) => self.step_handshake(addr, state, buf),
            Some(PeerState::Established(state)) => self.step_established(addr, state, buf),
            None => {
                if self.cid_size > 0 {
                    if let Some(cid) = peek_cid(&self.adapter, buf) {
                        return ReceiveResult::CidSessionMissing(cid);
                    }
                }
                self.callbacks.handshake_started(addr);
                let ctx = self.adapter.new_context(addr);
                let state = HandshakingState {
                    start: ctx.start_timestamp(),
                    ctx,
                    addr,
                    timer: self
                        .scheduler
                        .schedule(addr, self.config.expire_after, TimerKind::HandshakeExpire),
                };
                self.step_handshake(addr, state, buf)
            }
        }
    }

    /// Encrypt one outbound application record for an `Established` peer
    /// (spec §4.1). Returns `Ok(None)` when no `Established` state exists
    /// for `addr` (e.g. still handshaking, or unknown peer).
    pub fn encrypt_outbound(
        &mut self,
        addr: SocketAddr,
        plaintext: &[u8],
    ) -> Result<Option<Vec<u8>>, EngineError> {
        let Some(PeerState::Established(mut state)) = self.sessions.remove(&addr) else {
            return Ok(None);
        };
        match state.ctx.encrypt(plaintext) {
            Ok(ciphertext) => {
                self.sessions.insert(addr, PeerState::Established(state));
                Ok(Some(ciphertext))
            }
            Err(err) => {
                tracing::warn!(%addr, error = %err, "encrypt failed, closing session");
                self.callbacks
                    .session_finished(addr, SessionReason::Failed, Some(&err));
                state.ctx.close();
                Err(EngineError::Crypto(err))
            }
        }
    }

    /// Resurrect a session that was stored externally under `cid` (spec
    /// §4.1). `sess` is the full persisted record the caller fetched from
    /// its store after receiving `CidSessionMissing(cid)`.
    pub fn load_session(
        &mut self,
        addr: SocketAddr,
        cid: &[u8],
        sess: Option<SessionWithContext>,
    ) -> bool {
        let Some(sess) = sess else {
            self.callbacks.message_dropped(addr);
            return false;
        };
        match self
            .adapter
            .load_session(cid, &sess.session_blob, addr)
        {
            Ok(ctx) => {
                let cipher_suite = ctx.cipher_suite().to_string();
                let own_cid = ctx.own_cid().unwrap_or_default().to_vec();
                let peer_cid = ctx.peer_cid().unwrap_or_default().to_vec();
                let timer = self
                    .scheduler
                    .schedule(addr, self.config.expire_after, TimerKind::IdleExpire);
                let state = EstablishedState {
                    ctx,
                    addr,
                    timer,
                    auth_context: sess.authentication_context,
                    start: sess.session_start,
                    own_cid,
                    peer_cid,
                    cipher_suite: cipher_suite.clone(),
                };
                // Spec §9 open question: overwrites any existing entry at
                // `addr` without closing it.
                self.sessions.insert(addr, PeerState::Established(state));
                self.callbacks.session_started(addr, &cipher_suite, true);
                true
            }
            Err(err) => {
                tracing::warn!(%addr, cid = %crate::cid::cid_display(cid), error = %err, "failed to reload session");
                self.callbacks.message_dropped(addr);
                false
            }
        }
    }

    /// Set (or, with `value: None`, remove) an authentication-context key
    /// for `addr`. Only effective while `Established` (spec §9 open
    /// question: silently dropped while `Handshaking`).
    pub fn put_auth_context(&mut self, addr: SocketAddr, key: String, value: Option<String>) -> bool {
        match self.sessions.get_mut(&addr) {
            Some(PeerState::Established(state)) => {
                match value {
                    Some(v) => {
                        state.auth_context.insert(key, v);
                    }
                    None => {
                        state.auth_context.remove(&key);
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// Cancel every pending timer and store-and-close every `Established`
    /// session, then clear the table (spec §4.1). Unlike the other removal
    /// paths this does not fire a lifecycle callback per peer: it's a bulk
    /// shutdown, not an event attributable to any single session's Reason.
    pub fn close_all(&mut self) {
        for (addr, state) in self.sessions.drain() {
            self.scheduler.cancel(state.timer());
            match state {
                PeerState::Handshaking(s) => s.ctx.close(),
                PeerState::Established(s) => self.store_and_close(addr, s),
            }
        }
    }

    /// React to a fired timer (spec §4.2/§4.3/§5). Discards the event if the
    /// addressed state is gone or its current timer no longer matches,
    /// the identity check spec §5 requires to tolerate a cancellation
    /// racing a nearly-fired timer.
    pub fn on_timer_fired(&mut self, event: TimerEvent) {
        let still_current = self
            .sessions
            .get(&event.addr)
            .is_some_and(|s| s.timer() == event.id);
        if !still_current {
            return;
        }
        match (self.sessions.remove(&event.addr), event.kind) {
            (Some(PeerState::Handshaking(state)), TimerKind::HandshakeRetransmit) => {
                self.step_handshake(event.addr, state, &[]);
            }
            (Some(PeerState::Handshaking(state)), TimerKind::HandshakeExpire) => {
                tracing::debug!(addr = %event.addr, "handshake expired");
                let finish = SystemTime::now();
                state.ctx.close();
                self.callbacks.handshake_finished(
                    event.addr,
                    state.start,
                    finish,
                    HandshakeReason::Expired,
                    None,
                );
            }
            (Some(PeerState::Established(state)), TimerKind::IdleExpire) => {
                tracing::debug!(addr = %event.addr, "session idle timeout");
                self.store_and_close(event.addr, state);
                self.callbacks
                    .session_finished(event.addr, SessionReason::Expired, None);
            }
            (Some(other), _) => {
                // Timer kind mismatched the state it belongs to: put it
                // back untouched rather than silently dropping a live
                // session.
                self.sessions.insert(event.addr, other);
            }
            (None, _) => {}
        }
    }

    fn step_handshake(
        &mut self,
        addr: SocketAddr,
        mut state: HandshakingState<A::Handshake>,
        buf: &[u8],
    ) -> ReceiveResult {
        self.scheduler.cancel(state.timer);
        let mut send = self.send_fn(addr);
        let outcome = state.ctx.step(buf, &mut send);
        match outcome {
            Ok(HandshakeOutcome::Pending) => {
                let read_timeout = state.ctx.read_timeout();
                let (kind, after) = if read_timeout.is_zero() {
                    (TimerKind::HandshakeExpire, self.config.expire_after)
                } else {
                    (TimerKind::HandshakeRetransmit, read_timeout)
                };
                state.timer = self.scheduler.schedule(addr, after, kind);
                self.sessions.insert(addr, PeerState::Handshaking(state));
                ReceiveResult::Handled
            }
            Ok(HandshakeOutcome::Completed(ctx)) => {
                let finish = SystemTime::now();
                let cipher_suite = ctx.cipher_suite().to_string();
                let own_cid = ctx.own_cid().unwrap_or_default().to_vec();
                let peer_cid = ctx.peer_cid().unwrap_or_default().to_vec();
                let timer = self
                    .scheduler
                    .schedule(addr, self.config.expire_after, TimerKind::IdleExpire);
                let established = EstablishedState {
                    ctx,
                    addr,
                    timer,
                    auth_context: Default::default(),
                    start: finish,
                    own_cid,
                    peer_cid,
                    cipher_suite: cipher_suite.clone(),
                };
                self.sessions
                    .insert(addr, PeerState::Established(established));
                self.callbacks.handshake_finished(
                    addr,
                    state.start,
                    finish,
                    HandshakeReason::Succeeded,
                    None,
                );
                self.callbacks.session_started(addr, &cipher_suite, false);
                ReceiveResult::Handled
            }
            Err(err @ CryptoError::HelloVerifyRequired) => {
                tracing::debug!(%addr, "hello verify required, awaiting cookie retry");
                let finish = SystemTime::now();
                state.ctx.close();
                self.callbacks.handshake_finished(
                    addr,
                    state.start,
                    finish,
                    HandshakeReason::Failed,
                    Some(&err),
                );
                ReceiveResult::Handled
            }
            Err(err) => {
                tracing::error!(%addr, error = %err, "handshake failed");
                let finish = SystemTime::now();
                state.ctx.close();
                self.callbacks.handshake_finished(
                    addr,
                    state.start,
                    finish,
                    HandshakeReason::Failed,
                    Some(&err),
                );
                self.callbacks.message_dropped(addr);
                ReceiveResult::Handled
            }
        }
    }

    fn step_established(
        &mut self,
        addr: SocketAddr,
        mut state: EstablishedState<A::Established>,
        buf: &[u8],
    ) -> ReceiveResult {
        self.scheduler.cancel(state.timer);
        let mut send = self.send_fn(addr);
        match state.ctx.decrypt(buf, &mut send) {
            Ok(plaintext) => {
                state.timer = self.scheduler.schedule(
                    addr,
                    self.config.expire_after,
                    TimerKind::IdleExpire,
                );
                if plaintext.is_empty() {
                    self.sessions.insert(addr, PeerState::Established(state));
                    ReceiveResult::Handled
                } else {
                    let context = SessionContext {
                        peer_certificate_subject: state
                            .ctx
                            .peer_certificate_subject()
                            .map(str::to_string),
                        authentication_context: state.auth_context.clone(),
                        cid: if !state.own_cid.is_empty() {
                            state.own_cid.clone()
                        } else {
                            state.peer_cid.clone()
                        },
                        session_start: state.start,
                    };
                    self.sessions.insert(addr, PeerState::Established(state));
                    ReceiveResult::Decrypted(DecryptedPacket {
                        peer: addr,
                        plaintext,
                        context,
                    })
                }
            }
            Err(err @ CryptoError::CloseNotify) => {
                tracing::debug!(%addr, "peer closed session");
                state.ctx.close();
                self.callbacks
                    .session_finished(addr, SessionReason::Closed, Some(&err));
                ReceiveResult::DecryptFailed
            }
            Err(err) => {
                tracing::warn!(%addr, error = %err, "decrypt failed, closing session");
                state.ctx.close();
                self.callbacks
                    .session_finished(addr, SessionReason::Failed, Some(&err));
                self.callbacks.message_dropped(addr);
                ReceiveResult::DecryptFailed
            }
        }
    }

    /// Store-and-close (spec §4.4): save-and-persist if `own_cid` is
    /// non-empty, otherwise just close. Only ever invoked for `Established`
    /// states reached via idle expiry or `close_all`.
    fn store_and_close(&self, addr: SocketAddr, state: EstablishedState<A::Established>) {
        if state.own_cid.is_empty() {
            state.ctx.close();
            return;
        }
        let blob = state.ctx.save_and_close();
        let session = SessionWithContext {
            session_blob: blob,
            authentication_context: state.auth_context,
            session_start: state.start,
        };
        if let Err(err) = self.store.store_session(&state.own_cid, session) {
            tracing::warn!(%addr, error = %err, "failed to store session, discarding");
        }
    }
}
