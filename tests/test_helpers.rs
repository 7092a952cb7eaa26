//! Shared test scaffolding: building a [`SessionEngine`] wired to the
//! in-memory mock crypto adapter, an in-memory session store, and a
//! callback recorder, the way the teacher's own test helpers wire up a
//! `Node` with in-process transports.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use dtls_core::callbacks::{HandshakeReason, LifecycleCallbacks, SessionReason};
use dtls_core::config::{EngineConfig, SslConfig};
use dtls_core::crypto::Role;
use dtls_core::engine::SessionEngine;
use dtls_core::error::{CryptoError, StoreError};
use dtls_core::mock::MockCryptoAdapter;
use dtls_core::persistence::{SessionStore, SessionWithContext};
use dtls_transport::OutboundTransport;

/// A no-op outbound transport that just records what was sent, for
/// asserting on alerts/retransmits emitted mid-handshake or mid-decrypt.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
}

impl RecordingTransport {
    /// Build a new recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.sent.lock().unwrap().clone()
    }
}

impl OutboundTransport for RecordingTransport {
    fn send(&self, datagram: &[u8], peer: SocketAddr) {
        self.sent.lock().unwrap().push((datagram.to_vec(), peer));
    }
}

/// An in-memory [`SessionStore`] for tests: records every call, keyed by
/// CID, and lets tests assert call counts (spec §8 properties 5 and 6).
#[derive(Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<Vec<u8>, SessionWithContext>>,
    call_count: Mutex<HashMap<Vec<u8>, usize>>,
}

impl InMemoryStore {
    /// Build an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fetch a previously stored session by CID, the way an application
    /// would after receiving `CidSessionMissing`.
    pub fn get(&self, cid: &[u8]) -> Option<SessionWithContext> {
        self.sessions.lock().unwrap().get(cid).cloned()
    }

    /// How many times `store_session` was called for `cid`.
    pub fn call_count(&self, cid: &[u8]) -> usize {
        *self.call_count.lock().unwrap().get(cid).unwrap_or(&0)
    }
}

impl SessionStore for InMemoryStore {
    fn store_session(&self, cid: &[u8], session: SessionWithContext) -> Result<(), StoreError> {
        self.sessions.lock().unwrap().insert(cid.to_vec(), session);
        *self
            .call_count
            .lock()
            .unwrap()
            .entry(cid.to_vec())
            .or_insert(0) += 1;
        Ok(())
    }
}

/// Records every lifecycle callback invocation for later assertion.
#[derive(Default)]
pub struct RecordingCallbacks {
    handshake_started: Mutex<Vec<SocketAddr>>,
    handshake_finished: Mutex<Vec<(SocketAddr, HandshakeReason)>>,
    session_started: Mutex<Vec<(SocketAddr, String, bool)>>,
    session_finished: Mutex<Vec<(SocketAddr, SessionReason)>>,
    message_dropped: Mutex<Vec<SocketAddr>>,
}

impl RecordingCallbacks {
    /// Build a new recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every `handshake_finished` reason recorded for `addr`.
    pub fn handshake_reasons(&self, addr: SocketAddr) -> Vec<HandshakeReason> {
        self.handshake_finished
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, r)| *r)
            .collect()
    }

    /// Every `session_finished` reason recorded for `addr`.
    pub fn session_reasons(&self, addr: SocketAddr) -> Vec<SessionReason> {
        self.session_finished
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, r)| *r)
            .collect()
    }

    /// True if `session_started` fired for `addr` with `reloaded`.
    pub fn session_started_with(&self, addr: SocketAddr, reloaded: bool) -> bool {
        self.session_started
            .lock()
            .unwrap()
            .iter()
            .any(|(a, _, r)| *a == addr && *r == reloaded)
    }

    /// Number of times a message was dropped for `addr`.
    pub fn dropped_count(&self, addr: SocketAddr) -> usize {
        self.message_dropped
            .lock()
            .unwrap()
            .iter()
            .filter(|a| **a == addr)
            .count()
    }

    /// Number of times a handshake was started for `addr`.
    pub fn handshake_started_count(&self, addr: SocketAddr) -> usize {
        self.handshake_started
            .lock()
            .unwrap()
            .iter()
            .filter(|a| **a == addr)
            .count()
    }
}

impl LifecycleCallbacks for RecordingCallbacks {
    fn handshake_started(&self, addr: SocketAddr) {
        self.handshake_started.lock().unwrap().push(addr);
    }

    fn handshake_finished(
        &self,
        addr: SocketAddr,
        _start: std::time::SystemTime,
        _finish: std::time::SystemTime,
        reason: HandshakeReason,
        _err: Option<&CryptoError>,
    ) {
        self.handshake_finished.lock().unwrap().push((addr, reason));
    }

    fn session_started(&self, addr: SocketAddr, cipher_suite: &str, reloaded: bool) {
        self.session_started
            .lock()
            .unwrap()
            .push((addr, cipher_suite.to_string(), reloaded));
    }

    fn session_finished(&self, addr: SocketAddr, reason: SessionReason, _err: Option<&CryptoError>) {
        self.session_finished.lock().unwrap().push((addr, reason));
    }

    fn message_dropped(&self, addr: SocketAddr) {
        self.message_dropped.lock().unwrap().push(addr);
    }
}

/// Everything a test needs to drive a [`SessionEngine`] against the mock
/// adapter, plus handles to its collaborators for assertions.
pub struct Harness {
    /// The engine under test.
    pub engine: SessionEngine<MockCryptoAdapter>,
    /// Records every outbound send the adapter/engine made.
    pub transport: Arc<RecordingTransport>,
    /// Records every `store_session` call.
    pub store: Arc<InMemoryStore>,
    /// Records every lifecycle callback.
    pub callbacks: Arc<RecordingCallbacks>,
}

/// PSK shared by every harness built with [`harness`]/[`harness_with_cid`].
pub const PSK: &[u8] = b"correct-horse-battery-staple";

static TRACING_INIT: Once = Once::new();

/// Install a `tracing-subscriber` that writes to the test harness's captured
/// output (`RUST_LOG` controls verbosity, same as the rest of the
/// workspace). Idempotent: safe to call once per test via every `harness*`
/// constructor.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a harness with CID disabled and the spec's default 60s
/// expire-after.
pub fn harness() -> Harness {
    harness_with(0, Duration::from_secs(60), Duration::ZERO)
}

/// Build a harness with a `cid_size`-byte CID enabled.
pub fn harness_with_cid(cid_size: usize) -> Harness {
    harness_with(cid_size, Duration::from_secs(60), Duration::ZERO)
}

/// Build a fully-configured harness.
pub fn harness_with(
    cid_size: usize,
    expire_after: Duration,
    retransmit_timeout: Duration,
) -> Harness {
    init_tracing();
    let adapter = MockCryptoAdapter::new(cid_size, Role::Server, PSK.to_vec())
        .with_retransmit_timeout(retransmit_timeout);
    let transport = RecordingTransport::new();
    let store = InMemoryStore::new();
    let callbacks = RecordingCallbacks::new();
    let (scheduler, _events) = dtls_core::timer::TokioTimerScheduler::new();
    let ssl_config = SslConfig::psk(Role::Server, b"identity".to_vec(), PSK.to_vec());
    let engine = SessionEngine::new(
        adapter,
        EngineConfig::with_expire_after(expire_after),
        ssl_config,
        store.clone() as Arc<dyn SessionStore>,
        callbacks.clone() as Arc<dyn LifecycleCallbacks>,
        transport.clone() as Arc<dyn OutboundTransport>,
        scheduler,
    );
    Harness {
        engine,
        transport,
        store,
        callbacks,
    }
}

/// A peer address for use in tests, distinct per-`n` so tests can simulate
/// several independent peers.
pub fn peer(n: u16) -> SocketAddr {
    format!("127.0.0.1:{}", 5000 + n).parse().unwrap()
}
