//! In-memory mock [`CryptoAdapter`] (spec §6, §9: "any implementation
//! meeting the contract substitutes cleanly"). Gated behind the
//! `test-util` feature; exercised by this crate's own unit tests and the
//! workspace's `tests` crate, never shipped as a real DTLS backend.
//!
//! Simulates just enough of a PSK/CID-capable DTLS handshake to drive the
//! engine through every path in spec.md §8/§9: a `HelloVerifyRequest`
//! round trip, PSK mismatch, retransmit scheduling, close_notify, and CID
//! round-tripping through store/load.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use crate::cid::Cid;
use crate::crypto::{CryptoAdapter, EstablishedContext, HandshakeContext, HandshakeOutcome, Role};
use crate::error::CryptoError;

const COOKIE_MARKER: &[u8] = b"cookie:";
const CLOSE_NOTIFY: &[u8] = b"close_notify";
const BAD_MAC: &[u8] = b"bad_mac";
const BAD_PSK: &[u8] = b"bad_psk";
const KEEPALIVE: &[u8] = b"keepalive";
const ENC_PREFIX: &str = "enc:";

/// A mock DTLS crypto backend. Configure `retransmit_timeout` non-zero to
/// exercise the engine's handshake-retransmit path, or zero (the default)
/// to always fall straight through to the handshake-expiry path.
pub struct MockCryptoAdapter {
    cid_size: usize,
    role: Role,
    psk: Vec<u8>,
    retransmit_timeout: Duration,
    next_cid: AtomicU64,
}

impl MockCryptoAdapter {
    /// Build a mock adapter. `cid_size` of `0` disables CID, matching spec
    /// §3. `psk` is the only credential this mock checks: a `ClientHello`
    /// datagram of the form `cookie:<psk>` completes the handshake, any
    /// other `cookie:...` payload fails with a generic SSL error.
    pub fn new(cid_size: usize, role: Role, psk: impl Into<Vec<u8>>) -> Self {
        Self {
            cid_size,
            role,
            psk: psk.into(),
            retransmit_timeout: Duration::ZERO,
            next_cid: AtomicU64::new(1),
        }
    }

    /// Builder-style setter for the simulated retransmit timeout.
    #[must_use]
    pub fn with_retransmit_timeout(mut self, timeout: Duration) -> Self {
        self.retransmit_timeout = timeout;
        self
    }

    fn generate_cid(&self) -> Cid {
        if self.cid_size == 0 {
            return Vec::new();
        }
        let n = self.next_cid.fetch_add(1, Ordering::Relaxed);
        let mut cid = n.to_be_bytes().to_vec();
        cid.resize(self.cid_size, 0);
        cid
    }
}

impl CryptoAdapter for MockCryptoAdapter {
    type Handshake = MockHandshake;
    type Established = MockEstablished;

    fn cid_size(&self) -> usize {
        self.cid_size
    }

    fn role(&self) -> Role {
        self.role
    }

    fn new_context(&self, addr: SocketAddr) -> Self::Handshake {
        MockHandshake {
            addr,
            psk: self.psk.clone(),
            cid_size: self.cid_size,
            own_cid: self.generate_cid(),
            retransmit_timeout: self.retransmit_timeout,
            start: SystemTime::now(),
            sent_hello_verify: false,
        }
    }

    fn load_session(
        &self,
        cid: &[u8],
        blob: &[u8],
        _addr: SocketAddr,
    ) -> Result<Self::Established, CryptoError> {
        if blob.is_empty() {
            return Err(CryptoError::ssl("empty session blob"));
        }
        Ok(MockEstablished {
            own_cid: cid.to_vec(),
            peer_cid: blob.to_vec(),
            cipher_suite: "TLS_PSK_WITH_AES_128_GCM_SHA256".to_string(),
            peer_certificate_subject: None,
            reloaded: true,
        })
    }

    fn peek_cid(&self, cid_size: usize, datagram: &[u8]) -> Option<Cid> {
        // Post-handshake application records in this mock are tagged
        // `rec:<cid>:<ciphertext>`.
        let rest = datagram.strip_prefix(b"rec:")?;
        if rest.len() < cid_size {
            return None;
        }
        Some(rest[..cid_size].to_vec())
    }
}

/// Mock handshake context. Drives a trivial two-round-trip PSK handshake:
/// `ClientHello` -> `HelloVerifyRequest` -> `cookie:<psk>` -> established.
pub struct MockHandshake {
    addr: SocketAddr,
    psk: Vec<u8>,
    cid_size: usize,
    own_cid: Cid,
    retransmit_timeout: Duration,
    start: SystemTime,
    sent_hello_verify: bool,
}

impl HandshakeContext for MockHandshake {
    type Established = MockEstablished;

    fn step(
        &mut self,
        datagram: &[u8],
        send: &mut dyn FnMut(&[u8]),
    ) -> Result<HandshakeOutcome<Self::Established>, CryptoError> {
        if datagram.is_empty() {
            // Self-triggered retransmit: resend whatever flight is pending.
            if !self.sent_hello_verify {
                send(b"HelloVerifyRequest");
            }
            return Ok(HandshakeOutcome::Pending);
        }

        if let Some(rest) = datagram.strip_prefix(COOKIE_MARKER) {
            if rest == self.psk.as_slice() {
                let peer_cid = if self.cid_size > 0 {
                    vec![0xAAu8; self.cid_size]
                } else {
                    Vec::new()
                };
                return Ok(HandshakeOutcome::Completed(MockEstablished {
                    own_cid: self.own_cid.clone(),
                    peer_cid,
                    cipher_suite: "TLS_PSK_WITH_AES_128_GCM_SHA256".to_string(),
                    peer_certificate_subject: None,
                    reloaded: false,
                }));
            }
            return Err(CryptoError::ssl(BAD_PSK_MSG));
        }

        if datagram == BAD_PSK {
            return Err(CryptoError::ssl(BAD_PSK_MSG));
        }

        // Anything else is treated as a fresh ClientHello: demand a cookie.
        tracing::trace!(addr = %self.addr, "sending hello verify request");
        self.sent_hello_verify = true;
        send(b"HelloVerifyRequest");
        Err(CryptoError::HelloVerifyRequired)
    }

    fn read_timeout(&self) -> Duration {
        self.retransmit_timeout
    }

    fn start_timestamp(&self) -> SystemTime {
        self.start
    }

    fn close(self) {}
}

const BAD_PSK_MSG: &str = "PSK identity mismatch";

/// Mock established context. "Encryption" is a transparent, reversible hex
/// tag (`enc:<hex>`), enough to exercise the engine's decrypt/encrypt
/// plumbing without a real AEAD dependency in test-only code.
pub struct MockEstablished {
    own_cid: Cid,
    peer_cid: Cid,
    cipher_suite: String,
    peer_certificate_subject: Option<String>,
    reloaded: bool,
}

impl EstablishedContext for MockEstablished {
    fn decrypt(
        &mut self,
        datagram: &[u8],
        send: &mut dyn FnMut(&[u8]),
    ) -> Result<Vec<u8>, CryptoError> {
        if datagram == CLOSE_NOTIFY {
            return Err(CryptoError::CloseNotify);
        }
        if datagram == BAD_MAC {
            send(b"alert:bad_record_mac");
            return Err(CryptoError::ssl("bad record MAC"));
        }
        if datagram == KEEPALIVE {
            return Ok(Vec::new());
        }
        let tagged = Self::strip_record_tag(datagram);
        let hex_body = tagged
            .strip_prefix(ENC_PREFIX.as_bytes())
            .ok_or_else(|| CryptoError::ssl("not a recognized record"))?;
        hex::decode(hex_body).map_err(|_| CryptoError::ssl("corrupt ciphertext"))
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(format!("{ENC_PREFIX}{}", hex::encode(plaintext)).into_bytes())
    }

    fn save_and_close(self) -> Vec<u8> {
        self.peer_cid
    }

    fn close(self) {}

    fn own_cid(&self) -> Option<&[u8]> {
        if self.own_cid.is_empty() {
            None
        } else {
            Some(&self.own_cid)
        }
    }

    fn peer_cid(&self) -> Option<&[u8]> {
        if self.peer_cid.is_empty() {
            None
        } else {
            Some(&self.peer_cid)
        }
    }

    fn cipher_suite(&self) -> &str {
        &self.cipher_suite
    }

    fn peer_certificate_subject(&self) -> Option<&str> {
        self.peer_certificate_subject.as_deref()
    }

    fn reloaded(&self) -> bool {
        self.reloaded
    }
}

impl MockEstablished {
    fn strip_record_tag(datagram: &[u8]) -> &[u8] {
        match datagram.strip_prefix(b"rec:") {
            Some(rest) => match rest.iter().position(|&b| b == b':') {
                Some(idx) => &rest[idx + 1..],
                None => rest,
            },
            None => datagram,
        }
    }
}

/// Build the literal `cookie:<psk>` datagram a peer sends after receiving a
/// `HelloVerifyRequest`, for use in tests.
pub fn cookie_datagram(psk: &[u8]) -> Vec<u8> {
    let mut out = COOKIE_MARKER.to_vec();
    out.extend_from_slice(psk);
    out
}

/// A thread-safe sink that records every datagram an adapter tried to
/// `send`, for asserting on mid-handshake/mid-decrypt sends in tests.
#[derive(Default)]
pub struct SendLog {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl SendLog {
    /// Build an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sent datagram.
    pub fn record(&self, datagram: &[u8]) {
        self.sent.lock().unwrap().push(datagram.to_vec());
    }

    /// Snapshot everything recorded so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}
