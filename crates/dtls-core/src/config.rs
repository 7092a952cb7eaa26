//! Engine configuration (spec §6 "Configuration options recognized").

use std::time::Duration;

use crate::crypto::Role;

/// Idle timeout for `Established` sessions, and the hard ceiling for
/// `Handshaking` ones, per spec §6.
const DEFAULT_EXPIRE_AFTER: Duration = Duration::from_secs(60);

/// PSK material and the handful of options that reach the crypto adapter
/// directly rather than shaping engine behavior. Opaque to the engine beyond
/// what [`crate::crypto::CryptoAdapter`] exposes (spec §6: `sslConfig`).
#[derive(Debug, Clone)]
pub struct SslConfig {
    /// Pre-shared-key identity hint advertised during the handshake.
    pub psk_identity: Vec<u8>,
    /// The pre-shared key itself.
    pub psk: Vec<u8>,
    /// Client or server role.
    pub role: Role,
    /// Cipher suites offered/accepted, most-preferred first.
    pub cipher_suites: Vec<String>,
}

impl SslConfig {
    /// Build a PSK configuration for the given role.
    pub fn psk(role: Role, psk_identity: impl Into<Vec<u8>>, psk: impl Into<Vec<u8>>) -> Self {
        Self {
            psk_identity: psk_identity.into(),
            psk: psk.into(),
            role,
            cipher_suites: vec!["TLS_PSK_WITH_AES_128_GCM_SHA256".to_string()],
        }
    }
}

/// Engine-level configuration: everything the engine itself reads, as
/// opposed to what it merely forwards to the crypto adapter.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Idle timeout for `Established` sessions and the hard ceiling for
    /// `Handshaking` sessions. Default 60s per spec §6.
    pub expire_after: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expire_after: DEFAULT_EXPIRE_AFTER,
        }
    }
}

impl EngineConfig {
    /// Build a config with a non-default idle/handshake timeout.
    #[must_use]
    pub fn with_expire_after(expire_after: Duration) -> Self {
        Self { expire_after }
    }
}
