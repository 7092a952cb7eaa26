//! Session-context snapshot (spec §4.5), attached to every `Decrypted`
//! result so a caller can attribute application data to an authenticated
//! peer without re-deriving it from the session table.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::SystemTime;

/// A point-in-time snapshot of an `Established` session's identity and
/// annotations, taken fresh on every successful decrypt.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// The peer's certificate subject, if certificate-based auth is in use.
    pub peer_certificate_subject: Option<String>,
    /// The authentication-context map at the time of the snapshot.
    pub authentication_context: HashMap<String, String>,
    /// Own-CID if non-empty, else peer-CID, else empty (CID disabled).
    pub cid: Vec<u8>,
    /// When this session was established.
    pub session_start: SystemTime,
}

/// Decrypted application plaintext plus the peer it came from and the
/// session context in effect at the moment of decryption.
#[derive(Debug, Clone)]
pub struct DecryptedPacket {
    /// The peer address the datagram arrived from.
    pub peer: SocketAddr,
    /// The decrypted application plaintext.
    pub plaintext: Vec<u8>,
    /// Session context snapshot (spec §4.5).
    pub context: SessionContext,
}
