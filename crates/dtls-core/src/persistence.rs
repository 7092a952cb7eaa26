//! Session Persistence contract (spec §3, §4.4, §6): the on-the-wire shape
//! of a stored session and the store-side callback.
//!
//! Mirrors the teacher's `ResumeState` (serde-derived, persisted externally,
//! keyed by an application-chosen identifier) but keyed here by own-CID
//! bytes as spec §6 requires.

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// An `Established` session reduced to its persistable parts: the opaque
/// crypto blob, the authentication-context map, and when the session
/// started. The engine treats `session_blob` as opaque; only the crypto
/// adapter understands its contents (via
/// [`crate::crypto::CryptoAdapter::load_session`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWithContext {
    /// Opaque blob produced by [`crate::crypto::EstablishedContext::save_and_close`].
    pub session_blob: Vec<u8>,
    /// Application-level key/value annotations attached to the session.
    pub authentication_context: HashMap<String, String>,
    /// When the session was first established (not when it was stored).
    pub session_start: SystemTime,
}

impl SessionWithContext {
    /// Serialize to the JSON encoding a [`SessionStore`] would actually
    /// write to disk or hand to a remote store, the same way the teacher's
    /// `ResumeState` is persisted via `serde_json::to_string_pretty`.
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| StoreError::new(e.to_string()))
    }

    /// Parse the encoding produced by [`Self::to_json`].
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::new(e.to_string()))
    }
}

/// External key-value store keyed by own-CID, supplied by the caller.
///
/// `store_session` is called at most once per session end (spec §6);
/// implementations should be idempotent from the engine's perspective since
/// the engine never retries a failed store.
pub trait SessionStore: Send + Sync {
    /// Persist `session` under `cid`. A failure is logged and swallowed by
    /// the engine (spec §7 item 5): the session is closed either way.
    fn store_session(&self, cid: &[u8], session: SessionWithContext) -> Result<(), StoreError>;
}
