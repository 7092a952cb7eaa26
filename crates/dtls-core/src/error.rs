//! Error taxonomy for the session engine.
//!
//! Mirrors the split a caller actually needs to act on: transient failures
//! (drop the datagram, keep the session), permanent failures (the session is
//! gone, nothing to retry), and the two protocol signals that are not
//! failures at all (`HelloVerifyRequired`, `CloseNotify`) but still need to
//! flow out of the crypto adapter as `Result`s.

use std::borrow::Cow;

/// Errors reported by a [`crate::crypto::CryptoAdapter`] and its contexts.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CryptoError {
    /// The adapter wants a fresh handshake after a stateless cookie exchange.
    /// Not a failure: the engine drops the current attempt silently.
    #[error("hello verify required")]
    HelloVerifyRequired,

    /// The peer sent a close_notify alert. Not a failure: the session ends
    /// cleanly without being persisted.
    #[error("peer sent close_notify")]
    CloseNotify,

    /// Any other adapter-reported failure: bad MAC, handshake abort,
    /// unsupported cipher suite, malformed record, PSK identity mismatch.
    #[error("{0}")]
    Ssl(Cow<'static, str>),
}

impl CryptoError {
    /// Build an [`CryptoError::Ssl`] from a owned string without an extra
    /// allocation at the call site when a `&'static str` is available.
    pub fn ssl(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Ssl(msg.into())
    }

    /// True for failures the caller should treat as "this attempt failed,
    /// nothing else is affected" rather than a bug in the engine itself.
    pub fn is_protocol_signal(&self) -> bool {
        matches!(self, Self::HelloVerifyRequired | Self::CloseNotify)
    }
}

/// Errors returned by [`crate::persistence::SessionStore`] operations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("session store error: {0}")]
pub struct StoreError(pub Cow<'static, str>);

impl StoreError {
    /// Construct a store error from any string-like value.
    pub fn new(msg: impl Into<Cow<'static, str>>) -> Self {
        Self(msg.into())
    }
}

/// Top-level error type returned from [`crate::engine::SessionEngine`]
/// operations that can fail.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The crypto adapter failed the operation in progress.
    #[error("crypto adapter error: {0}")]
    Crypto(#[from] CryptoError),
}

impl EngineError {
    /// Transient failures are ones where the affected peer's session (if
    /// any survives) is unaffected; the caller can just drop the datagram
    /// and move on. Currently every `EngineError` the engine produces ends
    /// the session it came from, so this is always permanent, but the
    /// distinction is kept for callers composing this error with their own
    /// transport-level ones (see [`Self::is_permanent`]).
    pub fn is_transient(&self) -> bool {
        false
    }

    /// Permanent failures mean the session the operation targeted no
    /// longer exists in the table by the time the call returns.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}
