//! # dtls-core
//!
//! The per-peer DTLS session lifecycle engine: multiplexes UDP datagrams
//! into per-peer handshake/established state machines, routes by Connection
//! ID (RFC 9146) when a peer's address changes, schedules handshake
//! retransmits and idle/handshake expirations, and persists established
//! sessions to external storage so a node can evict idle peers and resume
//! them on demand.
//!
//! This crate implements the per-peer session lifecycle engine: the
//! state machine, demultiplexing, and scheduling. It deliberately does not
//! implement a DTLS record layer or handshake itself (see [`crypto`]), a UDP
//! transport (see the sibling `dtls-transport` crate), or a session-blob
//! store (see [`persistence::SessionStore`]): those are external
//! collaborators, injected at [`engine::SessionEngine::new`].
//!
//! ## Module map
//!
//! - [`crypto`]: the Crypto Adapter contract, the sole seam to an actual
//!   DTLS primitive.
//! - [`state`]: per-peer tagged state (`Handshaking`/`Established`).
//! - [`timer`]: the Timer Scheduler interface and a Tokio-backed impl.
//! - [`table`]: the peer-address-keyed session table and CID extraction.
//! - [`engine`]: the public surface: `handle_inbound`, `encrypt_outbound`,
//!   `load_session`, `put_auth_context`, `close_all`.
//! - [`driver`]: single-thread confinement wrapper driving timer events back
//!   into the engine.
//! - [`callbacks`]: the Lifecycle Callbacks contract.
//! - [`persistence`]: the Session Persistence contract and
//!   `SessionWithContext`.
//! - [`context`]: the per-decrypt session-context snapshot.
//! - [`config`]: engine and SSL configuration.
//! - [`cid`]: the Connection ID type.
//! - [`error`]: the crate's error taxonomy.
//! - [`mock`] (feature `test-util`): an in-memory `CryptoAdapter` for tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod callbacks;
pub mod cid;
pub mod config;
pub mod context;
pub mod crypto;
pub mod driver;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod state;
pub mod table;
pub mod timer;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use callbacks::{HandshakeReason, LifecycleCallbacks, SessionReason, TracingLifecycleCallbacks};
pub use cid::Cid;
pub use config::{EngineConfig, SslConfig};
pub use context::{DecryptedPacket, SessionContext};
pub use crypto::{CryptoAdapter, EstablishedContext, HandshakeContext, HandshakeOutcome, Role};
pub use driver::EngineDriver;
pub use engine::{ReceiveResult, SessionEngine};
pub use error::{CryptoError, EngineError, StoreError};
pub use persistence::{SessionStore, SessionWithContext};
pub use state::{EstablishedState, HandshakingState, PeerState};
pub use table::SessionTable;
pub use timer::{TimerEvent, TimerId, TimerKind, TimerScheduler, TokioTimerScheduler};
