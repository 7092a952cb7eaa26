//! Single-thread confinement wrapper around [`SessionEngine`] (spec §5).
//!
//! The engine's session table is deliberately unlocked; correctness depends
//! on every entry point (inbound datagrams, application-initiated encrypts,
//! timer firings, store-callback replies) being marshalled onto one thread.
//! `EngineDriver` is the concrete realization of spec §5 design option (a):
//! "an actor/mailbox wrapping the engine on top of a multi-threaded I/O
//! loop." It is intentionally `!Send`/`!Sync` (via `Rc<RefCell<_>>`) so the
//! type system enforces the confinement this design requires rather than
//! merely documenting it.

use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;

use tokio::sync::mpsc;

use crate::context::DecryptedPacket;
use crate::crypto::CryptoAdapter;
use crate::engine::{ReceiveResult, SessionEngine};
use crate::error::EngineError;
use crate::persistence::SessionWithContext;
use crate::timer::TimerEvent;

/// Cheaply-cloneable handle to a confined [`SessionEngine`]. Every clone
/// shares the same underlying engine; none of them may cross a thread
/// boundary (enforced by `Rc` not implementing `Send`).
pub struct EngineDriver<A: CryptoAdapter> {
    inner: Rc<RefCell<SessionEngine<A>>>,
}

impl<A: CryptoAdapter> Clone for EngineDriver<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: CryptoAdapter> EngineDriver<A> {
    /// Wrap an engine for single-thread confinement.
    pub fn new(engine: SessionEngine<A>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(engine)),
        }
    }

    /// See [`SessionEngine::handle_inbound`].
    pub fn handle_inbound(&self, addr: SocketAddr, buf: &[u8]) -> ReceiveResult {
        self.inner.borrow_mut().handle_inbound(addr, buf)
    }

    /// See [`SessionEngine::encrypt_outbound`].
    pub fn encrypt_outbound(
        &self,
        addr: SocketAddr,
        plaintext: &[u8],
    ) -> Result<Option<Vec<u8>>, EngineError> {
        self.inner.borrow_mut().encrypt_outbound(addr, plaintext)
    }

    /// See [`SessionEngine::load_session`].
    pub fn load_session(
        &self,
        addr: SocketAddr,
        cid: &[u8],
        sess: Option<SessionWithContext>,
    ) -> bool {
        self.inner.borrow_mut().load_session(addr, cid, sess)
    }

    /// See [`SessionEngine::put_auth_context`].
    pub fn put_auth_context(&self, addr: SocketAddr, key: String, value: Option<String>) -> bool {
        self.inner.borrow_mut().put_auth_context(addr, key, value)
    }

    /// See [`SessionEngine::close_all`].
    pub fn close_all(&self) {
        self.inner.borrow_mut().close_all();
    }

    /// See [`SessionEngine::number_of_sessions`].
    pub fn number_of_sessions(&self) -> usize {
        self.inner.borrow().number_of_sessions()
    }

    /// Drain a [`crate::timer::TimerScheduler`]'s event channel for as long
    /// as the channel stays open, feeding each fired timer back into the
    /// confined engine. Run this as a background task on the same
    /// single-threaded runtime/`LocalSet` the rest of the driver's methods
    /// are called from.
    pub async fn run_timers(&self, mut events: mpsc::UnboundedReceiver<TimerEvent>) {
        while let Some(event) = events.recv().await {
            self.inner.borrow_mut().on_timer_fired(event);
        }
    }
}

/// Convenience re-export so callers matching on decrypted packets don't need
/// a separate `use` for the payload type.
pub type Decrypted = DecryptedPacket;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::TracingLifecycleCallbacks;
    use crate::config::EngineConfig;
    use crate::crypto::Role;
    use crate::mock::{cookie_datagram, MockCryptoAdapter};
    use crate::persistence::{SessionStore, SessionWithContext};
    use crate::timer::TokioTimerScheduler;
    use std::time::Duration;

    struct NoopStore;
    impl SessionStore for NoopStore {
        fn store_session(
            &self,
            _cid: &[u8],
            _session: SessionWithContext,
        ) -> Result<(), crate::error::StoreError> {
            Ok(())
        }
    }

    struct NoopTransport;
    impl dtls_transport::OutboundTransport for NoopTransport {
        fn send(&self, _datagram: &[u8], _peer: std::net::SocketAddr) {}
    }

    #[tokio::test]
    async fn timer_events_flow_through_the_driver_back_into_the_engine() {
        let (scheduler, events) = TokioTimerScheduler::new();
        let adapter = MockCryptoAdapter::new(0, Role::Server, b"psk".to_vec());
        let engine = SessionEngine::new(
            adapter,
            EngineConfig::with_expire_after(Duration::from_millis(20)),
            crate::config::SslConfig::psk(Role::Server, b"identity".to_vec(), b"psk".to_vec()),
            std::sync::Arc::new(NoopStore) as std::sync::Arc<dyn SessionStore>,
            std::sync::Arc::new(TracingLifecycleCallbacks)
                as std::sync::Arc<dyn crate::callbacks::LifecycleCallbacks>,
            std::sync::Arc::new(NoopTransport) as std::sync::Arc<dyn dtls_transport::OutboundTransport>,
            scheduler as std::sync::Arc<dyn crate::timer::TimerScheduler>,
        );
        let driver = EngineDriver::new(engine);
        let local = tokio::task::LocalSet::new();
        let driver_for_timers = driver.clone();
        local.spawn_local(async move { driver_for_timers.run_timers(events).await });

        let addr: SocketAddr = "127.0.0.1:9200".parse().unwrap();
        local
            .run_until(async {
                driver.handle_inbound(addr, b"ClientHello");
                driver.handle_inbound(addr, &cookie_datagram(b"psk"));
                assert_eq!(driver.number_of_sessions(), 1);

                tokio::time::sleep(Duration::from_millis(60)).await;
                assert_eq!(
                    driver.number_of_sessions(),
                    0,
                    "idle timer fired through the driver should remove the session"
                );
            })
            .await;
    }
}
