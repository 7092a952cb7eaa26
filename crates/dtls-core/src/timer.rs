//! Timer Scheduler interface (spec §4.1.3, §5): schedules a one-shot
//! callback after a duration, cancellable, with a single-threaded execution
//! guarantee on the receiving side.
//!
//! The engine itself never blocks on a timer (spec §5: "no suspension
//! points"); instead a [`TimerScheduler`] posts fired timers onto a channel
//! that an [`crate::driver::EngineDriver`] drains on the engine's single
//! confinement thread. This is the concrete realization of design option
//! (a) from spec §5 ("actor/mailbox wrapping the engine").

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Identity of a scheduled timer, used for the cancellation-race check
/// spec §5 requires: "the timer callback must re-check that the state is
/// still present in the table ... before acting."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Construct a `TimerId` directly, for tests that build a [`PeerState`]
    /// by hand without going through a real [`TimerScheduler`].
    #[cfg(test)]
    pub(crate) fn for_test(id: u64) -> Self {
        Self(id)
    }
}

/// What a fired timer means to the engine. Distinguishes the three timer
/// uses named in spec §4.2–§4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Re-enter `step(EMPTY)` to drive a DTLS flight retransmit.
    HandshakeRetransmit,
    /// The handshake's hard ceiling (`expire_after`) elapsed.
    HandshakeExpire,
    /// No inbound traffic for `expire_after` on an `Established` session.
    IdleExpire,
}

/// A timer that fired, as delivered to whoever drains the scheduler's event
/// channel.
#[derive(Debug, Clone, Copy)]
pub struct TimerEvent {
    /// Which peer's state this timer belongs to.
    pub addr: SocketAddr,
    /// Identity of the timer that fired; the receiver must discard this
    /// event if the addressed state's current timer id no longer matches.
    pub id: TimerId,
    /// What kind of expiry this is.
    pub kind: TimerKind,
}

/// Schedules one-shot timers per peer-state. Implementations must be safe
/// to call from any thread (the engine's own thread schedules timers
/// synchronously as part of handling a datagram) but must guarantee that
/// firing itself is observed only through the event channel, never via a
/// direct callback into engine state.
pub trait TimerScheduler: Send + Sync {
    /// Schedule `kind` to fire for `addr` after `after` elapses, returning a
    /// [`TimerId`] the caller should record as the state's current pending
    /// timer.
    fn schedule(&self, addr: SocketAddr, after: Duration, kind: TimerKind) -> TimerId;

    /// Cancel a previously scheduled timer. A no-op if it already fired or
    /// was already cancelled; a cancellation racing a nearly-fired timer is
    /// tolerated per spec §5, not an error.
    fn cancel(&self, id: TimerId);
}

/// Tokio-backed [`TimerScheduler`]: each `schedule` call spawns a task that
/// sleeps and then posts a [`TimerEvent`]; `cancel` aborts that task.
pub struct TokioTimerScheduler {
    next_id: AtomicU64,
    handles: Arc<DashMap<TimerId, JoinHandle<()>>>,
    events_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TokioTimerScheduler {
    /// Build a new scheduler and the receiving half of its event channel.
    /// The receiver should be handed to an [`crate::driver::EngineDriver`].
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<TimerEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                next_id: AtomicU64::new(1),
                handles: Arc::new(DashMap::new()),
                events_tx,
            }),
            events_rx,
        )
    }
}

impl TimerScheduler for TokioTimerScheduler {
    fn schedule(&self, addr: SocketAddr, after: Duration, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tx = self.events_tx.clone();
        let handles = Arc::clone(&self.handles);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(TimerEvent { addr, id, kind });
            handles.remove(&id);
        });
        self.handles.insert(id, handle);
        id
    }

    fn cancel(&self, id: TimerId) {
        if let Some((_, handle)) = self.handles.remove(&id) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fired_timer_is_delivered_on_the_event_channel() {
        let (scheduler, mut events) = TokioTimerScheduler::new();
        let addr: SocketAddr = "127.0.0.1:9100".parse().unwrap();
        let id = scheduler.schedule(addr, Duration::from_millis(5), TimerKind::IdleExpire);

        let event = events.recv().await.expect("timer should fire");
        assert_eq!(event.addr, addr);
        assert_eq!(event.id, id);
        assert_eq!(event.kind, TimerKind::IdleExpire);
    }

    #[tokio::test]
    async fn cancelled_timer_never_fires() {
        let (scheduler, mut events) = TokioTimerScheduler::new();
        let addr: SocketAddr = "127.0.0.1:9101".parse().unwrap();
        let id = scheduler.schedule(addr, Duration::from_millis(50), TimerKind::IdleExpire);
        scheduler.cancel(id);

        let result = tokio::time::timeout(Duration::from_millis(150), events.recv()).await;
        assert!(result.is_err(), "cancelled timer must not deliver an event");
    }
}
