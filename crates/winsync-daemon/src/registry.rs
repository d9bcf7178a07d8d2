//! Connection registry and per-session outboxes.
//!
//! The scheduler publishes each snapshot here once; the registry fans
//! it out to every live session's [`OutboundQueue`]. A slow or stalled
//! client only ever backs up its own queue.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use winsync_proto::ServerMessage;
use winsync_types::State;

use crate::queue::{OutboundQueue, Push};
use crate::session::SessionId;

/// One session's outbound side: the bounded queue, a wakeup for the
/// writer task, and the session's cancellation token.
pub struct SessionOutbox {
    queue: Mutex<OutboundQueue>,
    notify: Notify,
    cancel: CancellationToken,
}

impl SessionOutbox {
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            queue: Mutex::new(OutboundQueue::new()),
            notify: Notify::new(),
            cancel,
        }
    }

    /// Queue an ack for this session. On ack-lane overflow the session
    /// token is cancelled and `false` is returned; the ack is lost
    /// along with the connection, never silently alone.
    pub fn push_ack(&self, msg: ServerMessage) -> bool {
        let result = self.queue.lock().unwrap().push_ack(msg);
        match result {
            Push::Queued | Push::DroppedOldestState => {
                self.notify.notify_one();
                true
            }
            Push::Overflow => {
                warn!("ack queue overflow, disconnecting session");
                self.cancel.cancel();
                false
            }
        }
    }

    /// Queue a state snapshot, dropping the oldest pending one if the
    /// client is behind.
    pub fn push_state(&self, msg: ServerMessage) {
        let result = self.queue.lock().unwrap().push_state(msg);
        match result {
            Push::Queued => self.notify.notify_one(),
            Push::DroppedOldestState => {
                debug!("client behind, dropped oldest pending state");
                self.notify.notify_one();
            }
            Push::Overflow => {}
        }
    }

    /// Next message to write, or `None` once the session is cancelled
    /// and the queue has drained.
    pub async fn next(&self) -> Option<ServerMessage> {
        loop {
            if let Some(msg) = self
                .queue
                .lock()
                .unwrap()
                .pop()
            {
                return Some(msg);
            }
            if self.cancel.is_cancelled() {
                return None;
            }
            tokio::select! {
                () = self.notify.notified() => {}
                () = self.cancel.cancelled() => {}
            }
        }
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Shared registry of live sessions plus the most recent snapshot.
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<SessionOutbox>>>,
    last_state: Mutex<Option<Arc<State>>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. If a snapshot already exists it is queued
    /// immediately so a new client does not wait a full tick.
    pub fn register(&self, id: SessionId, outbox: Arc<SessionOutbox>) {
        if let Some(state) = self.last_state() {
            outbox.push_state(ServerMessage::state((*state).clone()));
        }
        self.sessions
            .lock()
            .unwrap()
            .insert(id, outbox);
    }

    pub fn unregister(&self, id: &SessionId) {
        self.sessions.lock().unwrap().remove(id);
    }

    /// Fan a fresh snapshot out to every live session.
    pub fn broadcast_state(&self, state: &Arc<State>) {
        self.set_last_state(Arc::clone(state));
        let msg = ServerMessage::state((**state).clone());
        let sessions = self
            .sessions
            .lock()
            .unwrap();
        for outbox in sessions.values() {
            outbox.push_state(msg.clone());
        }
    }

    fn set_last_state(&self, state: Arc<State>) {
        *self
            .last_state
            .lock()
            .unwrap() = Some(state);
    }

    #[must_use]
    pub fn last_state(&self) -> Option<Arc<State>> {
        self.last_state
            .lock()
            .unwrap()
            .clone()
    }

    /// Desktop count from the latest snapshot, if any. Used to bounds-
    /// check desktop indices in commands.
    #[must_use]
    pub fn desktop_count(&self) -> Option<usize> {
        self.last_state().map(|s| s.desktop_count())
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use winsync_types::CommandResult;

    use crate::queue::MAX_PENDING_ACKS;

    fn sample_state(ts: f64) -> Arc<State> {
        Arc::new(State {
            timestamp: ts,
            ..State::default()
        })
    }

    fn ack() -> ServerMessage {
        ServerMessage::ack(CommandResult::ok(json!({ "name": "close" })))
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_sessions() {
        let registry = ConnectionRegistry::new();
        let a = Arc::new(SessionOutbox::new(CancellationToken::new()));
        let b = Arc::new(SessionOutbox::new(CancellationToken::new()));
        registry.register(SessionId::new(), Arc::clone(&a));
        registry.register(SessionId::new(), Arc::clone(&b));

        registry.broadcast_state(&sample_state(1.0));

        assert!(a.next().await.unwrap().is_state());
        assert!(b.next().await.unwrap().is_state());
    }

    #[tokio::test]
    async fn test_register_seeds_latest_snapshot() {
        let registry = ConnectionRegistry::new();
        registry.broadcast_state(&sample_state(7.0));

        let outbox = Arc::new(SessionOutbox::new(CancellationToken::new()));
        registry.register(SessionId::new(), Arc::clone(&outbox));

        match outbox.next().await.unwrap() {
            ServerMessage::State { payload } => {
                assert!((payload.timestamp - 7.0).abs() < f64::EPSILON);
            }
            ServerMessage::Ack { .. } => panic!("expected state"),
        }
    }

    #[tokio::test]
    async fn test_unregister_stops_broadcast() {
        let registry = ConnectionRegistry::new();
        let outbox = Arc::new(SessionOutbox::new(CancellationToken::new()));
        let id = SessionId::new();
        registry.register(id.clone(), Arc::clone(&outbox));
        registry.unregister(&id);
        assert_eq!(registry.session_count(), 0);

        registry.broadcast_state(&sample_state(1.0));
        let next = tokio::time::timeout(Duration::from_millis(50), outbox.next()).await;
        assert!(next.is_err(), "unregistered session must not receive state");
    }

    #[tokio::test]
    async fn test_ack_overflow_cancels_session() {
        let token = CancellationToken::new();
        let outbox = SessionOutbox::new(token.clone());

        for _ in 0..MAX_PENDING_ACKS {
            assert!(outbox.push_ack(ack()));
        }
        assert!(!outbox.push_ack(ack()));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_next_drains_queue_after_cancel() {
        let token = CancellationToken::new();
        let outbox = SessionOutbox::new(token.clone());
        assert!(outbox.push_ack(ack()));
        token.cancel();

        // Pending ack still flushed, then the writer is told to stop.
        assert!(outbox.next().await.is_some());
        assert!(outbox.next().await.is_none());
    }

    #[tokio::test]
    async fn test_desktop_count_tracks_last_state() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.desktop_count(), None);

        let state = Arc::new(State {
            desktops: vec![
                winsync_types::DesktopRecord {
                    index: 1,
                    name: "One".to_string(),
                    current: true,
                },
                winsync_types::DesktopRecord {
                    index: 2,
                    name: "Two".to_string(),
                    current: false,
                },
            ],
            timestamp: 1.0,
            ..State::default()
        });
        registry.broadcast_state(&state);
        assert_eq!(registry.desktop_count(), Some(2));
    }
}
