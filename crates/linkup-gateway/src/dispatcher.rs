use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use linkup_types::events::GatewayEvent;

/// Routes targeted events to every open gateway session of a user.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// user_id -> (session_id -> sender). A user may have several tabs open.
    sessions: RwLock<HashMap<i64, HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for `user_id`. Returns (session_id, receiver).
    pub async fn register_session(
        &self,
        user_id: i64,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .sessions
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(session_id, tx);
        (session_id, rx)
    }

    pub async fn unregister_session(&self, user_id: i64, session_id: Uuid) {
        let mut sessions = self.inner.sessions.write().await;
        if let Some(user_sessions) = sessions.get_mut(&user_id) {
            user_sessions.remove(&session_id);
            if user_sessions.is_empty() {
                sessions.remove(&user_id);
            }
        }
    }

    /// Deliver `event` to every live session of `user_id`. Never blocks on
    /// the client. Returns the number of sessions reached; 0 means the user
    /// is offline and the event is dropped.
    pub async fn send_to_user(&self, user_id: i64, event: GatewayEvent) -> usize {
        let sessions = self.inner.sessions.read().await;
        let Some(user_sessions) = sessions.get(&user_id) else {
            return 0;
        };

        let delivered = user_sessions
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count();
        debug!(user_id, delivered, "Dispatched targeted event");
        delivered
    }

    pub async fn session_count(&self, user_id: i64) -> usize {
        self.inner
            .sessions
            .read()
            .await
            .get(&user_id)
            .map_or(0, HashMap::len)
    }
}
