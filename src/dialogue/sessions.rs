//! Session map — per-identity conversation state with per-session locking.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::dialogue::state::SessionState;

/// All active sessions, keyed by chat identity.
///
/// Each session sits behind its own `Mutex`; an event holds the lock for the
/// whole transition, so events for one customer are serialized while
/// different customers proceed in parallel.
#[derive(Default)]
pub struct SessionMap {
    inner: Mutex<HashMap<String, Arc<Mutex<SessionState>>>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the session for `chat_id`, creating it on first contact.
    pub async fn acquire(&self, chat_id: &str) -> OwnedMutexGuard<SessionState> {
        let session = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(chat_id.to_string()).or_default())
        };
        // The outer map lock is released before waiting on the session lock,
        // so one busy customer never blocks the rest.
        session.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::state::DialogState;

    #[tokio::test]
    async fn sessions_are_independent() {
        let sessions = SessionMap::new();
        {
            let mut first = sessions.acquire("1").await;
            first.state = DialogState::BuildingCake;
            first.draft_cake_id = Some(7);
        }
        let second = sessions.acquire("2").await;
        assert_eq!(second.state, DialogState::Authorization);
        assert!(second.draft_cake_id.is_none());

        let first = sessions.acquire("1").await;
        assert_eq!(first.state, DialogState::BuildingCake);
        assert_eq!(first.draft_cake_id, Some(7));
    }

    #[tokio::test]
    async fn same_session_is_serialized() {
        let sessions = Arc::new(SessionMap::new());
        let guard = sessions.acquire("1").await;

        let contender = {
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move {
                let mut session = sessions.acquire("1").await;
                session.category_index += 1;
            })
        };

        // While the first guard is held the contender cannot finish.
        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        let session = sessions.acquire("1").await;
        assert_eq!(session.category_index, 1);
    }
}
