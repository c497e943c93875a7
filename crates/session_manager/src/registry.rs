//! Registry of live chat sessions, one per session id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::structs::ChatSession;

pub type SharedSession = Arc<Mutex<ChatSession>>;

/// Keeps each session's state apart from every other session's.
#[derive(Default)]
pub struct SessionRegistry {
    /// session_id -> session
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the session for `session_id`.
    pub async fn session(&self, session_id: &str, default_model: &str) -> SharedSession {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(session_id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have created it between the two locks.
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::info!(session_id, model = default_model, "Session created");
                Arc::new(Mutex::new(ChatSession::new(default_model)))
            })
            .clone()
    }

    /// Forget a session. Returns whether it existed.
    pub async fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            tracing::info!(session_id, "Session dropped");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
