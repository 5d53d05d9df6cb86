//! Session management — each conversation gets its own session with a
//! bounded in-memory history, which is what gives the specialist agents
//! their conversation memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use wayfare_core::types::{ChatTurn, TurnRole};

/// Maximum turns retained per session
const MAX_HISTORY_TURNS: usize = 40;

/// A single chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub message_count: u64,
    #[serde(skip)]
    pub history: Vec<ChatTurn>,
}

impl Session {
    fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            created_at: now,
            last_activity: now,
            message_count: 0,
            history: Vec::new(),
        }
    }
}

/// Manages all active sessions
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionManager {
    /// Create a new session manager with a default "main" session
    pub fn new() -> Self {
        let mut sessions = HashMap::new();
        sessions.insert("main".to_string(), Session::new("main", "Main"));
        Self {
            sessions: Arc::new(RwLock::new(sessions)),
        }
    }

    /// List all sessions, most recently active first
    pub async fn list(&self) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        let mut list: Vec<Session> = sessions.values().cloned().collect();
        list.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        list
    }

    /// Get a session by ID
    pub async fn get(&self, id: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// Create a new session, returns the session
    pub async fn create(&self, name: &str) -> Session {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), name);
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.clone(), session.clone());
        info!("Created session '{}' ({})", name, id);
        session
    }

    /// Get a session's conversation history, creating the session on first use
    pub async fn history(&self, session_id: &str) -> Vec<ChatTurn> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id, session_id))
            .history
            .clone()
    }

    /// Append a turn to a session, trimming old history and bumping activity
    pub async fn record_turn(&self, session_id: &str, role: TurnRole, content: &str) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id, session_id));

        session.history.push(ChatTurn {
            role,
            content: content.to_string(),
        });
        if session.history.len() > MAX_HISTORY_TURNS {
            let excess = session.history.len() - MAX_HISTORY_TURNS;
            session.history.drain(..excess);
        }
        session.last_activity = Utc::now();
        session.message_count += 1;
        debug!(
            "Session '{}' activity (messages: {})",
            session_id, session.message_count
        );
    }

    /// Number of active sessions
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
