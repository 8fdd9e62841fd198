//! In-Memory Conversation Storage
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Turn cap and idle expiry applied on write

use super::ConversationStorage;
use crate::config::ConversationConfig;
use crate::core::turn::Turn;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Session {
    turns: Vec<Turn>,
    last_active: Instant,
}

impl Session {
    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.last_active) > ttl)
    }
}

/// Session map held in process memory.
/// Data is lost when process terminates.
pub struct InMemoryStorage {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    max_turns: Option<usize>,
    idle_ttl: Option<Duration>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_turns: None,
            idle_ttl: None,
        }
    }

    pub fn from_config(config: &ConversationConfig) -> Self {
        Self::new()
            .with_max_turns(config.max_turns())
            .with_idle_ttl(config.session_ttl())
    }

    /// Oldest turns are dropped once a session holds more than `max_turns`
    pub fn with_max_turns(mut self, max_turns: Option<usize>) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Sessions with no append for longer than `ttl` are evicted
    pub fn with_idle_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.idle_ttl = ttl;
        self
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStorage for InMemoryStorage {
    async fn append_seeded(
        &self,
        session_id: &str,
        seed: Vec<Turn>,
        turns: Vec<Turn>,
    ) -> Result<bool> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.idle_ttl, now));
        if sessions.len() < before {
            tracing::debug!(
                "[InMemoryStorage] Evicted {} idle sessions",
                before - sessions.len()
            );
        }

        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                turns: Vec::new(),
                last_active: now,
            });

        let seeded = session.turns.is_empty() && !seed.is_empty();
        if seeded {
            session.turns.extend(seed);
        }
        session.turns.extend(turns);
        session.last_active = now;

        if let Some(max) = self.max_turns {
            if session.turns.len() > max {
                let excess = session.turns.len() - max;
                session.turns.drain(..excess);
            }
        }

        tracing::debug!(
            "[InMemoryStorage] Session '{}' now holds {} turns",
            session_id,
            session.turns.len()
        );
        Ok(seeded)
    }

    async fn all(&self, session_id: &str) -> Result<Vec<Turn>> {
        let sessions = self.sessions.read().await;
        let turns = sessions
            .get(session_id)
            .filter(|session| !session.is_expired(self.idle_ttl, Instant::now()))
            .map(|session| session.turns.clone())
            .unwrap_or_default();
        Ok(turns)
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        tracing::debug!("[InMemoryStorage] Cleared session '{}'", session_id);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let now = Instant::now();
        let sessions = self.sessions.read().await;
        Ok(sessions
            .iter()
            .filter(|(_, session)| !session.is_expired(self.idle_ttl, now))
            .map(|(id, _)| id.clone())
            .collect())
    }
}
