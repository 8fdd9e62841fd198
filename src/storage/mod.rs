//! Conversation Storage Abstraction
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Server-held sessions live in memory, the chat widget's copy lives on disk
//! - Each storage implementation encapsulates its own retention policy

use crate::core::turn::Turn;
use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

pub mod filesystem;
pub mod memory;

/// Session used when a caller does not name one
pub const DEFAULT_SESSION: &str = "default";

static SESSION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("session id pattern is valid")
});

/// Session ids double as file names, so keep them to a safe alphabet
pub fn is_valid_session_id(session_id: &str) -> bool {
    SESSION_ID.is_match(session_id)
}

/// Ordered turn sequences keyed by session
#[async_trait]
pub trait ConversationStorage: Send + Sync {
    /// Append `turns` in one write. `seed` goes in front of them only if the
    /// session holds no turns at that moment; returns whether it did.
    async fn append_seeded(&self, session_id: &str, seed: Vec<Turn>, turns: Vec<Turn>)
        -> Result<bool>;

    /// Append several turns in one write
    async fn append_all(&self, session_id: &str, turns: Vec<Turn>) -> Result<()> {
        self.append_seeded(session_id, Vec::new(), turns).await?;
        Ok(())
    }

    /// Append one turn to the end of a session
    async fn append(&self, session_id: &str, turn: Turn) -> Result<()> {
        self.append_all(session_id, vec![turn]).await
    }

    /// Full ordered sequence for a session; empty if it doesn't exist
    async fn all(&self, session_id: &str) -> Result<Vec<Turn>>;

    /// Drop every turn of a session
    async fn clear(&self, session_id: &str) -> Result<()>;

    async fn list_sessions(&self) -> Result<Vec<String>>;

    async fn len(&self, session_id: &str) -> Result<usize> {
        Ok(self.all(session_id).await?.len())
    }
}
