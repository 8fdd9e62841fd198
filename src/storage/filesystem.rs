//! File System Conversation Storage
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Turns are stored in the chat widget's `{from, text}` shape
//! - Every change rewrites the whole file, never appends to it

use super::{is_valid_session_id, ConversationStorage};
use crate::core::turn::{Turn, WidgetEntry};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// Storage key the chat widget persists its messages under
pub const WIDGET_STORAGE_KEY: &str = "pixyMessages";

/// File system storage - each storage key is a JSON file
/// Files are stored as {base_path}/{key}.json
pub struct FileSystemStorage {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSystemStorage {
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path)
            .await
            .context("Failed to create storage directory")?;

        Ok(Self {
            base_path,
            write_lock: Mutex::new(()),
        })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_session_id(key) {
            bail!("Invalid storage key: {:?}", key);
        }
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    async fn read_entries(&self, key: &str) -> Result<Vec<WidgetEntry>> {
        let path = self.key_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&path)
            .await
            .context(format!("Failed to read storage file: {:?}", path))?;

        serde_json::from_str(&json).context("Failed to deserialize widget messages")
    }

    async fn write_entries(&self, key: &str, entries: &[WidgetEntry]) -> Result<()> {
        let path = self.key_path(key)?;
        let json =
            serde_json::to_string(entries).context("Failed to serialize widget messages")?;

        fs::write(&path, json)
            .await
            .context(format!("Failed to write storage file: {:?}", path))?;

        tracing::debug!(
            "[FileSystemStorage] Wrote {} entries for '{}' to {:?}",
            entries.len(),
            key,
            path
        );
        Ok(())
    }
}

#[async_trait]
impl ConversationStorage for FileSystemStorage {
    async fn append_seeded(
        &self,
        session_id: &str,
        seed: Vec<Turn>,
        turns: Vec<Turn>,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries(session_id).await?;

        let seeded = entries.is_empty() && !seed.is_empty();
        if seeded {
            entries.extend(seed.into_iter().map(WidgetEntry::from));
        }
        entries.extend(turns.into_iter().map(WidgetEntry::from));

        self.write_entries(session_id, &entries).await?;
        Ok(seeded)
    }

    async fn all(&self, session_id: &str) -> Result<Vec<Turn>> {
        let entries = self.read_entries(session_id).await?;
        Ok(entries.into_iter().map(Turn::from).collect())
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_entries(session_id, &[]).await
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .context("Failed to read storage directory")?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(key) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(key.to_string());
                }
            }
        }

        tracing::debug!("[FileSystemStorage] Listed {} keys", keys.len());
        Ok(keys)
    }
}
