//! Conversation relay - one request/reply turn against a stored conversation
//!
//! Information Hiding:
//! - Storage backend and model backend hidden behind traits
//! - Prompt assembly and history bookkeeping internalized
//! - Failures surface as `RelayError`, never as raw upstream errors

use std::sync::Arc;

use crate::config::Settings;
use crate::core::llm::{GatewayReply, ModelGateway};
use crate::core::prompt::PromptBuilder;
use crate::core::turn::Turn;
use crate::error::RelayError;
use crate::storage::{is_valid_session_id, ConversationStorage};

pub const MESSAGE_REQUIRED: &str = "Message is required";

pub struct ConversationRelay {
    prompt: PromptBuilder,
    gateway: Arc<dyn ModelGateway>,
    storage: Arc<dyn ConversationStorage>,
}

impl ConversationRelay {
    pub fn new(
        prompt: PromptBuilder,
        gateway: Arc<dyn ModelGateway>,
        storage: Arc<dyn ConversationStorage>,
    ) -> Self {
        Self {
            prompt,
            gateway,
            storage,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        gateway: Arc<dyn ModelGateway>,
        storage: Arc<dyn ConversationStorage>,
    ) -> Self {
        let prompt = PromptBuilder::new(settings.conversation.persona.clone())
            .with_context_window(settings.conversation.context_window());
        Self::new(prompt, gateway, storage)
    }

    /// Send `message` in `session_id` and return the model's reply.
    ///
    /// `seed` is the caller's own copy of the conversation. It is only used
    /// when the session holds no turns yet. It is stored in the same write as
    /// the new exchange, and only if the session is still empty at that point.
    /// On success the user turn and the assistant turn are appended together;
    /// on failure nothing is.
    pub async fn send_message(
        &self,
        session_id: &str,
        message: &str,
        seed: Option<Vec<Turn>>,
    ) -> Result<String, RelayError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(RelayError::Validation(MESSAGE_REQUIRED.to_string()));
        }
        check_session_id(session_id)?;

        let stored = self.storage.all(session_id).await.map_err(storage_error)?;
        let seed = match seed {
            Some(turns) if stored.is_empty() && !turns.is_empty() => {
                tracing::debug!(
                    "[Relay {}] Using {} client turns as context for empty session",
                    session_id,
                    turns.len()
                );
                turns
            }
            _ => Vec::new(),
        };
        let history = if seed.is_empty() { &stored } else { &seed };

        let messages = self.prompt.build(history, message);

        let reply = match self.gateway.reply(&messages).await {
            GatewayReply::Answer(text) => text,
            GatewayReply::Fallback(text) => {
                tracing::warn!("[Relay {}] Model unavailable, replying with fallback", session_id);
                return Err(RelayError::Upstream(text));
            }
        };

        let offered_seed = !seed.is_empty();
        let seeded = self
            .storage
            .append_seeded(
                session_id,
                seed,
                vec![Turn::user(message), Turn::assistant(reply.clone())],
            )
            .await
            .map_err(storage_error)?;
        if offered_seed && !seeded {
            tracing::debug!(
                "[Relay {}] Session filled concurrently, client turns not stored",
                session_id
            );
        }

        Ok(reply)
    }

    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>, RelayError> {
        check_session_id(session_id)?;
        self.storage.all(session_id).await.map_err(storage_error)
    }

    pub async fn clear(&self, session_id: &str) -> Result<(), RelayError> {
        check_session_id(session_id)?;
        self.storage.clear(session_id).await.map_err(storage_error)
    }
}

fn check_session_id(session_id: &str) -> Result<(), RelayError> {
    if is_valid_session_id(session_id) {
        Ok(())
    } else {
        Err(RelayError::Validation("Invalid session id".to_string()))
    }
}

fn storage_error(e: anyhow::Error) -> RelayError {
    RelayError::Storage(format!("{:#}", e))
}
