//! Pixy Relay - conversation relay and contact mail backend for Pixel Studio
//!
//! A chat message comes in over HTTP, is wrapped with Pixy's persona and the
//! session's earlier turns, goes out to the generative-language API, and the
//! reply is recorded and returned.

mod config;
pub mod core;
pub mod error;
pub mod server;
pub mod storage;
pub mod utils;

pub mod cli;

pub use config::{
    ConversationConfig, LLMConfig, LoggingConfig, MailConfig, ServerConfig, Settings,
    DEFAULT_FALLBACK_REPLY, DEFAULT_PERSONA,
};
pub use crate::core::llm::{GatewayError, GatewayReply, GeminiClient, ModelGateway};
pub use crate::core::mail::{ContactMessage, HttpMailRelay, MailError, MailRelay};
pub use crate::core::prompt::{PromptBuilder, PromptMessage, PromptRole};
pub use crate::core::relay::ConversationRelay;
pub use crate::core::turn::{Role, Turn, WidgetEntry};
pub use error::RelayError;
pub use server::AppState;

use std::sync::Arc;
use crate::storage::memory::InMemoryStorage;

/// Wire the production relay: Gemini gateway, in-memory session map, HTTP mail relay
pub fn build_state(settings: &Settings, api_key: String) -> anyhow::Result<AppState> {
    let gateway = Arc::new(GeminiClient::new(api_key, settings.clone())?);
    let storage = Arc::new(InMemoryStorage::from_config(&settings.conversation));
    let relay = ConversationRelay::from_settings(settings, gateway, storage);

    tracing::info!(
        "Pixy relay initialized (model '{}', context window {:?})",
        settings.llm.model,
        settings.conversation.context_window()
    );

    Ok(AppState {
        relay: Arc::new(relay),
        mail: Arc::new(HttpMailRelay::from_settings(settings)),
    })
}
