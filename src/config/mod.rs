mod settings;

pub use settings::{
    ConversationConfig, LLMConfig, LoggingConfig, MailConfig, ServerConfig, Settings,
    DEFAULT_FALLBACK_REPLY, DEFAULT_PERSONA,
};
