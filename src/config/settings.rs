use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_PERSONA: &str = "You are Pixy, the playful, sarcastic, and cute AI mascot of Pixel Studio.
- Always refer to yourself as Pixy.
- Keep answers short, cheerful, and slightly mischievous.
- Use emojis where appropriate, especially 🍄.
- Refer to Pixel Studio as \"my studio\".
- Respond in 1-2 sentences max.
- Never give unsafe or rude advice.";

pub const DEFAULT_FALLBACK_REPLY: &str =
    "Pixy is currently stuck in a mushroom 🍄. Check back later!";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub conversation: ConversationConfig,
    pub mail: MailConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_ms: u64,
}

/// Retention and prompt-window limits. A value of `0` disables the limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    pub persona: String,
    pub fallback_reply: String,
    pub context_window: usize,
    pub max_turns_per_session: usize,
    pub session_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub relay_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Self::with_defaults(Config::builder())?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .set_override_option("server.port", env::var("PORT").ok())?
            .build()?;

        config.try_deserialize()
    }

    /// Built-in values only, ignoring files and the environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder())?
            .build()?
            .try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("llm.model", "gemini-2.5-flash")?
            .set_default("llm.base_url", "https://generativelanguage.googleapis.com")?
            .set_default("llm.max_tokens", 256)?
            .set_default("llm.temperature", 0.9)?
            .set_default("llm.timeout_ms", 30_000)?
            .set_default("conversation.persona", DEFAULT_PERSONA)?
            .set_default("conversation.fallback_reply", DEFAULT_FALLBACK_REPLY)?
            .set_default("conversation.context_window", 20)?
            .set_default("conversation.max_turns_per_session", 200)?
            .set_default("conversation.session_ttl_secs", 3600)?
            .set_default("mail.relay_url", "http://localhost:8025/api/send")?
            .set_default("logging.level", "info")
    }

    pub fn api_key() -> Result<String> {
        env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))
    }

    /// Mail relay account and credential, if both are present.
    pub fn mail_credentials() -> Option<(String, String)> {
        let user = env::var("EMAIL_USER").ok().filter(|u| !u.is_empty())?;
        let pass = env::var("EMAIL_PASS").ok().filter(|p| !p.is_empty())?;
        Some((user, pass))
    }
}

impl LLMConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ConversationConfig {
    pub fn context_window(&self) -> Option<usize> {
        (self.context_window > 0).then_some(self.context_window)
    }

    pub fn max_turns(&self) -> Option<usize> {
        (self.max_turns_per_session > 0).then_some(self.max_turns_per_session)
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Process environment is shared across test threads
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let settings = Settings::defaults().unwrap();
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.llm.model, "gemini-2.5-flash");
        assert_eq!(settings.conversation.context_window(), Some(20));
        assert_eq!(settings.conversation.persona, DEFAULT_PERSONA);
        assert_eq!(settings.llm.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_disables_limits() {
        let mut settings = Settings::defaults().unwrap();
        settings.conversation.context_window = 0;
        settings.conversation.max_turns_per_session = 0;
        settings.conversation.session_ttl_secs = 0;

        assert_eq!(settings.conversation.context_window(), None);
        assert_eq!(settings.conversation.max_turns(), None);
        assert_eq!(settings.conversation.session_ttl(), None);
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("PORT", "8081");
        env::set_var("APP__LLM__MODEL", "gemini-test");
        env::set_var("APP__CONVERSATION__CONTEXT_WINDOW", "4");

        let settings = Settings::new();

        env::remove_var("PORT");
        env::remove_var("APP__LLM__MODEL");
        env::remove_var("APP__CONVERSATION__CONTEXT_WINDOW");

        let settings = settings.unwrap();
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.llm.model, "gemini-test");
        assert_eq!(settings.conversation.context_window(), Some(4));
    }

    #[test]
    fn test_mail_credentials_need_both_values() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("EMAIL_USER", "studio@example.com");
        env::remove_var("EMAIL_PASS");
        assert!(Settings::mail_credentials().is_none());

        env::set_var("EMAIL_PASS", "secret");
        let credentials = Settings::mail_credentials();

        env::remove_var("EMAIL_USER");
        env::remove_var("EMAIL_PASS");

        assert_eq!(
            credentials,
            Some(("studio@example.com".to_string(), "secret".to_string()))
        );
    }
}
