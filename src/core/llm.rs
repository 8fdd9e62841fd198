//! Model gateway
//!
//! Performs the outbound `generateContent` call and reduces the response to
//! plain reply text. Callers that go through [`ModelGateway::reply`] never
//! see an error: any failure becomes the configured fallback string.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;
use crate::core::prompt::{PromptMessage, PromptRole};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Response decode error: {0}")]
    Decode(String),

    #[error("Model returned no reply text")]
    EmptyReply,
}

/// Outcome of a gateway call. Both variants carry user-safe text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayReply {
    Answer(String),
    Fallback(String),
}

impl GatewayReply {
    pub fn text(&self) -> &str {
        match self {
            GatewayReply::Answer(text) | GatewayReply::Fallback(text) => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, GatewayReply::Fallback(_))
    }
}

#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// One outbound call. No retry.
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, GatewayError>;

    fn fallback_reply(&self) -> &str;

    async fn reply(&self, messages: &[PromptMessage]) -> GatewayReply {
        match self.generate(messages).await {
            Ok(text) => GatewayReply::Answer(text),
            Err(e) => {
                tracing::error!("[ModelGateway] Falling back after failed model call: {}", e);
                GatewayReply::Fallback(self.fallback_reply().to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    settings: Settings,
}

impl GeminiClient {
    pub fn new(api_key: String, settings: Settings) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(settings.llm.timeout()).build()?;
        Ok(Self {
            client,
            api_key,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.llm.base_url.trim_end_matches('/'),
            self.settings.llm.model
        )
    }

    fn build_request(&self, messages: &[PromptMessage]) -> GenerateContentRequest {
        let mut system_instruction: Option<Content> = None;
        let mut contents = Vec::with_capacity(messages.len());

        for message in messages {
            match message.role {
                PromptRole::System => {
                    system_instruction = Some(Content::text(None, &message.content));
                }
                PromptRole::User => contents.push(Content::text(Some("user"), &message.content)),
                PromptRole::Model => contents.push(Content::text(Some("model"), &message.content)),
            }
        }

        GenerateContentRequest {
            system_instruction,
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: self.settings.llm.max_tokens,
                temperature: self.settings.llm.temperature,
            },
        }
    }
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, GatewayError> {
        let request = self.build_request(messages);

        tracing::debug!(
            "[GeminiClient] Sending {} contents to model '{}'",
            request.contents.len(),
            self.settings.llm.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!("[GeminiClient] API returned error status {}: {}", status, body);
            return Err(GatewayError::Status { status, body });
        }

        let body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(GatewayError::EmptyReply);
        }
        Ok(text.to_string())
    }

    fn fallback_reply(&self) -> &str {
        &self.settings.conversation.fallback_reply
    }
}
