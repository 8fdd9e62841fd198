//! Prompt assembly
//!
//! Produces the ordered message list sent to the model: persona first,
//! then prior turns in conversation order, then the new user message.

use crate::core::turn::{Role, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    /// Persona instruction
    System,
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl From<&Turn> for PromptMessage {
    fn from(turn: &Turn) -> Self {
        let role = match turn.role {
            Role::User => PromptRole::User,
            Role::Assistant => PromptRole::Model,
        };
        Self {
            role,
            content: turn.content.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
    context_window: Option<usize>,
}

impl PromptBuilder {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            context_window: None,
        }
    }

    /// Only the most recent `turns` prior turns are sent to the model.
    /// Retention in the store is unaffected.
    pub fn with_context_window(mut self, turns: Option<usize>) -> Self {
        self.context_window = turns;
        self
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn build(&self, history: &[Turn], message: &str) -> Vec<PromptMessage> {
        let skip = match self.context_window {
            Some(window) => history.len().saturating_sub(window),
            None => 0,
        };
        let window = &history[skip..];

        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(PromptMessage {
            role: PromptRole::System,
            content: self.persona.clone(),
        });
        messages.extend(window.iter().map(PromptMessage::from));
        messages.push(PromptMessage {
            role: PromptRole::User,
            content: message.to_string(),
        });
        messages
    }
}
