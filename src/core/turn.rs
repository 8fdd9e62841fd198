//! Conversation turns and their client-persisted representation

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// Also accepts the model API's own name for this role
    #[serde(alias = "model")]
    Assistant,
}

/// One message exchanged in a conversation, tagged with its originating role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Pixy,
}

/// Turn as the chat widget stores it: `{"from": "user" | "pixy", "text": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetEntry {
    pub from: Speaker,
    pub text: String,
}

impl From<Turn> for WidgetEntry {
    fn from(turn: Turn) -> Self {
        let from = match turn.role {
            Role::User => Speaker::User,
            Role::Assistant => Speaker::Pixy,
        };
        Self {
            from,
            text: turn.content,
        }
    }
}

impl From<WidgetEntry> for Turn {
    fn from(entry: WidgetEntry) -> Self {
        let role = match entry.from {
            Speaker::User => Role::User,
            Speaker::Pixy => Role::Assistant,
        };
        Self {
            role,
            content: entry.text,
        }
    }
}
