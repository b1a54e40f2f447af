//! Generator trait and chat message types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The author of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation sent to a [`Generator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A text-generation backend that answers an ordered list of messages.
///
/// Calls are stateless: everything the model needs is in `messages`.
/// Failures should be reported as [`RagError::Generation`](crate::RagError::Generation).
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer for the conversation in `messages`.
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// A short provider name used in errors and logs.
    fn name(&self) -> &str {
        "generator"
    }
}
