//! System prompt assembly and chat history
//!
//! Retrieved context is placed in the system message of every turn:
//!
//! ```text
//! <base prompt>
//!
//! ---
//! RELEVANT CONTEXT:
//! <fragments joined by "\n---\n", or NO_CONTEXT_PLACEHOLDER>
//! ---
//! ```
//!
//! The chat endpoint itself is behind [`ChatBackend`]; nothing here opens a
//! connection. [`ChatRequest`] is the body a chat-completion client would send.

use crate::retrieval::Retriever;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Used in the context section when retrieval found nothing.
pub const NO_CONTEXT_PLACEHOLDER: &str =
    "No relevant context was found in the files for this question.";

pub const DEFAULT_BASE_PROMPT: &str = "You are a helpful assistant. \
Use the relevant context below, taken from the user's documents, to answer their questions.";

pub const DEFAULT_CHAT_MODEL: &str = "deepseek-chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in chat-completion wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

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

/// Request body for an OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            messages,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Builds system messages around a fixed base prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptAssembler {
    base_prompt: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_PROMPT)
    }
}

impl PromptAssembler {
    pub fn new(base_prompt: impl Into<String>) -> Self {
        Self {
            base_prompt: base_prompt.into(),
        }
    }

    /// Reads the base prompt from `path`, falling back to [`DEFAULT_BASE_PROMPT`]
    /// when the file is missing or unreadable.
    pub async fn load_or_default(path: &Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(text) if !text.trim().is_empty() => Self::new(text.trim_end()),
            Ok(_) => {
                tracing::warn!("{} is empty, using the default prompt", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read prompt from {}: {}. Using the default prompt",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn base_prompt(&self) -> &str {
        &self.base_prompt
    }

    pub fn system_message(&self, relevant_context: &str) -> ChatMessage {
        let context = if relevant_context.trim().is_empty() {
            NO_CONTEXT_PLACEHOLDER
        } else {
            relevant_context
        };
        ChatMessage::system(format!(
            "{}\n\n---\nRELEVANT CONTEXT:\n{}\n---",
            self.base_prompt, context
        ))
    }
}

/// A hosted chat-completion endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Returns the assistant reply for `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// User and assistant turns, oldest first. The system message is rebuilt per turn.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    history: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn messages_for(&self, system: ChatMessage) -> Vec<ChatMessage> {
        std::iter::once(system)
            .chain(self.history.iter().cloned())
            .collect()
    }

    /// Records `user_prompt` and returns the message list for the next request.
    pub async fn prepare_turn(
        &mut self,
        user_prompt: &str,
        retriever: &Retriever,
        assembler: &PromptAssembler,
    ) -> Result<Vec<ChatMessage>> {
        let relevant_context = retriever
            .relevant_context(user_prompt)
            .await
            .context("Failed to retrieve context")?;
        self.history.push(ChatMessage::user(user_prompt));
        Ok(self.messages_for(assembler.system_message(&relevant_context)))
    }

    /// Runs one turn through `backend`. On failure the history is left as it was.
    pub async fn ask(
        &mut self,
        user_prompt: &str,
        retriever: &Retriever,
        assembler: &PromptAssembler,
        backend: &dyn ChatBackend,
    ) -> Result<String> {
        let messages = self.prepare_turn(user_prompt, retriever, assembler).await?;

        match backend.complete(&messages).await {
            Ok(reply) => {
                self.history.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e.context("Chat completion failed"))
            }
        }
    }
}
