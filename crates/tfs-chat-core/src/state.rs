//! UI-agnostic conversation types
//!
//! Shared by every frontend; nothing here depends on a UI framework.

use crate::render::{DisplayContent, Tone};

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    Error,
}

/// A rendered transcript turn. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: DisplayContent,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self {
            role: ChatRole::User,
            content: DisplayContent::text(Tone::Success, text),
        }
    }

    /// Assistant turn; error-toned content becomes an error turn.
    pub fn reply(content: DisplayContent) -> Self {
        let role = if content.is_error() {
            ChatRole::Error
        } else {
            ChatRole::Assistant
        };
        Self { role, content }
    }

    pub fn plain_text(&self) -> String {
        self.content.to_plain_text()
    }
}

/// Append-only transcript.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
