//! Tutor conversation messages.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    Learner,
    Tutor,
}

/// One turn of a lesson conversation. Text is markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    text: String,
    speaker: Speaker,
    created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// # Errors
    ///
    /// Returns `ChatError::EmptyMessage` if the text is blank.
    pub fn new(
        text: impl Into<String>,
        speaker: Speaker,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ChatError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        Ok(Self {
            text,
            speaker,
            created_at,
        })
    }

    /// # Errors
    ///
    /// Returns `ChatError::EmptyMessage` if the text is blank.
    pub fn learner(text: impl Into<String>, at: DateTime<Utc>) -> Result<Self, ChatError> {
        Self::new(text, Speaker::Learner, at)
    }

    /// # Errors
    ///
    /// Returns `ChatError::EmptyMessage` if the text is blank.
    pub fn tutor(text: impl Into<String>, at: DateTime<Utc>) -> Result<Self, ChatError> {
        Self::new(text, Speaker::Tutor, at)
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    #[must_use]
    pub fn is_from_user(&self) -> bool {
        self.speaker == Speaker::Learner
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Canned markdown replies used when no real tutor backend is available.
pub const CANNED_TUTOR_REPLIES: [&str; 5] = [
    "That's a **great question**! Let me explain...\n\n- First, we need to understand the basics\n- Then, we can move to more advanced concepts\n- Finally, we'll practice with examples",
    "I see what you're asking. Here's how it works:\n\n1. Start with the fundamentals\n2. Build on that knowledge\n3. Apply it in real scenarios",
    "**Excellent observation!** The key concept here is understanding how everything connects together.\n\n`Remember`: Practice makes perfect!",
    "Let me break that down for you:\n\n- **Core concept**: This is the foundation\n- **Implementation**: How we use it in practice\n- **Best practices**: Tips for success",
    "That's correct! You're getting the hang of it. 🎉\n\n*Keep up the great work!*",
];

/// Greeting used when the tutor cannot produce its own opening message.
#[must_use]
pub fn fallback_greeting(lesson_title: &str) -> String {
    format!(
        "Hello! Welcome to **\"{lesson_title}\"**. I'm here to help you learn. Feel free to ask me anything!"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn blank_messages_are_rejected() {
        assert_eq!(
            ChatMessage::learner(" \n", fixed_now()).unwrap_err(),
            ChatError::EmptyMessage
        );
    }

    #[test]
    fn speaker_maps_to_is_from_user() {
        let mine = ChatMessage::learner("hi", fixed_now()).unwrap();
        let theirs = ChatMessage::tutor("hello", fixed_now()).unwrap();
        assert!(mine.is_from_user());
        assert!(!theirs.is_from_user());
    }

    #[test]
    fn greeting_names_the_lesson() {
        let text = fallback_greeting("JSX Basics");
        assert!(text.contains("**\"JSX Basics\"**"));
    }
}
