//! Sources of tutor replies for the lesson chat.

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use storage::repository::ChatRepository;
use tutor_core::model::CANNED_TUTOR_REPLIES;
use tutor_core::model::chat::fallback_greeting;

use crate::error::TutorError;

/// Produces the tutor's side of a lesson conversation.
#[async_trait]
pub trait TutorResponder: Send + Sync {
    /// Opening message for a fresh lesson chat.
    ///
    /// # Errors
    ///
    /// Returns `TutorError` if the responder cannot produce a greeting.
    async fn greeting(&self, lesson_title: &str) -> Result<String, TutorError> {
        Ok(fallback_greeting(lesson_title))
    }

    /// Reply to one learner message.
    ///
    /// # Errors
    ///
    /// Returns `TutorError` if no reply could be produced.
    async fn reply(&self, lesson_title: &str, message: &str) -> Result<String, TutorError>;
}

/// Asks the backend's `/chat/ai-response` endpoint.
#[derive(Clone)]
pub struct BackendTutor {
    chat: Arc<dyn ChatRepository>,
}

impl BackendTutor {
    #[must_use]
    pub fn new(chat: Arc<dyn ChatRepository>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl TutorResponder for BackendTutor {
    async fn reply(&self, _lesson_title: &str, message: &str) -> Result<String, TutorError> {
        let reply = self.chat.tutor_reply(message).await?;
        if reply.trim().is_empty() {
            return Err(TutorError::EmptyResponse);
        }
        Ok(reply)
    }
}

/// Picks one of the canned markdown replies at random.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockTutor;

#[async_trait]
impl TutorResponder for MockTutor {
    async fn reply(&self, _lesson_title: &str, _message: &str) -> Result<String, TutorError> {
        Ok(canned_reply())
    }
}

/// A random entry from the canned replies.
#[must_use]
pub fn canned_reply() -> String {
    let mut rng = rand::rng();
    CANNED_TUTOR_REPLIES
        .choose(&mut rng)
        .copied()
        .unwrap_or(CANNED_TUTOR_REPLIES[0])
        .to_owned()
}

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl OpenAiConfig {
    /// Reads `TUTOR_AI_API_KEY`, `TUTOR_AI_BASE_URL` and `TUTOR_AI_MODEL`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("TUTOR_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("TUTOR_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("TUTOR_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Talks to an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiTutor {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiTutor {
    #[must_use]
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn complete(&self, system: String, prompt: &str) -> Result<String, TutorError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                CompletionMessage {
                    role: "system",
                    content: system,
                },
                CompletionMessage {
                    role: "user",
                    content: prompt.to_owned(),
                },
            ],
            temperature: 0.4,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TutorError::HttpStatus(response.status()));
        }

        let body: CompletionResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(TutorError::EmptyResponse)?;

        Ok(content.trim().to_owned())
    }
}

fn system_prompt(lesson_title: &str) -> String {
    format!(
        "You are a patient tutor teaching the lesson \"{lesson_title}\". \
         Answer in short markdown, ask a follow-up question when it helps, \
         and stay on the lesson's subject."
    )
}

#[async_trait]
impl TutorResponder for OpenAiTutor {
    async fn greeting(&self, lesson_title: &str) -> Result<String, TutorError> {
        self.complete(
            system_prompt(lesson_title),
            "Greet the learner and briefly say what this lesson covers.",
        )
        .await
    }

    async fn reply(&self, lesson_title: &str, message: &str) -> Result<String, TutorError> {
        self.complete(system_prompt(lesson_title), message).await
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<CompletionMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct CompletionMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessageResponse,
}

#[derive(Debug, Deserialize)]
struct CompletionMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn mock_tutor_replies_with_a_canned_message() {
        let reply = MockTutor.reply("Intro", "what is a closure?").await.unwrap();
        assert!(CANNED_TUTOR_REPLIES.contains(&reply.as_str()));
    }

    #[tokio::test]
    async fn default_greeting_names_the_lesson() {
        let greeting = MockTutor.greeting("What is React?").await.unwrap();
        assert!(greeting.contains("**\"What is React?\"**"));
    }

    #[tokio::test]
    async fn backend_tutor_relays_repository_replies() {
        let tutor = BackendTutor::new(Arc::new(InMemoryRepository::new()));
        let reply = tutor.reply("Intro", "hello").await.unwrap();
        assert_eq!(reply, CANNED_TUTOR_REPLIES[0]);
    }
}
