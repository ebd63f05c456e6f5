use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use tutor_core::model::{ChatMessage, LessonId};

use super::HttpRepository;
use super::wire::{
    Listing, MessageBody, MessageDto, TutorPromptBody, TutorReplyDto, messages_from_dtos,
};
use crate::repository::{ChatRepository, StorageError};

#[async_trait]
impl ChatRepository for HttpRepository {
    async fn list_messages(
        &self,
        lesson_id: LessonId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let request = self
            .request(Method::GET, &format!("/chat/lesson/{lesson_id}/messages"))
            .query(&[("limit", limit), ("offset", offset)]);
        let listing: Listing<MessageDto> = self.send_json(request).await?;
        Ok(messages_from_dtos(listing.into_vec(), Utc::now()))
    }

    async fn append_message(
        &self,
        lesson_id: LessonId,
        message: &ChatMessage,
    ) -> Result<(), StorageError> {
        let body = MessageBody {
            message: message.text(),
            is_user: message.is_from_user(),
        };
        self.send(
            self.request(Method::POST, &format!("/chat/lesson/{lesson_id}/messages"))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn clear_messages(&self, lesson_id: LessonId) -> Result<(), StorageError> {
        self.send(self.request(Method::DELETE, &format!("/chat/lesson/{lesson_id}/messages")))
            .await?;
        Ok(())
    }

    async fn tutor_reply(&self, message: &str) -> Result<String, StorageError> {
        let reply: TutorReplyDto = self
            .send_json(
                self.request(Method::POST, "/chat/ai-response")
                    .json(&TutorPromptBody { message }),
            )
            .await?;
        reply.into_text()
    }
}
