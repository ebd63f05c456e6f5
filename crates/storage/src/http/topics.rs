use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tutor_core::model::{Lesson, LessonId, Topic, TopicId, TopicSummary};

use super::HttpRepository;
use super::wire::{
    LessonBody, LessonDto, Listing, Single, TopicBody, TopicDto, decode_each, lesson_from_dto,
    summary_from_dto, topic_from_dto,
};
use crate::repository::{
    LessonRepository, NewLessonRecord, NewTopicRecord, StorageError, TopicRepository,
};

#[async_trait]
impl TopicRepository for HttpRepository {
    async fn list_topics(&self) -> Result<Vec<TopicSummary>, StorageError> {
        let listing: Listing<Value> = self
            .send_json(self.request(Method::GET, "/topics"))
            .await?;
        let dtos: Vec<TopicDto> = decode_each(listing.into_vec(), "topic");
        Ok(dtos
            .into_iter()
            .filter_map(|dto| match summary_from_dto(dto) {
                Ok(summary) => Some(summary),
                Err(err) => {
                    log::warn!("skipping topic: {err}");
                    None
                }
            })
            .collect())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Topic, StorageError> {
        let dto: TopicDto = self
            .send_json(self.request(Method::GET, &format!("/topics/{id}")))
            .await?;
        topic_from_dto(dto)
    }

    async fn create_topic(&self, topic: &NewTopicRecord) -> Result<TopicSummary, StorageError> {
        let body = TopicBody {
            name: &topic.name,
            description: topic.description.as_deref(),
        };
        let dto: TopicDto = self
            .send_json(self.request(Method::POST, "/topics").json(&body))
            .await?;
        summary_from_dto(dto)
    }

    async fn update_topic(&self, id: TopicId, topic: &NewTopicRecord) -> Result<(), StorageError> {
        let body = TopicBody {
            name: &topic.name,
            description: topic.description.as_deref(),
        };
        self.send(self.request(Method::PUT, &format!("/topics/{id}")).json(&body))
            .await?;
        Ok(())
    }

    async fn delete_topic(&self, id: TopicId) -> Result<(), StorageError> {
        self.send(self.request(Method::DELETE, &format!("/topics/{id}")))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for HttpRepository {
    async fn complete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        self.send(self.request(Method::POST, &format!("/lessons/{id}/complete")))
            .await?;
        Ok(())
    }

    async fn uncomplete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        self.send(self.request(Method::POST, &format!("/lessons/{id}/uncomplete")))
            .await?;
        Ok(())
    }

    async fn create_lesson(
        &self,
        topic_id: TopicId,
        lesson: &NewLessonRecord,
    ) -> Result<Lesson, StorageError> {
        let body = LessonBody {
            title: &lesson.title,
            content: &lesson.content,
            order_index: lesson.order_index,
        };
        let response: Single<LessonDto> = self
            .send_json(
                self.request(Method::POST, &format!("/lessons/topic/{topic_id}/lessons"))
                    .json(&body),
            )
            .await?;
        lesson_from_dto(response.into_inner())
    }

    async fn update_lesson(
        &self,
        id: LessonId,
        lesson: &NewLessonRecord,
    ) -> Result<(), StorageError> {
        let body = LessonBody {
            title: &lesson.title,
            content: &lesson.content,
            order_index: lesson.order_index,
        };
        self.send(self.request(Method::PUT, &format!("/lessons/{id}")).json(&body))
            .await?;
        Ok(())
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        self.send(self.request(Method::DELETE, &format!("/lessons/{id}")))
            .await?;
        Ok(())
    }
}
