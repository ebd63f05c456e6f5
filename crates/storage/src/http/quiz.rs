use async_trait::async_trait;
use reqwest::Method;
use tutor_core::model::{Question, Quiz, QuizId, TopicId};

use super::HttpRepository;
use super::wire::{
    AttemptDto, AttemptResponse, Listing, QuestionBody, QuestionDto, QuizBody, QuizDto, Single,
    SubmitBody, attempt_from_dto, question_from_dto, quiz_from_dto,
};
use crate::repository::{
    AttemptRecord, NewQuestionRecord, NewQuizRecord, QuizRepository, StorageError,
    SubmittedAnswer,
};

#[async_trait]
impl QuizRepository for HttpRepository {
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let dto: QuizDto = self
            .send_json(self.request(Method::GET, &format!("/quiz/{id}")))
            .await?;
        Ok(quiz_from_dto(dto))
    }

    async fn submit_attempt(
        &self,
        quiz_id: QuizId,
        answers: &[SubmittedAnswer],
    ) -> Result<AttemptRecord, StorageError> {
        let body = SubmitBody::new(answers);
        let response: AttemptResponse = self
            .send_json(
                self.request(Method::POST, &format!("/quiz/{quiz_id}/submit"))
                    .json(&body),
            )
            .await?;
        Ok(attempt_from_dto(quiz_id, response.into_dto()))
    }

    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<AttemptRecord>, StorageError> {
        let listing: Listing<AttemptDto> = self
            .send_json(self.request(Method::GET, &format!("/quiz/{quiz_id}/attempts")))
            .await?;
        Ok(listing
            .into_vec()
            .into_iter()
            .map(|dto| attempt_from_dto(quiz_id, dto))
            .collect())
    }

    async fn create_quiz(
        &self,
        topic_id: TopicId,
        quiz: &NewQuizRecord,
    ) -> Result<Quiz, StorageError> {
        let body = QuizBody {
            title: &quiz.title,
            description: quiz.description.as_deref(),
            order_index: quiz.order_index,
        };
        let response: Single<QuizDto> = self
            .send_json(
                self.request(Method::POST, &format!("/quiz/topic/{topic_id}/quiz"))
                    .json(&body),
            )
            .await?;
        Ok(quiz_from_dto(response.into_inner()))
    }

    async fn add_question(
        &self,
        quiz_id: QuizId,
        question: &NewQuestionRecord,
    ) -> Result<Question, StorageError> {
        let body = QuestionBody {
            question: &question.question,
            options: &question.options,
            correct_answer: question.correct_answer,
            order_index: question.order_index,
        };
        let response: Single<QuestionDto> = self
            .send_json(
                self.request(Method::POST, &format!("/quiz/{quiz_id}/question"))
                    .json(&body),
            )
            .await?;
        Ok(question_from_dto(response.into_inner()))
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<(), StorageError> {
        self.send(self.request(Method::DELETE, &format!("/quiz/{id}")))
            .await?;
        Ok(())
    }
}
