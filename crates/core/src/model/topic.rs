use thiserror::Error;

use crate::model::ids::{LessonId, QuizId, TopicId};
use crate::model::lesson::{Lesson, LessonError};
use crate::model::quiz::{Question, Quiz};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic name cannot be empty")]
    EmptyName,

    #[error("lesson {0} does not belong to this topic")]
    LessonNotFound(LessonId),

    #[error("quiz {0} does not belong to this topic")]
    QuizNotFound(QuizId),

    #[error(transparent)]
    Lesson(#[from] LessonError),
}

/// A course-like grouping of ordered lessons and quizzes.
///
/// List order is the backend's position order and is never re-sorted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    name: String,
    description: Option<String>,
    lessons: Vec<Lesson>,
    quizzes: Vec<Quiz>,
}

impl Topic {
    /// Creates a topic with no lessons or quizzes.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyName` if the name is blank.
    pub fn new(
        id: TopicId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, TopicError> {
        let name = normalize_name(name.into())?;
        Ok(Self {
            id,
            name,
            description: normalize_description(description),
            lessons: Vec::new(),
            quizzes: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_content(mut self, lessons: Vec<Lesson>, quizzes: Vec<Quiz>) -> Self {
        self.lessons = lessons;
        self.quizzes = quizzes;
        self
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    #[must_use]
    pub fn lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id() == id)
    }

    #[must_use]
    pub fn quiz(&self, id: QuizId) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn completed_lessons(&self) -> usize {
        self.lessons.iter().filter(|l| l.is_completed()).count()
    }

    /// Renames the topic and replaces its description.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyName` if the new name is blank.
    pub fn rename(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<(), TopicError> {
        self.name = normalize_name(name.into())?;
        self.description = normalize_description(description);
        Ok(())
    }

    /// Marks a lesson completed. Returns `true` if its state changed.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::LessonNotFound` if the lesson is not in this topic.
    pub fn complete_lesson(&mut self, id: LessonId) -> Result<bool, TopicError> {
        self.lessons
            .iter_mut()
            .find(|l| l.id() == id)
            .map(Lesson::complete)
            .ok_or(TopicError::LessonNotFound(id))
    }

    /// Marks a lesson not completed. Returns `true` if its state changed.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::LessonNotFound` if the lesson is not in this topic.
    pub fn uncomplete_lesson(&mut self, id: LessonId) -> Result<bool, TopicError> {
        self.lessons
            .iter_mut()
            .find(|l| l.id() == id)
            .map(Lesson::uncomplete)
            .ok_or(TopicError::LessonNotFound(id))
    }

    /// Appends a lesson at the end of the path.
    pub fn push_lesson(&mut self, lesson: Lesson) {
        self.lessons.push(lesson);
    }

    /// # Errors
    ///
    /// Returns `TopicError::LessonNotFound` for a foreign lesson and
    /// `TopicError::Lesson` for a blank title.
    pub fn edit_lesson(
        &mut self,
        id: LessonId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), TopicError> {
        let lesson = self
            .lessons
            .iter_mut()
            .find(|l| l.id() == id)
            .ok_or(TopicError::LessonNotFound(id))?;
        lesson.edit(title, content)?;
        Ok(())
    }

    /// Returns `true` if the lesson was part of this topic.
    pub fn remove_lesson(&mut self, id: LessonId) -> bool {
        let before = self.lessons.len();
        self.lessons.retain(|l| l.id() != id);
        self.lessons.len() != before
    }

    pub fn push_quiz(&mut self, quiz: Quiz) {
        self.quizzes.push(quiz);
    }

    /// Returns `true` if the quiz was part of this topic.
    pub fn remove_quiz(&mut self, id: QuizId) -> bool {
        let before = self.quizzes.len();
        self.quizzes.retain(|q| q.id() != id);
        self.quizzes.len() != before
    }

    /// # Errors
    ///
    /// Returns `TopicError::QuizNotFound` if the quiz is not in this topic.
    pub fn add_question(&mut self, quiz_id: QuizId, question: Question) -> Result<(), TopicError> {
        self.quizzes
            .iter_mut()
            .find(|q| q.id() == quiz_id)
            .ok_or(TopicError::QuizNotFound(quiz_id))?
            .push_question(question);
        Ok(())
    }

    /// Swaps in a freshly fetched copy of one of this topic's quizzes.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::QuizNotFound` if no quiz with that id exists here.
    pub fn replace_quiz(&mut self, quiz: Quiz) -> Result<(), TopicError> {
        let id = quiz.id();
        let slot = self
            .quizzes
            .iter_mut()
            .find(|q| q.id() == id)
            .ok_or(TopicError::QuizNotFound(id))?;
        *slot = quiz;
        Ok(())
    }

    #[must_use]
    pub fn summary(&self) -> TopicSummary {
        TopicSummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            lesson_count: self.lessons.len(),
            quiz_count: self.quizzes.len(),
            completed_lessons: self.completed_lessons(),
        }
    }
}

/// List-view shape of a topic, with aggregate counts instead of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    pub id: TopicId,
    pub name: String,
    pub description: Option<String>,
    pub lesson_count: usize,
    pub quiz_count: usize,
    pub completed_lessons: usize,
}

fn normalize_name(name: String) -> Result<String, TopicError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TopicError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty())
}
