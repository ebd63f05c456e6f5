use thiserror::Error;

use crate::model::ids::LessonId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,
}

/// A single lesson inside a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    content: String,
    completed: bool,
}

impl Lesson {
    /// Creates an incomplete lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` if the title is blank.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, LessonError> {
        Self::from_persisted(id, title, content, false)
    }

    /// Rehydrates a lesson as reported by the backend.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` if the title is blank.
    pub fn from_persisted(
        id: LessonId,
        title: impl Into<String>,
        content: impl Into<String>,
        completed: bool,
    ) -> Result<Self, LessonError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        Ok(Self {
            id,
            title,
            content: content.into(),
            completed,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Marks the lesson completed. Returns `true` if this call changed it.
    pub fn complete(&mut self) -> bool {
        let changed = !self.completed;
        self.completed = true;
        changed
    }

    /// Returns `true` if the lesson was completed before.
    pub fn uncomplete(&mut self) -> bool {
        let changed = self.completed;
        self.completed = false;
        changed
    }

    /// Replaces title and content; completion is kept.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` if the title is blank.
    pub fn edit(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), LessonError> {
        let edited = Self::from_persisted(self.id, title, content, self.completed)?;
        *self = edited;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_is_one_way_and_reports_transition() {
        let mut lesson = Lesson::new(LessonId::new(1), "JSX Basics", "").unwrap();
        assert!(!lesson.is_completed());
        assert!(lesson.complete());
        assert!(!lesson.complete());
        assert!(lesson.is_completed());
    }

    #[test]
    fn uncomplete_reports_transition() {
        let mut lesson = Lesson::from_persisted(LessonId::new(1), "JSX", "", true).unwrap();
        assert!(lesson.uncomplete());
        assert!(!lesson.uncomplete());
        assert!(!lesson.is_completed());
    }

    #[test]
    fn edit_keeps_completion() {
        let mut lesson = Lesson::from_persisted(LessonId::new(1), "JSX", "", true).unwrap();
        lesson.edit(" Props ", "passing data down").unwrap();
        assert_eq!(lesson.title(), "Props");
        assert!(lesson.is_completed());
        assert_eq!(lesson.edit("", "x"), Err(LessonError::EmptyTitle));
        assert_eq!(lesson.title(), "Props");
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = Lesson::new(LessonId::new(1), "   ", "body").unwrap_err();
        assert_eq!(err, LessonError::EmptyTitle);
    }
}
