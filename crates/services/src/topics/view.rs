use tutor_core::model::{LessonId, QuizId, Topic, TopicId};
use tutor_core::timeline::{Timeline, TimelineEntry, TimelineKind};

/// What a timeline row opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelineTarget {
    Lesson(LessonId),
    Quiz(QuizId),
}

impl TimelineTarget {
    #[must_use]
    pub fn kind(&self) -> TimelineKind {
        match self {
            TimelineTarget::Lesson(_) => TimelineKind::Lesson,
            TimelineTarget::Quiz(_) => TimelineKind::Quiz,
        }
    }
}

/// Presentation-agnostic row of a topic's learning path.
///
/// Owns its data so callers can keep it after the topic cache changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRow {
    pub position: usize,
    pub target: TimelineTarget,
    pub title: String,
    pub locked: bool,
    /// Always `false` for quizzes.
    pub completed: bool,
    /// Number of questions, for quizzes.
    pub question_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineView {
    pub topic_id: TopicId,
    pub topic_name: String,
    pub rows: Vec<TimelineRow>,
    pub completed_lessons: usize,
    pub total_lessons: usize,
}

impl TimelineView {
    #[must_use]
    pub fn from_topic(topic: &Topic) -> Self {
        let rows = Timeline::for_topic(topic)
            .items()
            .iter()
            .map(|item| match item.entry {
                TimelineEntry::Lesson(lesson) => TimelineRow {
                    position: item.position,
                    target: TimelineTarget::Lesson(lesson.id()),
                    title: lesson.title().to_owned(),
                    locked: item.locked,
                    completed: lesson.is_completed(),
                    question_count: None,
                },
                TimelineEntry::Quiz(quiz) => TimelineRow {
                    position: item.position,
                    target: TimelineTarget::Quiz(quiz.id()),
                    title: quiz.title().to_owned(),
                    locked: item.locked,
                    completed: false,
                    question_count: Some(quiz.question_count()),
                },
            })
            .collect();

        Self {
            topic_id: topic.id(),
            topic_name: topic.name().to_owned(),
            rows,
            completed_lessons: topic.completed_lessons(),
            total_lessons: topic.lessons().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row the learner should open next: the first unlocked, unfinished lesson.
    #[must_use]
    pub fn next_lesson(&self) -> Option<&TimelineRow> {
        self.rows.iter().find(|row| {
            !row.locked && !row.completed && row.target.kind() == TimelineKind::Lesson
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::model::{Lesson, Quiz};

    fn lesson(id: u64, done: bool) -> Lesson {
        Lesson::from_persisted(LessonId::new(id), format!("L{id}"), "", done).unwrap()
    }

    #[test]
    fn rows_follow_the_interleaved_order() {
        let topic = Topic::new(TopicId::new(1), "Rust", None)
            .unwrap()
            .with_content(
                vec![lesson(1, true), lesson(2, false), lesson(3, false)],
                vec![Quiz::new(QuizId::new(9), "Check")],
            );
        let view = TimelineView::from_topic(&topic);

        let targets: Vec<TimelineTarget> = view.rows.iter().map(|r| r.target).collect();
        assert_eq!(
            targets,
            vec![
                TimelineTarget::Lesson(LessonId::new(1)),
                TimelineTarget::Lesson(LessonId::new(2)),
                TimelineTarget::Quiz(QuizId::new(9)),
                TimelineTarget::Lesson(LessonId::new(3)),
            ]
        );
        let locked: Vec<bool> = view.rows.iter().map(|r| r.locked).collect();
        assert_eq!(locked, vec![false, false, true, true]);
        assert_eq!(view.rows[2].question_count, Some(0));
        assert_eq!(view.completed_lessons, 1);
        assert_eq!(view.total_lessons, 3);
        assert_eq!(
            view.next_lesson().map(|r| r.target),
            Some(TimelineTarget::Lesson(LessonId::new(2)))
        );
    }

    #[test]
    fn topic_without_content_has_no_rows() {
        let topic = Topic::new(TopicId::new(1), "Empty", None).unwrap();
        let view = TimelineView::from_topic(&topic);
        assert!(view.is_empty());
        assert!(view.next_lesson().is_none());
    }
}
