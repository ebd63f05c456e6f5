//! Interleaves a topic's lessons and quizzes into one access-gated path.
//!
//! Lessons are split into `ceil(L / (Q + 1))`-sized groups with one quiz
//! after each group. An entry is locked once any lesson before it is still
//! incomplete; quizzes never gate what follows them.

use crate::model::{Lesson, LessonId, Quiz, QuizId, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelineKind {
    Lesson,
    Quiz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEntry<'a> {
    Lesson(&'a Lesson),
    Quiz(&'a Quiz),
}

impl TimelineEntry<'_> {
    #[must_use]
    pub fn kind(&self) -> TimelineKind {
        match self {
            TimelineEntry::Lesson(_) => TimelineKind::Lesson,
            TimelineEntry::Quiz(_) => TimelineKind::Quiz,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            TimelineEntry::Lesson(lesson) => lesson.title(),
            TimelineEntry::Quiz(quiz) => quiz.title(),
        }
    }
}

/// One stop on the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineItem<'a> {
    pub entry: TimelineEntry<'a>,
    /// Position in the interleaved sequence.
    pub position: usize,
    /// Index within the topic's lesson list or quiz list.
    pub source_index: usize,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Timeline<'a> {
    items: Vec<TimelineItem<'a>>,
}

impl<'a> Timeline<'a> {
    #[must_use]
    pub fn for_topic(topic: &'a Topic) -> Self {
        build_timeline(topic.lessons(), topic.quizzes())
    }

    #[must_use]
    pub fn items(&self) -> &[TimelineItem<'a>] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<&TimelineItem<'a>> {
        self.items.get(position)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn unlocked_count(&self) -> usize {
        self.items.iter().filter(|item| !item.locked).count()
    }

    /// The first entry the learner cannot open yet.
    #[must_use]
    pub fn first_locked(&self) -> Option<&TimelineItem<'a>> {
        self.items.iter().find(|item| item.locked)
    }

    /// `Some(true)` if the lesson is on the path and unlocked, `None` if absent.
    #[must_use]
    pub fn lesson_accessible(&self, id: LessonId) -> Option<bool> {
        self.items.iter().find_map(|item| match item.entry {
            TimelineEntry::Lesson(lesson) if lesson.id() == id => Some(!item.locked),
            _ => None,
        })
    }

    /// `Some(true)` if the quiz is on the path and unlocked, `None` if absent.
    #[must_use]
    pub fn quiz_accessible(&self, id: QuizId) -> Option<bool> {
        self.items.iter().find_map(|item| match item.entry {
            TimelineEntry::Quiz(quiz) if quiz.id() == id => Some(!item.locked),
            _ => None,
        })
    }
}

/// Number of consecutive lessons placed before each quiz.
#[must_use]
pub fn group_size(lesson_count: usize, quiz_count: usize) -> usize {
    lesson_count.div_ceil(quiz_count + 1)
}

/// Builds the gated path for the given lessons and quizzes.
///
/// The group size is fixed up front, so the last lesson group may be short.
#[must_use]
pub fn build_timeline<'a>(lessons: &'a [Lesson], quizzes: &'a [Quiz]) -> Timeline<'a> {
    let group = group_size(lessons.len(), quizzes.len());
    let mut items = Vec::with_capacity(lessons.len() + quizzes.len());
    let mut next_lesson = 0;
    let mut next_quiz = 0;
    let mut blocked = false;

    while next_lesson < lessons.len() || next_quiz < quizzes.len() {
        let group_end = (next_lesson + group).min(lessons.len());
        for (source_index, lesson) in lessons
            .iter()
            .enumerate()
            .take(group_end)
            .skip(next_lesson)
        {
            items.push(TimelineItem {
                entry: TimelineEntry::Lesson(lesson),
                position: items.len(),
                source_index,
                locked: blocked,
            });
            blocked |= !lesson.is_completed();
        }
        next_lesson = group_end;

        if let Some(quiz) = quizzes.get(next_quiz) {
            items.push(TimelineItem {
                entry: TimelineEntry::Quiz(quiz),
                position: items.len(),
                source_index: next_quiz,
                locked: blocked,
            });
            next_quiz += 1;
        }
    }

    Timeline { items }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lessons(completed: &[bool]) -> Vec<Lesson> {
        completed
            .iter()
            .enumerate()
            .map(|(i, done)| {
                let id = u64::try_from(i).unwrap() + 1;
                Lesson::from_persisted(LessonId::new(id), format!("L{i}"), "", *done).unwrap()
            })
            .collect()
    }

    fn quizzes(n: u64) -> Vec<Quiz> {
        (1..=n)
            .map(|i| Quiz::new(QuizId::new(i), format!("Q{}", i - 1)))
            .collect()
    }

    fn shape(timeline: &Timeline<'_>) -> Vec<String> {
        timeline
            .items()
            .iter()
            .map(|item| item.entry.title().to_string())
            .collect()
    }

    fn locks(timeline: &Timeline<'_>) -> Vec<bool> {
        timeline.items().iter().map(|item| item.locked).collect()
    }

    #[test]
    fn group_size_rounds_up() {
        assert_eq!(group_size(5, 1), 3);
        assert_eq!(group_size(3, 2), 1);
        assert_eq!(group_size(4, 0), 4);
        assert_eq!(group_size(0, 3), 0);
    }

    #[test]
    fn interleaves_groups_with_short_final_group() {
        let ls = lessons(&[true; 5]);
        let qs = quizzes(1);
        let timeline = build_timeline(&ls, &qs);
        assert_eq!(shape(&timeline), ["L0", "L1", "L2", "Q0", "L3", "L4"]);
        assert_eq!(timeline.len(), 6);
    }

    #[test]
    fn more_quizzes_than_groups_trail_at_the_end() {
        let ls = lessons(&[true; 2]);
        let qs = quizzes(3);
        let timeline = build_timeline(&ls, &qs);
        assert_eq!(shape(&timeline), ["L0", "Q0", "L1", "Q1", "Q2"]);
    }

    #[test]
    fn no_quizzes_yields_lessons_in_order() {
        let ls = lessons(&[false, false, false]);
        let timeline = build_timeline(&ls, &[]);
        assert_eq!(shape(&timeline), ["L0", "L1", "L2"]);
        assert!(
            timeline
                .items()
                .iter()
                .all(|item| item.entry.kind() == TimelineKind::Lesson)
        );
    }

    #[test]
    fn no_lessons_yields_quizzes_back_to_back_all_unlocked() {
        let qs = quizzes(3);
        let timeline = build_timeline(&[], &qs);
        assert_eq!(shape(&timeline), ["Q0", "Q1", "Q2"]);
        assert_eq!(locks(&timeline), [false, false, false]);
    }

    #[test]
    fn empty_inputs_give_empty_timeline() {
        let timeline = build_timeline(&[], &[]);
        assert!(timeline.is_empty());
        assert!(timeline.first_locked().is_none());
    }

    #[test]
    fn locks_after_first_incomplete_lesson() {
        let ls = lessons(&[true, false, true]);
        let timeline = build_timeline(&ls, &[]);
        assert_eq!(locks(&timeline), [false, false, true]);
    }

    #[test]
    fn first_item_is_never_locked() {
        let ls = lessons(&[false, false]);
        let qs = quizzes(1);
        let timeline = build_timeline(&ls, &qs);
        assert_eq!(locks(&timeline), [false, true, true]);
    }

    #[test]
    fn unattempted_quiz_does_not_gate_later_lessons() {
        let ls = lessons(&[true, true, false, false]);
        let qs = quizzes(1);
        let timeline = build_timeline(&ls, &qs);
        assert_eq!(shape(&timeline), ["L0", "L1", "Q0", "L2", "L3"]);
        assert_eq!(locks(&timeline), [false, false, false, false, true]);
        assert_eq!(timeline.quiz_accessible(QuizId::new(1)), Some(true));
        assert_eq!(timeline.lesson_accessible(LessonId::new(4)), Some(false));
        assert_eq!(timeline.lesson_accessible(LessonId::new(99)), None);
    }

    #[test]
    fn positions_and_source_indices_are_tracked() {
        let ls = lessons(&[true, true, true, true]);
        let qs = quizzes(1);
        let timeline = build_timeline(&ls, &qs);
        let quiz = timeline.get(2).unwrap();
        assert_eq!(quiz.position, 2);
        assert_eq!(quiz.source_index, 0);
        let last = timeline.get(4).unwrap();
        assert_eq!(last.source_index, 3);
        assert_eq!(timeline.unlocked_count(), 5);
    }

    #[test]
    fn rebuild_is_deterministic() {
        let ls = lessons(&[true, false, true, false]);
        let qs = quizzes(2);
        assert_eq!(build_timeline(&ls, &qs), build_timeline(&ls, &qs));
    }
}
