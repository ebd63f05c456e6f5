use storage::repository::{AttemptAnswerRecord, SubmittedAnswer};
use tutor_core::model::{Question, Quiz, option_label};

use super::review::{QuizReview, ReviewItem};
use crate::error::QuizError;

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    /// The quiz has no questions; nothing can be answered.
    Empty,
    /// Waiting for an answer to the question at this index.
    Answering(usize),
    Complete,
}

/// One option as presented to the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView<'a> {
    pub index: usize,
    pub label: String,
    pub text: &'a str,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionOptions<'a> {
    Choices(Vec<OptionView<'a>>),
    /// The question's options could not be read; it can be skipped.
    NoOptions,
}

/// The question awaiting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView<'a> {
    /// 1-based.
    pub number: usize,
    pub total: usize,
    pub prompt: &'a str,
    pub options: QuestionOptions<'a>,
    pub is_last: bool,
}

/// Steps through a quiz one question at a time and keeps score.
#[derive(Debug, Clone)]
pub struct QuizRunner {
    quiz: Quiz,
    state: QuizState,
    selected: Option<usize>,
    answers: Vec<AttemptAnswerRecord>,
    score: usize,
}

impl QuizRunner {
    #[must_use]
    pub fn new(quiz: Quiz) -> Self {
        let state = initial_state(&quiz);
        Self {
            quiz,
            state,
            selected: None,
            answers: Vec::new(),
            score: 0,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == QuizState::Complete
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn answers(&self) -> &[AttemptAnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.quiz.question_count()
    }

    /// Share of correct answers in percent, `0.0` for an empty quiz.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.total())
    }

    fn current(&self) -> Result<(usize, &Question), QuizError> {
        match self.state {
            QuizState::Answering(index) => self
                .quiz
                .question(index)
                .map(|question| (index, question))
                .ok_or(QuizError::NotAnswering),
            QuizState::Empty | QuizState::Complete => Err(QuizError::NotAnswering),
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<QuestionView<'_>> {
        let (index, question) = self.current().ok()?;
        let options = if question.has_options() {
            QuestionOptions::Choices(
                question
                    .options()
                    .iter()
                    .enumerate()
                    .map(|(i, text)| OptionView {
                        index: i,
                        label: option_label(i),
                        text,
                        selected: self.selected == Some(i),
                    })
                    .collect(),
            )
        } else {
            QuestionOptions::NoOptions
        };
        Some(QuestionView {
            number: index + 1,
            total: self.total(),
            prompt: question.prompt(),
            options,
            is_last: index + 1 == self.total(),
        })
    }

    /// Provisionally choose an option for the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotAnswering` outside a run and
    /// `QuizError::OptionOutOfRange` for an index the question does not have.
    pub fn select_answer(&mut self, option: usize) -> Result<(), QuizError> {
        let (_, question) = self.current()?;
        let len = question.options().len();
        if option >= len {
            return Err(QuizError::OptionOutOfRange { index: option, len });
        }
        self.selected = Some(option);
        Ok(())
    }

    /// Record the current choice and move on.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoSelection` if nothing is chosen for a question
    /// that has options, and `QuizError::NotAnswering` outside a run.
    pub fn advance(&mut self) -> Result<QuizState, QuizError> {
        let (index, question) = self.current()?;
        if question.has_options() && self.selected.is_none() {
            return Err(QuizError::NoSelection);
        }

        let question_id = question.id();
        let is_correct = question.is_correct(self.selected);
        self.answers.push(AttemptAnswerRecord {
            question_id,
            selected_answer: self.selected,
            is_correct,
        });
        if is_correct {
            self.score += 1;
        }

        self.selected = None;
        self.state = if index + 1 >= self.total() {
            QuizState::Complete
        } else {
            QuizState::Answering(index + 1)
        };
        Ok(self.state)
    }

    /// Start over after finishing.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotComplete` unless the run is complete.
    pub fn retry(&mut self) -> Result<(), QuizError> {
        if self.state != QuizState::Complete {
            return Err(QuizError::NotComplete);
        }
        self.state = initial_state(&self.quiz);
        self.selected = None;
        self.answers.clear();
        self.score = 0;
        Ok(())
    }

    /// Answers in the shape the backend expects on submission.
    #[must_use]
    pub fn submission(&self) -> Vec<SubmittedAnswer> {
        self.answers
            .iter()
            .map(|answer| SubmittedAnswer {
                question_id: answer.question_id,
                selected_answer: answer.selected_answer,
            })
            .collect()
    }

    /// Pair every question with the recorded answer.
    ///
    /// `confirmed` is the backend's copy of the attempt; it is used only when
    /// it holds exactly one answer per question.
    #[must_use]
    pub fn review<'a>(&'a self, confirmed: Option<&'a [AttemptAnswerRecord]>) -> QuizReview<'a> {
        let (log, from_backend) = match confirmed {
            Some(answers) if answers.len() == self.total() => (answers, true),
            _ => (self.answers.as_slice(), false),
        };

        let items: Vec<ReviewItem<'a>> = self
            .quiz
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let answer = log.get(index);
                let selected_answer = answer.and_then(|a| a.selected_answer);
                let correct_answer = question.correct_answer();
                ReviewItem {
                    number: index + 1,
                    prompt: question.prompt(),
                    selected_answer,
                    selected_text: selected_answer.and_then(|i| question.option(i)),
                    correct_answer,
                    correct_text: correct_answer.and_then(|i| question.option(i)),
                    is_correct: answer.is_some_and(|a| a.is_correct),
                }
            })
            .collect();

        let score = items.iter().filter(|item| item.is_correct).count();
        QuizReview {
            score,
            total: items.len(),
            percentage: percentage(score, items.len()),
            from_backend,
            items,
        }
    }
}

fn initial_state(quiz: &Quiz) -> QuizState {
    if quiz.has_questions() {
        QuizState::Answering(0)
    } else {
        QuizState::Empty
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(score: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    score as f64 * 100.0 / total as f64
}
