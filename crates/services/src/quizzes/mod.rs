mod review;
mod runner;
mod workflow;

pub use crate::error::{QuizError, QuizServiceError};
pub use review::{QuizReview, ReviewItem};
pub use runner::{OptionView, QuestionOptions, QuestionView, QuizRunner, QuizState};
pub use workflow::{QuizAdvance, QuizLoopService};
