pub mod chat;
mod ids;
mod lesson;
mod quiz;
mod topic;
mod user;

pub use chat::{CANNED_TUTOR_REPLIES, ChatError, ChatMessage, Speaker};
pub use ids::{LessonId, ParseIdError, QuestionId, QuizId, TopicId, UserId};
pub use lesson::{Lesson, LessonError};
pub use quiz::{Question, QuestionError, Quiz, option_label};
pub use topic::{Topic, TopicError, TopicSummary};
pub use user::{AuthSession, Credentials, CredentialsError, User};
