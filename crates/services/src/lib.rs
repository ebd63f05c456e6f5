#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod chat;
pub mod config;
pub mod error;
pub mod quizzes;
pub mod topics;
pub mod tutor;

pub use tutor_core::Clock;

pub use app_services::AppServices;
pub use auth_service::AuthService;
pub use chat::{ChatService, ChatState};
pub use config::AppConfig;
pub use error::{
    AppServicesError, AuthError, ChatServiceError, ContentError, QuizError, QuizServiceError,
    TutorError,
};
pub use quizzes::{QuizLoopService, QuizRunner, QuizState};
pub use topics::{ContentStore, TimelineRow, TimelineTarget, TimelineView};
pub use tutor::{BackendTutor, MockTutor, OpenAiTutor, TutorResponder};
