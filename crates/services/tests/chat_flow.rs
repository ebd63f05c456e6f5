use std::sync::Arc;

use async_trait::async_trait;
use services::{ChatService, ChatState, TutorError, TutorResponder};
use storage::repository::{ChatRepository, InMemoryRepository, StorageError};
use tutor_core::model::{CANNED_TUTOR_REPLIES, ChatMessage, Lesson, LessonId, Speaker};
use tutor_core::time::fixed_clock;

/// Chat repository whose history load yields once, so two entries overlap.
#[derive(Clone, Default)]
struct SlowHistory {
    inner: InMemoryRepository,
}

#[async_trait]
impl ChatRepository for SlowHistory {
    async fn list_messages(
        &self,
        lesson_id: LessonId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        tokio::task::yield_now().await;
        self.inner.list_messages(lesson_id, limit, offset).await
    }

    async fn append_message(
        &self,
        lesson_id: LessonId,
        message: &ChatMessage,
    ) -> Result<(), StorageError> {
        self.inner.append_message(lesson_id, message).await
    }

    async fn clear_messages(&self, lesson_id: LessonId) -> Result<(), StorageError> {
        self.inner.clear_messages(lesson_id).await
    }

    async fn tutor_reply(&self, message: &str) -> Result<String, StorageError> {
        self.inner.tutor_reply(message).await
    }
}

struct EchoTutor;

#[async_trait]
impl TutorResponder for EchoTutor {
    async fn reply(&self, _lesson_title: &str, message: &str) -> Result<String, TutorError> {
        Ok(format!("You said: {message}"))
    }
}

/// Tutor that takes a few scheduler turns before answering.
struct SlowTutor;

#[async_trait]
impl TutorResponder for SlowTutor {
    async fn reply(&self, _lesson_title: &str, message: &str) -> Result<String, TutorError> {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        Ok(format!("Eventually: {message}"))
    }
}

struct BrokenTutor;

#[async_trait]
impl TutorResponder for BrokenTutor {
    async fn greeting(&self, _lesson_title: &str) -> Result<String, TutorError> {
        Err(TutorError::EmptyResponse)
    }

    async fn reply(&self, _lesson_title: &str, _message: &str) -> Result<String, TutorError> {
        Err(TutorError::Disabled)
    }
}

fn lesson() -> Lesson {
    Lesson::new(LessonId::new(3), "Components", "").unwrap()
}

#[tokio::test]
async fn overlapping_entries_seed_a_single_greeting() {
    let repo = SlowHistory::default();
    let chat = ChatService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(EchoTutor));
    let lesson = lesson();

    let (first, second) = tokio::join!(chat.enter_lesson(&lesson), chat.enter_lesson(&lesson));
    assert_eq!(first.len() + second.len(), 1);
    assert_eq!(chat.messages(lesson.id()).len(), 1);
    assert_eq!(chat.state(lesson.id()), ChatState::Ready);

    let stored = repo.list_messages(lesson.id(), 50, 0).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn send_appends_learner_then_tutor_turns() {
    let repo = InMemoryRepository::new();
    let chat = ChatService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(EchoTutor));
    let lesson = lesson();
    chat.enter_lesson(&lesson).await;

    let reply = chat.send(&lesson, "props?").await.unwrap();
    assert_eq!(reply.text(), "You said: props?");
    assert!(!chat.is_typing(lesson.id()));

    let speakers: Vec<Speaker> = chat
        .messages(lesson.id())
        .iter()
        .map(ChatMessage::speaker)
        .collect();
    assert_eq!(speakers, vec![Speaker::Tutor, Speaker::Learner, Speaker::Tutor]);
    assert_eq!(repo.list_messages(lesson.id(), 50, 0).await.unwrap().len(), 3);
}

#[tokio::test]
async fn typing_flag_is_set_while_the_reply_is_pending() {
    let chat = ChatService::new(
        fixed_clock(),
        Arc::new(InMemoryRepository::new()),
        Arc::new(SlowTutor),
    );
    let lesson = lesson();
    chat.enter_lesson(&lesson).await;

    let observe = async {
        tokio::task::yield_now().await;
        (chat.is_typing(lesson.id()), chat.messages(lesson.id()).len())
    };
    let (sent, (typing, shown)) = tokio::join!(chat.send(&lesson, "state?"), observe);

    assert!(typing);
    assert_eq!(shown, 2);
    assert_eq!(sent.unwrap().text(), "Eventually: state?");
    assert!(!chat.is_typing(lesson.id()));
    assert_eq!(chat.messages(lesson.id()).len(), 3);
}

#[tokio::test]
async fn tutor_failures_fall_back_to_canned_text() {
    let chat = ChatService::new(
        fixed_clock(),
        Arc::new(InMemoryRepository::new()),
        Arc::new(BrokenTutor),
    );
    let lesson = lesson();
    let seeded = chat.enter_lesson(&lesson).await;
    assert!(seeded[0].text().starts_with("Hello! Welcome to **\"Components\"**"));

    let reply = chat.send(&lesson, "hello?").await.unwrap();
    assert!(CANNED_TUTOR_REPLIES.contains(&reply.text()));
    assert_eq!(chat.messages(lesson.id()).len(), 3);
}

#[tokio::test]
async fn reset_clears_local_and_stored_history() {
    let repo = InMemoryRepository::new();
    let chat = ChatService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(EchoTutor));
    let lesson = lesson();
    chat.enter_lesson(&lesson).await;
    chat.send(&lesson, "one").await.unwrap();

    chat.reset(lesson.id()).await;
    assert_eq!(chat.state(lesson.id()), ChatState::Uninitialized);
    assert!(chat.messages(lesson.id()).is_empty());
    assert!(repo.list_messages(lesson.id(), 50, 0).await.unwrap().is_empty());

    let fresh = chat.enter_lesson(&lesson).await;
    assert_eq!(fresh.len(), 1);
}

#[tokio::test]
async fn stored_history_is_loaded_instead_of_seeding() {
    let repo = InMemoryRepository::new();
    let lesson = lesson();
    let earlier = ChatMessage::learner("from last time", tutor_core::time::fixed_now()).unwrap();
    repo.append_message(lesson.id(), &earlier).await.unwrap();

    let chat = ChatService::new(fixed_clock(), Arc::new(repo), Arc::new(EchoTutor));
    let messages = chat.enter_lesson(&lesson).await;
    assert_eq!(messages, vec![earlier]);
}

#[tokio::test]
async fn stale_history_errors_do_not_block_entry() {
    struct DownChat;

    #[async_trait]
    impl ChatRepository for DownChat {
        async fn list_messages(
            &self,
            _: LessonId,
            _: u32,
            _: u32,
        ) -> Result<Vec<ChatMessage>, StorageError> {
            Err(StorageError::Connection("down".into()))
        }
        async fn append_message(&self, _: LessonId, _: &ChatMessage) -> Result<(), StorageError> {
            Err(StorageError::Connection("down".into()))
        }
        async fn clear_messages(&self, _: LessonId) -> Result<(), StorageError> {
            Err(StorageError::Connection("down".into()))
        }
        async fn tutor_reply(&self, _: &str) -> Result<String, StorageError> {
            Err(StorageError::Connection("down".into()))
        }
    }

    let chat = ChatService::new(fixed_clock(), Arc::new(DownChat), Arc::new(EchoTutor));
    let lesson = lesson();
    assert_eq!(chat.enter_lesson(&lesson).await.len(), 1);
    chat.send(&lesson, "still here?").await.unwrap();
    assert_eq!(chat.messages(lesson.id()).len(), 3);
}
