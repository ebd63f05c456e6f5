use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use storage::repository::{ChatRepository, Storage};
use tutor_core::Clock;
use tutor_core::model::chat::fallback_greeting;
use tutor_core::model::{ChatMessage, Lesson, LessonId};

use super::session::{ChatState, LessonChat};
use crate::error::ChatServiceError;
use crate::tutor::{TutorResponder, canned_reply};

/// How many stored messages are loaded when a lesson chat opens.
pub const HISTORY_LIMIT: u32 = 200;

/// Per-lesson tutor conversations.
///
/// Local logs are the source of truth for display; the chat repository is
/// written best effort.
#[derive(Clone)]
pub struct ChatService {
    clock: Clock,
    chat: Arc<dyn ChatRepository>,
    tutor: Arc<dyn TutorResponder>,
    lessons: Arc<Mutex<HashMap<LessonId, LessonChat>>>,
}

impl ChatService {
    #[must_use]
    pub fn new(
        clock: Clock,
        chat: Arc<dyn ChatRepository>,
        tutor: Arc<dyn TutorResponder>,
    ) -> Self {
        Self {
            clock,
            chat,
            tutor,
            lessons: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage, tutor: Arc<dyn TutorResponder>) -> Self {
        Self::new(clock, Arc::clone(&storage.chat), tutor)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<LessonId, LessonChat>> {
        self.lessons
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Open a lesson's chat: load its history, or seed a greeting if there
    /// is none. Only the first call per lesson does any work.
    pub async fn enter_lesson(&self, lesson: &Lesson) -> Vec<ChatMessage> {
        let id = lesson.id();
        if !self.lock().entry(id).or_default().begin_init() {
            return self.messages(id);
        }

        let mut history = match self.chat.list_messages(id, HISTORY_LIMIT, 0).await {
            Ok(history) => history,
            Err(err) => {
                log::error!("failed to load chat history for lesson {id}: {err}");
                Vec::new()
            }
        };

        if history.is_empty() {
            if let Some(greeting) = self.greeting(lesson).await {
                self.persist(id, &greeting).await;
                history.push(greeting);
            }
        }

        let mut lessons = self.lock();
        match lessons.get_mut(&id) {
            Some(chat) if chat.state == ChatState::Initializing => chat.finish_init(history),
            _ => log::debug!("lesson {id} chat was closed while loading"),
        }
        lessons.get(&id).map(|chat| chat.messages.clone()).unwrap_or_default()
    }

    async fn greeting(&self, lesson: &Lesson) -> Option<ChatMessage> {
        let text = match self.tutor.greeting(lesson.title()).await {
            Ok(text) => text,
            Err(err) => {
                log::warn!("tutor greeting failed, using the default: {err}");
                fallback_greeting(lesson.title())
            }
        };
        let fallback = || ChatMessage::tutor(fallback_greeting(lesson.title()), self.clock.now());
        match ChatMessage::tutor(text, self.clock.now()).or_else(|_| fallback()) {
            Ok(greeting) => Some(greeting),
            Err(err) => {
                log::error!("could not build a greeting for lesson {}: {err}", lesson.id());
                None
            }
        }
    }

    /// Send a learner message and wait for the tutor's answer.
    ///
    /// The learner's message shows up immediately; if the tutor fails, a
    /// canned reply is used.
    ///
    /// # Errors
    ///
    /// Returns `ChatServiceError::Chat` for blank text and
    /// `ChatServiceError::NotReady` if the lesson chat is not open.
    pub async fn send(&self, lesson: &Lesson, text: &str) -> Result<ChatMessage, ChatServiceError> {
        let id = lesson.id();
        let message = ChatMessage::learner(text, self.clock.now())?;
        {
            let mut lessons = self.lock();
            let chat = lessons
                .get_mut(&id)
                .filter(|chat| chat.state == ChatState::Ready)
                .ok_or(ChatServiceError::NotReady(id))?;
            chat.messages.push(message.clone());
            chat.typing = true;
        }
        self.persist(id, &message).await;

        let reply_text = match self.tutor.reply(lesson.title(), message.text()).await {
            Ok(reply) => reply,
            Err(err) => {
                log::error!("tutor reply failed for lesson {id}: {err}");
                canned_reply()
            }
        };
        let reply = match ChatMessage::tutor(reply_text, self.clock.now()) {
            Ok(reply) => reply,
            Err(_) => ChatMessage::tutor(canned_reply(), self.clock.now())?,
        };

        {
            let mut lessons = self.lock();
            if let Some(chat) = lessons
                .get_mut(&id)
                .filter(|chat| chat.state == ChatState::Ready)
            {
                chat.messages.push(reply.clone());
                chat.typing = false;
            }
        }
        self.persist(id, &reply).await;
        Ok(reply)
    }

    async fn persist(&self, id: LessonId, message: &ChatMessage) {
        if let Err(err) = self.chat.append_message(id, message).await {
            log::error!("failed to store chat message for lesson {id}: {err}");
        }
    }

    #[must_use]
    pub fn messages(&self, lesson_id: LessonId) -> Vec<ChatMessage> {
        self.lock()
            .get(&lesson_id)
            .map(|chat| chat.messages.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_typing(&self, lesson_id: LessonId) -> bool {
        self.lock().get(&lesson_id).is_some_and(|chat| chat.typing)
    }

    #[must_use]
    pub fn state(&self, lesson_id: LessonId) -> ChatState {
        self.lock()
            .get(&lesson_id)
            .map(|chat| chat.state)
            .unwrap_or_default()
    }

    /// Clear the conversation here and on the backend.
    pub async fn reset(&self, lesson_id: LessonId) {
        self.lock().remove(&lesson_id);
        if let Err(err) = self.chat.clear_messages(lesson_id).await {
            log::error!("failed to clear chat for lesson {lesson_id}: {err}");
        }
    }

    /// Drop the local log; the stored history is kept.
    pub fn leave_lesson(&self, lesson_id: LessonId) {
        self.lock().remove(&lesson_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::MockTutor;
    use storage::repository::InMemoryRepository;
    use tutor_core::time::fixed_clock;

    fn lesson() -> Lesson {
        Lesson::new(LessonId::new(1), "What is React?", "").unwrap()
    }

    fn service() -> ChatService {
        ChatService::new(
            fixed_clock(),
            Arc::new(InMemoryRepository::new()),
            Arc::new(MockTutor),
        )
    }

    #[tokio::test]
    async fn entering_seeds_a_greeting_once() {
        let chat = service();
        let first = chat.enter_lesson(&lesson()).await;
        let second = chat.enter_lesson(&lesson()).await;
        assert_eq!(first.len(), 1);
        assert_eq!(second, first);
        assert!(first[0].text().contains("**\"What is React?\"**"));
        assert_eq!(chat.state(lesson().id()), ChatState::Ready);
    }

    #[tokio::test]
    async fn sending_before_entering_is_rejected() {
        let chat = service();
        let err = chat.send(&lesson(), "hi").await.unwrap_err();
        assert!(matches!(err, ChatServiceError::NotReady(_)));
    }

    #[tokio::test]
    async fn blank_messages_are_rejected() {
        let chat = service();
        chat.enter_lesson(&lesson()).await;
        assert!(matches!(
            chat.send(&lesson(), "   ").await,
            Err(ChatServiceError::Chat(_))
        ));
        assert_eq!(chat.messages(lesson().id()).len(), 1);
    }

    #[tokio::test]
    async fn leaving_drops_the_local_log_only() {
        let chat = service();
        chat.enter_lesson(&lesson()).await;
        chat.leave_lesson(lesson().id());
        assert_eq!(chat.state(lesson().id()), ChatState::Uninitialized);
        assert!(chat.messages(lesson().id()).is_empty());

        let reloaded = chat.enter_lesson(&lesson()).await;
        assert_eq!(reloaded.len(), 1);
    }
}
