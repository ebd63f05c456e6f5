use tutor_core::model::ChatMessage;

/// Lifecycle of one lesson's chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Uninitialized,
    /// History is loading; further entries are ignored.
    Initializing,
    Ready,
}

/// Local view of one lesson's conversation.
#[derive(Debug, Clone, Default)]
pub(crate) struct LessonChat {
    pub(crate) state: ChatState,
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) typing: bool,
}

impl LessonChat {
    /// Claims initialization. Returns `false` if another caller already has.
    pub(crate) fn begin_init(&mut self) -> bool {
        if self.state != ChatState::Uninitialized {
            return false;
        }
        self.state = ChatState::Initializing;
        true
    }

    pub(crate) fn finish_init(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
        self.typing = false;
        self.state = ChatState::Ready;
    }
}
