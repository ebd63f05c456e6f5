mod service;
mod session;

pub use crate::error::ChatServiceError;
pub use service::ChatService;
pub use session::ChatState;
