mod store;
mod view;

pub use crate::error::ContentError;
pub use store::ContentStore;
pub use view::{TimelineRow, TimelineTarget, TimelineView};
