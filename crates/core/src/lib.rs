#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod time;
pub mod timeline;

pub use time::Clock;
