#![forbid(unsafe_code)]

pub mod http;
pub mod memory;
pub mod repository;
pub mod session;
pub mod sqlite;
