//! Domain models and request/response payloads

pub mod chat;
pub mod task;
pub mod user;
