pub mod chat;

pub use chat::{ChatRequest, ChatResponse, SessionResponse, SESSION_HEADER};
