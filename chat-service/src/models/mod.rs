//! Domain models for chat-service.

mod message;
mod session;
mod user;

pub use message::{Message, MessageRow, NewMessage, Sender};
pub use session::{new_session_token, Session};
pub use user::{NewUser, User};
