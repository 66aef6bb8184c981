//! Conversation store.
//!
//! One contract, two backends: `MemoryStore` for single-process deployments
//! and tests, `PostgresStore` for durable history. The chat service only ever
//! talks to `dyn ConversationStore`.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::models::{Message, NewMessage, NewUser, Session, User};
use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

/// Attempts at minting a session token before giving up on collisions.
pub(crate) const MAX_TOKEN_ATTEMPTS: usize = 5;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Creates a session with a fresh, unique public token.
    async fn create_session(&self, user_id: Option<&str>) -> Result<Session, AppError>;

    /// Looks a session up by its public token.
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError>;

    /// Advances `updated_at` to now. Unknown sessions are ignored.
    async fn update_session_timestamp(&self, session_id: &str) -> Result<(), AppError>;

    /// Appends a message. The session is not checked for existence.
    async fn create_message(&self, input: NewMessage) -> Result<Message, AppError>;

    /// All messages of a session, oldest first; insertion order on ties.
    async fn get_messages_by_session(&self, session_id: &str) -> Result<Vec<Message>, AppError>;

    async fn create_user(&self, input: NewUser) -> Result<User, AppError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Backend reachability probe.
    async fn health_check(&self) -> Result<(), AppError>;
}
