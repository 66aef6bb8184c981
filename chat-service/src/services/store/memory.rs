//! In-process conversation store.
//!
//! Sessions live in a primary map keyed by storage id, with a secondary index
//! from public token to id. Messages are kept per session token in append
//! order. Every individual map operation holds the owning shard lock, so a
//! read-modify-write such as bumping `updated_at` is atomic.

use super::{ConversationStore, MAX_TOKEN_ATTEMPTS};
use crate::models::{Message, NewMessage, NewUser, Session, User};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use service_core::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    sessions: DashMap<Uuid, Session>,
    session_index: DashMap<String, Uuid>,
    messages: DashMap<String, Vec<Message>>,
    users: DashMap<Uuid, User>,
    username_index: DashMap<String, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn session_key(&self, session_id: &str) -> Option<Uuid> {
        self.session_index.get(session_id).map(|entry| *entry.value())
    }

    fn append(&self, message: Message) {
        self.messages
            .entry(message.session_id.clone())
            .or_default()
            .push(message);
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    #[instrument(skip(self))]
    async fn create_session(&self, user_id: Option<&str>) -> Result<Session, AppError> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let session = Session::new(user_id.map(str::to_string));

            match self.session_index.entry(session.session_id.clone()) {
                Entry::Occupied(_) => {
                    warn!(session_id = %session.session_id, "Session token collision, retrying");
                }
                Entry::Vacant(slot) => {
                    // Primary record first so the token never resolves to nothing.
                    self.sessions.insert(session.id, session.clone());
                    slot.insert(session.id);

                    info!(session_id = %session.session_id, "Session created");
                    return Ok(session);
                }
            }
        }

        Err(AppError::InternalError(anyhow::anyhow!(
            "Could not allocate a unique session token"
        )))
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let Some(key) = self.session_key(session_id) else {
            return Ok(None);
        };
        Ok(self.sessions.get(&key).map(|entry| entry.value().clone()))
    }

    async fn update_session_timestamp(&self, session_id: &str) -> Result<(), AppError> {
        let Some(key) = self.session_key(session_id) else {
            return Ok(());
        };
        if let Some(mut session) = self.sessions.get_mut(&key) {
            session.touch(Utc::now());
        }
        Ok(())
    }

    async fn create_message(&self, input: NewMessage) -> Result<Message, AppError> {
        let message = Message::new(input);
        self.append(message.clone());
        Ok(message)
    }

    async fn get_messages_by_session(&self, session_id: &str) -> Result<Vec<Message>, AppError> {
        let mut messages = self
            .messages
            .get(session_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        // Stable sort: equal timestamps keep append order.
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    async fn create_user(&self, input: NewUser) -> Result<User, AppError> {
        match self.username_index.entry(input.username.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(anyhow::anyhow!(
                "Username '{}' is already taken",
                input.username
            ))),
            Entry::Vacant(slot) => {
                let user = User {
                    id: Uuid::new_v4(),
                    username: input.username,
                    password: input.password,
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let Some(key) = self.username_index.get(username).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&key).map(|entry| entry.value().clone()))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
