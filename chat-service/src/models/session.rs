//! Chat session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A run of chat turns correlated by a public token.
///
/// `id` is the storage key; clients only ever see `session_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub session_id: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session_id: new_session_token(),
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves `updated_at` forward to `now`, never backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

/// Mints a fresh public session token.
pub fn new_session_token() -> String {
    Uuid::new_v4().to_string()
}
