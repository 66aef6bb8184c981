//! PostgreSQL conversation store.

use super::{ConversationStore, MAX_TOKEN_ATTEMPTS};
use crate::models::{Message, MessageRow, NewMessage, NewUser, Session, User};
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

impl PostgresStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "chat-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for PostgresStore {
    #[instrument(skip(self))]
    async fn create_session(&self, user_id: Option<&str>) -> Result<Session, AppError> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let candidate = Session::new(user_id.map(str::to_string));

            let result = sqlx::query_as::<_, Session>(
                r#"
                INSERT INTO chat_sessions (id, user_id, session_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, session_id, user_id, created_at, updated_at
                "#,
            )
            .bind(candidate.id)
            .bind(&candidate.user_id)
            .bind(&candidate.session_id)
            .bind(candidate.created_at)
            .bind(candidate.updated_at)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(session) => {
                    info!(session_id = %session.session_id, "Session created");
                    return Ok(session);
                }
                Err(e) if is_unique_violation(&e) => {
                    warn!(session_id = %candidate.session_id, "Session token collision, retrying");
                }
                Err(e) => {
                    return Err(AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to create session: {}",
                        e
                    )))
                }
            }
        }

        Err(AppError::InternalError(anyhow::anyhow!(
            "Could not allocate a unique session token"
        )))
    }

    #[instrument(skip(self))]
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT id, session_id, user_id, created_at, updated_at
            FROM chat_sessions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get session: {}", e)))
    }

    #[instrument(skip(self))]
    async fn update_session_timestamp(&self, session_id: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE chat_sessions
            SET updated_at = GREATEST(updated_at, NOW())
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update session: {}", e))
        })?;
        Ok(())
    }

    #[instrument(skip(self, input), fields(session_id = %input.session_id, sender = input.sender.as_str()))]
    async fn create_message(&self, input: NewMessage) -> Result<Message, AppError> {
        let message = Message::new(input);

        sqlx::query(
            r#"
            INSERT INTO messages (id, session_id, content, sender, timestamp, is_read)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(&message.session_id)
        .bind(&message.content)
        .bind(message.sender.as_str())
        .bind(message.timestamp)
        .bind(message.is_read)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create message: {}", e)))?;

        Ok(message)
    }

    #[instrument(skip(self))]
    async fn get_messages_by_session(&self, session_id: &str) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, session_id, content, sender, timestamp, is_read
            FROM messages
            WHERE session_id = $1
            ORDER BY timestamp ASC, seq ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list messages: {}", e)))?;

        rows.into_iter()
            .map(|row| Message::try_from(row).map_err(AppError::DatabaseError))
            .collect()
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    async fn create_user(&self, input: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, password)
            VALUES ($1, $2, $3)
            RETURNING id, username, password
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.username)
        .bind(&input.password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(anyhow::anyhow!(
                    "Username '{}' is already taken",
                    input.username
                ))
            } else {
                AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e))
            }
        })
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT id, username, password FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))
    }

    #[instrument(skip(self))]
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT id, username, password FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}
