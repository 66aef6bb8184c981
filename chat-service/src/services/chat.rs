//! Chat turn orchestration.
//!
//! A turn resolves (or mints) a session, records the user message, asks the
//! configured generator for a reply and records that reply. Generator failures
//! never fail the turn: the user receives a fixed apology instead and the
//! apology is stored as the bot message.

use crate::dtos::ChatRequest;
use crate::models::{Message, NewMessage, Session};
use crate::services::metrics;
use crate::services::responder::ResponseGenerator;
use crate::services::store::ConversationStore;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

/// Bot reply used when generation fails for any reason.
pub const FALLBACK_REPLY: &str =
    "Lo siento, hubo un problema al procesar tu mensaje. Por favor, inténtalo de nuevo.";

/// Outcome of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub reply: String,
    pub session_id: String,
    /// True when `reply` is [`FALLBACK_REPLY`] because generation failed.
    pub fallback: bool,
}

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    generator: Arc<dyn ResponseGenerator>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ConversationStore>, generator: Arc<dyn ResponseGenerator>) -> Self {
        Self { store, generator }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub async fn create_session(&self) -> Result<Session, AppError> {
        let session = self.store.create_session(None).await?;
        metrics::record_session_created();
        Ok(session)
    }

    pub async fn session_exists(&self, session_id: &str) -> Result<bool, AppError> {
        Ok(self.store.get_session(session_id).await?.is_some())
    }

    /// Full history of a known session, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Message>, AppError> {
        if self.store.get_session(session_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Session {} not found",
                session_id
            )));
        }
        self.store.get_messages_by_session(session_id).await
    }

    /// Runs one turn.
    ///
    /// The request is validated before anything is written, so a rejected
    /// message never creates a session. An unknown or blank `session_id` starts
    /// a new session whose token is returned in the result.
    #[instrument(skip(self, request), fields(generator = self.generator.name()))]
    pub async fn handle_turn(
        &self,
        session_id: Option<&str>,
        request: ChatRequest,
    ) -> Result<ChatTurn, AppError> {
        request.validate()?;

        let session = self.resolve_session(session_id).await?;
        let token = session.session_id;

        self.store
            .create_message(NewMessage::user(&token, &request.message))
            .await?;

        let (reply, fallback) = match self.generator.generate(&request.message, &token).await {
            Ok(reply) => (reply, false),
            Err(e) => {
                error!(
                    session_id = %token,
                    kind = e.kind(),
                    error = %e,
                    "Reply generation failed, answering with fallback"
                );
                metrics::record_generator_failure(e.kind());
                (FALLBACK_REPLY.to_string(), true)
            }
        };

        self.store
            .create_message(NewMessage::bot(&token, &reply))
            .await?;
        // Only a generated reply counts as session activity.
        if !fallback {
            self.store.update_session_timestamp(&token).await?;
        }

        metrics::record_turn(if fallback { "fallback" } else { "reply" });

        Ok(ChatTurn {
            reply,
            session_id: token,
            fallback,
        })
    }

    async fn resolve_session(&self, session_id: Option<&str>) -> Result<Session, AppError> {
        if let Some(token) = session_id.map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(session) = self.store.get_session(token).await? {
                return Ok(session);
            }
            info!(session_id = %token, "Unknown session token, starting a new session");
        }
        self.create_session().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sender;
    use crate::services::responder::{GeneratorError, PatternResponder, Rule};
    use crate::services::store::MemoryStore;
    use async_trait::async_trait;

    struct FailingGenerator;

    #[async_trait]
    impl ResponseGenerator for FailingGenerator {
        async fn generate(&self, _text: &str, _session_id: &str) -> Result<String, GeneratorError> {
            Err(GeneratorError::Upstream("boom".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn echo_service() -> (ChatService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let generator = PatternResponder::new(
            vec![Rule::new(&["hola"], &["¡Hola!"])],
            vec!["default".to_string()],
        );
        (
            ChatService::new(store.clone(), Arc::new(generator)),
            store,
        )
    }

    #[tokio::test]
    async fn turn_without_session_creates_one() {
        let (service, store) = echo_service();

        let turn = service
            .handle_turn(None, ChatRequest::new("hola"))
            .await
            .unwrap();

        assert_eq!(turn.reply, "¡Hola!");
        assert!(!turn.fallback);
        assert!(store.get_session(&turn.session_id).await.unwrap().is_some());

        let history = store.get_messages_by_session(&turn.session_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, Sender::User);
        assert_eq!(history[0].content, "hola");
        assert_eq!(history[1].sender, Sender::Bot);
        assert_eq!(history[1].content, "¡Hola!");
    }

    #[tokio::test]
    async fn known_session_is_reused() {
        let (service, _store) = echo_service();
        let session = service.create_session().await.unwrap();

        let turn = service
            .handle_turn(Some(&session.session_id), ChatRequest::new("something"))
            .await
            .unwrap();

        assert_eq!(turn.session_id, session.session_id);
        assert_eq!(turn.reply, "default");
    }

    #[tokio::test]
    async fn unknown_or_blank_token_starts_new_session() {
        let (service, _store) = echo_service();

        let turn = service
            .handle_turn(Some("does-not-exist"), ChatRequest::new("hola"))
            .await
            .unwrap();
        assert_ne!(turn.session_id, "does-not-exist");

        let turn = service
            .handle_turn(Some("   "), ChatRequest::new("hola"))
            .await
            .unwrap();
        assert!(!turn.session_id.trim().is_empty());
    }

    #[tokio::test]
    async fn invalid_message_writes_nothing() {
        let (service, store) = echo_service();
        let session = service.create_session().await.unwrap();

        let err = service
            .handle_turn(Some(&session.session_id), ChatRequest::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = service
            .handle_turn(None, ChatRequest::new("a".repeat(1001)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        assert!(store
            .get_messages_by_session(&session.session_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn generator_failure_stores_fallback() {
        let store = Arc::new(MemoryStore::new());
        let service = ChatService::new(store.clone(), Arc::new(FailingGenerator));

        let turn = service
            .handle_turn(None, ChatRequest::new("hola"))
            .await
            .unwrap();

        assert!(turn.fallback);
        assert_eq!(turn.reply, FALLBACK_REPLY);

        let history = store.get_messages_by_session(&turn.session_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].sender, Sender::Bot);
        assert_eq!(history[1].content, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn fallback_turn_leaves_session_timestamp_alone() {
        let store = Arc::new(MemoryStore::new());
        let service = ChatService::new(store.clone(), Arc::new(FailingGenerator));
        let session = service.create_session().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let turn = service
            .handle_turn(Some(&session.session_id), ChatRequest::new("hola"))
            .await
            .unwrap();
        assert!(turn.fallback);

        let after = store
            .get_session(&session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.updated_at, session.updated_at);
    }

    #[tokio::test]
    async fn history_of_unknown_session_is_not_found() {
        let (service, _store) = echo_service();
        let err = service.history("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn turn_advances_session_timestamp() {
        let (service, store) = echo_service();
        let session = service.create_session().await.unwrap();

        service
            .handle_turn(Some(&session.session_id), ChatRequest::new("hola"))
            .await
            .unwrap();

        let updated = store
            .get_session(&session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.updated_at >= session.updated_at);
    }
}
