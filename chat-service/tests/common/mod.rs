//! Test helper module for chat-service integration tests.
//!
//! Spawns the full HTTP application on a random port with an in-memory store.

#![allow(dead_code)]

use chat_service::config::ChatConfig;
use chat_service::services::responder::{GeneratorError, PatternResponder, ResponseGenerator, Rule};
use chat_service::models::{Message, NewMessage, NewUser, Session, User};
use chat_service::services::{ConversationStore, MemoryStore};
use chat_service::startup::Application;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

/// Deterministic rule table used by most tests.
pub fn test_responder() -> PatternResponder {
    PatternResponder::new(
        vec![
            Rule::new(&["hola"], &["¡Hola! ¿En qué puedo ayudarte?"]),
            Rule::new(&["precio"], &["Nuestros planes empiezan en 10 USD."]),
        ],
        vec!["No entendí tu mensaje.".to_string()],
    )
}

/// Generator that always fails, to exercise the fallback path.
pub struct FailingGenerator;

#[async_trait::async_trait]
impl ResponseGenerator for FailingGenerator {
    async fn generate(&self, _text: &str, _session_id: &str) -> Result<String, GeneratorError> {
        Err(GeneratorError::Timeout(5000))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Store whose backend is unreachable: every call fails.
pub struct DownStore;

fn backend_down() -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("connection refused by 10.0.0.7:5432"))
}

#[async_trait::async_trait]
impl ConversationStore for DownStore {
    async fn create_session(&self, _user_id: Option<&str>) -> Result<Session, AppError> {
        Err(backend_down())
    }

    async fn get_session(&self, _session_id: &str) -> Result<Option<Session>, AppError> {
        Err(backend_down())
    }

    async fn update_session_timestamp(&self, _session_id: &str) -> Result<(), AppError> {
        Err(backend_down())
    }

    async fn create_message(&self, _input: NewMessage) -> Result<Message, AppError> {
        Err(backend_down())
    }

    async fn get_messages_by_session(&self, _session_id: &str) -> Result<Vec<Message>, AppError> {
        Err(backend_down())
    }

    async fn create_user(&self, _input: NewUser) -> Result<User, AppError> {
        Err(backend_down())
    }

    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, AppError> {
        Err(backend_down())
    }

    async fn get_user_by_username(&self, _username: &str) -> Result<Option<User>, AppError> {
        Err(backend_down())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Err(backend_down())
    }
}

/// Starts the application around `store` and returns its base address.
pub async fn spawn_server(
    store: Arc<dyn ConversationStore>,
    generator: Arc<dyn ResponseGenerator>,
    config: ChatConfig,
) -> String {
    let app = Application::build_with(config, store, generator)
        .await
        .expect("Failed to build test application");

    let address = format!("http://127.0.0.1:{}", app.port());

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    // Wait for the server to accept connections; any status will do.
    let client = reqwest::Client::new();
    let health_url = format!("{}/health", address);
    for _ in 0..50 {
        if client.get(&health_url).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    address
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(Arc::new(test_responder()), ChatConfig::for_tests()).await
    }

    pub async fn spawn_with_generator(generator: Arc<dyn ResponseGenerator>) -> Self {
        Self::spawn_with(generator, ChatConfig::for_tests()).await
    }

    pub async fn spawn_with(generator: Arc<dyn ResponseGenerator>, config: ChatConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let address = spawn_server(store.clone(), generator, config).await;
        let port = address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .expect("address has a port");

        TestApp {
            address,
            port,
            store,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn create_session(&self) -> String {
        let body: serde_json::Value = self
            .client
            .post(self.url("/api/chat/session"))
            .send()
            .await
            .expect("Failed to create session")
            .json()
            .await
            .expect("Invalid session response");
        body["sessionId"]
            .as_str()
            .expect("sessionId missing")
            .to_string()
    }

    pub async fn send(&self, session_id: Option<&str>, message: &str) -> reqwest::Response {
        let mut request = self
            .client
            .post(self.url("/api/chat"))
            .json(&serde_json::json!({ "message": message }));
        if let Some(id) = session_id {
            request = request.header("x-session-id", id);
        }
        request.send().await.expect("Failed to send message")
    }

    pub async fn messages(&self, session_id: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/api/chat/{}/messages", session_id)))
            .send()
            .await
            .expect("Failed to fetch messages")
    }

    pub async fn exists(&self, session_id: &str) -> reqwest::Response {
        self.client
            .head(self.url(&format!("/api/chat/{}/exists", session_id)))
            .send()
            .await
            .expect("Failed to check session")
    }
}
