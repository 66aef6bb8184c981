//! Application startup and lifecycle management.

use crate::config::{ChatConfig, ResponderKind, StoreBackend};
use crate::dtos::SESSION_HEADER;
use crate::handlers;
use crate::services::responder::{DialogflowClient, DialogflowConfig};
use crate::services::{
    ChatService, ConversationStore, IntentResponder, MemoryStore, PatternResponder,
    PostgresStore, ResponseGenerator,
};
use axum::{
    middleware,
    routing::{get, head, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    make_request_span, metrics_middleware, request_id_middleware, security_headers_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ChatConfig,
    pub chat: ChatService,
}

/// Builds the HTTP router for the given state.
pub fn build_router(state: AppState) -> Router {
    let cors = state.config.cors.clone().into_layer(&[SESSION_HEADER]);

    Router::new()
        .route("/", get(handlers::root))
        .route("/status", get(handlers::status))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/api/chat", post(handlers::send_message))
        .route("/api/chat/session", post(handlers::create_session))
        .route("/api/chat/:session_id/exists", head(handlers::session_exists))
        .route("/api/chat/:session_id/messages", get(handlers::get_messages))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .with_state(state)
}

/// Opens the configured conversation store.
pub async fn build_store(config: &ChatConfig) -> Result<Arc<dyn ConversationStore>, AppError> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory conversation store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config.store.database_url.as_deref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is not set"))
            })?;
            let store = PostgresStore::new(
                url,
                config.store.max_connections,
                config.store.min_connections,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                e
            })?;
            store.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
            tracing::info!("Using PostgreSQL conversation store");
            Ok(Arc::new(store))
        }
    }
}

/// Builds the configured reply generator.
pub fn build_generator(config: &ChatConfig) -> Result<Arc<dyn ResponseGenerator>, AppError> {
    let responder = &config.responder;
    match responder.kind {
        ResponderKind::Pattern => Ok(Arc::new(PatternResponder::builtin())),
        ResponderKind::Dialogflow => {
            let (Some(project_id), Some(access_token)) =
                (responder.project_id.clone(), responder.access_token.clone())
            else {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Dialogflow responder requires a project id and an access token"
                )));
            };

            let client = DialogflowClient::new(DialogflowConfig {
                endpoint: responder.endpoint.clone(),
                project_id,
                access_token,
                request_timeout: responder.upstream_timeout,
            })
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

            Ok(Arc::new(IntentResponder::new(
                Arc::new(client),
                responder.language_code.clone(),
                responder.upstream_timeout,
            )))
        }
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application with the store and generator named by `config`.
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        let store = build_store(&config).await?;
        let generator = build_generator(&config)?;
        Self::build_with(config, store, generator).await
    }

    /// Build the application around an existing store and generator.
    pub async fn build_with(
        config: ChatConfig,
        store: Arc<dyn ConversationStore>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Result<Self, AppError> {
        tracing::info!(generator = generator.name(), "Reply generator ready");

        let state = AppState {
            config: config.clone(),
            chat: ChatService::new(store, generator),
        };

        let app = build_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            service = "chat-service",
            version = env!("CARGO_PKG_VERSION"),
            port = port,
            environment = config.environment.as_str(),
            "Service ready to accept connections"
        );

        Ok(Self {
            port,
            listener,
            router: app,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn chat(&self) -> &ChatService {
        &self.state.chat
    }

    /// Run until the server stops.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
