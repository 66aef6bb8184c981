use crate::dtos::{ChatRequest, ChatResponse, SessionResponse, SESSION_HEADER};
use crate::models::Message;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use service_core::utils::ValidatedJson;

const NO_STORE: [(header::HeaderName, &str); 1] = [(header::CACHE_CONTROL, "no-store")];

pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.chat.create_session().await?;
    Ok(Json(SessionResponse {
        session_id: session.session_id,
    }))
}

/// `HEAD /api/chat/:session_id/exists`: 204 when known, 404 otherwise.
pub async fn session_exists(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let status = match state.chat.session_exists(&session_id).await {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "Session lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, NO_STORE)
}

pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok());

    let turn = state.chat.handle_turn(session_id, request).await?;

    Ok(Json(ChatResponse {
        reply: turn.reply,
        session_id: turn.session_id,
    }))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let messages: Vec<Message> = state.chat.history(&session_id).await?;
    Ok((NO_STORE, Json(messages)))
}
