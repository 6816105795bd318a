//! HTTP API routes.

use crate::error::ApiError;
use crate::prompt::{self, PromptContext, PromptMode};
use crate::provider::{CompletionClient, CompletionOptions, TokenUsage};
use crate::session::{Message, Role, SessionStats, SessionStore, SessionSummary};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub completion: Arc<dyn CompletionClient>,
}

impl AppState {
    pub fn new(store: SessionStore, completion: Arc<dyn CompletionClient>) -> Self {
        Self { store, completion }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/chat", post(chat))
        .route("/sessions/:id/history", get(session_history))
        .route("/sessions/:id/reset", post(reset_session))
        .route("/sessions/:id", delete(delete_session))
        .route("/sessions/:id/stats", get(session_stats))
        .route("/modes", get(list_modes))
        .fallback(not_found)
        .with_state(state)
}

// ============ Health ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    completion_ready: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        completion_ready: state.completion.is_ready(),
    })
}

// ============ Session Lifecycle ============

#[derive(Debug, Default, Deserialize)]
struct CreateSessionRequest {
    mode: Option<String>,
    context: Option<PromptContext>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    session_id: String,
    created_at: DateTime<Utc>,
}

async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let mode = request
        .mode
        .as_deref()
        .map(PromptMode::parse)
        .unwrap_or_default();
    let context = request.context.unwrap_or_default();

    let system_prompt = prompt::resolve(mode, &context);
    let session = state.store.create(&system_prompt).await;

    let metadata = std::collections::HashMap::from([
        ("mode".to_string(), serde_json::json!(mode.as_str())),
        (
            "context".to_string(),
            serde_json::to_value(&context).unwrap_or(serde_json::Value::Null),
        ),
    ]);
    state.store.update_metadata(&session.id, metadata).await?;

    tracing::info!(session_id = %session.id, mode = mode.as_str(), "Session created");

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            created_at: session.created_at,
        }),
    ))
}

#[derive(Debug, Serialize)]
struct ListSessionsResponse {
    sessions: Vec<SessionSummary>,
    count: usize,
}

async fn list_sessions(State(state): State<AppState>) -> Json<ListSessionsResponse> {
    let sessions = state.store.list().await;
    let count = sessions.len();
    Json(ListSessionsResponse { sessions, count })
}

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    state.store.reset(&id).await?;
    Ok(Json(OkResponse { ok: true }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    if !state.store.delete(&id).await {
        return Err(ApiError::SessionNotFound(id));
    }
    Ok(Json(OkResponse { ok: true }))
}

// ============ History & Stats ============

#[derive(Debug, Serialize)]
struct HistoryResponse {
    messages: Vec<Message>,
    stats: SessionStats,
}

async fn session_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = state
        .store
        .get(&id)
        .await
        .ok_or_else(|| ApiError::SessionNotFound(id.clone()))?;
    let stats = state
        .store
        .stats(&id)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;

    Ok(Json(HistoryResponse {
        messages: session.messages,
        stats,
    }))
}

async fn session_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionStats>, ApiError> {
    let stats = state
        .store
        .stats(&id)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;
    Ok(Json(stats))
}

// ============ Chat ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    message: String,
    options: Option<CompletionOptions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    response_text: String,
    usage: TokenUsage,
    model: String,
}

/// One conversation turn: append the user message, send the full history
/// to the completion boundary, append the assistant reply.
///
/// A failed completion call leaves the user message in place so the turn
/// can be retried without losing context.
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.session_id.is_empty() {
        return Err(ApiError::MissingField("sessionId"));
    }
    if request.message.is_empty() {
        return Err(ApiError::MissingField("message"));
    }
    if state.store.get(&request.session_id).await.is_none() {
        return Err(ApiError::SessionNotFound(request.session_id));
    }
    if !state.completion.is_ready() {
        return Err(ApiError::CompletionNotConfigured);
    }

    state
        .store
        .append(&request.session_id, Role::User, &request.message)
        .await?;
    let history = state.store.history(&request.session_id).await;
    let options = request.options.unwrap_or_default();

    match state.completion.complete(&history, &options).await {
        Ok(completion) => {
            // The session may have been reset or deleted while the model
            // call was in flight; the append no-ops in that case.
            let _ = state
                .store
                .append(&request.session_id, Role::Assistant, &completion.text)
                .await;

            Ok(Json(ChatResponse {
                response_text: completion.text,
                usage: completion.usage,
                model: completion.model,
            }))
        }
        Err(err) => {
            tracing::warn!(session_id = %request.session_id, error = %err, "Completion call failed");
            Err(ApiError::Upstream {
                message: err.message,
                provider_code: err.provider_code,
            })
        }
    }
}

// ============ Modes ============

#[derive(Debug, Serialize)]
struct ListModesResponse {
    modes: Vec<&'static str>,
    descriptions: BTreeMap<&'static str, &'static str>,
}

async fn list_modes() -> Json<ListModesResponse> {
    Json(ListModesResponse {
        modes: PromptMode::ALL.iter().map(|m| m.as_str()).collect(),
        descriptions: PromptMode::ALL
            .iter()
            .map(|m| (m.as_str(), m.description()))
            .collect(),
    })
}

// ============ Fallback ============

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Route not found",
            "code": "NOT_FOUND",
        })),
    )
}
