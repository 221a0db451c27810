use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use taskchat_core::error::AgentError;
use taskchat_core::types::ExecutedToolCall;
use taskchat_store::ConversationStore;

// ── Health ──────────────────────────────────────────────────────────────

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ── Chat ────────────────────────────────────────────────────────────────

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/{user_id}", post(chat))
        .route("/chat/{user_id}/conversations", get(list_conversations))
        .route(
            "/chat/{user_id}/conversations/{conversation_id}/messages",
            get(get_messages),
        )
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    conversation_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    conversation_id: i64,
    response: String,
    tool_calls: Vec<ExecutedToolCall>,
}

fn error_response(err: AgentError) -> (StatusCode, String) {
    match err {
        AgentError::ConversationNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

async fn chat(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let reply = state
        .chat
        .chat(&user_id, req.conversation_id, &req.message)
        .await
        .map_err(error_response)?;

    Ok(Json(ChatResponse {
        conversation_id: reply.conversation_id,
        response: reply.response,
        tool_calls: reply.tool_calls,
    }))
}

#[derive(Debug, Serialize)]
struct ConversationInfo {
    id: i64,
    created_at: String,
    updated_at: String,
}

async fn list_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let conversations = state
        .store
        .list_conversations(&user_id)
        .await
        .map_err(|e| error_response(e.into()))?;

    let conversations: Vec<ConversationInfo> = conversations
        .into_iter()
        .map(|c| ConversationInfo {
            id: c.id,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(serde_json::json!({
        "count": conversations.len(),
        "conversations": conversations,
    })))
}

#[derive(Debug, Serialize)]
struct MessageInfo {
    id: i64,
    role: taskchat_store::Role,
    content: String,
    created_at: String,
}

async fn get_messages(
    State(state): State<AppState>,
    Path((user_id, conversation_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // Ownership check before any history is returned.
    state
        .store
        .get_conversation(&user_id, conversation_id)
        .await
        .map_err(|e| error_response(e.into()))?;

    let messages = state
        .store
        .history(&user_id, conversation_id, 50, 0)
        .await
        .map_err(|e| error_response(e.into()))?;

    let messages: Vec<MessageInfo> = messages
        .into_iter()
        .map(|m| MessageInfo {
            id: m.id,
            role: m.role,
            content: m.content,
            created_at: m.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(serde_json::json!({
        "conversation_id": conversation_id,
        "count": messages.len(),
        "messages": messages,
    })))
}
