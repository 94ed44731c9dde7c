//! Conversation proxy route

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::{
    error::{ApiError, ApiResult},
    llm::{ChatTurn, DEFAULT_MODEL},
    state::AppState,
};

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Prompt request for the conversation proxy
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub session_id: String,
    pub prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
}

/// Forward the prompt plus accumulated session history to the
/// completion API and return the reply.
///
/// The per-session lock is held across the upstream call; concurrent
/// requests for the same session id run one after the other. On
/// upstream failure the prompt stays in the history and the error
/// message is surfaced to the caller.
pub async fn generate(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.conversations.session(&payload.session_id);
    let mut history = session.lock().await;

    history.push(ChatTurn::user(&payload.prompt));

    let reply = state
        .completion_client
        .complete(&payload.model, &history)
        .await
        .map_err(|e| {
            error!("Completion call failed: {:#}", e);
            ApiError::Upstream(e.to_string())
        })?;

    history.push(ChatTurn::assistant(reply.clone()));
    state.conversations.enforce_cap(&mut history);

    Ok(Json(json!({ "response": reply })))
}
