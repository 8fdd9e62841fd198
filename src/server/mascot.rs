use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::core::turn::Turn;
use crate::error::RelayError;
use crate::storage::DEFAULT_SESSION;

#[derive(Debug, Deserialize)]
pub struct MascotRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    history: Option<Vec<Turn>>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MascotReply {
    reply: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    turns: Vec<Turn>,
}

const SESSION_REQUIRED: &str = "session_id is required";

fn session_or_default(session_id: Option<String>) -> String {
    session_id.unwrap_or_else(|| DEFAULT_SESSION.to_string())
}

/// History reads and deletes must name their session
fn required_session(session_id: Option<String>) -> Result<String, RelayError> {
    session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| RelayError::Validation(SESSION_REQUIRED.to_string()))
}

pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<MascotRequest>, JsonRejection>,
) -> Result<Json<MascotReply>, RelayError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!("[Mascot] Rejected request body: {}", e);
        RelayError::Validation("Invalid request body".to_string())
    })?;

    let session_id = session_or_default(request.session_id);
    let message = request.message.unwrap_or_default();

    let reply = state
        .relay
        .send_message(&session_id, &message, request.history)
        .await?;

    Ok(Json(MascotReply { reply }))
}

pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<HistoryResponse>, RelayError> {
    let session_id = required_session(query.session_id)?;
    let turns = state.relay.history(&session_id).await?;
    Ok(Json(HistoryResponse { turns }))
}

pub async fn clear_history(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<StatusCode, RelayError> {
    let session_id = required_session(query.session_id)?;
    state.relay.clear(&session_id).await?;
    tracing::info!("[Mascot] Cleared session '{}'", session_id);
    Ok(StatusCode::NO_CONTENT)
}
