//! REST access to assistant conversations, for clients that cannot
//! hold a duplex connection open. Sessions created here live in the
//! same manager as socket sessions and are subject to the same idle
//! reclaim.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use adj_domain::error::Error;

use super::{ApiError, AuthPrincipal};
use crate::state::AppState;

pub async fn create_session(
    State(state): State<AppState>,
    Extension(AuthPrincipal(principal_id)): Extension<AuthPrincipal>,
) -> Result<Json<Value>, ApiError> {
    let record = state.sessions.create(&principal_id)?;
    let engine = state.registry.assistant();

    let engine_session_id = match engine.create_session(&principal_id).await {
        Ok(id) => id,
        Err(e) => {
            state.sessions.end(&record.session_id);
            return Err(e.into());
        }
    };
    state
        .sessions
        .bind_engine_session(&record.session_id, &engine_session_id);

    Ok(Json(json!({
        "session_id": record.session_id,
        "created_at": record.created_at.to_rfc3339(),
    })))
}

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default = "d_chat")]
    pub message_type: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

fn d_chat() -> String {
    "chat".to_owned()
}

pub async fn chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Extension(AuthPrincipal(principal_id)): Extension<AuthPrincipal>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let record = lookup(&state, &session_id, &principal_id)?;
    let engine_session_id = record
        .engine_session_id
        .ok_or_else(|| Error::SessionProtocol(format!("session {session_id} has no conversation")))?;

    state.sessions.touch(&session_id);
    let reply = state
        .registry
        .assistant()
        .process_message(
            &engine_session_id,
            req.message.as_deref(),
            &req.message_type,
            &req.context,
        )
        .await?;

    Ok(Json(json!({
        "session_id": session_id,
        "data": reply,
    })))
}

pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Extension(AuthPrincipal(principal_id)): Extension<AuthPrincipal>,
) -> Result<Json<Value>, ApiError> {
    let record = lookup(&state, &session_id, &principal_id)?;

    state.sessions.mark_closing(&session_id);
    if let Some(engine_session_id) = &record.engine_session_id {
        if let Err(e) = state.registry.assistant().end_session(engine_session_id).await {
            tracing::warn!(session_id = %session_id, error = %e, "engine teardown failed");
        }
    }
    state.sessions.end(&session_id);

    Ok(Json(json!({ "session_id": session_id, "status": "closed" })))
}

/// A principal only ever sees its own sessions; someone else's session
/// ID behaves exactly like a missing one.
fn lookup(
    state: &AppState,
    session_id: &str,
    principal_id: &str,
) -> Result<adj_sessions::SessionRecord, Error> {
    state
        .sessions
        .get(session_id)
        .filter(|r| r.principal_id == principal_id)
        .ok_or_else(|| Error::NotFound(format!("session {session_id}")))
}
