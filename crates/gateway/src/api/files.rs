//! Read-only file operations over the storage workspace.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<PathQuery>,
) -> Result<Json<Value>, ApiError> {
    let entries = state.registry.datastore().list_dir(&q.path).await?;
    Ok(Json(json!({ "path": q.path, "entries": entries })))
}

pub async fn content(
    State(state): State<AppState>,
    Query(q): Query<PathQuery>,
) -> Result<Json<Value>, ApiError> {
    let content = state.registry.datastore().read_file(&q.path).await?;
    Ok(Json(json!({ "path": q.path, "content": content })))
}
