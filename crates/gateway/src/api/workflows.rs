//! Workflow listing and run control.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::ApiError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let workflows = state.registry.workflow().list().await?;
    Ok(Json(json!({ "workflows": workflows })))
}

#[derive(Deserialize, Default)]
pub struct RunRequest {
    #[serde(default)]
    pub params: Map<String, Value>,
}

pub async fn run(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Json(req): Json<RunRequest>,
) -> Result<Json<Value>, ApiError> {
    let run_id = state.registry.workflow().run(&workflow_id, &req.params).await?;
    Ok(Json(json!({
        "workflow_id": workflow_id,
        "run_id": run_id,
    })))
}

pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let run = state.registry.workflow().get_run(&run_id).await?;
    Ok(Json(serde_json::to_value(run).map_err(adj_domain::error::Error::from)?))
}
