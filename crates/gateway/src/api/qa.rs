//! QA review requests.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use adj_services::ReviewType;

use super::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub review_type: String,
    pub target: String,
}

pub async fn create_review(
    State(state): State<AppState>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<Json<Value>, ApiError> {
    let review_type: ReviewType = req.review_type.parse()?;
    let id = state
        .registry
        .qa()
        .create_review(review_type, &req.target)
        .await?;
    Ok(Json(json!({ "id": id })))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let review = state.registry.qa().get_review(&id).await?;
    Ok(Json(serde_json::to_value(review).map_err(adj_domain::error::Error::from)?))
}
