//! HTTP surface: public system routes, the token-protected `/api`
//! sub-APIs, and the `/ws/assistant` duplex endpoint.

mod assistant;
mod auth;
mod files;
mod qa;
mod system;
mod workflows;
mod ws;

pub use auth::AuthPrincipal;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;

use adj_domain::error::Error;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/assistant/sessions", post(assistant::create_session))
        .route("/api/assistant/sessions/:id/chat", post(assistant::chat))
        .route("/api/assistant/sessions/:id", delete(assistant::end_session))
        .route("/api/files", get(files::list))
        .route("/api/files/content", get(files::content))
        .route("/api/workflows", get(workflows::list))
        .route("/api/workflows/:id/run", post(workflows::run))
        .route("/api/workflows/runs/:run_id", get(workflows::get_run))
        .route("/api/qa/reviews", post(qa::create_review))
        .route("/api/qa/reviews/:id", get(qa::get_review))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/api/health", get(system::health))
        .route("/api/status", get(system::status))
        .route("/ws/assistant", get(ws::upgrade))
        .merge(protected)
        .with_state(state)
}

/// Wrapper mapping domain errors onto HTTP statuses at the handler
/// boundary.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Invalid(_) | Error::SessionProtocol(_) => StatusCode::BAD_REQUEST,
            Error::ResourceExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
