//! Bearer-token auth for the protected `/api` routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::ApiError;
use crate::state::AppState;

/// The resolved principal, inserted as a request extension for
/// downstream handlers.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub String);

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match state.identity.resolve(token) {
        Ok(principal_id) => {
            req.extensions_mut().insert(AuthPrincipal(principal_id));
            next.run(req).await
        }
        Err(e) => ApiError(e).into_response(),
    }
}
