//! `/ws/assistant`: the duplex assistant channel.
//!
//! Auth happens before the upgrade; an invalid token never gets a
//! socket. After the upgrade the connection is handed to the dispatch
//! loop, with a drain watcher so server shutdown can end the session
//! even while the loop is blocked on a receive.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use async_trait::async_trait;

use adj_domain::error::{Error, Result};

use super::ApiError;
use crate::dispatch::{
    run_dispatch_loop, DuplexChannel, InboundMessage, Incoming, SessionBinding,
};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

pub async fn upgrade(
    State(state): State<AppState>,
    Query(q): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let principal_id = match state.identity.resolve(q.token.as_deref()) {
        Ok(p) => p,
        Err(e) => return ApiError(e).into_response(),
    };
    ws.on_upgrade(move |socket| handle(socket, state, principal_id))
}

async fn handle(socket: WebSocket, state: AppState, principal_id: String) {
    let mut channel = WsChannel { socket };

    let record = match state.sessions.create(&principal_id) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(principal_id = %principal_id, error = %e, "connection refused");
            let _ = channel
                .send(json!({ "type": "error", "error": e.to_string() }))
                .await;
            let _ = channel.close().await;
            return;
        }
    };

    let engine = state.registry.assistant();
    let engine_session_id = match engine.create_session(&principal_id).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(session_id = %record.session_id, error = %e, "engine refused session");
            state.sessions.end(&record.session_id);
            let _ = channel
                .send(json!({ "type": "error", "error": e.to_string() }))
                .await;
            let _ = channel.close().await;
            return;
        }
    };
    state
        .sessions
        .bind_engine_session(&record.session_id, &engine_session_id);

    let hello = json!({ "type": "session", "session_id": record.session_id });
    if channel.send(hello).await.is_err() {
        state.sessions.end(&record.session_id);
        let _ = engine.end_session(&engine_session_id).await;
        return;
    }

    tracing::info!(
        session_id = %record.session_id,
        principal_id = %principal_id,
        "assistant connection established"
    );

    let binding = SessionBinding {
        session_id: record.session_id.clone(),
        engine_session_id: engine_session_id.clone(),
    };
    let request_timeout = Duration::from_secs(state.config.sessions.request_timeout_sec);

    let drained = {
        let fut = run_dispatch_loop(
            &mut channel,
            &binding,
            engine.clone(),
            state.sessions.clone(),
            request_timeout,
        );
        tokio::pin!(fut);
        tokio::select! {
            _exit = &mut fut => false,
            _ = state.drain.notified() => true,
        }
    };

    // The loop future was dropped mid-receive; its teardown never ran.
    if drained {
        tracing::info!(session_id = %binding.session_id, "connection drained for shutdown");
        let _ = channel.close().await;
        state.sessions.mark_closing(&binding.session_id);
        if let Err(e) = engine.end_session(&binding.engine_session_id).await {
            tracing::warn!(session_id = %binding.session_id, error = %e, "engine teardown failed");
        }
        state.sessions.end(&binding.session_id);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channel adapter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct WsChannel {
    socket: WebSocket,
}

#[async_trait]
impl DuplexChannel for WsChannel {
    async fn recv(&mut self) -> Result<Incoming> {
        loop {
            match self.socket.recv().await {
                None => return Ok(Incoming::Closed),
                // The peer vanished; same teardown as a close frame.
                Some(Err(_)) => return Ok(Incoming::Closed),
                Some(Ok(Message::Close(_))) => return Ok(Incoming::Closed),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Binary(_))) => {
                    return Ok(Incoming::Malformed("binary frames not supported".into()))
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(match serde_json::from_str::<InboundMessage>(&text) {
                        Ok(msg) => Incoming::Frame(msg),
                        Err(e) => Incoming::Malformed(format!("invalid message: {e}")),
                    })
                }
            }
        }
    }

    async fn send(&mut self, payload: Value) -> Result<()> {
        self.socket
            .send(Message::Text(payload.to_string()))
            .await
            .map_err(|e| Error::SessionProtocol(format!("send failed: {e}")))
    }

    async fn close(&mut self) -> Result<()> {
        self.socket
            .send(Message::Close(None))
            .await
            .map_err(|e| Error::SessionProtocol(format!("close failed: {e}")))
    }
}
