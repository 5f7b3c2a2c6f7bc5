//! Per-connection dispatch loop.
//!
//! One loop per duplex connection, consuming messages strictly in
//! arrival order: a message is not received until the previous one's
//! response has been sent. The loop is generic over [`DuplexChannel`]
//! so the ordering and teardown rules are testable without a socket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use adj_domain::error::{Error, Result};
use adj_services::AssistantEngine;
use adj_sessions::SessionManager;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One inbound client message. `type` defaults to `chat` and `context`
/// to empty, matching what thin clients actually send.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
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

/// What the channel yielded on a receive.
pub enum Incoming {
    Frame(InboundMessage),
    /// A frame arrived but could not be decoded. The loop reports the
    /// reason to the client and keeps the connection open.
    Malformed(String),
    /// Peer closed the connection.
    Closed,
}

/// Transport seam between the dispatch loop and the wire.
#[async_trait]
pub trait DuplexChannel: Send {
    /// Receive the next message. `Err` means the transport itself
    /// failed; the loop exits and teardown runs.
    async fn recv(&mut self) -> Result<Incoming>;

    async fn send(&mut self, payload: Value) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// The two IDs a connection operates under: the gateway session and
/// the conversation the engine minted for it.
#[derive(Debug, Clone)]
pub struct SessionBinding {
    pub session_id: String,
    pub engine_session_id: String,
}

/// How the loop ended. Teardown already ran either way.
#[derive(Debug)]
pub enum LoopExit {
    /// Peer disconnected normally.
    Clean,
    /// Transport failure, engine failure, or engine timeout.
    Error(Error),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drive one connection until the peer disconnects or something
/// breaks.
///
/// Every exit path reclaims the session: the record is marked closing,
/// the engine conversation is ended (best effort), and the record is
/// closed. On error exits the channel is also closed so the peer sees
/// the connection drop rather than a hang.
pub async fn run_dispatch_loop<C: DuplexChannel>(
    channel: &mut C,
    binding: &SessionBinding,
    engine: Arc<dyn AssistantEngine>,
    sessions: Arc<SessionManager>,
    request_timeout: Duration,
) -> LoopExit {
    let exit = dispatch(channel, binding, engine.as_ref(), &sessions, request_timeout).await;

    sessions.mark_closing(&binding.session_id);
    if let Err(e) = engine.end_session(&binding.engine_session_id).await {
        tracing::warn!(
            session_id = %binding.session_id,
            error = %e,
            "engine session teardown failed"
        );
    }
    sessions.end(&binding.session_id);

    match &exit {
        LoopExit::Clean => {
            tracing::info!(session_id = %binding.session_id, "connection closed");
        }
        LoopExit::Error(e) => {
            tracing::warn!(
                session_id = %binding.session_id,
                error = %e,
                "connection terminated"
            );
            if channel.close().await.is_err() {
                tracing::debug!(session_id = %binding.session_id, "channel already gone");
            }
        }
    }
    exit
}

async fn dispatch<C: DuplexChannel>(
    channel: &mut C,
    binding: &SessionBinding,
    engine: &dyn AssistantEngine,
    sessions: &SessionManager,
    request_timeout: Duration,
) -> LoopExit {
    loop {
        let inbound = match channel.recv().await {
            Ok(Incoming::Frame(msg)) => msg,
            Ok(Incoming::Malformed(reason)) => {
                tracing::debug!(
                    session_id = %binding.session_id,
                    reason = %reason,
                    "dropping malformed frame"
                );
                let notice = json!({ "type": "error", "error": reason });
                if let Err(e) = channel.send(notice).await {
                    return LoopExit::Error(e);
                }
                continue;
            }
            Ok(Incoming::Closed) => return LoopExit::Clean,
            Err(e) => return LoopExit::Error(e),
        };

        sessions.touch(&binding.session_id);

        let processed = tokio::time::timeout(
            request_timeout,
            engine.process_message(
                &binding.engine_session_id,
                inbound.message.as_deref(),
                &inbound.message_type,
                &inbound.context,
            ),
        )
        .await;

        let reply = match processed {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return LoopExit::Error(e),
            Err(_) => {
                return LoopExit::Error(Error::Timeout(format!(
                    "assistant engine exceeded {}s",
                    request_timeout.as_secs()
                )))
            }
        };

        let outbound = json!({
            "type": "response",
            "session_id": binding.session_id,
            "data": reply,
        });
        if let Err(e) = channel.send(outbound).await {
            return LoopExit::Error(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_message_defaults() {
        let msg: InboundMessage = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(msg.message.as_deref(), Some("hi"));
        assert_eq!(msg.message_type, "chat");
        assert!(msg.context.is_empty());
    }

    #[test]
    fn inbound_message_full_form() {
        let msg: InboundMessage = serde_json::from_str(
            r#"{"message":"book it","type":"command","context":{"tz":"UTC"}}"#,
        )
        .unwrap();
        assert_eq!(msg.message_type, "command");
        assert_eq!(msg.context["tz"], "UTC");
    }

    #[test]
    fn message_field_may_be_absent() {
        let msg: InboundMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(msg.message.is_none());
        assert_eq!(msg.message_type, "ping");
    }
}
