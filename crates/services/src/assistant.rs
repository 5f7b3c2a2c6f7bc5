//! Assistant engine: the conversational backend behind every session.
//!
//! The dispatch loop and the assistant sub-API only ever touch the
//! [`AssistantEngine`] trait; reasoning internals stay opaque.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};

use adj_domain::config::ServiceEndpoint;
use adj_domain::config::Transport;
use adj_domain::error::{Error, Result};
use adj_domain::subsystem::{Subsystem, SubsystemName};

use crate::rest;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Narrow surface the orchestration core calls on the conversational
/// engine. The engine mints its own conversation IDs; message content
/// is passed through untouched (a missing `message` is the engine's
/// problem, not the core's).
#[async_trait]
pub trait AssistantEngine: Send + Sync {
    async fn create_session(&self, principal_id: &str) -> Result<String>;

    async fn process_message(
        &self,
        session_id: &str,
        message: Option<&str>,
        message_type: &str,
        context: &Map<String, Value>,
    ) -> Result<Value>;

    /// Idempotent: ending an unknown or already-ended session is Ok.
    async fn end_session(&self, session_id: &str) -> Result<()>;

    async fn shutdown(&self) -> Result<()>;
}

/// Build the configured engine as `(capability, lifecycle)` facets of
/// one instance.
pub fn create(
    cfg: &ServiceEndpoint,
) -> Result<(Arc<dyn AssistantEngine>, Arc<dyn Subsystem>)> {
    match cfg.transport {
        Transport::Local => {
            let engine = Arc::new(LocalAssistant::new());
            Ok((engine.clone(), engine))
        }
        Transport::Rest => {
            let engine = Arc::new(RestAssistantClient::new(cfg)?);
            Ok((engine.clone(), engine))
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct EngineSession {
    principal_id: String,
    created_at: DateTime<Utc>,
    turns: u64,
}

/// Deterministic in-process engine for development and tests: tracks
/// conversations and acknowledges each message with a structured
/// reply. No reasoning, by definition.
pub struct LocalAssistant {
    sessions: RwLock<HashMap<String, EngineSession>>,
}

impl LocalAssistant {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl Default for LocalAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssistantEngine for LocalAssistant {
    async fn create_session(&self, principal_id: &str) -> Result<String> {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.sessions.write().insert(
            session_id.clone(),
            EngineSession {
                principal_id: principal_id.to_owned(),
                created_at: Utc::now(),
                turns: 0,
            },
        );
        Ok(session_id)
    }

    async fn process_message(
        &self,
        session_id: &str,
        message: Option<&str>,
        message_type: &str,
        context: &Map<String, Value>,
    ) -> Result<Value> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(format!("engine session {session_id}")))?;
        session.turns += 1;

        Ok(json!({
            "session_id": session_id,
            "principal_id": session.principal_id,
            "type": message_type,
            "turn": session.turns,
            "reply": format!("ack: {}", message.unwrap_or("")),
            "context_keys": context.keys().cloned().collect::<Vec<_>>(),
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }

    async fn end_session(&self, session_id: &str) -> Result<()> {
        if let Some(session) = self.sessions.write().remove(session_id) {
            tracing::debug!(
                session_id = %session_id,
                turns = session.turns,
                age_sec = (Utc::now() - session.created_at).num_seconds(),
                "engine session ended"
            );
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let remaining = {
            let mut sessions = self.sessions.write();
            let n = sessions.len();
            sessions.clear();
            n
        };
        if remaining > 0 {
            tracing::info!(flushed = remaining, "assistant engine flushed open sessions");
        }
        Ok(())
    }
}

#[async_trait]
impl Subsystem for LocalAssistant {
    fn name(&self) -> SubsystemName {
        SubsystemName::Assistant
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.shutdown().await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REST client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Client for an assistant engine served out-of-process.
pub struct RestAssistantClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestAssistantClient {
    pub fn new(cfg: &ServiceEndpoint) -> Result<Self> {
        Ok(Self {
            http: rest::client(cfg.timeout_ms)?,
            base_url: rest::base(&cfg.base_url),
        })
    }
}

#[async_trait]
impl AssistantEngine for RestAssistantClient {
    async fn create_session(&self, principal_id: &str) -> Result<String> {
        let body = rest::expect_json(
            self.http
                .post(format!("{}/v1/sessions", self.base_url))
                .json(&json!({ "principal_id": principal_id })),
            "assistant create_session",
        )
        .await?;

        body.get("session_id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::Http("assistant create_session: missing session_id".into()))
    }

    async fn process_message(
        &self,
        session_id: &str,
        message: Option<&str>,
        message_type: &str,
        context: &Map<String, Value>,
    ) -> Result<Value> {
        rest::expect_json(
            self.http
                .post(format!(
                    "{}/v1/sessions/{session_id}/messages",
                    self.base_url
                ))
                .json(&json!({
                    "message": message,
                    "type": message_type,
                    "context": context,
                })),
            "assistant process_message",
        )
        .await
    }

    async fn end_session(&self, session_id: &str) -> Result<()> {
        match rest::expect_json(
            self.http
                .delete(format!("{}/v1/sessions/{session_id}", self.base_url)),
            "assistant end_session",
        )
        .await
        {
            Ok(_) => Ok(()),
            // The upstream already forgot the session — same outcome.
            Err(Error::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn shutdown(&self) -> Result<()> {
        // The upstream engine owns its own lifecycle; dropping the
        // connection pool is all the client-side teardown there is.
        Ok(())
    }
}

#[async_trait]
impl Subsystem for RestAssistantClient {
    fn name(&self) -> SubsystemName {
        SubsystemName::Assistant
    }

    async fn start(&self) -> Result<()> {
        rest::probe_health(&self.http, &self.base_url, "assistant engine").await
    }

    async fn stop(&self) -> Result<()> {
        self.shutdown().await
    }
}
