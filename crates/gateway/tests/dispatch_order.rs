//! Dispatch loop semantics against a scripted channel: strict
//! per-connection ordering, teardown on every exit path.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use adj_domain::error::{Error, Result};
use adj_gateway::dispatch::{
    run_dispatch_loop, DuplexChannel, InboundMessage, Incoming, LoopExit, SessionBinding,
};
use adj_services::AssistantEngine;
use adj_sessions::{SessionManager, SessionState};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Test doubles
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct ScriptedChannel {
    incoming: VecDeque<Result<Incoming>>,
    sent: Vec<Value>,
    closed: bool,
}

impl ScriptedChannel {
    fn new(script: Vec<Result<Incoming>>) -> Self {
        Self {
            incoming: script.into(),
            sent: Vec::new(),
            closed: false,
        }
    }
}

#[async_trait]
impl DuplexChannel for ScriptedChannel {
    async fn recv(&mut self) -> Result<Incoming> {
        self.incoming
            .pop_front()
            .unwrap_or(Ok(Incoming::Closed))
    }

    async fn send(&mut self, payload: Value) -> Result<()> {
        self.sent.push(payload);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

fn frame(text: &str) -> Result<Incoming> {
    Ok(Incoming::Frame(
        serde_json::from_value::<InboundMessage>(json!({ "message": text })).unwrap(),
    ))
}

/// Engine double: per-message artificial latency keyed by message
/// text, a call log, and an optional scripted failure.
struct TestEngine {
    calls: Mutex<Vec<String>>,
    delays_ms: Mutex<std::collections::HashMap<String, u64>>,
    fail_on: Option<String>,
    ended: Mutex<Vec<String>>,
}

impl TestEngine {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delays_ms: Mutex::new(std::collections::HashMap::new()),
            fail_on: None,
            ended: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(self, message: &str, ms: u64) -> Self {
        self.delays_ms.lock().insert(message.to_owned(), ms);
        self
    }

    fn failing_on(mut self, message: &str) -> Self {
        self.fail_on = Some(message.to_owned());
        self
    }
}

#[async_trait]
impl AssistantEngine for TestEngine {
    async fn create_session(&self, _principal_id: &str) -> Result<String> {
        Ok("conv-1".to_owned())
    }

    async fn process_message(
        &self,
        _session_id: &str,
        message: Option<&str>,
        _message_type: &str,
        _context: &Map<String, Value>,
    ) -> Result<Value> {
        let text = message.unwrap_or("").to_owned();
        let delay = self.delays_ms.lock().get(&text).copied().unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.calls.lock().push(text.clone());

        if self.fail_on.as_deref() == Some(text.as_str()) {
            return Err(Error::Http("engine backend unreachable".into()));
        }
        Ok(json!({ "reply": format!("ack: {text}") }))
    }

    async fn end_session(&self, session_id: &str) -> Result<()> {
        self.ended.lock().push(session_id.to_owned());
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

fn binding_for(sessions: &SessionManager) -> SessionBinding {
    let record = sessions.create("tester").unwrap();
    sessions.bind_engine_session(&record.session_id, "conv-1");
    SessionBinding {
        session_id: record.session_id,
        engine_session_id: "conv-1".to_owned(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test(start_paused = true)]
async fn responses_follow_request_order_even_when_the_first_is_slow() {
    let sessions = Arc::new(SessionManager::new(8));
    let binding = binding_for(&sessions);
    let engine = Arc::new(TestEngine::new().with_delay("r1", 2_000));

    let mut channel = ScriptedChannel::new(vec![
        frame("r1"),
        frame("r2"),
        frame("r3"),
        Ok(Incoming::Closed),
    ]);

    let exit = run_dispatch_loop(
        &mut channel,
        &binding,
        engine.clone(),
        sessions.clone(),
        Duration::from_secs(120),
    )
    .await;
    assert!(matches!(exit, LoopExit::Clean));

    // r2 and r3 waited behind the slow r1; the engine never saw them
    // out of order and every response went out in request order.
    assert_eq!(*engine.calls.lock(), vec!["r1", "r2", "r3"]);
    let replies: Vec<&str> = channel
        .sent
        .iter()
        .map(|v| v["data"]["reply"].as_str().unwrap())
        .collect();
    assert_eq!(replies, vec!["ack: r1", "ack: r2", "ack: r3"]);
}

#[tokio::test]
async fn clean_disconnect_ends_the_session() {
    let sessions = Arc::new(SessionManager::new(8));
    let binding = binding_for(&sessions);
    let engine = Arc::new(TestEngine::new());

    let mut channel = ScriptedChannel::new(vec![frame("hello"), Ok(Incoming::Closed)]);
    let exit = run_dispatch_loop(
        &mut channel,
        &binding,
        engine.clone(),
        sessions.clone(),
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(exit, LoopExit::Clean));
    assert_eq!(
        sessions.get(&binding.session_id).unwrap().state,
        SessionState::Closed
    );
    assert_eq!(*engine.ended.lock(), vec!["conv-1"]);
}

#[tokio::test]
async fn engine_failure_reclaims_the_session_and_closes_the_channel() {
    let sessions = Arc::new(SessionManager::new(8));
    let binding = binding_for(&sessions);
    let engine = Arc::new(TestEngine::new().failing_on("boom"));

    let mut channel = ScriptedChannel::new(vec![frame("ok"), frame("boom"), frame("never")]);
    let exit = run_dispatch_loop(
        &mut channel,
        &binding,
        engine.clone(),
        sessions.clone(),
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(exit, LoopExit::Error(Error::Http(_))));
    assert!(channel.closed);
    assert_eq!(
        sessions.get(&binding.session_id).unwrap().state,
        SessionState::Closed
    );
    // The message after the failure was never dispatched.
    assert_eq!(*engine.calls.lock(), vec!["ok", "boom"]);
    assert_eq!(*engine.ended.lock(), vec!["conv-1"]);
}

#[tokio::test(start_paused = true)]
async fn engine_timeout_terminates_the_connection() {
    let sessions = Arc::new(SessionManager::new(8));
    let binding = binding_for(&sessions);
    let engine = Arc::new(TestEngine::new().with_delay("stall", 30_000));

    let mut channel = ScriptedChannel::new(vec![frame("stall")]);
    let exit = run_dispatch_loop(
        &mut channel,
        &binding,
        engine.clone(),
        sessions.clone(),
        Duration::from_secs(2),
    )
    .await;

    assert!(matches!(exit, LoopExit::Error(Error::Timeout(_))));
    assert!(channel.closed);
    assert_eq!(
        sessions.get(&binding.session_id).unwrap().state,
        SessionState::Closed
    );
}

#[tokio::test]
async fn malformed_frames_get_an_error_notice_and_the_loop_continues() {
    let sessions = Arc::new(SessionManager::new(8));
    let binding = binding_for(&sessions);
    let engine = Arc::new(TestEngine::new());

    let mut channel = ScriptedChannel::new(vec![
        Ok(Incoming::Malformed("invalid message: not json".into())),
        frame("still here"),
        Ok(Incoming::Closed),
    ]);
    let exit = run_dispatch_loop(
        &mut channel,
        &binding,
        engine.clone(),
        sessions.clone(),
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(exit, LoopExit::Clean));
    assert_eq!(channel.sent[0]["type"], "error");
    assert_eq!(channel.sent[1]["data"]["reply"], "ack: still here");
    assert_eq!(*engine.calls.lock(), vec!["still here"]);
}
