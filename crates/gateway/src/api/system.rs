//! Public system routes: banner, health, and the status snapshot.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use adj_domain::subsystem::{LifecycleState, SubsystemName};

use crate::state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "adjutant",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.registry.subsystems().snapshot();
    let healthy = snapshot
        .iter()
        .all(|s| s.state == LifecycleState::Ready || s.state == LifecycleState::Degraded);

    Json(json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Status snapshot: per-service booleans (true only when fully ready,
/// a degraded voice reads as false), overall status, session count,
/// and uptime. A pure read of the lifecycle table; never fails.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let ready = |name: SubsystemName| state.registry.state_of(name) == LifecycleState::Ready;

    let services = json!({
        "assistant": ready(SubsystemName::Assistant),
        "voice": ready(SubsystemName::Voice),
        "workflow": ready(SubsystemName::Workflow),
        "qa": ready(SubsystemName::Qa),
        "files": ready(SubsystemName::Storage),
    });

    // Overall status covers every registered subsystem, including the
    // ones (memory) with no flag of their own.
    let all_ready = state
        .registry
        .subsystems()
        .snapshot()
        .iter()
        .all(|s| s.state == LifecycleState::Ready);

    let uptime = Utc::now() - state.started_at;
    let secs = uptime.num_seconds().max(0);

    Json(json!({
        "status": if all_ready { "online" } else { "degraded" },
        "services": services,
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.sessions.active_count(),
        "uptime": format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
