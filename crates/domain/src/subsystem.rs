//! Subsystem model: logical names, failure criticality, lifecycle
//! states, the sequencer-facing [`Subsystem`] trait, and the reports
//! the startup/shutdown sequencers produce.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Names, criticality, lifecycle states
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fixed logical name of one backend capability owned by the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsystemName {
    Storage,
    Assistant,
    Memory,
    Voice,
    Workflow,
    Qa,
}

impl SubsystemName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubsystemName::Storage => "storage",
            SubsystemName::Assistant => "assistant",
            SubsystemName::Memory => "memory",
            SubsystemName::Voice => "voice",
            SubsystemName::Workflow => "workflow",
            SubsystemName::Qa => "qa",
        }
    }
}

impl fmt::Display for SubsystemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a subsystem's init failure blocks process readiness
/// (`Fatal`) or merely downgrades it (`Degraded`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Fatal,
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Starting,
    Ready,
    Degraded,
    Stopping,
    Stopped,
    Failed,
}

impl LifecycleState {
    /// True for states in which the subsystem holds live resources and
    /// should receive a stop call during shutdown.
    pub fn is_live(&self) -> bool {
        matches!(self, LifecycleState::Ready | LifecycleState::Degraded)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Starting => "starting",
            LifecycleState::Ready => "ready",
            LifecycleState::Degraded => "degraded",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Subsystem trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One opaque backend capability, owned by the process for its
/// lifetime.
///
/// Constructors of concrete subsystems are cheap and infallible; all
/// fallible initialization (I/O, upstream probes, directory setup)
/// happens in [`Subsystem::start`]. Once ready, a subsystem's method
/// surface is internally thread-safe — the registry hands out shared
/// references, never mutable ones.
#[async_trait]
pub trait Subsystem: Send + Sync {
    fn name(&self) -> SubsystemName;

    fn criticality(&self) -> Criticality {
        Criticality::Fatal
    }

    /// Bring the subsystem up. Called exactly once by the startup
    /// sequencer, in dependency order.
    async fn start(&self) -> Result<()>;

    /// Release the subsystem's resources. Only called for subsystems
    /// that actually started.
    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reports
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-subsystem outcome of the startup sequence.
#[derive(Debug, Clone, Serialize)]
pub struct SubsystemReport {
    pub name: SubsystemName,
    pub criticality: Criticality,
    pub state: LifecycleState,
    /// Degradation reason, when the subsystem came up degraded.
    pub note: Option<String>,
}

/// Snapshot of every subsystem's state after the startup sequence.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadinessReport {
    pub subsystems: Vec<SubsystemReport>,
}

impl ReadinessReport {
    /// Process readiness: every fatal-criticality subsystem is ready.
    /// Degraded-criticality subsystems may be degraded or failed.
    pub fn is_ready(&self) -> bool {
        self.subsystems.iter().all(|s| {
            s.criticality != Criticality::Fatal || s.state == LifecycleState::Ready
        })
    }

    pub fn state_of(&self, name: SubsystemName) -> Option<LifecycleState> {
        self.subsystems.iter().find(|s| s.name == name).map(|s| s.state)
    }
}

/// Outcome of one subsystem's teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownOutcome {
    Stopped,
    Failed(String),
    /// Never started, already stopped, or failed earlier — no stop
    /// attempt was made.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShutdownEntry {
    pub name: SubsystemName,
    pub outcome: ShutdownOutcome,
}

/// Per-subsystem shutdown outcomes, in the order teardown was
/// attempted (reverse of startup). Purely informational.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShutdownReport {
    pub subsystems: Vec<ShutdownEntry>,
}

impl ShutdownReport {
    pub fn outcome_of(&self, name: SubsystemName) -> Option<&ShutdownOutcome> {
        self.subsystems
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.outcome)
    }

    pub fn failure_count(&self) -> usize {
        self.subsystems
            .iter()
            .filter(|e| matches!(e.outcome, ShutdownOutcome::Failed(_)))
            .count()
    }
}
