use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on concurrently active sessions; creating one past
    /// this limit fails with a resource-exhausted error.
    #[serde(default = "d_1024")]
    pub max_sessions: usize,
    /// Sessions with no dispatched message for this long are closed by
    /// the reclaim task, whether or not their loop exited cleanly.
    #[serde(default = "d_900")]
    pub idle_timeout_sec: u64,
    /// Closed session records are evicted after this long.
    #[serde(default = "d_300")]
    pub closed_ttl_sec: u64,
    /// Defensive per-message bound on the assistant-engine call.
    #[serde(default = "d_120")]
    pub request_timeout_sec: u64,
    /// Interval of the background reclaim sweep.
    #[serde(default = "d_60")]
    pub reclaim_interval_sec: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 1024,
            idle_timeout_sec: 900,
            closed_ttl_sec: 300,
            request_timeout_sec: 120,
            reclaim_interval_sec: 60,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_1024() -> usize {
    1024
}

fn d_900() -> u64 {
    900
}

fn d_300() -> u64 {
    300
}

fn d_120() -> u64 {
    120
}

fn d_60() -> u64 {
    60
}
