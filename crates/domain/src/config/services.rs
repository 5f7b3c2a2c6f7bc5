use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Collaborator services
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Transport selection for one collaborator service.
///
/// | Transport | Implementation                   | Best for            |
/// |-----------|----------------------------------|---------------------|
/// | `local`   | In-process implementation        | Dev, tests (default)|
/// | `rest`    | reqwest client against `base_url`| Production          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Local,
    Rest,
}

/// Connection settings shared by every REST-capable collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    #[serde(default)]
    pub transport: Transport,
    /// Upstream base URL, e.g. `http://127.0.0.1:7700`. Required for
    /// the `rest` transport, ignored for `local`.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self {
            transport: Transport::Local,
            base_url: String::new(),
            timeout_ms: d_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub assistant: ServiceEndpoint,
    #[serde(default)]
    pub memory: ServiceEndpoint,
    #[serde(default)]
    pub voice: ServiceEndpoint,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub qa: ServiceEndpoint,
}

// ── Storage tier ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root for Adjutant's own state (session bookkeeping, markers).
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
    /// Root served by the file-operations sub-API. Reads never escape
    /// this directory.
    #[serde(default = "d_workspace_path")]
    pub workspace_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
            workspace_path: d_workspace_path(),
        }
    }
}

// ── Workflow engine ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    /// Workflow definitions available to the local engine.
    #[serde(default)]
    pub definitions: Vec<WorkflowDef>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Local,
            base_url: String::new(),
            timeout_ms: d_timeout_ms(),
            definitions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_timeout_ms() -> u64 {
    30_000
}

fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}

fn d_workspace_path() -> PathBuf {
    PathBuf::from("./workspace")
}
