//! TOML configuration tree for the Adjutant backend.
//!
//! Loaded from `config.toml` (path overridable via the
//! `ADJUTANT_CONFIG` env var); every field carries a serde default so
//! a missing or partial file still yields a runnable configuration.

mod server;
mod services;
mod session;

pub use server::{CorsConfig, ServerConfig};
pub use services::{
    ServiceEndpoint, ServicesConfig, StorageConfig, Transport, WorkflowConfig, WorkflowDef,
};
pub use session::SessionConfig;

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub services: ServicesConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A configured principal: one authenticated identity and the bearer
/// token that resolves to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Static principal list. Empty plus an unset token env var means
    /// dev mode: connections resolve to the `anonymous` principal.
    #[serde(default)]
    pub principals: Vec<Principal>,
    /// Env var holding a single-owner API token; when set and
    /// non-empty it resolves to the `owner` principal.
    #[serde(default = "d_token_env")]
    pub token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            principals: Vec::new(),
            token_env: d_token_env(),
        }
    }
}

fn d_token_env() -> String {
    "ADJUTANT_API_TOKEN".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Config {
    /// Structural validation beyond what serde can express. Errors
    /// abort the boot path; warnings are only logged.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let mut rest_needs_url = |label: &str, ep: &ServiceEndpoint| {
            if ep.transport == Transport::Rest && ep.base_url.is_empty() {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    message: format!("services.{label}: rest transport requires base_url"),
                });
            }
        };
        rest_needs_url("assistant", &self.services.assistant);
        rest_needs_url("memory", &self.services.memory);
        rest_needs_url("voice", &self.services.voice);
        rest_needs_url("qa", &self.services.qa);
        if self.services.workflow.transport == Transport::Rest
            && self.services.workflow.base_url.is_empty()
        {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "services.workflow: rest transport requires base_url".into(),
            });
        }

        for p in &self.auth.principals {
            if p.token.len() < 16 {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Warning,
                    message: format!("auth: token for principal '{}' is shorter than 16 chars", p.id),
                });
            }
        }

        if self.sessions.max_sessions == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "sessions.max_sessions must be > 0".into(),
            });
        }
        if self.server.drain_grace_sec == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "server.drain_grace_sec is 0 — in-flight sessions are cut off on shutdown"
                    .into(),
            });
        }

        issues
    }
}
