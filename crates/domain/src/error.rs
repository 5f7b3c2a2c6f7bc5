use crate::subsystem::SubsystemName;

/// Shared error type used across all Adjutant crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// A fatal-criticality subsystem failed to initialize. Aborts the
    /// startup sequence; the process must not serve traffic.
    #[error("startup: subsystem {subsystem} failed: {message}")]
    Startup {
        subsystem: SubsystemName,
        message: String,
    },

    /// A subsystem's own initialization step failed.
    #[error("init: {0}")]
    Init(String),

    /// A subsystem failed during teardown. Logged and isolated by the
    /// shutdown sequencer, never escalated.
    #[error("shutdown: {0}")]
    Shutdown(String),

    /// Malformed or unexpected inbound frame, or an assistant-engine
    /// failure while processing one. Terminates that session's loop only.
    #[error("session protocol: {0}")]
    SessionProtocol(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
