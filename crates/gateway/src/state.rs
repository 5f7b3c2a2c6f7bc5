//! Shared per-process state handed to every handler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use adj_domain::config::Config;
use adj_sessions::{IdentityResolver, SessionManager};

use crate::lifecycle::ServiceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ServiceRegistry>,
    pub sessions: Arc<SessionManager>,
    pub identity: Arc<IdentityResolver>,
    pub started_at: DateTime<Utc>,
    /// Signalled once on SIGINT/SIGTERM; stops background tasks.
    pub shutdown: Arc<Notify>,
    /// Signalled when the server begins draining; every live dispatch
    /// loop ends its session and closes its connection.
    pub drain: Arc<Notify>,
}
