//! Process bring-up: validate config, build the registry, run the
//! startup sequence, and spawn the background tasks.

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use tokio::sync::Notify;

use adj_domain::config::{Config, ConfigSeverity};
use adj_sessions::{IdentityResolver, SessionManager};

use crate::lifecycle::{ServiceRegistry, StartupSequencer};
use crate::state::AppState;

/// Validate the config, construct every subsystem, and run the startup
/// sequence. Fails if the config has hard errors or a fatal subsystem
/// refuses to start; a degraded voice interface is not a failure.
pub async fn build_app_state(config: Config) -> anyhow::Result<AppState> {
    let mut hard_errors = 0;
    for issue in config.validate() {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!(issue = %issue, "config warning"),
            ConfigSeverity::Error => {
                tracing::error!(issue = %issue, "config error");
                hard_errors += 1;
            }
        }
    }
    if hard_errors > 0 {
        bail!("{hard_errors} config error(s); refusing to start");
    }

    let registry = Arc::new(
        ServiceRegistry::from_config(&config.services)
            .context("constructing service registry")?,
    );

    let report = StartupSequencer::new()
        .run(registry.subsystems())
        .await
        .context("startup sequence")?;

    for s in &report.subsystems {
        tracing::info!(
            subsystem = %s.name,
            state = %s.state,
            note = s.note.as_deref().unwrap_or(""),
            "subsystem state"
        );
    }
    if report.is_ready() {
        tracing::info!("all fatal subsystems ready");
    }

    let sessions = Arc::new(SessionManager::new(config.sessions.max_sessions));
    let identity = Arc::new(IdentityResolver::from_config(&config.auth));

    Ok(AppState {
        config: Arc::new(config),
        registry,
        sessions,
        identity,
        started_at: Utc::now(),
        shutdown: Arc::new(Notify::new()),
        drain: Arc::new(Notify::new()),
    })
}

/// Spawn the session reclaim sweep. Runs until the shutdown notify
/// fires.
pub fn spawn_background_tasks(state: &AppState) {
    let sessions = state.sessions.clone();
    let shutdown = state.shutdown.clone();
    let cfg = state.config.sessions.clone();

    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(cfg.reclaim_interval_sec));
        // Skip the immediate first tick.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let closed = sessions.reclaim(
                        chrono::Duration::seconds(cfg.idle_timeout_sec as i64),
                        chrono::Duration::seconds(cfg.closed_ttl_sec as i64),
                    );
                    if closed > 0 {
                        tracing::info!(closed, "reclaim sweep closed idle sessions");
                    }
                }
                _ = shutdown.notified() => {
                    tracing::debug!("reclaim sweep stopping");
                    break;
                }
            }
        }
    });
}
