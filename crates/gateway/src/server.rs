//! Server runner: middleware stack, bind, graceful drain, ordered
//! teardown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderValue;
use tokio::sync::Notify;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use adj_domain::config::{Config, CorsConfig};

use crate::lifecycle::ShutdownSequencer;
use crate::{api, bootstrap};

pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let drain_grace = Duration::from_secs(config.server.drain_grace_sec);
    let max_requests = config.server.max_concurrent_requests;
    let cors = cors_layer(&config.server.cors);

    let state = bootstrap::build_app_state(config).await?;
    bootstrap::spawn_background_tasks(&state);

    let app = api::router(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(max_requests))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(addr = %addr, "adjutant listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await
        .context("server error")?;

    // Listener is closed; drain the live duplex connections before
    // tearing the subsystems down underneath them.
    tracing::info!("draining live sessions");
    state.drain.notify_waiters();
    let deadline = tokio::time::Instant::now() + drain_grace;
    while state.sessions.active_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let leftover = state.sessions.active_count();
    if leftover > 0 {
        tracing::warn!(leftover, "drain grace expired with sessions still active");
    }

    let report = ShutdownSequencer::new()
        .run(state.registry.subsystems())
        .await;
    for entry in &report.subsystems {
        tracing::info!(subsystem = %entry.name, outcome = ?entry.outcome, "teardown");
    }

    tracing::info!("adjutant stopped");
    Ok(())
}

fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    if cfg.allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = cfg
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Resolves on SIGINT or SIGTERM, then wakes the background tasks.
async fn shutdown_signal(shutdown: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
    shutdown.notify_waiters();
}
