//! Boots the broker: loads configuration, wires logging, sweeps orphan
//! containers left by a previous process, starts the idle-session reaper,
//! and serves the tool façade and the artifact HTTP route on one listener.

mod logging;
mod tools;

use anyhow::Context;
use axum::Router;
use sandbox_core::driver::bollard_driver::BollardDriver;
use sandbox_core::{SandboxConfig, SessionManager};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SandboxConfig::from_env().context("loading SANDBOX_* configuration")?;
    let _log_guard = logging::init(&config).context("initializing logging")?;

    info!(
        image = %config.image,
        max_sessions = config.max_sessions,
        "starting mcp-code-sandbox broker"
    );

    let driver = BollardDriver::connect().context("connecting to the container engine")?;
    let http_base_url = format!("http://{}:{}", config.http_host, config.http_port);
    let manager = Arc::new(
        SessionManager::new(config.clone(), Arc::new(driver)).with_http_base_url(http_base_url),
    );

    let removed = manager
        .sweep_orphans()
        .await
        .context("sweeping orphan containers")?;
    info!(removed, "orphan sweep complete");

    let _reaper = sandbox_core::reaper::spawn_ttl_reaper(manager.clone());

    let app = Router::new()
        .merge(sandbox_http::router(manager.clone()))
        .merge(tools::router(manager))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.http_host, config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .await
        .context("serving HTTP")?;

    Ok(())
}
