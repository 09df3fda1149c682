//! Main entry point for the pty_bridge host
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use pty_bridge::app_state::AppState;
use pty_bridge::config::{ConfigLoader, init_logging};
use pty_bridge::server::{build_router, run_server_with_graceful_shutdown};
use pty_bridge::service::SessionSupervisor;
use pty_bridge::shell::ShellResolver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may set APP_DEV and PTY_BRIDGE_CONFIG
    let _ = dotenvy::dotenv();

    let config = ConfigLoader::new()
        .load_config(None)
        .context("Failed to load configuration")?;
    let _log_guard = init_logging(&config.logging)?;

    let supervisor = Arc::new(SessionSupervisor::new(ShellResolver::new(
        config.terminal.clone(),
    )));
    let session = supervisor
        .on_application_ready()
        .await
        .context("Failed to start terminal session")?;
    info!("Terminal session {} ready", session.id());
    drop(session);

    let state = AppState::new(config, supervisor.clone());
    let app = build_router(state.clone());
    let served = run_server_with_graceful_shutdown(app, &state.config.server).await;

    supervisor.on_application_shutdown().await;
    served.context("Server error")?;
    Ok(())
}
