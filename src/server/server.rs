/// Server implementation for pty_bridge
use std::future::Future;
use std::net::SocketAddr;

use axum::{Router, http::Method, routing::get};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::{app_state::AppState, config::ServerConfig, handlers};

/// Build the application router with routes
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "pty_bridge - embedded terminal host" }))
        .route("/health", get(handlers::rest::health_check))
        // the display channel
        .route("/ws", get(handlers::websocket::websocket_handler))
        .route("/api/session", get(handlers::rest::get_session))
        .layer(cors)
        .with_state(state)
}

/// Resolve the configured listen address
pub fn listen_addr(config: &ServerConfig) -> Result<SocketAddr, std::io::Error> {
    format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
}

/// Serve `router` on an already bound listener until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C signal, initiating graceful shutdown...");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM signal, initiating graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}

/// Run the HTTP server with graceful shutdown support
pub async fn run_server_with_graceful_shutdown(
    router: Router,
    config: &ServerConfig,
) -> Result<(), std::io::Error> {
    let addr = listen_addr(config)?;
    let listener = TcpListener::bind(addr).await?;

    info!("Server running on http://{}", addr);
    info!("Display channel available at ws://{}/ws", addr);

    serve(listener, router, shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}
