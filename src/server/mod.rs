//! Server management for pty_bridge
mod server;

pub use server::{
    build_router, listen_addr, run_server_with_graceful_shutdown, serve, shutdown_signal,
};
