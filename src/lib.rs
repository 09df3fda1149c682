//! Embedded interactive terminal bridge.
//!
//! Spawns a shell on a pseudo-terminal and relays its byte stream to a
//! single display over the `terminal.output` / `terminal.input` channels.

pub mod api;
pub mod app_state;
pub mod config;
pub mod handlers;
pub mod protocol;
pub mod pty;
pub mod server;
pub mod service;
pub mod shell;
