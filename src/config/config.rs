/// Configuration data structures for pty_bridge
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::shell::{DEFAULT_COLUMNS, DEFAULT_ROWS, DEFAULT_TERM_NAME};

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Display channel listener
    pub server: ServerConfig,

    /// Shell and PTY settings
    pub terminal: TerminalSettings,

    /// Log output settings
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7681,
        }
    }
}

/// Shell configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TerminalSettings {
    /// Shell executable (defaults to the platform shell)
    pub shell: Option<String>,

    /// Extra arguments passed to the shell
    pub args: Vec<String>,

    /// Working directory (defaults to the home directory)
    pub working_directory: Option<PathBuf>,

    /// Exported to the shell as TERM
    pub term_name: String,

    /// Number of columns
    pub columns: u16,

    /// Number of rows
    pub rows: u16,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            shell: None,
            args: Vec::new(),
            working_directory: None,
            term_name: DEFAULT_TERM_NAME.to_string(),
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,

    /// Emit JSON lines instead of human readable output
    pub json: bool,

    /// Write daily rolling log files here instead of stderr
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}
