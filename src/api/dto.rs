/// Data Transfer Objects (DTOs) for REST API endpoints
use serde::Serialize;

use crate::pty::{PtySession, SessionState};

/// Response DTO for the terminal session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session ID
    pub id: String,

    /// starting, running or exited
    pub state: String,

    /// Exit code once the shell has exited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<u32>,

    /// Terminating signal, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,

    /// Shell executable
    pub shell: String,

    /// Working directory the shell started in
    pub working_directory: String,

    /// Terminal columns
    pub columns: u16,

    /// Terminal rows
    pub rows: u16,

    /// Whether a display is currently attached
    pub display_attached: bool,
}

impl SessionSnapshot {
    pub fn from_session(session: &PtySession, display_attached: bool) -> Self {
        let state = session.state();
        let (exit_code, signal) = match &state {
            SessionState::Exited(exit) => (Some(exit.exit_code), exit.signal.clone()),
            _ => (None, None),
        };
        let spec = session.spec();

        Self {
            id: session.id().to_string(),
            state: state.label().to_string(),
            exit_code,
            signal,
            shell: spec.executable.clone(),
            working_directory: spec.working_directory.to_string_lossy().to_string(),
            columns: spec.columns,
            rows: spec.rows,
            display_attached,
        }
    }
}

/// Generic error response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error flag
    pub error: bool,

    /// Error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}
