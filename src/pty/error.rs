/// Error types for the PTY layer
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PtyError {
    /// The pseudo-terminal device pair could not be allocated
    #[error("Failed to open PTY: {0}")]
    OpenPty(String),

    /// The shell executable could not be launched on the PTY
    #[error("Failed to spawn `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    /// The session has exited or was terminated
    #[error("Session is closed")]
    SessionClosed,

    /// Each observer slot accepts a single registration
    #[error("Observer already registered for {0} events")]
    ObserverAlreadyRegistered(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task error: {0}")]
    BackgroundTask(String),
}

impl PtyError {
    /// Whether this error means the session never got started.
    pub fn is_spawn_error(&self) -> bool {
        matches!(self, PtyError::OpenPty(_) | PtyError::Spawn { .. })
    }
}
