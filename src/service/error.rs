/// Error types for the service layer
use thiserror::Error;
use uuid::Uuid;

/// Service layer error type
#[derive(Error, Debug)]
pub enum ServiceError {
    /// PTY error
    #[error("PTY error: {0}")]
    Pty(#[from] crate::pty::PtyError),

    /// Only one live terminal session is allowed per process
    #[error("Session {0} is still running")]
    SessionAlreadyActive(Uuid),
}
