/// Lifecycle state of a PTY-backed shell session
use serde::Serialize;

/// How the child process ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitInfo {
    /// Process exit code (non-zero when killed by a signal)
    pub exit_code: u32,
    /// Name of the terminating signal, if any
    pub signal: Option<String>,
}

impl ExitInfo {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.signal.is_none()
    }
}

impl From<portable_pty::ExitStatus> for ExitInfo {
    fn from(status: portable_pty::ExitStatus) -> Self {
        Self {
            exit_code: status.exit_code(),
            signal: status.signal().map(str::to_string),
        }
    }
}

/// Session state. Transitions only move forward: Starting -> Running -> Exited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionState {
    Starting,
    Running,
    Exited(ExitInfo),
}

impl SessionState {
    fn rank(&self) -> u8 {
        match self {
            SessionState::Starting => 0,
            SessionState::Running => 1,
            SessionState::Exited(_) => 2,
        }
    }

    /// Move to `next` if it is strictly later in the lifecycle.
    /// Returns false (and leaves the state alone) otherwise.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if next.rank() > self.rank() {
            *self = next;
            true
        } else {
            false
        }
    }

    pub fn is_exited(&self) -> bool {
        matches!(self, SessionState::Exited(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Exited(_) => "exited",
        }
    }
}
