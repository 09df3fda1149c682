//! PTY (Pseudo Terminal) handling.
//!
//! A [`PtySession`] owns one shell process attached to a pseudo-terminal and
//! pushes its output to registered observers from a single dispatcher task.

mod error;
mod observers;
mod session;
mod state;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use error::PtyError;
pub use observers::{DataObserver, ExitObserver};
pub use session::{PtySession, READ_CHUNK_SIZE, READER_DRAIN, TERMINATE_GRACE};
pub use state::{ExitInfo, SessionState};

/// Lock a std mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
