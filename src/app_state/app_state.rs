/// Application state shared across handlers
use std::sync::Arc;

use crate::config::AppConfig;
use crate::service::SessionSupervisor;

/// Application state containing shared data across handlers
#[derive(Clone)]
pub struct AppState {
    /// Owner of the terminal session and its display bridge
    pub supervisor: Arc<SessionSupervisor>,
    /// Application configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Create a new instance of AppState
    pub fn new(config: AppConfig, supervisor: Arc<SessionSupervisor>) -> Self {
        Self {
            supervisor,
            config: Arc::new(config),
        }
    }
}
