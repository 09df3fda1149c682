/// Lifecycle owner of the single terminal session
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::pty::PtySession;
use crate::service::{ChannelBridge, ServiceError};
use crate::shell::ShellResolver;

/// Creates the terminal session when the application is ready and tears it
/// down at shutdown. Construct once and share by reference.
pub struct SessionSupervisor {
    resolver: ShellResolver,
    bridge: ChannelBridge,
    active: Mutex<Option<Arc<PtySession>>>,
}

impl SessionSupervisor {
    pub fn new(resolver: ShellResolver) -> Self {
        Self {
            resolver,
            bridge: ChannelBridge::new(),
            active: Mutex::new(None),
        }
    }

    pub fn bridge(&self) -> &ChannelBridge {
        &self.bridge
    }

    /// Resolve the shell, start it and bind it to the display bridge.
    ///
    /// Fails with [`ServiceError::SessionAlreadyActive`] until the previous
    /// child has actually exited, terminated or not. An exited session is
    /// replaced.
    pub async fn on_application_ready(&self) -> Result<Arc<PtySession>, ServiceError> {
        let mut active = self.active.lock().await;
        if let Some(existing) = active.as_ref() {
            if !existing.state().is_exited() {
                return Err(ServiceError::SessionAlreadyActive(existing.id()));
            }
            debug!("Replacing exited session {}", existing.id());
        }

        let spec = self.resolver.resolve();
        let session = Arc::new(PtySession::start(spec).await?);
        self.bridge.bind(&session)?;

        info!(
            "Terminal session {} started ({} in {:?})",
            session.id(),
            session.spec().executable,
            session.spec().working_directory
        );
        *active = Some(session.clone());
        Ok(session)
    }

    /// Terminate the active session, if any. Safe to call more than once.
    ///
    /// The session stays recorded until a replacement starts.
    pub async fn on_application_shutdown(&self) {
        let session = self.active.lock().await.clone();
        match session {
            Some(session) => {
                info!("Shutting down terminal session {}", session.id());
                session.terminate();
            }
            None => debug!("No terminal session to shut down"),
        }
    }

    pub async fn active_session(&self) -> Option<Arc<PtySession>> {
        self.active.lock().await.clone()
    }
}
