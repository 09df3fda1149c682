/// Duplex relay between the terminal session and the attached display
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, info, trace, warn};

use crate::protocol::DisplaySink;
use crate::pty::{ExitInfo, PtyError, PtySession, lock};

#[derive(Default)]
struct Binding {
    session: Weak<PtySession>,
    sink: Option<Arc<dyn DisplaySink>>,
}

impl Binding {
    /// The attached sink, but only for the session currently bound.
    fn sink_for(&self, session: &Weak<PtySession>) -> Option<Arc<dyn DisplaySink>> {
        if Weak::ptr_eq(&self.session, session) {
            self.sink.clone()
        } else {
            None
        }
    }
}

/// One-to-one binding of the PTY session to a single display.
///
/// Output reaches whichever sink is attached at the time it is produced;
/// nothing is buffered while no display is attached. Input is written to
/// the bound session immediately, or dropped if there is none.
#[derive(Clone, Default)]
pub struct ChannelBridge {
    binding: Arc<Mutex<Binding>>,
}

impl ChannelBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `session` and route its output and exit status to the display.
    ///
    /// Only a weak reference to the session is kept. Binding another session
    /// cuts this one off from the display.
    pub fn bind(&self, session: &Arc<PtySession>) -> Result<(), PtyError> {
        let registered = Arc::downgrade(session);
        lock(&self.binding).session = registered.clone();

        let outbound = self.binding.clone();
        let data_session = registered.clone();
        session.on_data(Box::new(move |chunk: &[u8]| {
            let sink = lock(&outbound).sink_for(&data_session);
            match sink {
                Some(sink) => sink.send_output(chunk),
                None => trace!("No display for this session, dropping {} bytes", chunk.len()),
            }
        }))?;

        let exits = self.binding.clone();
        let session_id = session.id();
        session.on_exit(Box::new(move |exit: ExitInfo| {
            info!(
                "Session {} ended (code {}, signal {:?})",
                session_id, exit.exit_code, exit.signal
            );
            // a replaced session must not report its exit to the new display
            let sink = lock(&exits).sink_for(&registered);
            if let Some(sink) = sink {
                sink.send_exit(&exit);
            }
        }))?;

        debug!("Bridge bound to session {}", session_id);
        Ok(())
    }

    /// Attach the display, replacing any previous one. The replaced sink is
    /// returned; dropping it is how its transport learns it was detached.
    pub fn attach_display(&self, sink: Arc<dyn DisplaySink>) -> Option<Arc<dyn DisplaySink>> {
        info!("Display {} attached", sink.id());
        let previous = lock(&self.binding).sink.replace(sink);
        if let Some(previous) = &previous {
            info!("Display {} replaced", previous.id());
        }
        previous
    }

    /// Detach the display with `sink_id` if it is still the attached one.
    pub fn detach_display(&self, sink_id: &str) -> bool {
        let mut binding = lock(&self.binding);
        match &binding.sink {
            Some(current) if current.id() == sink_id => {
                binding.sink = None;
                info!("Display {} detached", sink_id);
                true
            }
            _ => false,
        }
    }

    pub fn has_display(&self) -> bool {
        lock(&self.binding).sink.is_some()
    }

    pub fn display_id(&self) -> Option<String> {
        lock(&self.binding).sink.as_ref().map(|sink| sink.id().to_string())
    }

    /// Write display input to the session. Silently dropped when no session
    /// is bound; a closed session is logged and ignored.
    pub fn forward_inbound(&self, bytes: &[u8]) {
        let session = lock(&self.binding).session.upgrade();
        let Some(session) = session else {
            trace!("No session bound, dropping {} input bytes", bytes.len());
            return;
        };

        match session.write(bytes) {
            Ok(()) => {}
            Err(PtyError::SessionClosed) => {
                debug!("Session {} is closed, dropping input", session.id());
            }
            Err(e) => warn!("Failed to write input to session {}: {}", session.id(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ChannelSink;

    #[test]
    fn inbound_without_session_is_dropped() {
        let bridge = ChannelBridge::new();
        let (sink, mut rx) = ChannelSink::new("display");
        bridge.attach_display(Arc::new(sink));

        bridge.forward_inbound(b"echo nobody\n");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn attaching_replaces_and_returns_previous() {
        let bridge = ChannelBridge::new();
        let (first, mut first_rx) = ChannelSink::new("first");
        let (second, _second_rx) = ChannelSink::new("second");

        assert!(bridge.attach_display(Arc::new(first)).is_none());
        let previous = bridge.attach_display(Arc::new(second)).unwrap();
        assert_eq!(previous.id(), "first");
        assert_eq!(bridge.display_id().as_deref(), Some("second"));

        drop(previous);
        assert!(matches!(
            first_rx.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn stale_detach_leaves_current_display() {
        let bridge = ChannelBridge::new();
        let (first, _a) = ChannelSink::new("first");
        let (second, _b) = ChannelSink::new("second");
        bridge.attach_display(Arc::new(first));
        bridge.attach_display(Arc::new(second));

        assert!(!bridge.detach_display("first"));
        assert!(bridge.has_display());
        assert!(bridge.detach_display("second"));
        assert!(!bridge.has_display());
    }
}
