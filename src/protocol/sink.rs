use tokio::sync::mpsc;
use tracing::trace;

use super::ChannelMessage;
use crate::pty::ExitInfo;

/// Where the bridge pushes session output.
///
/// Called from the session's dispatcher; implementations must not block.
pub trait DisplaySink: Send + Sync {
    fn id(&self) -> &str;

    fn send_output(&self, chunk: &[u8]);

    fn send_exit(&self, exit: &ExitInfo);
}

/// Sink that queues messages for a transport task to drain.
///
/// Dropping the sink closes the queue, which tells the transport it was
/// detached.
#[derive(Debug)]
pub struct ChannelSink {
    id: String,
    tx: mpsc::UnboundedSender<ChannelMessage>,
}

impl ChannelSink {
    pub fn new(id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<ChannelMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id: id.into(), tx }, rx)
    }

    fn push(&self, message: ChannelMessage) {
        if self.tx.send(message).is_err() {
            trace!("Display {} is gone, dropping message", self.id);
        }
    }
}

impl DisplaySink for ChannelSink {
    fn id(&self) -> &str {
        &self.id
    }

    fn send_output(&self, chunk: &[u8]) {
        self.push(ChannelMessage::Output(chunk.to_vec()));
    }

    fn send_exit(&self, exit: &ExitInfo) {
        self.push(ChannelMessage::Exit(exit.clone()));
    }
}
