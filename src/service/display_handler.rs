/// Display connection handler: wires one transport to the bridge
use std::sync::Arc;

use tokio::select;
use tracing::{debug, error, info};

use crate::app_state::AppState;
use crate::protocol::{ChannelMessage, ChannelSink, DisplayConnection, DisplaySink};
use crate::pty::SessionState;

/// Serve one display until it disconnects or is replaced by a newer one.
pub async fn handle_display_connection(mut connection: impl DisplayConnection, state: AppState) {
    let conn_id = connection.id().to_string();
    info!("New display connection: {}", conn_id);

    let bridge = state.supervisor.bridge().clone();
    let (sink, mut outbound) = ChannelSink::new(conn_id.clone());

    // a display that attaches after the shell died still learns why
    if let Some(session) = state.supervisor.active_session().await {
        if let SessionState::Exited(exit) = session.state() {
            sink.send_exit(&exit);
        }
    }

    // the bridge owns the only sink handle; when it lets go the queue closes
    drop(bridge.attach_display(Arc::new(sink)));

    loop {
        select! {
            inbound = connection.receive() => {
                match inbound {
                    Some(Ok(ChannelMessage::Input(bytes))) => {
                        debug!("Display {} sent {} bytes", conn_id, bytes.len());
                        bridge.forward_inbound(&bytes);
                    }
                    Some(Ok(other)) => {
                        debug!("Display {} sent {} message, ignoring", conn_id, other.channel());
                    }
                    Some(Err(e)) => {
                        error!("Connection error for display {}: {}", conn_id, e);
                        break;
                    }
                    None => {
                        info!("Display {} disconnected", conn_id);
                        break;
                    }
                }
            },
            message = outbound.recv() => {
                match message {
                    Some(message) => {
                        if let Err(e) = connection.send(message).await {
                            error!("Failed to send to display {}: {}", conn_id, e);
                            break;
                        }
                    }
                    None => {
                        info!("Display {} was replaced by a newer display", conn_id);
                        break;
                    }
                }
            },
        }
    }

    bridge.detach_display(&conn_id);
    if let Err(e) = connection.close().await {
        debug!("Failed to close display {}: {}", conn_id, e);
    }
    info!("Display connection {} closed", conn_id);
}
