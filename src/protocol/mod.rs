//! Host <-> display channel protocol
mod channel;
mod connection;
mod sink;
mod websocket_connection;

pub use channel::{ChannelMessage, EXIT_CHANNEL, Envelope, INPUT_CHANNEL, OUTPUT_CHANNEL};
pub use connection::{ConnectionError, ConnectionResult, DisplayConnection};
pub use sink::{ChannelSink, DisplaySink};
pub use websocket_connection::WebSocketConnection;
