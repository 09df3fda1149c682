/// Display connection trait for abstracting the transport carrying the channels
use std::fmt::Debug;

use thiserror::Error;

use super::ChannelMessage;

/// 连接错误类型
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket 错误
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// 消息序列化错误
    #[error("Message serialization error: {0}")]
    Serialization(String),
}

/// 连接结果类型
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// A connected display surface
#[async_trait::async_trait]
pub trait DisplayConnection: Send + Debug {
    /// Send a message to the display
    async fn send(&mut self, message: ChannelMessage) -> ConnectionResult<()>;

    /// Receive the next message from the display.
    /// Returns None when the display went away.
    async fn receive(&mut self) -> Option<ConnectionResult<ChannelMessage>>;

    /// Close the connection
    async fn close(&mut self) -> ConnectionResult<()>;

    /// Get the connection ID
    fn id(&self) -> &str;
}
