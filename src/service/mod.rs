//! Service layer: the session bridge, its lifecycle owner and the display
//! connection handler.
mod bridge;
mod display_handler;
mod error;
mod supervisor;

pub use bridge::ChannelBridge;
pub use display_handler::handle_display_connection;
pub use error::ServiceError;
pub use supervisor::SessionSupervisor;
