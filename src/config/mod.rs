//! Configuration module for pty_bridge
mod config;
mod config_loader;
mod error;
mod logging;

pub use config::*;
pub use config_loader::{
    CONFIG_PATH_ENV, ConfigLoader, DEV_MODE_ENV, apply_dev_mode, default_config_path,
    dev_mode_enabled,
};
pub use error::ConfigError;
pub use logging::{LOG_FILE_PREFIX, build_filter, init_logging};
