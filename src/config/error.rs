use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;
use toml::de::Error as TomlDeError;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read configuration file: {0}")]
    FileReadError(#[from] IoError),

    /// Failed to parse configuration file
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] TomlDeError),

    /// Explicitly requested configuration file does not exist
    #[error("Configuration file not found at: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A value parsed but makes no sense
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Subscriber setup failed
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}
