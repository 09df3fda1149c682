use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{AppConfig, ConfigError};

/// Overrides the configuration file location
pub const CONFIG_PATH_ENV: &str = "PTY_BRIDGE_CONFIG";

/// Development flag; any value other than empty, `0` or `false` turns on debug logging
pub const DEV_MODE_ENV: &str = "APP_DEV";

/// Configuration loader responsible for loading and parsing configuration files
#[derive(Debug, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self
    }

    /// Load configuration.
    ///
    /// An explicit path (argument, then `PTY_BRIDGE_CONFIG`) must exist. The
    /// default `./config.toml` is optional; without it the defaults apply.
    pub fn load_config(&self, config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let explicit = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => self.load_config_from_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => self.load_config_from_file(&path)?,
                _ => {
                    info!("No configuration file found, using defaults");
                    AppConfig::default()
                }
            },
        };

        apply_dev_mode(&mut config, std::env::var(DEV_MODE_ENV).ok().as_deref());
        validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_config_from_file(&self, path: &Path) -> Result<AppConfig, ConfigError> {
        info!("Loading configuration from file: {:?}", path);

        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            _ => ConfigError::FileReadError(e),
        })?;

        self.parse_config(&contents)
    }

    /// Parse configuration from string content
    pub fn parse_config(&self, content: &str) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        debug!("Configuration parsed: {:?}", config);
        Ok(config)
    }
}

/// Default configuration path
pub fn default_config_path() -> Option<PathBuf> {
    std::env::current_dir().ok().map(|dir| dir.join("config.toml"))
}

pub fn dev_mode_enabled(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) => !(v == "0" || v.eq_ignore_ascii_case("false")),
    }
}

/// Force debug logging when the development flag is set
pub fn apply_dev_mode(config: &mut AppConfig, dev_flag: Option<&str>) {
    if dev_mode_enabled(dev_flag) {
        config.logging.level = "debug".to_string();
    }
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.terminal.columns == 0 || config.terminal.rows == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "terminal size must be non-zero, got {}x{}",
            config.terminal.columns, config.terminal.rows
        )));
    }
    if config.terminal.term_name.is_empty() {
        return Err(ConfigError::InvalidValue("terminal.term_name is empty".to_string()));
    }
    if matches!(&config.terminal.shell, Some(shell) if shell.trim().is_empty()) {
        return Err(ConfigError::InvalidValue("terminal.shell is empty".to_string()));
    }
    Ok(())
}
