use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::config::TerminalSettings;

/// Fixed terminal width handed to the PTY at spawn time
pub const DEFAULT_COLUMNS: u16 = 80;

/// Fixed terminal height handed to the PTY at spawn time
pub const DEFAULT_ROWS: u16 = 80;

/// Value exported to the child as `TERM`
pub const DEFAULT_TERM_NAME: &str = "xterm-color";

/// Everything needed to launch the interactive shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSpec {
    pub executable: String,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
    pub environment: BTreeMap<String, String>,
    pub term_name: String,
    pub columns: u16,
    pub rows: u16,
}

/// Snapshot of the parts of the host the resolver looks at
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    pub vars: BTreeMap<String, String>,
    pub home_dir: Option<PathBuf>,
    pub current_dir: Option<PathBuf>,
    pub windows: bool,
}

impl HostEnvironment {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();

        Self {
            vars,
            home_dir: dirs::home_dir(),
            current_dir: std::env::current_dir().ok(),
            windows: cfg!(windows),
        }
    }
}

/// Default interactive shell for the platform
pub fn platform_shell(windows: bool) -> &'static str {
    if windows { "powershell.exe" } else { "bash" }
}

/// Picks the shell executable, working directory and environment
#[derive(Debug, Clone)]
pub struct ShellResolver {
    settings: TerminalSettings,
}

impl ShellResolver {
    pub fn new(settings: TerminalSettings) -> Self {
        Self { settings }
    }

    /// Resolve a spec from the live host environment. Never fails; a bad
    /// executable surfaces when the session is started.
    pub fn resolve(&self) -> ShellSpec {
        self.resolve_from(&HostEnvironment::capture())
    }

    pub fn resolve_from(&self, host: &HostEnvironment) -> ShellSpec {
        let executable = self
            .settings
            .shell
            .clone()
            .unwrap_or_else(|| platform_shell(host.windows).to_string());

        let working_directory = self
            .settings
            .working_directory
            .clone()
            .or_else(|| host.home_dir.clone())
            .or_else(|| host.current_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        let spec = ShellSpec {
            executable,
            args: self.settings.args.clone(),
            working_directory,
            environment: host.vars.clone(),
            term_name: self.settings.term_name.clone(),
            columns: self.settings.columns,
            rows: self.settings.rows,
        };
        debug!(
            "Resolved shell {:?} in {:?} ({}x{}, {} env vars)",
            spec.executable,
            spec.working_directory,
            spec.columns,
            spec.rows,
            spec.environment.len()
        );
        spec
    }
}
