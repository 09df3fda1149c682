//! Shell selection for the embedded terminal.
mod resolver;

pub use resolver::{
    DEFAULT_COLUMNS, DEFAULT_ROWS, DEFAULT_TERM_NAME, HostEnvironment, ShellResolver, ShellSpec,
    platform_shell,
};
