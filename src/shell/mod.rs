//! Step process execution.

pub mod command;
pub mod platform;

pub use command::{execute, CommandOutcome, CommandSpec, TailBuffer, Termination};
pub use platform::{detect_shell, ShellInfo, ShellType};
