//! Platform-specific shell selection and process termination.

use std::path::{Path, PathBuf};
use std::process::Child;

/// Overrides the shell used for string commands.
pub const SHELL_ENV: &str = "ORCHESTRATE_SHELL";

/// Known shell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Sh,
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Cmd,
    Unknown,
}

impl ShellType {
    /// Parse shell type from executable name.
    pub fn from_executable(exe: &str) -> Self {
        let name = Path::new(exe)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match name.as_str() {
            "sh" | "dash" | "ash" => ShellType::Sh,
            "bash" => ShellType::Bash,
            "zsh" => ShellType::Zsh,
            "fish" => ShellType::Fish,
            "powershell" | "pwsh" => ShellType::PowerShell,
            "cmd" => ShellType::Cmd,
            _ => ShellType::Unknown,
        }
    }

    /// Flag that makes the shell run its next argument as a command.
    pub fn command_flag(self) -> &'static str {
        match self {
            ShellType::Cmd => "/C",
            ShellType::PowerShell => "-Command",
            _ => "-c",
        }
    }
}

/// The shell string commands run under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInfo {
    pub executable: PathBuf,
    pub kind: ShellType,
}

impl ShellInfo {
    pub fn flag(&self) -> &'static str {
        self.kind.command_flag()
    }
}

/// Select the shell for string commands.
///
/// Steps run under a plain non-login shell so their environment doesn't
/// depend on the user's rc files. `ORCHESTRATE_SHELL` overrides.
pub fn detect_shell() -> ShellInfo {
    shell_from(std::env::var(SHELL_ENV).ok())
}

fn shell_from(override_shell: Option<String>) -> ShellInfo {
    let executable = match override_shell.filter(|s| !s.trim().is_empty()) {
        Some(shell) => PathBuf::from(shell),
        None if cfg!(windows) => std::env::var("COMSPEC")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("cmd.exe")),
        None => PathBuf::from("/bin/sh"),
    };
    let kind = ShellType::from_executable(&executable.to_string_lossy());
    ShellInfo { executable, kind }
}

/// Ask a child (and its process group) to stop.
///
/// On Unix this sends SIGTERM to the group the child leads; elsewhere
/// there is no graceful signal and the child is killed outright.
pub fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        terminate_group(child.id());
    }

    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }
}

/// Kill a child and its process group.
pub fn kill(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
}

/// SIGTERM the process group led by `pid`, which may itself be gone.
/// No-op where process groups don't exist.
pub fn terminate_group(pid: u32) {
    #[cfg(unix)]
    signal_group(pid, libc::SIGTERM);
    #[cfg(not(unix))]
    let _ = pid;
}

/// SIGKILL the process group led by `pid`.
pub fn kill_group(pid: u32) {
    #[cfg(unix)]
    signal_group(pid, libc::SIGKILL);
    #[cfg(not(unix))]
    let _ = pid;
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid
    // addresses the process group the child was placed in at spawn.
    unsafe {
        libc::kill(-pid, signal);
    }
}
