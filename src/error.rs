//! Error types for orchestration.
//!
//! This module defines [`OrchestrateError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Structural problems with a playbook, catalog or config are *load
//!   errors*: they surface before any step runs and map to exit code 2
//! - Step failures are recorded in the run report rather than returned
//! - [`OrchestrateError::Spawn`] is fatal and aborts a run in progress
//! - Use `anyhow::Error` (via `OrchestrateError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a run where one or more phases failed.
pub const EXIT_FAILED: i32 = 1;

/// Exit code for configuration, catalog and playbook load errors.
pub const EXIT_LOAD_ERROR: i32 = 2;

/// Exit code for a cancelled run (128 + SIGINT).
pub const EXIT_ABORTED: i32 = 130;

/// Core error type for orchestration.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// A profile is unknown or its `extends` chain is broken.
    #[error("Invalid profile '{profile}': {message}")]
    InvalidProfile { profile: String, message: String },

    /// The step catalog is unreadable or structurally invalid.
    #[error("Invalid step catalog {origin}: {message}")]
    CatalogError { origin: String, message: String },

    /// A playbook definition is malformed.
    #[error("Playbook '{playbook}' is invalid: {message}")]
    PlaybookParse { playbook: String, message: String },

    /// A step selector matched nothing in the registry.
    #[error("Unknown step '{selector}'{}", location(.phase))]
    UnknownStep {
        selector: String,
        phase: Option<String>,
    },

    /// The phase `requires` graph contains a cycle.
    #[error("Circular phase dependency detected: {cycle}")]
    CyclicDependency { cycle: String },

    /// A phase requires a phase that does not exist.
    #[error("Phase '{phase}' requires unknown phase '{missing}'")]
    MissingDependency { phase: String, missing: String },

    /// A step exited with a non-zero status.
    #[error("Step '{step}' failed ({})", describe_exit(.code))]
    StepExecution { step: String, code: Option<i32> },

    /// A step exceeded its timeout.
    #[error("Step '{step}' timed out after {seconds}s")]
    StepTimeout { step: String, seconds: u64 },

    /// The run was cancelled before it completed.
    #[error("Run cancelled")]
    Cancelled,

    /// The engine could not start a step process at all.
    #[error("Failed to spawn step '{step}': {message}")]
    Spawn { step: String, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn location(phase: &Option<String>) -> String {
    match phase {
        Some(phase) => format!(" in phase '{}'", phase),
        None => String::new(),
    }
}

impl OrchestrateError {
    /// Whether this error happens before any step executes.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigParse { .. }
                | Self::InvalidProfile { .. }
                | Self::CatalogError { .. }
                | Self::PlaybookParse { .. }
                | Self::UnknownStep { .. }
                | Self::CyclicDependency { .. }
                | Self::MissingDependency { .. }
        )
    }

    /// Process exit code for this error when it terminates the CLI.
    pub fn exit_code(&self) -> i32 {
        if self.is_load_error() {
            EXIT_LOAD_ERROR
        } else if matches!(self, Self::Cancelled) {
            EXIT_ABORTED
        } else {
            EXIT_FAILED
        }
    }
}

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, OrchestrateError>;

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_displays_path() {
        let err = OrchestrateError::ConfigNotFound {
            path: PathBuf::from("/foo/config.yml"),
        };
        assert!(err.to_string().contains("/foo/config.yml"));
    }

    #[test]
    fn playbook_parse_displays_playbook_and_message() {
        let err = OrchestrateError::PlaybookParse {
            playbook: "nightly".into(),
            message: "phase 'lint' has max_concurrency 0".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("nightly"));
        assert!(msg.contains("max_concurrency 0"));
    }

    #[test]
    fn unknown_step_names_phase_when_known() {
        let err = OrchestrateError::UnknownStep {
            selector: "category:deploy".into(),
            phase: Some("release".into()),
        };
        assert_eq!(
            err.to_string(),
            "Unknown step 'category:deploy' in phase 'release'"
        );
    }

    #[test]
    fn unknown_step_without_phase() {
        let err = OrchestrateError::UnknownStep {
            selector: "0999".into(),
            phase: None,
        };
        assert_eq!(err.to_string(), "Unknown step '0999'");
    }

    #[test]
    fn cyclic_dependency_displays_cycle() {
        let err = OrchestrateError::CyclicDependency {
            cycle: "a -> b -> a".into(),
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn missing_dependency_displays_both_phases() {
        let err = OrchestrateError::MissingDependency {
            phase: "verify".into(),
            missing: "setup".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("verify"));
        assert!(msg.contains("setup"));
    }

    #[test]
    fn load_errors_exit_with_two() {
        let errs = [
            OrchestrateError::CyclicDependency { cycle: "a".into() },
            OrchestrateError::MissingDependency {
                phase: "a".into(),
                missing: "b".into(),
            },
            OrchestrateError::UnknownStep {
                selector: "x".into(),
                phase: None,
            },
            OrchestrateError::PlaybookParse {
                playbook: "p".into(),
                message: "bad".into(),
            },
        ];
        for err in errs {
            assert!(err.is_load_error());
            assert_eq!(err.exit_code(), EXIT_LOAD_ERROR);
        }
    }

    #[test]
    fn spawn_error_is_not_a_load_error() {
        let err = OrchestrateError::Spawn {
            step: "install".into(),
            message: "No such file or directory".into(),
        };
        assert!(!err.is_load_error());
        assert_eq!(err.exit_code(), EXIT_FAILED);
    }

    #[test]
    fn cancelled_has_distinct_exit_code() {
        assert_eq!(OrchestrateError::Cancelled.exit_code(), EXIT_ABORTED);
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: OrchestrateError = io_err.into();
        assert!(matches!(err, OrchestrateError::Io(_)));
    }
}
