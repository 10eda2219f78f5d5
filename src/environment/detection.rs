//! Interactivity detection.
//!
//! Decides whether a run may ask a human anything. CI indicators always
//! win over flags: a run under CI is non-interactive even if nobody passed
//! `--non-interactive`.

/// Environment variables whose presence marks a CI runner.
pub const CI_INDICATORS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "JENKINS_URL",
    "BUILDKITE",
    "TRAVIS",
];

/// Why a run was classified the way it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractivitySource {
    /// A CI indicator variable was set.
    Ci { variable: String },
    /// The caller asked for non-interactive mode.
    Flag,
    /// Standard streams are not attached to a terminal.
    NoTerminal,
    /// Nothing prevents prompting.
    Terminal,
}

/// Result of interactivity detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interactivity {
    pub interactive: bool,
    pub source: InteractivitySource,
}

/// Detects whether the current process runs under CI.
///
/// # Example
///
/// ```
/// use orchestrate::environment::detect_ci_with_env;
///
/// let ci = detect_ci_with_env(|key| {
///     if key == "GITHUB_ACTIONS" {
///         Ok("true".to_string())
///     } else {
///         Err(std::env::VarError::NotPresent)
///     }
/// });
/// assert_eq!(ci.as_deref(), Some("GITHUB_ACTIONS"));
/// ```
pub fn detect_ci() -> Option<String> {
    detect_ci_with_env(|key| std::env::var(key))
}

/// Detect CI with a custom env var lookup (for testing).
pub fn detect_ci_with_env<F>(env_fn: F) -> Option<String>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    for var in CI_INDICATORS {
        if env_fn(var).is_ok() {
            return Some(var.to_string());
        }
    }

    // TF_BUILD must equal "True" (Azure DevOps)
    if env_fn("TF_BUILD").as_deref() == Ok("True") {
        return Some("TF_BUILD".to_string());
    }

    None
}

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    detect_ci().is_some()
}

/// Classify the run.
///
/// Priority: CI indicator, then the explicit flag, then terminal detection.
pub fn detect_interactivity(non_interactive_flag: bool) -> Interactivity {
    detect_interactivity_with(non_interactive_flag, console::user_attended(), |key| {
        std::env::var(key)
    })
}

/// Classify with explicit inputs (for testing).
pub fn detect_interactivity_with<F>(
    non_interactive_flag: bool,
    attended: bool,
    env_fn: F,
) -> Interactivity
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let source = if let Some(variable) = detect_ci_with_env(env_fn) {
        InteractivitySource::Ci { variable }
    } else if non_interactive_flag {
        InteractivitySource::Flag
    } else if !attended {
        InteractivitySource::NoTerminal
    } else {
        InteractivitySource::Terminal
    };

    Interactivity {
        interactive: source == InteractivitySource::Terminal,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn make_env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, std::env::VarError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned().ok_or(std::env::VarError::NotPresent)
    }

    #[test]
    fn detects_plain_ci_variable() {
        assert_eq!(detect_ci_with_env(make_env(&[("CI", "1")])), Some("CI".into()));
    }

    #[test]
    fn detects_gitlab() {
        assert_eq!(
            detect_ci_with_env(make_env(&[("GITLAB_CI", "true")])),
            Some("GITLAB_CI".into())
        );
    }

    #[test]
    fn tf_build_requires_true() {
        assert_eq!(detect_ci_with_env(make_env(&[("TF_BUILD", "False")])), None);
        assert_eq!(
            detect_ci_with_env(make_env(&[("TF_BUILD", "True")])),
            Some("TF_BUILD".into())
        );
    }

    #[test]
    fn no_indicators_means_not_ci() {
        assert_eq!(detect_ci_with_env(make_env(&[("HOME", "/root")])), None);
    }

    #[test]
    fn ci_forces_non_interactive_without_flag() {
        let result = detect_interactivity_with(false, true, make_env(&[("CI", "true")]));
        assert!(!result.interactive);
        assert_eq!(
            result.source,
            InteractivitySource::Ci {
                variable: "CI".into()
            }
        );
    }

    #[test]
    fn ci_wins_over_flag() {
        let result = detect_interactivity_with(true, true, make_env(&[("CIRCLECI", "1")]));
        assert!(matches!(result.source, InteractivitySource::Ci { .. }));
    }

    #[test]
    fn flag_forces_non_interactive() {
        let result = detect_interactivity_with(true, true, make_env(&[]));
        assert!(!result.interactive);
        assert_eq!(result.source, InteractivitySource::Flag);
    }

    #[test]
    fn unattended_terminal_is_non_interactive() {
        let result = detect_interactivity_with(false, false, make_env(&[]));
        assert!(!result.interactive);
        assert_eq!(result.source, InteractivitySource::NoTerminal);
    }

    #[test]
    fn attended_terminal_is_interactive() {
        let result = detect_interactivity_with(false, true, make_env(&[]));
        assert!(result.interactive);
    }
}
