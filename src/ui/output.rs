//! Output mode.

use std::time::Duration;

/// How much the CLI prints while a run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Step lines plus captured output of every step.
    Verbose,
    /// Phase and step lines, output of failed steps.
    #[default]
    Normal,
    /// Final summary only.
    Quiet,
}

impl OutputMode {
    /// `--quiet` wins over `--verbose`.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Per-step progress lines.
    pub fn shows_progress(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Captured stdout/stderr of successful steps.
    pub fn shows_command_output(self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Captured output of failed steps.
    pub fn shows_failure_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }
}

/// Human-readable duration: `350ms`, `4.2s`, `2.5m`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_flags() {
        assert_eq!(OutputMode::from_flags(false, false), OutputMode::Normal);
        assert_eq!(OutputMode::from_flags(true, false), OutputMode::Verbose);
        assert_eq!(OutputMode::from_flags(true, true), OutputMode::Quiet);
    }

    #[test]
    fn quiet_hides_progress() {
        assert!(!OutputMode::Quiet.shows_progress());
        assert!(!OutputMode::Quiet.shows_failure_output());
        assert!(OutputMode::Normal.shows_failure_output());
        assert!(!OutputMode::Normal.shows_command_output());
        assert!(OutputMode::Verbose.shows_command_output());
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(350)), "350ms");
        assert_eq!(format_duration(Duration::from_millis(4200)), "4.2s");
        assert_eq!(format_duration(Duration::from_secs(150)), "2.5m");
    }
}
