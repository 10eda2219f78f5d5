//! Visual theme and styling.

use console::Style;

use crate::report::{OverallStatus, StepStatus};

/// Styles used for CLI output.
#[derive(Debug, Clone)]
pub struct Theme {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    /// Running elements and phase headers.
    pub info: Style,
    pub dim: Style,
    pub highlight: Style,
    pub header: Style,
    pub duration: Style,
    /// Commands echoed in dry runs.
    pub command: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().cyan(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().cyan(),
            duration: Style::new().dim(),
            command: Style::new().dim().italic(),
        }
    }

    /// No colors (non-TTY or `--no-color`).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            duration: Style::new(),
            command: Style::new(),
        }
    }

    /// Pick by color support.
    pub fn for_colors(colors: bool) -> Self {
        if colors {
            Self::new()
        } else {
            Self::plain()
        }
    }

    pub fn symbol(status: StepStatus) -> &'static str {
        match status {
            StepStatus::Pending => "·",
            StepStatus::Running => "▸",
            StepStatus::Succeeded => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Skipped => "○",
            StepStatus::Cancelled => "⊘",
        }
    }

    fn status_style(&self, status: StepStatus) -> &Style {
        match status {
            StepStatus::Succeeded => &self.success,
            StepStatus::Failed => &self.error,
            StepStatus::Cancelled => &self.warning,
            StepStatus::Running => &self.info,
            StepStatus::Pending | StepStatus::Skipped => &self.dim,
        }
    }

    /// `✓ text` styled by status.
    pub fn format_status(&self, status: StepStatus, text: &str) -> String {
        self.status_style(status)
            .apply_to(format!("{} {}", Self::symbol(status), text))
            .to_string()
    }

    /// Status label alone (for tables).
    pub fn status_label(&self, status: StepStatus) -> String {
        self.status_style(status)
            .apply_to(format!("{} {}", Self::symbol(status), status))
            .to_string()
    }

    pub fn format_overall(&self, status: OverallStatus) -> String {
        let (style, symbol) = match status {
            OverallStatus::Succeeded => (&self.success, "✓"),
            OverallStatus::SucceededWithWarnings => (&self.warning, "⚠"),
            OverallStatus::Failed => (&self.error, "✗"),
            OverallStatus::Aborted => (&self.warning, "⊘"),
        };
        style.apply_to(format!("{} Run {}", symbol, status)).to_string()
    }

    pub fn format_header(&self, title: &str) -> String {
        self.header.apply_to(format!("◆ {}", title)).to_string()
    }

    pub fn format_warning(&self, msg: &str) -> String {
        self.warning.apply_to(format!("⚠ {}", msg)).to_string()
    }

    pub fn format_error(&self, msg: &str) -> String {
        self.error.apply_to(format!("✗ {}", msg)).to_string()
    }
}

/// Colors unless `NO_COLOR` is set or stdout is not a terminal.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_status_lines() {
        let theme = Theme::plain();
        assert_eq!(theme.format_status(StepStatus::Succeeded, "s1"), "✓ s1");
        assert_eq!(theme.format_status(StepStatus::Skipped, "s2"), "○ s2");
        assert_eq!(theme.status_label(StepStatus::Failed), "✗ failed");
    }

    #[test]
    fn overall_lines() {
        let theme = Theme::plain();
        assert_eq!(
            theme.format_overall(OverallStatus::SucceededWithWarnings),
            "⚠ Run succeeded with warnings"
        );
        assert_eq!(theme.format_overall(OverallStatus::Aborted), "⊘ Run aborted");
    }

    #[test]
    fn colored_theme_formats_without_panic() {
        let theme = Theme::for_colors(true);
        assert!(theme.format_header("setup").contains("setup"));
        assert!(theme.format_error("boom").contains("boom"));
    }
}
