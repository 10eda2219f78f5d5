//! Mock UI for testing.
//!
//! `MockUI` captures everything a command prints.
//!
//! # Example
//!
//! ```
//! use orchestrate::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.message("Playbook loaded");
//! ui.error("Unknown step 'x'");
//!
//! assert_eq!(ui.messages(), ["Playbook loaded"]);
//! assert!(ui.has_error("Unknown step"));
//! ```

use crate::report::Observer;

use super::{OutputMode, Theme, UserInterface};

/// Captures output instead of printing it.
#[derive(Debug)]
pub struct MockUI {
    mode: OutputMode,
    theme: Theme,
    messages: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Default for MockUI {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUI {
    /// Normal output mode, plain theme.
    pub fn new() -> Self {
        Self::with_mode(OutputMode::Normal)
    }

    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            theme: Theme::plain(),
            messages: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// All stdout text joined by newlines.
    pub fn stdout(&self) -> String {
        self.messages.join("\n")
    }

    pub fn has_error(&self, fragment: &str) -> bool {
        self.errors.iter().any(|e| e.contains(fragment))
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn theme(&self) -> &Theme {
        &self.theme
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn progress_observer(&self) -> Option<Observer> {
        None
    }
}
