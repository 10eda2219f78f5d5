//! Terminal UI.

use console::Term;
use std::io::Write;

use crate::report::Observer;

use super::{should_use_colors, LiveProgress, OutputMode, Theme, UserInterface};

/// Writes to the real stdout/stderr.
pub struct TerminalUI {
    out: Term,
    err: Term,
    theme: Theme,
    mode: OutputMode,
}

impl TerminalUI {
    /// Colors follow `NO_COLOR` and whether stdout is a terminal, unless
    /// `no_color` forces them off.
    pub fn new(mode: OutputMode, no_color: bool) -> Self {
        let colors = !no_color && should_use_colors();
        if !colors {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme: Theme::for_colors(colors),
            mode,
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn theme(&self) -> &Theme {
        &self.theme
    }

    fn message(&mut self, msg: &str) {
        writeln!(self.out, "{}", msg).ok();
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_progress() {
            writeln!(self.err, "{}", self.theme.format_warning(msg)).ok();
        }
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_error(msg)).ok();
    }

    fn progress_observer(&self) -> Option<Observer> {
        self.mode
            .shows_progress()
            .then(|| LiveProgress::stderr(self.mode, self.theme.clone()).into_observer())
    }
}
