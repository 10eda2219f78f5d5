//! Terminal presentation.
//!
//! Commands talk to the user through [`UserInterface`]: [`TerminalUI`] in
//! the binary, [`MockUI`] in tests. Live progress goes to stderr through an
//! aggregator observer ([`LiveProgress`]); the final summary goes to stdout
//! ([`render_summary`]).

pub mod live;
pub mod mock;
pub mod output;
pub mod summary;
pub mod table;
pub mod terminal;
pub mod theme;

pub use live::LiveProgress;
pub use mock::MockUI;
pub use output::{format_duration, OutputMode};
pub use summary::render_summary;
pub use table::{Align, Table};
pub use terminal::TerminalUI;
pub use theme::{should_use_colors, Theme};

use crate::report::Observer;

/// What commands need from the terminal.
pub trait UserInterface {
    fn output_mode(&self) -> OutputMode;

    fn theme(&self) -> &Theme;

    /// Plain line on stdout.
    fn message(&mut self, msg: &str);

    fn warning(&mut self, msg: &str);

    /// Always shown, on stderr.
    fn error(&mut self, msg: &str);

    /// Observer rendering live run progress, if this UI shows any.
    fn progress_observer(&self) -> Option<Observer>;
}
