//! Live run progress.
//!
//! [`LiveProgress`] turns aggregator events into terminal lines. It runs on
//! the aggregator's writer thread, so lines never interleave.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use console::Term;

use crate::report::{Observer, RunEvent, StepResult, StepStatus};

use super::output::{format_duration, OutputMode};
use super::theme::Theme;

/// Renders [`RunEvent`]s as they arrive.
pub struct LiveProgress<W> {
    mode: OutputMode,
    theme: Theme,
    out: W,
}

impl LiveProgress<Term> {
    /// Progress on stderr.
    pub fn stderr(mode: OutputMode, theme: Theme) -> Self {
        Self::new(mode, theme, Term::stderr())
    }
}

impl<W: Write + Send + 'static> LiveProgress<W> {
    pub fn new(mode: OutputMode, theme: Theme, out: W) -> Self {
        Self { mode, theme, out }
    }

    /// Wrap as an aggregator observer.
    pub fn into_observer(self) -> Observer {
        let progress = Mutex::new(self);
        Arc::new(move |event: &RunEvent| {
            progress
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .handle(event);
        })
    }

    pub fn handle(&mut self, event: &RunEvent) {
        if !self.mode.shows_progress() {
            return;
        }
        let lines = self.lines_for(event);
        for line in lines {
            let _ = writeln!(self.out, "{}", line);
        }
        let _ = self.out.flush();
    }

    fn lines_for(&self, event: &RunEvent) -> Vec<String> {
        match event {
            RunEvent::Phase(record) => match record.status {
                StepStatus::Running => vec![self.theme.format_header(&record.name)],
                StepStatus::Skipped | StepStatus::Cancelled => {
                    let mut text = format!("phase {}", record.name);
                    if let Some(message) = &record.message {
                        text.push_str(&format!(" ({})", message));
                    }
                    vec![self.theme.format_status(record.status, &text)]
                }
                _ => Vec::new(),
            },
            RunEvent::StepStarted {
                step_id, attempt, ..
            } if *attempt > 0 => vec![format!(
                "  {}",
                self.theme
                    .format_warning(&format!("{} retry {}", step_id, attempt))
            )],
            RunEvent::StepStarted { .. } => Vec::new(),
            RunEvent::StepFinished(result) => self.step_lines(result),
        }
    }

    fn step_lines(&self, result: &StepResult) -> Vec<String> {
        let mut text = result.step_id.clone();
        if result.started_at.is_some() && !result.dry_run {
            text.push_str(&format!(
                " {}",
                self.theme.duration.apply_to(format!(
                    "({})",
                    format_duration(Duration::from_millis(result.duration_ms))
                ))
            ));
        }
        if let Some(message) = &result.message {
            let styled = if result.dry_run {
                self.theme.command.apply_to(message.as_str()).to_string()
            } else {
                self.theme.dim.apply_to(message.as_str()).to_string()
            };
            text.push_str(&format!(" {}", styled));
        }

        let mut lines = vec![format!("  {}", self.theme.format_status(result.status, &text))];

        let show_output = match result.status {
            StepStatus::Failed => self.mode.shows_failure_output(),
            _ => self.mode.shows_command_output(),
        };
        if show_output {
            for stream in [&result.stdout, &result.stderr] {
                lines.extend(
                    stream
                        .lines()
                        .map(|line| format!("    {}", self.theme.dim.apply_to(line))),
                );
            }
        }
        lines
    }
}
