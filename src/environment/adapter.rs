//! The environment adapter: one place that knows whether a human can be asked.

use std::sync::{Arc, Mutex, PoisonError};

use console::Term;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use tracing::info;

use crate::error::{OrchestrateError, Result};

use super::detection::{detect_interactivity, Interactivity};

/// Mediates run-time confirmations.
///
/// Shared by the coordinator (step confirmations) and the configuration
/// context (feature-enable requests), so both agree on whether prompting
/// is possible.
pub trait EnvironmentAdapter: Send + Sync {
    /// Whether prompts may block waiting for a human.
    fn is_interactive(&self) -> bool;

    /// Ask a yes/no question.
    ///
    /// Never blocks when [`is_interactive`](Self::is_interactive) is false.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Prompts on the controlling terminal.
///
/// Prompts from concurrently running phases are serialized.
pub struct TerminalAdapter {
    term: Term,
    prompt_lock: Mutex<()>,
}

impl TerminalAdapter {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            prompt_lock: Mutex::new(()),
        }
    }
}

impl Default for TerminalAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentAdapter for TerminalAdapter {
    fn is_interactive(&self) -> bool {
        true
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        let _guard = self
            .prompt_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact_on(&self.term)
            .map_err(|e| OrchestrateError::Io(e.into()))
    }
}

/// Answers every question with "no" without blocking.
#[derive(Debug, Default)]
pub struct NonInteractiveAdapter {
    reason: Option<String>,
}

impl NonInteractiveAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record why prompting is disabled, for log messages.
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

impl EnvironmentAdapter for NonInteractiveAdapter {
    fn is_interactive(&self) -> bool {
        false
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        match &self.reason {
            Some(reason) => info!("Skipped prompt ({}): {}", reason, prompt),
            None => info!("Skipped prompt (non-interactive): {}", prompt),
        }
        Ok(false)
    }
}

/// Build the adapter for this process.
///
/// CI indicators force non-interactive mode regardless of the flag.
pub fn detect_adapter(non_interactive_flag: bool) -> Arc<dyn EnvironmentAdapter> {
    adapter_for(&detect_interactivity(non_interactive_flag))
}

/// Build the adapter matching a detection result.
pub fn adapter_for(interactivity: &Interactivity) -> Arc<dyn EnvironmentAdapter> {
    use super::detection::InteractivitySource;

    match &interactivity.source {
        InteractivitySource::Terminal => Arc::new(TerminalAdapter::new()),
        InteractivitySource::Ci { variable } => Arc::new(NonInteractiveAdapter::with_reason(
            format!("CI detected via {}", variable),
        )),
        InteractivitySource::Flag => {
            Arc::new(NonInteractiveAdapter::with_reason("--non-interactive"))
        }
        InteractivitySource::NoTerminal => Arc::new(NonInteractiveAdapter::with_reason(
            "no terminal attached",
        )),
    }
}
