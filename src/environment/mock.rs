//! Mock adapter for testing.
//!
//! `MockAdapter` implements [`EnvironmentAdapter`] with scripted answers and
//! records every prompt it was asked.
//!
//! # Example
//!
//! ```
//! use orchestrate::environment::{EnvironmentAdapter, MockAdapter};
//!
//! let adapter = MockAdapter::interactive();
//! adapter.set_response("Enable docker?", true);
//!
//! assert!(adapter.confirm("Enable docker?").unwrap());
//! assert!(!adapter.confirm("Something else?").unwrap());
//! assert_eq!(adapter.prompts().len(), 2);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::Result;

use super::adapter::EnvironmentAdapter;

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, bool>,
    default_response: bool,
    prompts: Vec<String>,
}

/// Scripted environment adapter.
#[derive(Debug, Default)]
pub struct MockAdapter {
    interactive: bool,
    state: Mutex<MockState>,
}

impl MockAdapter {
    /// An adapter that reports itself interactive and answers "no" by default.
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            ..Default::default()
        }
    }

    /// An adapter that behaves like a CI runner.
    pub fn non_interactive() -> Self {
        Self::default()
    }

    /// Answer a specific prompt.
    pub fn set_response(&self, prompt: &str, answer: bool) {
        self.state()
            .responses
            .insert(prompt.to_string(), answer);
    }

    /// Answer for prompts without a specific response.
    pub fn set_default_response(&self, answer: bool) {
        self.state().default_response = answer;
    }

    /// Every prompt asked so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EnvironmentAdapter for MockAdapter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        let mut state = self.state();
        state.prompts.push(prompt.to_string());
        if !self.interactive {
            return Ok(false);
        }
        Ok(state
            .responses
            .get(prompt)
            .copied()
            .unwrap_or(state.default_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_prompts_in_order() {
        let adapter = MockAdapter::interactive();
        adapter.confirm("first").unwrap();
        adapter.confirm("second").unwrap();
        assert_eq!(adapter.prompts(), vec!["first", "second"]);
    }

    #[test]
    fn default_response_applies_to_unknown_prompts() {
        let adapter = MockAdapter::interactive();
        adapter.set_default_response(true);
        assert!(adapter.confirm("anything").unwrap());
    }

    #[test]
    fn non_interactive_mock_always_declines() {
        let adapter = MockAdapter::non_interactive();
        adapter.set_response("go?", true);
        assert!(!adapter.confirm("go?").unwrap());
        assert_eq!(adapter.prompts(), vec!["go?"]);
    }
}
