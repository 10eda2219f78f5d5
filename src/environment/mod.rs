//! Environment adapter.
//!
//! Classifies a run as interactive or non-interactive and mediates every
//! run-time confirmation. The priority chain is:
//!
//! 1. CI indicator variables (always non-interactive)
//! 2. Explicit `--non-interactive` flag
//! 3. Whether a terminal is attached

pub mod adapter;
pub mod detection;
pub mod mock;

pub use adapter::{
    adapter_for, detect_adapter, EnvironmentAdapter, NonInteractiveAdapter, TerminalAdapter,
};
pub use detection::{
    detect_ci, detect_ci_with_env, detect_interactivity, detect_interactivity_with, is_ci,
    Interactivity, InteractivitySource, CI_INDICATORS,
};
pub use mock::MockAdapter;
