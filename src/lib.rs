//! Orchestrate - declarative playbook orchestration.
//!
//! A playbook is an ordered list of phases. Each phase selects steps from a
//! shared catalog and runs them with bounded concurrency, optional
//! exclusivity and a per-phase failure policy. Every run produces a
//! structured report.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, profiles and features
//! - [`environment`] - Interactivity detection and prompting adapters
//! - [`error`] - Error types and result aliases
//! - [`playbook`] - Playbook loading and phase conditions
//! - [`registry`] - Step catalog and selectors
//! - [`report`] - Step results, aggregation and report files
//! - [`runner`] - Phase scheduling and concurrent step execution
//! - [`shell`] - Child process execution
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```
//! use orchestrate::playbook::Condition;
//!
//! let condition = Condition::parse_shorthand("profile:ci,nightly").unwrap();
//! assert_eq!(condition.to_string(), "profile:ci,nightly");
//! ```

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod playbook;
pub mod registry;
pub mod report;
pub mod runner;
pub mod shell;
pub mod ui;

pub use error::{OrchestrateError, Result};
