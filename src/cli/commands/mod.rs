//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed by
//! [`CommandDispatcher`]. Commands that need the project load it through
//! [`Workspace`] so configuration and catalog errors surface before any
//! step runs.

pub mod completions;
pub mod dispatcher;
pub mod list;
pub mod plan;
pub mod run;
pub mod workspace;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
pub use workspace::{Workspace, WorkspaceOptions};
