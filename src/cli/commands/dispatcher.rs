//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::runner::CancellationToken;
use crate::ui::UserInterface;

use super::workspace::{Workspace, WorkspaceOptions};

/// Each CLI subcommand implements this trait.
pub trait Command {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,

    /// Process exit code.
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }

    /// Success when `exit_code` is zero.
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            Self::success()
        } else {
            Self::failure(exit_code)
        }
    }
}

/// Routes CLI subcommands to their implementations.
pub struct CommandDispatcher {
    options: WorkspaceOptions,
    cancel: CancellationToken,
}

impl CommandDispatcher {
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            options: WorkspaceOptions {
                root: project_root,
                ..Default::default()
            },
            cancel: CancellationToken::new(),
        }
    }

    /// Take `--config` and `--catalog` from the parsed CLI.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        self.options.config = cli.config.clone();
        self.options.catalog = cli.catalog.clone();
        self
    }

    /// Token cancelled on Ctrl-C.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.options.root
    }

    /// Load the project where needed and execute the command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Commands::Run(args) => {
                let workspace = Workspace::load(&self.options)?;
                super::run::RunCommand::new(workspace, args.clone(), self.cancel.clone())
                    .execute(ui)
            }
            Commands::Plan(args) => {
                let workspace = Workspace::load(&self.options)?;
                super::plan::PlanCommand::new(workspace, args.clone()).execute(ui)
            }
            Commands::List(args) => {
                let workspace = Workspace::load(&self.options)?;
                super::list::ListCommand::new(workspace, args.clone()).execute(ui)
            }
            Commands::Completions(args) => {
                super::completions::CompletionsCommand::new(args.clone()).execute(ui)
            }
        }
    }
}
