//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::report::ReportFormat;

/// Orchestrate - declarative playbook runner.
#[derive(Debug, Parser)]
#[command(name = "orchestrate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Load this config file instead of the layered defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides discovery from the current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Step catalog (overrides settings.catalog)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Show captured output of every step
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final summary
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a playbook
    Run(RunArgs),

    /// Load a playbook and print its phase groups without running anything
    Plan(PlanArgs),

    /// List catalog steps
    List(ListArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Playbook name (looked up in the playbook directory) or path
    pub playbook: String,

    /// Profile to run with (defaults to settings.default_profile)
    #[arg(long, env = "ORCHESTRATE_PROFILE")]
    pub profile: Option<String>,

    /// Show what would run without spawning any step
    #[arg(long)]
    pub dry_run: bool,

    /// Never prompt; confirmations are declined
    #[arg(long)]
    pub non_interactive: bool,

    /// Cap on concurrently running steps (overrides settings.max_concurrency)
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Write the run report to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Report format (defaults to the report file extension, else json)
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,
}

impl RunArgs {
    pub fn new(playbook: impl Into<String>) -> Self {
        Self {
            playbook: playbook.into(),
            profile: None,
            dry_run: false,
            non_interactive: false,
            max_concurrency: None,
            report: None,
            format: None,
        }
    }
}

/// Arguments for the `plan` command.
#[derive(Debug, Clone, clap::Args)]
pub struct PlanArgs {
    /// Playbook name or path
    pub playbook: String,

    /// Profile to plan for
    #[arg(long, env = "ORCHESTRATE_PROFILE")]
    pub profile: Option<String>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Only steps in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "orchestrate",
            "--quiet",
            "run",
            "bootstrap",
            "--profile",
            "ci",
            "--dry-run",
            "--non-interactive",
            "--max-concurrency",
            "8",
            "--report",
            "out/report.yml",
            "--format",
            "yaml",
        ])
        .unwrap();

        assert!(cli.quiet);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.playbook, "bootstrap");
        assert_eq!(args.profile.as_deref(), Some("ci"));
        assert!(args.dry_run);
        assert!(args.non_interactive);
        assert_eq!(args.max_concurrency, Some(8));
        assert_eq!(args.report, Some(PathBuf::from("out/report.yml")));
        assert_eq!(args.format, Some(ReportFormat::Yaml));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "orchestrate",
            "list",
            "--catalog",
            "steps.yml",
            "--category",
            "toolchain",
        ])
        .unwrap();
        assert_eq!(cli.catalog, Some(PathBuf::from("steps.yml")));
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.category.as_deref(), Some("toolchain"));
    }

    #[test]
    fn run_requires_playbook() {
        assert!(Cli::try_parse_from(["orchestrate", "run"]).is_err());
    }
}
