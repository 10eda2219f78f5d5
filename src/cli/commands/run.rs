//! Run command implementation.
//!
//! The `orchestrate run` command loads a playbook, runs it and reports.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cli::args::RunArgs;
use crate::config::{local_config_path, ProfileContext};
use crate::environment::{adapter_for, detect_interactivity, EnvironmentAdapter, InteractivitySource};
use crate::error::Result;
use crate::report::{report_path_in, write_report, ReportFormat, RunReport};
use crate::runner::{resolve, CancellationToken, Coordinator, ExecutionContext};
use crate::ui::{render_summary, UserInterface};

use super::dispatcher::{Command, CommandResult};
use super::workspace::Workspace;

/// The run command implementation.
pub struct RunCommand {
    workspace: Workspace,
    args: RunArgs,
    cancel: CancellationToken,
}

impl RunCommand {
    pub fn new(workspace: Workspace, args: RunArgs, cancel: CancellationToken) -> Self {
        Self {
            workspace,
            args,
            cancel,
        }
    }

    /// Feature context for the run. Dry runs never write accepted
    /// feature enables back to the local config.
    fn profile_context(
        &self,
        profile: &str,
        adapter: Arc<dyn EnvironmentAdapter>,
    ) -> Result<ProfileContext> {
        let config = ProfileContext::new(&self.workspace.config, profile, adapter)?;
        if self.args.dry_run {
            return Ok(config);
        }
        Ok(config.with_persist_path(local_config_path(&self.workspace.root)))
    }

    /// Report files to write: `--report`, then `settings.report_dir`.
    fn report_targets(&self, report: &RunReport) -> Vec<(PathBuf, ReportFormat)> {
        let mut targets = Vec::new();
        if let Some(path) = &self.args.report {
            let format = self
                .args
                .format
                .unwrap_or_else(|| ReportFormat::from_path(path));
            targets.push((path.clone(), format));
        }
        if let Some(dir) = &self.workspace.config.settings.report_dir {
            let format = self.args.format.unwrap_or_default();
            let dir = self.workspace.root.join(dir);
            targets.push((report_path_in(&dir, report, format), format));
        }
        targets
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let workspace = &self.workspace;
        let settings = &workspace.config.settings;
        let profile = workspace.profile(self.args.profile.as_deref());

        let interactivity = detect_interactivity(self.args.non_interactive);
        if let InteractivitySource::Ci { variable } = &interactivity.source {
            info!("CI detected ({}); running non-interactively", variable);
        }
        let adapter = adapter_for(&interactivity);

        let config = self.profile_context(&profile, adapter.clone())?;

        // Everything that can fail on bad input happens before the first step.
        let playbook = workspace.load_playbook(&self.args.playbook, &profile)?;
        let groups = resolve(&playbook)?;
        debug!(
            "Playbook '{}': {} phases in {} groups",
            playbook.name,
            playbook.phases.len(),
            groups.len()
        );

        let ctx = ExecutionContext::new(Arc::new(config), adapter)
            .with_dry_run(self.args.dry_run)
            .with_cancel(self.cancel.clone())
            .with_max_concurrency(self.args.max_concurrency.unwrap_or(settings.max_concurrency))
            .with_grace_period(Duration::from_secs(settings.grace_period_secs))
            .with_summary_lines(settings.output_summary_lines)
            .with_working_dir(&workspace.root);

        let mut coordinator = Coordinator::new(&playbook.name);
        if let Some(observer) = ui.progress_observer() {
            coordinator = coordinator.with_observer(observer);
        }
        let report = coordinator.run(&groups, &ctx);

        let summary = render_summary(&report, ui.theme());
        ui.message(&summary);

        for (path, format) in self.report_targets(&report) {
            match write_report(&report, &path, format) {
                Ok(()) => info!("Report written to {}", path.display()),
                Err(e) => ui.error(&format!(
                    "Could not write report to {}: {}",
                    path.display(),
                    e
                )),
            }
        }

        Ok(CommandResult::from_exit_code(report.exit_code()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::cli::commands::workspace::WorkspaceOptions;
    use crate::config::ConfigContext;
    use crate::environment::MockAdapter;
    use crate::error::OrchestrateError;
    use crate::report::{read_report, OverallStatus};
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    const CATALOG: &str = r#"
steps:
  - id: s1
    command: "true"
  - id: s2
    command: "exit 4"
  - id: s3
    command: "true"
"#;

    fn project(playbook: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".orchestrate/playbooks");
        fs::create_dir_all(&dir).unwrap();
        fs::write(temp.path().join(".orchestrate/steps.yml"), CATALOG).unwrap();
        fs::write(dir.join("main.yml"), playbook).unwrap();
        temp
    }

    fn command(temp: &TempDir, args: RunArgs) -> RunCommand {
        let workspace = Workspace::load(&WorkspaceOptions {
            root: temp.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        RunCommand::new(workspace, args, CancellationToken::new())
    }

    fn args() -> RunArgs {
        RunArgs {
            non_interactive: true,
            profile: Some("dev".into()),
            ..RunArgs::new("main")
        }
    }

    #[test]
    fn successful_run_writes_report() {
        let temp = project("phases:\n  - name: a\n    steps: [s1]\n  - name: b\n    steps: [s3]\n");
        let report_path = temp.path().join("out/report.json");
        let cmd = command(
            &temp,
            RunArgs {
                report: Some(report_path.clone()),
                ..args()
            },
        );

        let mut ui = MockUI::new();
        let result = cmd.execute(&mut ui).unwrap();

        assert_eq!(result, CommandResult::success());
        assert!(ui.stdout().contains("Run succeeded"));
        let report = read_report(&report_path).unwrap();
        assert_eq!(report.overall_status, OverallStatus::Succeeded);
        assert_eq!(report.results.len(), 2);
    }

    #[test]
    fn failed_step_exits_one() {
        let temp = project("phases:\n  - name: a\n    steps: [s1, s2]\n  - name: b\n    steps: [s3]\n");
        let mut ui = MockUI::new();
        let result = command(&temp, args()).execute(&mut ui).unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(ui.stdout().contains("✗ failed"));
    }

    #[test]
    fn unknown_step_fails_before_running() {
        let temp = project("phases:\n  - name: a\n    steps: [s1, nope]\n");
        let mut ui = MockUI::new();
        let err = command(&temp, args()).execute(&mut ui).unwrap_err();
        assert!(matches!(err, OrchestrateError::UnknownStep { .. }));
        assert_eq!(err.exit_code(), 2);
        assert!(ui.messages().is_empty());
    }

    #[test]
    fn report_dir_setting_writes_timestamped_file() {
        let temp = project("phases:\n  - name: a\n    steps: [s1]\n");
        fs::write(
            temp.path().join(".orchestrate/config.yml"),
            "settings:\n  report_dir: reports\n",
        )
        .unwrap();
        let mut ui = MockUI::new();
        command(&temp, args()).execute(&mut ui).unwrap();

        let files: Vec<_> = fs::read_dir(temp.path().join("reports"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("main-"));
        assert!(files[0].ends_with(".json"));
    }

    #[test]
    fn cancelled_before_start_aborts() {
        let temp = project("phases:\n  - name: a\n    steps: [s1]\n");
        let workspace = Workspace::load(&WorkspaceOptions {
            root: temp.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut ui = MockUI::new();
        let result = RunCommand::new(workspace, args(), cancel)
            .execute(&mut ui)
            .unwrap();
        assert_eq!(result.exit_code, 130);
    }

    #[test]
    fn accepted_feature_persists_only_outside_dry_run() {
        let temp = project("phases:\n  - name: a\n    steps: [s1]\n");
        let local = local_config_path(temp.path());

        for dry_run in [true, false] {
            let cmd = command(&temp, RunArgs { dry_run, ..args() });
            let adapter = Arc::new(MockAdapter::interactive());
            adapter.set_default_response(true);
            let config = cmd.profile_context("dev", adapter).unwrap();

            assert!(config.request_feature_enable("docker").unwrap());
            assert!(config.is_feature_enabled("docker"));
            assert_eq!(local.exists(), !dry_run);
        }
    }
}
