//! Library integration tests: catalog, playbook, scheduling and report.

use std::fs;
use std::sync::Arc;

use orchestrate::config::{OrchestrateConfig, ProfileContext};
use orchestrate::environment::{EnvironmentAdapter, MockAdapter};
use orchestrate::playbook::PlaybookLoader;
use orchestrate::registry::parse_catalog;
use orchestrate::report::{read_report, write_report, OverallStatus, ReportFormat, StepStatus};
use orchestrate::runner::{resolve, Coordinator, ExecutionContext};
use orchestrate::OrchestrateError;
use tempfile::TempDir;

const CATALOG: &str = r#"
steps:
  - id: "0101"
    category: build
    command: "true"
  - id: "0102"
    category: build
    command: "true"
  - id: lint
    category: check
    tags: [fast]
    command: "true"
  - id: docs
    category: check
    command: "true"
"#;

const CONFIG: &str = r#"
features:
  docker: false
  docs: true
profiles:
  dev: {}
  ci:
    features:
      docker: true
"#;

#[test]
fn profile_changes_which_phases_run() {
    let registry = parse_catalog(CATALOG, "inline").unwrap();
    let config: OrchestrateConfig = serde_yaml::from_str(CONFIG).unwrap();
    let playbook_yaml = r#"
name: pipeline
phases:
  - name: build
    steps: ["0101-0102"]
    maxConcurrency: 2
  - name: containers
    steps: [lint]
    when: feature:docker
  - name: docs
    steps: [docs]
    when: profile:dev
"#;

    for (profile, expected) in [
        ("dev", StepStatus::Skipped),
        ("ci", StepStatus::Succeeded),
    ] {
        let adapter: Arc<dyn EnvironmentAdapter> = Arc::new(MockAdapter::non_interactive());
        let context = ProfileContext::with_env(&config, profile, adapter.clone(), Vec::new())
            .unwrap();
        let playbook = PlaybookLoader::new(&registry)
            .load_str(playbook_yaml, "pipeline", profile)
            .unwrap();
        let groups = resolve(&playbook).unwrap();
        let ctx = ExecutionContext::new(Arc::new(context), adapter);

        let report = Coordinator::new(&playbook.name).run(&groups, &ctx);
        assert_eq!(report.profile, profile);
        assert_eq!(report.phase("containers").unwrap().status, expected);
        assert_eq!(report.phase("build").unwrap().steps.len(), 2);
        assert_eq!(report.overall_status, OverallStatus::Succeeded);
    }
}

#[test]
fn unknown_profile_is_a_load_error() {
    let config: OrchestrateConfig = serde_yaml::from_str(CONFIG).unwrap();
    let adapter: Arc<dyn EnvironmentAdapter> = Arc::new(MockAdapter::non_interactive());
    let err = ProfileContext::with_env(&config, "staging", adapter, Vec::new()).unwrap_err();
    assert!(matches!(err, OrchestrateError::InvalidProfile { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn dry_run_report_round_trips_through_disk() {
    let registry = parse_catalog(CATALOG, "inline").unwrap();
    let playbook = PlaybookLoader::new(&registry)
        .load_str("phases:\n  - name: check\n    steps: [tag:fast]\n", "quick", "dev")
        .unwrap();
    let groups = resolve(&playbook).unwrap();

    let adapter: Arc<dyn EnvironmentAdapter> = Arc::new(MockAdapter::non_interactive());
    let config = ProfileContext::from_features("dev", Default::default(), adapter.clone());
    let ctx = ExecutionContext::new(Arc::new(config), adapter).with_dry_run(true);
    let report = Coordinator::new(&playbook.name).run(&groups, &ctx);

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("quick.json");
    write_report(&report, &path, ReportFormat::Json).unwrap();
    assert!(fs::metadata(&path).unwrap().len() > 0);

    let loaded = read_report(&path).unwrap();
    assert!(loaded.dry_run);
    assert_eq!(loaded.results.len(), 1);
    assert_eq!(loaded.results[0].step_id, "lint");
}
