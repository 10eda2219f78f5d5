//! Writing run reports to disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{OrchestrateError, Result};

use super::result::RunReport;

/// Report file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Json,
    Yaml,
}

impl ReportFormat {
    /// Guess from a file extension; anything unrecognized is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yml") | Some("yaml") => Self::Yaml,
            _ => Self::Json,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yml",
        }
    }
}

/// Render a report.
pub fn render(report: &RunReport, format: ReportFormat) -> Result<String> {
    let text = match format {
        ReportFormat::Json => serde_json::to_string_pretty(report).map_err(anyhow::Error::from)?,
        ReportFormat::Yaml => serde_yaml::to_string(report).map_err(anyhow::Error::from)?,
    };
    Ok(text)
}

/// Write a report, creating parent directories.
pub fn write_report(report: &RunReport, path: &Path, format: ReportFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut text = render(report, format)?;
    if !text.ends_with('\n') {
        text.push('\n');
    }
    fs::write(path, text)?;
    debug!("Wrote run report to {}", path.display());
    Ok(())
}

/// `<dir>/<playbook>-<timestamp>.<ext>` for the report directory setting.
pub fn report_path_in(dir: &Path, report: &RunReport, format: ReportFormat) -> PathBuf {
    let stamp = report.started_at.format("%Y%m%dT%H%M%SZ");
    let name: String = report
        .playbook
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("{}-{}.{}", name, stamp, format.extension()))
}

/// Read a report back.
pub fn read_report(path: &Path) -> Result<RunReport> {
    let text = fs::read_to_string(path)?;
    let report = match ReportFormat::from_path(path) {
        ReportFormat::Json => serde_json::from_str(&text).map_err(anyhow::Error::from),
        ReportFormat::Yaml => serde_yaml::from_str(&text).map_err(anyhow::Error::from),
    };
    report.map_err(OrchestrateError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{OverallStatus, PhaseReport, StepResult, StepStatus, StepSummary};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn report() -> RunReport {
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        RunReport {
            playbook: "boot strap".into(),
            profile: "ci".into(),
            started_at: started,
            finished_at: started,
            duration_ms: 0,
            overall_status: OverallStatus::Succeeded,
            dry_run: false,
            features: BTreeMap::from([("docker".to_string(), true)]),
            phases: vec![PhaseReport {
                name: "setup".into(),
                status: StepStatus::Succeeded,
                continue_on_error: false,
                message: None,
                steps: vec![StepSummary {
                    id: "s1".into(),
                    status: StepStatus::Succeeded,
                    exit_code: Some(0),
                    duration_ms: 12,
                    retries: 0,
                    failure: None,
                }],
            }],
            results: vec![StepResult::new("setup", "s1", StepStatus::Succeeded)],
            error: None,
        }
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ReportFormat::from_path(Path::new("r.yaml")), ReportFormat::Yaml);
        assert_eq!(ReportFormat::from_path(Path::new("r.YML")), ReportFormat::Yaml);
        assert_eq!(ReportFormat::from_path(Path::new("r.json")), ReportFormat::Json);
        assert_eq!(ReportFormat::from_path(Path::new("r")), ReportFormat::Json);
    }

    #[test]
    fn json_uses_report_field_names() {
        let text = render(&report(), ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["overallStatus"], "Succeeded");
        assert_eq!(value["phases"][0]["steps"][0]["exitCode"], 0);
        assert_eq!(value["phases"][0]["steps"][0]["durationMs"], 12);
        assert_eq!(value["phases"][0]["continueOnError"], false);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn writes_and_reads_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/report.yml");
        write_report(&report(), &path, ReportFormat::Yaml).unwrap();
        let back = read_report(&path).unwrap();
        assert_eq!(back.profile, "ci");
        assert_eq!(back.phases[0].steps[0].id, "s1");
    }

    #[test]
    fn report_dir_file_name_is_sanitized_and_stamped() {
        let path = report_path_in(Path::new("/reports"), &report(), ReportFormat::Json);
        assert_eq!(
            path,
            PathBuf::from("/reports/boot_strap-20260301T123000Z.json")
        );
    }
}
