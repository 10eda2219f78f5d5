//! Run report data model.
//!
//! Everything here serializes with camelCase field names and PascalCase
//! status values, the shape external dashboards consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of one step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
    Cancelled,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

/// Why a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Exited non-zero.
    ExitCode,
    /// Exceeded its timeout.
    Timeout,
    /// Could not be started.
    Spawn,
}

/// Status of a whole phase.
pub type PhaseStatus = StepStatus;

/// Overall run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    Succeeded,
    SucceededWithWarnings,
    Failed,
    Aborted,
}

impl OverallStatus {
    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Succeeded | Self::SucceededWithWarnings => 0,
            Self::Failed => crate::error::EXIT_FAILED,
            Self::Aborted => crate::error::EXIT_ABORTED,
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Succeeded => "succeeded",
            Self::SucceededWithWarnings => "succeeded with warnings",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        write!(f, "{}", label)
    }
}

/// One recorded step attempt. Retries produce additional results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_id: String,
    pub phase: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    /// Tail of standard output.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    /// Tail of standard error.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    /// Zero for the first attempt.
    pub attempt: u32,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default)]
    pub exclusive: bool,
    /// Assigned by the aggregator in recording order.
    #[serde(default)]
    pub sequence: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StepResult {
    /// A result with nothing filled in beyond identity and status.
    pub fn new(phase: impl Into<String>, step_id: impl Into<String>, status: StepStatus) -> Self {
        Self {
            step_id: step_id.into(),
            phase: phase.into(),
            status,
            exit_code: None,
            started_at: None,
            finished_at: None,
            duration_ms: 0,
            stdout: String::new(),
            stderr: String::new(),
            attempt: 0,
            dry_run: false,
            failure: None,
            exclusive: false,
            sequence: 0,
            message: None,
        }
    }

    /// A step that never ran.
    pub fn skipped(phase: &str, step_id: &str, reason: impl Into<String>) -> Self {
        Self::new(phase, step_id, StepStatus::Skipped).with_message(reason)
    }

    /// A step stopped or never started because the run was cancelled.
    pub fn cancelled(phase: &str, step_id: &str) -> Self {
        Self::new(phase, step_id, StepStatus::Cancelled)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set both timestamps and derive the duration.
    pub fn timed(mut self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        self.duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        self.started_at = Some(started_at);
        self.finished_at = Some(finished_at);
        self
    }

    /// Whether `[started_at, finished_at]` intersects another result's interval.
    pub fn overlaps(&self, other: &StepResult) -> bool {
        match (
            self.started_at,
            self.finished_at,
            other.started_at,
            other.finished_at,
        ) {
            (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) => {
                a_start < b_end && b_start < a_end
            }
            _ => false,
        }
    }
}

/// Phase-level event recorded alongside step results.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseRecord {
    pub name: String,
    pub status: PhaseStatus,
    pub continue_on_error: bool,
    /// Step ids in declaration order.
    pub steps: Vec<String>,
    pub message: Option<String>,
}

impl PhaseRecord {
    pub fn new(name: impl Into<String>, status: PhaseStatus, continue_on_error: bool) -> Self {
        Self {
            name: name.into(),
            status,
            continue_on_error,
            steps: Vec::new(),
            message: None,
        }
    }

    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Per-step line in a phase summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSummary {
    pub id: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    /// Attempts beyond the first.
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

/// Phase summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport {
    pub name: String,
    pub status: PhaseStatus,
    pub continue_on_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub steps: Vec<StepSummary>,
}

/// The structured document produced by every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub playbook: String,
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub overall_status: OverallStatus,
    pub dry_run: bool,
    pub features: BTreeMap<String, bool>,
    pub phases: Vec<PhaseReport>,
    /// Every recorded attempt in sequence order.
    pub results: Vec<StepResult>,
    /// Fatal infrastructure error that aborted the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn phase(&self, name: &str) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Attempts recorded for one step, in order.
    pub fn results_for(&self, step_id: &str) -> Vec<&StepResult> {
        self.results.iter().filter(|r| r.step_id == step_id).collect()
    }

    pub fn exit_code(&self) -> i32 {
        self.overall_status.exit_code()
    }

    /// Count of final step outcomes by status.
    pub fn count(&self, status: StepStatus) -> usize {
        self.phases
            .iter()
            .flat_map(|p| &p.steps)
            .filter(|s| s.status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn timed_derives_duration() {
        let start = Utc::now();
        let result = StepResult::new("p", "s", StepStatus::Succeeded)
            .timed(start, start + Duration::milliseconds(1500));
        assert_eq!(result.duration_ms, 1500);
    }

    #[test]
    fn overlap_detection() {
        let t0 = Utc::now();
        let a = StepResult::new("p", "a", StepStatus::Succeeded)
            .timed(t0, t0 + Duration::milliseconds(100));
        let b = StepResult::new("p", "b", StepStatus::Succeeded).timed(
            t0 + Duration::milliseconds(50),
            t0 + Duration::milliseconds(150),
        );
        let c = StepResult::new("p", "c", StepStatus::Succeeded).timed(
            t0 + Duration::milliseconds(100),
            t0 + Duration::milliseconds(200),
        );
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&StepResult::skipped("p", "d", "never ran")));
    }

    #[test]
    fn serializes_camel_case_and_pascal_status() {
        let result = StepResult::new("setup", "s1", StepStatus::Failed);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["stepId"], "s1");
        assert_eq!(json["status"], "Failed");
        assert_eq!(json["durationMs"], 0);
        assert!(json.get("exitCode").is_none());
    }

    #[test]
    fn overall_status_exit_codes() {
        assert_eq!(OverallStatus::Succeeded.exit_code(), 0);
        assert_eq!(OverallStatus::SucceededWithWarnings.exit_code(), 0);
        assert_eq!(OverallStatus::Failed.exit_code(), 1);
        assert_eq!(OverallStatus::Aborted.exit_code(), 130);
    }
}
