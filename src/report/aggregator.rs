//! Result aggregation.
//!
//! Workers never touch the report directly. They send events down a
//! channel to a single writer thread, which assigns sequence numbers,
//! forwards each event to the observer and keeps the append-only log.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use tracing::warn;

use super::result::{
    OverallStatus, PhaseRecord, PhaseReport, RunReport, StepResult, StepStatus, StepSummary,
};

/// Progress events, in the order the writer received them.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// A phase changed state.
    Phase(PhaseRecord),
    /// A step attempt is starting.
    StepStarted {
        phase: String,
        step_id: String,
        attempt: u32,
    },
    /// A step attempt finished (or was skipped or cancelled).
    StepFinished(StepResult),
}

/// Receives every event on the writer thread.
pub type Observer = Arc<dyn Fn(&RunEvent) + Send + Sync>;

/// Run-level facts the aggregator cannot observe itself.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub playbook: String,
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub features: BTreeMap<String, bool>,
    pub cancelled: bool,
    /// Fatal infrastructure error, if one aborted the run.
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Log {
    results: Vec<StepResult>,
    /// Latest record per phase, in order of first appearance.
    phases: Vec<PhaseRecord>,
}

/// Single-writer collector of step results.
///
/// `record` can be called from any thread; the handle is `Sync`.
pub struct ResultAggregator {
    sender: Sender<RunEvent>,
    writer: JoinHandle<Log>,
}

impl ResultAggregator {
    pub fn new(observer: Option<Observer>) -> Self {
        let (sender, receiver) = mpsc::channel::<RunEvent>();

        let writer = thread::spawn(move || {
            let mut log = Log::default();
            let mut sequence = 0u64;

            for mut event in receiver {
                match &mut event {
                    RunEvent::StepFinished(result) => {
                        sequence += 1;
                        result.sequence = sequence;
                        log.results.push(result.clone());
                    }
                    RunEvent::Phase(record) => {
                        match log.phases.iter_mut().find(|p| p.name == record.name) {
                            Some(existing) => {
                                let steps = std::mem::take(&mut existing.steps);
                                *existing = record.clone();
                                if existing.steps.is_empty() {
                                    existing.steps = steps;
                                }
                            }
                            None => log.phases.push(record.clone()),
                        }
                    }
                    RunEvent::StepStarted { .. } => {}
                }

                if let Some(observer) = &observer {
                    observer(&event);
                }
            }

            log
        });

        Self { sender, writer }
    }

    /// Append a step result.
    pub fn record(&self, result: StepResult) {
        self.send(RunEvent::StepFinished(result));
    }

    /// Record a phase state change.
    pub fn record_phase(&self, record: PhaseRecord) {
        self.send(RunEvent::Phase(record));
    }

    /// Announce a step attempt starting.
    pub fn step_started(&self, phase: &str, step_id: &str, attempt: u32) {
        self.send(RunEvent::StepStarted {
            phase: phase.to_string(),
            step_id: step_id.to_string(),
            attempt,
        });
    }

    fn send(&self, event: RunEvent) {
        if self.sender.send(event).is_err() {
            warn!("Result writer stopped; event dropped");
        }
    }

    /// Close the log and build the report.
    pub fn finalize(self, summary: RunSummary) -> RunReport {
        let Self { sender, writer } = self;
        drop(sender);
        let log = writer.join().unwrap_or_else(|_| {
            warn!("Result writer panicked; report is incomplete");
            Log::default()
        });

        let phases: Vec<PhaseReport> = log
            .phases
            .iter()
            .map(|record| phase_report(record, &log.results))
            .collect();

        let overall_status = overall_status(&summary, &phases);
        let finished_at = Utc::now();

        RunReport {
            playbook: summary.playbook,
            profile: summary.profile,
            started_at: summary.started_at,
            finished_at,
            duration_ms: (finished_at - summary.started_at)
                .num_milliseconds()
                .max(0) as u64,
            overall_status,
            dry_run: summary.dry_run,
            features: summary.features,
            phases,
            results: log.results,
            error: summary.error,
        }
    }
}

fn phase_report(record: &PhaseRecord, results: &[StepResult]) -> PhaseReport {
    let steps = record
        .steps
        .iter()
        .map(|id| {
            let last = results
                .iter()
                .rev()
                .find(|r| &r.step_id == id && r.phase == record.name);
            match last {
                Some(result) => StepSummary {
                    id: id.clone(),
                    status: result.status,
                    exit_code: result.exit_code,
                    duration_ms: result.duration_ms,
                    retries: result.attempt,
                    failure: result.failure,
                },
                None => StepSummary {
                    id: id.clone(),
                    status: StepStatus::Pending,
                    exit_code: None,
                    duration_ms: 0,
                    retries: 0,
                    failure: None,
                },
            }
        })
        .collect();

    PhaseReport {
        name: record.name.clone(),
        status: record.status,
        continue_on_error: record.continue_on_error,
        message: record.message.clone(),
        steps,
    }
}

/// Aborted beats Failed beats warnings.
pub fn overall_status(summary: &RunSummary, phases: &[PhaseReport]) -> OverallStatus {
    if summary.cancelled {
        return OverallStatus::Aborted;
    }
    if summary.error.is_some() {
        return OverallStatus::Failed;
    }

    let mut warnings = false;
    for phase in phases {
        let failed = phase.status == StepStatus::Failed
            || phase.steps.iter().any(|s| s.status == StepStatus::Failed);
        if failed {
            if phase.continue_on_error {
                warnings = true;
            } else {
                return OverallStatus::Failed;
            }
        }
    }

    if warnings {
        OverallStatus::SucceededWithWarnings
    } else {
        OverallStatus::Succeeded
    }
}
