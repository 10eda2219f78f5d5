//! Execution coordinator.
//!
//! Phase groups run one after another. Phases inside a group run on their
//! own scoped threads. Inside a phase, exclusive steps run one at a time on
//! a serial lane in declaration order, while the remaining steps are pulled
//! from a shared queue by a small worker pool. Every running step holds a
//! permit from a run-wide [`Semaphore`], so the global concurrency cap
//! holds across phases of the same group.
//!
//! Failure policy is applied at group boundaries: a failed phase without
//! `continue_on_error` stops the run after its group completes, and every
//! later phase is recorded `Skipped`. A step that cannot be spawned at all
//! aborts the run immediately.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::OrchestrateError;
use crate::playbook::Phase;
use crate::registry::Step;
use crate::report::{
    FailureKind, Observer, PhaseRecord, PhaseStatus, ResultAggregator, RunReport, RunSummary,
    StepResult, StepStatus,
};
use crate::shell::{self, CommandSpec, Termination};

use super::cancel::CancellationToken;
use super::context::ExecutionContext;
use super::dependency::{PhaseGraph, PhaseGroup};
use super::lanes::{lock, ExclusionGate, Semaphore};

/// Prefix of the environment variables carrying step parameters.
pub const PARAM_ENV_PREFIX: &str = "ORCHESTRATE_PARAM_";

/// Runs resolved phase groups and produces the run report.
pub struct Coordinator {
    playbook: String,
    observer: Option<Observer>,
}

/// Why the remaining groups will not run.
#[derive(Debug, Clone)]
enum Halt {
    Cancelled,
    Fatal(String),
    PhaseFailed {
        phase: String,
        /// Phases that depend on the failed one.
        downstream: Vec<String>,
    },
}

/// State shared by every lane of one run.
struct Run<'a> {
    ctx: &'a ExecutionContext,
    aggregator: &'a ResultAggregator,
    permits: Semaphore,
    graph: Option<PhaseGraph>,
    /// Cancelled on user cancel or on a fatal error.
    stop: CancellationToken,
    fatal: Mutex<Option<String>>,
}

impl Coordinator {
    pub fn new(playbook: impl Into<String>) -> Self {
        Self {
            playbook: playbook.into(),
            observer: None,
        }
    }

    /// Receive live progress events.
    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run every group and return the finalized report.
    ///
    /// Step failures, cancellation and spawn errors all end up in the
    /// report rather than as an `Err`.
    pub fn run(&self, groups: &[PhaseGroup], ctx: &ExecutionContext) -> RunReport {
        let started_at = Utc::now();
        let aggregator = ResultAggregator::new(self.observer.clone());

        for phase in groups.iter().flat_map(|g| &g.phases) {
            aggregator.record_phase(
                PhaseRecord::new(&phase.name, PhaseStatus::Pending, phase.continue_on_error)
                    .with_steps(phase.steps.iter().map(|s| s.id.clone()).collect()),
            );
        }

        info!(
            "Running playbook '{}' with profile '{}'{}",
            self.playbook,
            ctx.profile,
            if ctx.dry_run { " (dry run)" } else { "" }
        );

        let run = Run {
            ctx,
            aggregator: &aggregator,
            permits: Semaphore::new(ctx.max_concurrency),
            graph: PhaseGraph::from_groups(groups)
                .map_err(|e| warn!("Cannot rebuild phase graph: {}", e))
                .ok(),
            stop: ctx.cancel.child(),
            fatal: Mutex::new(None),
        };

        let mut halt: Option<Halt> = None;
        for group in groups {
            if halt.is_none() && ctx.cancel.is_cancelled() {
                halt = Some(Halt::Cancelled);
            }
            if let Some(reason) = &halt {
                run.abandon(group, reason);
                continue;
            }

            debug!("Starting phase group {}: {}", group.index, group.names().join(", "));
            let statuses = run.run_group(group);
            halt = run.halt_after(group, &statuses);
        }

        let error = run
            .fatal
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        let report = aggregator.finalize(RunSummary {
            playbook: self.playbook.clone(),
            profile: ctx.profile.clone(),
            started_at,
            dry_run: ctx.dry_run,
            features: ctx.config.features(),
            cancelled: ctx.cancel.is_cancelled(),
            error,
        });

        info!(
            "Playbook '{}' {} in {}ms",
            report.playbook, report.overall_status, report.duration_ms
        );
        report
    }
}

impl Run<'_> {
    fn run_group(&self, group: &PhaseGroup) -> Vec<PhaseStatus> {
        if let [phase] = group.phases.as_slice() {
            return vec![self.run_phase(phase)];
        }

        thread::scope(|scope| {
            let handles: Vec<_> = group
                .phases
                .iter()
                .map(|phase| scope.spawn(move || self.run_phase(phase)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(PhaseStatus::Failed))
                .collect()
        })
    }

    fn halt_after(&self, group: &PhaseGroup, statuses: &[PhaseStatus]) -> Option<Halt> {
        if self.ctx.cancel.is_cancelled() {
            return Some(Halt::Cancelled);
        }
        if let Some(message) = lock(&self.fatal).clone() {
            return Some(Halt::Fatal(message));
        }
        group
            .phases
            .iter()
            .zip(statuses)
            .find(|(phase, status)| **status == PhaseStatus::Failed && !phase.continue_on_error)
            .map(|(phase, _)| {
                warn!("Phase '{}' failed; skipping remaining phases", phase.name);
                Halt::PhaseFailed {
                    phase: phase.name.clone(),
                    downstream: self
                        .graph
                        .as_ref()
                        .map(|g| g.transitive_dependents(&phase.name))
                        .unwrap_or_default(),
                }
            })
    }

    /// Record every phase of a group that will never run.
    fn abandon(&self, group: &PhaseGroup, reason: &Halt) {
        for phase in &group.phases {
            let (status, message) = match reason {
                Halt::Cancelled => (PhaseStatus::Cancelled, "run cancelled".to_string()),
                Halt::Fatal(error) => (PhaseStatus::Skipped, format!("run aborted: {}", error)),
                Halt::PhaseFailed { phase: failed, downstream } => {
                    let message = if downstream.contains(&phase.name) {
                        format!("phase '{}' failed", failed)
                    } else {
                        format!("run stopped after phase '{}' failed", failed)
                    };
                    (PhaseStatus::Skipped, message)
                }
            };

            for step in &phase.steps {
                let result = match reason {
                    Halt::Cancelled => StepResult::cancelled(&phase.name, &step.id),
                    _ => StepResult::skipped(&phase.name, &step.id, message.clone()),
                };
                self.aggregator.record(result);
            }
            debug!("Phase '{}' {}: {}", phase.name, status, message);
            self.aggregator.record_phase(
                PhaseRecord::new(&phase.name, status, phase.continue_on_error)
                    .with_message(message),
            );
        }
    }

    fn run_phase(&self, phase: &Phase) -> PhaseStatus {
        if self.stop.is_cancelled() {
            for step in &phase.steps {
                self.aggregator
                    .record(StepResult::cancelled(&phase.name, &step.id));
            }
            return self.finish_phase(phase, PhaseStatus::Cancelled, None);
        }

        if let Some(condition) = &phase.condition {
            match condition.evaluate(self.ctx.config.as_ref()) {
                Ok(true) => debug!("Phase '{}': condition {} holds", phase.name, condition),
                Ok(false) => {
                    let message = format!("condition {} is false", condition);
                    info!("Skipping phase '{}': {}", phase.name, message);
                    self.skip_steps(phase, &message);
                    return self.finish_phase(phase, PhaseStatus::Skipped, Some(message));
                }
                Err(e) => {
                    let message = format!("condition {} could not be evaluated: {}", condition, e);
                    warn!("Phase '{}': {}", phase.name, message);
                    self.skip_steps(phase, &message);
                    return self.finish_phase(phase, PhaseStatus::Failed, Some(message));
                }
            }
        }

        if phase.steps.is_empty() {
            return self.finish_phase(phase, PhaseStatus::Succeeded, None);
        }

        self.aggregator.record_phase(PhaseRecord::new(
            &phase.name,
            PhaseStatus::Running,
            phase.continue_on_error,
        ));
        info!("Phase '{}' started ({} steps)", phase.name, phase.steps.len());

        let statuses = if self.ctx.dry_run {
            phase
                .steps
                .iter()
                .map(|step| self.dry_run_step(phase, step))
                .collect()
        } else {
            self.run_lanes(phase)
        };

        let status = phase_status(&statuses);
        let failed = statuses.iter().filter(|s| **s == StepStatus::Failed).count();
        let message = (failed > 0).then(|| format!("{} of {} steps failed", failed, statuses.len()));
        self.finish_phase(phase, status, message)
    }

    fn finish_phase(
        &self,
        phase: &Phase,
        status: PhaseStatus,
        message: Option<String>,
    ) -> PhaseStatus {
        let mut record = PhaseRecord::new(&phase.name, status, phase.continue_on_error);
        record.message = message;
        self.aggregator.record_phase(record);
        info!("Phase '{}' {}", phase.name, status);
        status
    }

    fn skip_steps(&self, phase: &Phase, reason: &str) {
        for step in &phase.steps {
            self.aggregator
                .record(StepResult::skipped(&phase.name, &step.id, reason));
        }
    }

    fn run_lanes(&self, phase: &Phase) -> Vec<StepStatus> {
        let (exclusive, concurrent): (Vec<&Step>, Vec<&Step>) =
            phase.steps.iter().partition(|s| s.exclusive);

        let workers = phase
            .max_concurrency
            .min(self.ctx.max_concurrency)
            .max(1)
            .min(concurrent.len());
        debug!(
            "Phase '{}': {} exclusive, {} concurrent on {} workers",
            phase.name,
            exclusive.len(),
            concurrent.len(),
            workers
        );

        let gate = ExclusionGate::new();
        let queue = Mutex::new(concurrent.into_iter().collect::<VecDeque<_>>());
        let statuses = Mutex::new(Vec::with_capacity(phase.steps.len()));

        thread::scope(|scope| {
            if !exclusive.is_empty() {
                scope.spawn(|| {
                    for step in &exclusive {
                        let status = self.run_step(phase, step, &gate);
                        lock(&statuses).push(status);
                    }
                });
            }
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let Some(step) = lock(&queue).pop_front() else {
                        break;
                    };
                    let status = self.run_step(phase, step, &gate);
                    lock(&statuses).push(status);
                });
            }
        });

        statuses.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn dry_run_step(&self, phase: &Phase, step: &Step) -> StepStatus {
        if self.stop.is_cancelled() {
            self.aggregator
                .record(StepResult::cancelled(&phase.name, &step.id));
            return StepStatus::Cancelled;
        }

        info!("[dry run] {} / {}: {}", phase.name, step.id, step.command);
        let now = Utc::now();
        let mut result = StepResult::new(&phase.name, &step.id, StepStatus::Succeeded)
            .timed(now, now)
            .with_message(format!("would run: {}", step.command));
        result.dry_run = true;
        result.exclusive = step.exclusive;
        self.aggregator.record(result);
        StepStatus::Succeeded
    }

    fn run_step(&self, phase: &Phase, step: &Step, gate: &ExclusionGate) -> StepStatus {
        if self.stop.is_cancelled() {
            self.aggregator
                .record(StepResult::cancelled(&phase.name, &step.id));
            return StepStatus::Cancelled;
        }

        if let Some(prompt) = &step.confirm {
            if let Some(reason) = self.declined(step, prompt) {
                info!("Skipping step '{}': {}", step.id, reason);
                self.aggregator
                    .record(StepResult::skipped(&phase.name, &step.id, reason));
                return StepStatus::Skipped;
            }
        }

        let _entry = if step.exclusive {
            gate.exclusive()
        } else {
            gate.shared()
        };
        let _permit = self.permits.acquire();

        if self.stop.is_cancelled() {
            self.aggregator
                .record(StepResult::cancelled(&phase.name, &step.id));
            return StepStatus::Cancelled;
        }

        let spec = self.command_spec(phase, step);
        let mut status = StepStatus::Failed;

        for attempt in 0..=step.retries {
            if attempt > 0 {
                if self.stop.is_cancelled() {
                    break;
                }
                info!(
                    "Retrying step '{}' (attempt {} of {})",
                    step.id,
                    attempt + 1,
                    step.retries + 1
                );
            }

            self.aggregator.step_started(&phase.name, &step.id, attempt);
            let started_at = Utc::now();
            let outcome = shell::execute(&spec, &self.stop);
            let finished_at = Utc::now();

            let mut result = StepResult::new(&phase.name, &step.id, StepStatus::Failed)
                .timed(started_at, finished_at);
            result.attempt = attempt;
            result.exclusive = step.exclusive;

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    let message = e.to_string();
                    result.failure = Some(FailureKind::Spawn);
                    result.message = Some(message.clone());
                    self.aggregator.record(result);
                    self.abort(message);
                    return StepStatus::Failed;
                }
            };

            match outcome.termination {
                Termination::Exited(Some(0)) => {
                    result.status = StepStatus::Succeeded;
                    result.exit_code = Some(0);
                    info!("Step '{}' succeeded in {}ms", step.id, result.duration_ms);
                }
                Termination::Exited(code) => {
                    let err = OrchestrateError::StepExecution {
                        step: step.id.clone(),
                        code,
                    };
                    warn!("{}", err);
                    result.exit_code = code;
                    result.failure = Some(FailureKind::ExitCode);
                    result.message = Some(err.to_string());
                }
                Termination::TimedOut => {
                    let err = OrchestrateError::StepTimeout {
                        step: step.id.clone(),
                        seconds: spec.timeout.map(|t| t.as_secs()).unwrap_or_default(),
                    };
                    result.failure = Some(FailureKind::Timeout);
                    result.message = Some(err.to_string());
                }
                Termination::Cancelled => {
                    info!("Step '{}' cancelled", step.id);
                    result.status = StepStatus::Cancelled;
                    result.message = Some(OrchestrateError::Cancelled.to_string());
                }
            }
            result.stdout = outcome.stdout;
            result.stderr = outcome.stderr;

            status = result.status;
            self.aggregator.record(result);
            if status != StepStatus::Failed {
                break;
            }
        }

        status
    }

    /// `Some(reason)` when the step must not run.
    fn declined(&self, step: &Step, prompt: &str) -> Option<String> {
        if !self.ctx.adapter.is_interactive() {
            // The adapter still sees the prompt so it can be logged.
            if let Err(e) = self.ctx.adapter.confirm(prompt) {
                warn!("Could not record prompt for step '{}': {}", step.id, e);
            }
            return Some("confirmation required but running non-interactively".to_string());
        }
        match self.ctx.adapter.confirm(prompt) {
            Ok(true) => None,
            Ok(false) => Some("declined".to_string()),
            Err(e) => {
                warn!("Could not confirm step '{}': {}", step.id, e);
                Some(format!("confirmation failed: {}", e))
            }
        }
    }

    fn command_spec(&self, phase: &Phase, step: &Step) -> CommandSpec {
        let mut env: BTreeMap<String, String> = step.env.clone();
        for (name, value) in phase.params_for(step) {
            env.insert(format!("{}{}", PARAM_ENV_PREFIX, env_key(&name)), value);
        }
        env.insert("ORCHESTRATE_STEP_ID".into(), step.id.clone());
        env.insert("ORCHESTRATE_PHASE".into(), phase.name.clone());
        env.insert("ORCHESTRATE_PROFILE".into(), self.ctx.profile.clone());
        env.insert("ORCHESTRATE_DRY_RUN".into(), "0".into());
        if !self.ctx.interactive {
            env.insert("ORCHESTRATE_NON_INTERACTIVE".into(), "1".into());
        }

        let cwd = match &step.cwd {
            Some(dir) => self.ctx.working_dir.join(dir),
            None => self.ctx.working_dir.clone(),
        };

        CommandSpec {
            label: step.id.clone(),
            command: step.command.clone(),
            cwd: Some(cwd),
            env,
            timeout: phase.timeout_for(step).map(Duration::from_secs),
            grace_period: self.ctx.grace_period,
            summary_lines: self.ctx.summary_lines,
        }
    }

    /// Record the first fatal error and stop every lane.
    fn abort(&self, message: String) {
        let mut fatal = lock(&self.fatal);
        if fatal.is_none() {
            error!("Aborting run: {}", message);
            *fatal = Some(message);
        }
        drop(fatal);
        self.stop.cancel();
    }
}

/// Failed beats Cancelled; a phase whose steps were all skipped is Skipped.
fn phase_status(statuses: &[StepStatus]) -> PhaseStatus {
    if statuses.contains(&StepStatus::Failed) {
        PhaseStatus::Failed
    } else if statuses.contains(&StepStatus::Cancelled) {
        PhaseStatus::Cancelled
    } else if !statuses.is_empty() && statuses.iter().all(|s| *s == StepStatus::Skipped) {
        PhaseStatus::Skipped
    } else {
        PhaseStatus::Succeeded
    }
}

/// `node-version` → `NODE_VERSION`.
fn env_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
