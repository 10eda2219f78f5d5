//! Run reports.
//!
//! Step results stream into a [`ResultAggregator`] while the run is in
//! progress; [`ResultAggregator::finalize`] turns them into a
//! [`RunReport`], which [`store`] can write as JSON or YAML.

pub mod aggregator;
pub mod result;
pub mod store;

pub use aggregator::{overall_status, Observer, ResultAggregator, RunEvent, RunSummary};
pub use result::{
    FailureKind, OverallStatus, PhaseRecord, PhaseReport, PhaseStatus, RunReport, StepResult,
    StepStatus, StepSummary,
};
pub use store::{read_report, render, report_path_in, write_report, ReportFormat};
