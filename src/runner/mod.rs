//! Playbook execution.
//!
//! [`resolve`] turns a playbook into ordered [`PhaseGroup`]s and a
//! [`Coordinator`] runs them against an [`ExecutionContext`].

pub mod cancel;
pub mod context;
pub mod coordinator;
pub mod dependency;
pub mod lanes;

pub use cancel::CancellationToken;
pub use context::ExecutionContext;
pub use coordinator::{Coordinator, PARAM_ENV_PREFIX};
pub use dependency::{resolve, PhaseGraph, PhaseGroup};
pub use lanes::{ExclusionGate, Semaphore};
