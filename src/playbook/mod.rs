//! Playbooks: ordered phases of steps with per-phase policy.
//!
//! A playbook file is parsed, bound to the step registry and validated in
//! one pass by [`PlaybookLoader`]. Conditions are kept unevaluated until
//! their phase runs.

pub mod condition;
pub mod loader;
pub mod schema;

pub use condition::{Condition, ConditionSpec, OneOrMany, StructuredCondition};
pub use loader::{resolve_playbook_path, PlaybookLoader};
pub use schema::{ParamValue, Phase, PhaseFile, Playbook, PlaybookFile};
