//! Playbook file format and the resolved playbook model.
//!
//! ```yaml
//! name: bootstrap
//! profiles: [dev, ci]
//! phases:
//!   - name: setup
//!     steps: ["0201", category:install]
//!     max_concurrency: 4
//!   - name: docker
//!     condition: request:docker
//!     continue_on_error: true
//!     steps: [tag:docker?]
//!   - name: verify
//!     requires: [setup]
//!     steps: [verify-all]
//!     params:
//!       level: strict
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::registry::Step;

use super::condition::{Condition, ConditionSpec};

/// A playbook as written on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybookFile {
    /// Defaults to the file stem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Profiles this playbook may run under. Empty means any.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,

    pub phases: Vec<PhaseFile>,
}

/// A phase as written on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseFile {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Step selectors, resolved against the registry at load time.
    #[serde(deserialize_with = "selector_list")]
    pub steps: Vec<String>,

    #[serde(alias = "maxConcurrency", skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    #[serde(alias = "continueOnError")]
    pub continue_on_error: bool,

    /// Phases that must reach a terminal state first.
    #[serde(alias = "dependsOn", skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    /// Do not implicitly depend on the previous phase.
    pub independent: bool,

    #[serde(alias = "when", skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionSpec>,

    /// Overrides every step's own timeout.
    #[serde(alias = "timeoutSecs", skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Values bound to step parameters.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamValue>,
}

/// A scalar parameter value; numbers and booleans are passed as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    /// The value as it appears in the step's environment.
    pub fn as_env_value(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// Accept `steps: [install, 201]`; unquoted numbers become strings.
fn selector_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Text(String),
        Number(u64),
    }

    Ok(Vec::<Entry>::deserialize(deserializer)?
        .into_iter()
        .map(|entry| match entry {
            Entry::Text(s) => s,
            Entry::Number(n) => n.to_string(),
        })
        .collect())
}

/// A playbook bound to the registry, ready for dependency resolution.
#[derive(Debug, Clone)]
pub struct Playbook {
    pub name: String,
    pub description: Option<String>,
    pub profiles: Vec<String>,
    pub phases: Vec<Phase>,
    /// File the playbook was loaded from, when loaded from disk.
    pub source: Option<PathBuf>,
}

impl Playbook {
    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Total number of steps across phases.
    pub fn step_count(&self) -> usize {
        self.phases.iter().map(|p| p.steps.len()).sum()
    }
}

/// A named group of steps sharing one concurrency and failure policy.
#[derive(Debug, Clone)]
pub struct Phase {
    pub name: String,
    pub description: Option<String>,
    /// Resolved steps in declaration order, without duplicates.
    pub steps: Vec<Step>,
    pub max_concurrency: usize,
    pub continue_on_error: bool,
    pub requires: Vec<String>,
    pub independent: bool,
    /// Evaluated when the phase is about to run.
    pub condition: Option<Condition>,
    pub timeout_secs: Option<u64>,
    pub params: BTreeMap<String, String>,
}

impl Phase {
    /// Create a phase with default policy (sequential, fail-fast).
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps,
            max_concurrency: 1,
            continue_on_error: false,
            requires: Vec::new(),
            independent: false,
            condition: None,
            timeout_secs: None,
            params: BTreeMap::new(),
        }
    }

    /// Parameter values for one step: phase bindings first, then declared defaults.
    pub fn params_for(&self, step: &Step) -> BTreeMap<String, String> {
        step.params
            .iter()
            .filter_map(|spec| {
                self.params
                    .get(&spec.name)
                    .cloned()
                    .or_else(|| spec.default.clone())
                    .map(|value| (spec.name.clone(), value))
            })
            .collect()
    }

    /// Effective timeout for a step in this phase.
    pub fn timeout_for(&self, step: &Step) -> Option<u64> {
        self.timeout_secs.or(step.timeout_secs)
    }
}
