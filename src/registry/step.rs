//! Step definitions as declared in the step catalog.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// One executable unit of work.
///
/// Steps are registered once from the catalog and never change during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Stable identifier (e.g. `0201` or `install-node`).
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Category used by `category:` selectors.
    #[serde(default = "default_category")]
    pub category: String,

    /// Free-form tags used by `tag:` selectors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Numeric ordinal for range selectors. Defaults to the id's leading digits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// What to execute.
    pub command: StepCommand,

    /// Declared parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,

    /// Whether the executable honours a dry-run indicator.
    #[serde(default, skip_serializing_if = "is_false")]
    pub supports_dry_run: bool,

    /// Step mutates shared state and must never overlap other steps in its phase.
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive: bool,

    /// Kill the step after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Extra attempts after a failed run. Zero means no retry.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retries: u32,

    /// Confirmation question asked before the step runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<String>,

    /// Extra environment variables for the step process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Working directory, relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

fn default_category() -> String {
    "general".to_string()
}

fn is_false(v: &bool) -> bool {
    !v
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

/// Accept both `id: install` and `id: 201`.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Str(String),
        Num(u64),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Str(s) => s,
        Repr::Num(n) => n.to_string(),
    })
}

impl Step {
    /// Create a step running a shell command, with everything else defaulted.
    pub fn shell(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            category: default_category(),
            tags: Vec::new(),
            number: None,
            description: None,
            command: StepCommand::Shell(command.into()),
            params: Vec::new(),
            supports_dry_run: false,
            exclusive: false,
            timeout_secs: None,
            retries: 0,
            confirm: None,
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Set the category.
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Mark as exclusive.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Name shown in output, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Numeric ordinal used by range selectors.
    pub fn ordinal(&self) -> Option<u32> {
        if self.number.is_some() {
            return self.number;
        }
        let digits: String = self.id.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }

    /// Look up a declared parameter.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// How a step is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepCommand {
    /// A command line run through the platform shell.
    Shell(String),
    /// A program and its arguments, executed directly.
    Exec(Vec<String>),
}

impl StepCommand {
    /// Whether there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Shell(cmd) => cmd.trim().is_empty(),
            Self::Exec(argv) => argv.first().map_or(true, |p| p.trim().is_empty()),
        }
    }
}

impl fmt::Display for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(cmd) => write!(f, "{}", cmd),
            Self::Exec(argv) => write!(f, "{}", argv.join(" ")),
        }
    }
}

/// A parameter a step accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name; passed as `ORCHESTRATE_PARAM_<NAME>`.
    pub name: String,

    /// Whether a value must be bound by the playbook.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    /// Value used when the playbook binds none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
