//! Phase conditions.
//!
//! A condition is parsed when the playbook loads but evaluated only when
//! its phase is about to run, so `request` conditions prompt at the point
//! where the answer matters.
//!
//! String shorthand:
//!
//! ```yaml
//! condition: profile:ci
//! condition: feature:docker
//! condition: request:docker     # ask to enable when disabled
//! condition: "!feature:docker"
//! ```
//!
//! Structured form:
//!
//! ```yaml
//! condition:
//!   any:
//!     - profile: [ci, full]
//!     - feature: docker
//!       request: true
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigContext;
use crate::error::Result;

/// Condition as written in a playbook file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionSpec {
    Shorthand(String),
    Structured(StructuredCondition),
}

/// Structured condition. Several keys in one mapping must all hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StructuredCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<OneOrMany>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,

    /// With `feature`: ask to enable the feature when it is disabled.
    pub request: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<ConditionSpec>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<ConditionSpec>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<ConditionSpec>>,
}

/// A single value or a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(v) => v,
        }
    }
}

/// A parsed, unevaluated condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Active profile is one of these.
    Profile(Vec<String>),
    /// Feature is enabled; with `request`, ask to enable it when it isn't.
    Feature { name: String, request: bool },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Convert the file representation, rejecting malformed conditions.
    pub fn from_spec(spec: &ConditionSpec) -> std::result::Result<Self, String> {
        match spec {
            ConditionSpec::Shorthand(text) => Self::parse_shorthand(text),
            ConditionSpec::Structured(structured) => Self::from_structured(structured),
        }
    }

    /// Parse `profile:x`, `feature:x`, `request:x`, optionally prefixed by `!`.
    pub fn parse_shorthand(text: &str) -> std::result::Result<Self, String> {
        let text = text.trim();
        if let Some(inner) = text.strip_prefix('!') {
            return Ok(Self::Not(Box::new(Self::parse_shorthand(inner)?)));
        }

        let (kind, value) = text
            .split_once(':')
            .ok_or_else(|| format!("invalid condition '{}': expected kind:value", text))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("invalid condition '{}': empty value", text));
        }

        match kind.trim() {
            "profile" => Ok(Self::Profile(
                value.split(',').map(|p| p.trim().to_string()).collect(),
            )),
            "feature" => Ok(Self::Feature {
                name: value.to_string(),
                request: false,
            }),
            "request" => Ok(Self::Feature {
                name: value.to_string(),
                request: true,
            }),
            other => Err(format!(
                "invalid condition '{}': unknown kind '{}' (expected profile, feature or request)",
                text, other
            )),
        }
    }

    fn from_structured(spec: &StructuredCondition) -> std::result::Result<Self, String> {
        let mut parts = Vec::new();

        if let Some(profile) = &spec.profile {
            let profiles = profile.clone().into_vec();
            if profiles.is_empty() {
                return Err("condition 'profile' list is empty".to_string());
            }
            parts.push(Self::Profile(profiles));
        }

        match (&spec.feature, spec.request) {
            (Some(name), request) => parts.push(Self::Feature {
                name: name.clone(),
                request,
            }),
            (None, true) => return Err("condition 'request' requires 'feature'".to_string()),
            (None, false) => {}
        }

        if let Some(all) = &spec.all {
            parts.push(Self::All(Self::from_list(all, "all")?));
        }
        if let Some(any) = &spec.any {
            parts.push(Self::Any(Self::from_list(any, "any")?));
        }
        if let Some(not) = &spec.not {
            parts.push(Self::Not(Box::new(Self::from_spec(not)?)));
        }

        match parts.len() {
            0 => Err("empty condition".to_string()),
            1 => Ok(parts.remove(0)),
            _ => Ok(Self::All(parts)),
        }
    }

    fn from_list(specs: &[ConditionSpec], key: &str) -> std::result::Result<Vec<Self>, String> {
        if specs.is_empty() {
            return Err(format!("condition '{}' list is empty", key));
        }
        specs.iter().map(Self::from_spec).collect()
    }

    /// Evaluate against the configuration context.
    ///
    /// `all` and `any` short-circuit, so a `request` is only prompted
    /// when its answer decides the outcome.
    pub fn evaluate(&self, ctx: &dyn ConfigContext) -> Result<bool> {
        match self {
            Self::Profile(profiles) => Ok(profiles.iter().any(|p| p == ctx.profile())),
            Self::Feature {
                name,
                request: false,
            } => Ok(ctx.is_feature_enabled(name)),
            Self::Feature {
                name,
                request: true,
            } => ctx.request_feature_enable(name),
            Self::All(conditions) => {
                for condition in conditions {
                    if !condition.evaluate(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any(conditions) => {
                for condition in conditions {
                    if condition.evaluate(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(inner) => Ok(!inner.evaluate(ctx)?),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile(profiles) => write!(f, "profile:{}", profiles.join(",")),
            Self::Feature {
                name,
                request: false,
            } => write!(f, "feature:{}", name),
            Self::Feature {
                name,
                request: true,
            } => write!(f, "request:{}", name),
            Self::All(items) => write_joined(f, items, "and"),
            Self::Any(items) => write_joined(f, items, "or"),
            Self::Not(inner) => write!(f, "!{}", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Condition], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", sep)?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, ")")
}
