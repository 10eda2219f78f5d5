//! Configuration schema.
//!
//! ```yaml
//! settings:
//!   max_concurrency: 4
//!   default_profile: dev
//!   catalog: .orchestrate/steps.yml
//!   playbook_dir: .orchestrate/playbooks
//!
//! features:
//!   docker: false
//!
//! profiles:
//!   dev:
//!     features:
//!       hot_reload: true
//!   ci:
//!     extends: dev
//!     features:
//!       docker: true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::error::{OrchestrateError, Result};

/// Root configuration, after layering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrateConfig {
    pub settings: Settings,

    /// Feature defaults shared by every profile.
    pub features: BTreeMap<String, bool>,

    /// Named profiles.
    pub profiles: BTreeMap<String, ProfileConfig>,
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Global cap on concurrently running steps.
    #[serde(alias = "maxConcurrency")]
    pub max_concurrency: usize,

    /// Profile used when none is given on the command line.
    #[serde(alias = "defaultProfile")]
    pub default_profile: String,

    /// Step catalog, relative to the project root.
    pub catalog: PathBuf,

    /// Directory searched for bare playbook names.
    #[serde(alias = "playbookDir")]
    pub playbook_dir: PathBuf,

    /// Seconds between SIGTERM and kill when a step is terminated.
    #[serde(alias = "gracePeriodSecs")]
    pub grace_period_secs: u64,

    /// Write a JSON report for every run into this directory.
    #[serde(alias = "reportDir", skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,

    /// Lines of stdout/stderr kept per step result.
    #[serde(alias = "outputSummaryLines")]
    pub output_summary_lines: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            default_profile: "dev".to_string(),
            catalog: PathBuf::from(".orchestrate/steps.yml"),
            playbook_dir: PathBuf::from(".orchestrate/playbooks"),
            grace_period_secs: 5,
            report_dir: None,
            output_summary_lines: 20,
        }
    }
}

/// One named profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Parent profile whose features this one inherits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Feature values overriding the parent's.
    pub features: BTreeMap<String, bool>,
}

impl OrchestrateConfig {
    /// Resolve the feature set of a profile.
    ///
    /// Top-level features apply first, then each profile in the `extends`
    /// chain from the root ancestor down to `profile`.
    ///
    /// A profile not declared in `profiles` is only an error when some
    /// profiles are declared; a config without profiles accepts any name.
    pub fn resolve_features(&self, profile: &str) -> Result<BTreeMap<String, bool>> {
        let mut features = self.features.clone();

        if self.profiles.is_empty() {
            return Ok(features);
        }

        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(profile.to_string());

        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                chain.push(name);
                let path: Vec<&str> = chain.iter().map(String::as_str).collect();
                return Err(OrchestrateError::InvalidProfile {
                    profile: profile.to_string(),
                    message: format!("extends cycle: {}", path.join(" -> ")),
                });
            }

            let Some(config) = self.profiles.get(&name) else {
                let message = if name == profile {
                    format!(
                        "not defined (known profiles: {})",
                        self.profile_names().join(", ")
                    )
                } else {
                    format!("extends unknown profile '{}'", name)
                };
                return Err(OrchestrateError::InvalidProfile {
                    profile: profile.to_string(),
                    message,
                });
            };

            chain.push(name);
            current = config.extends.clone();
        }

        for name in chain.iter().rev() {
            if let Some(config) = self.profiles.get(name) {
                features.extend(config.features.iter().map(|(k, v)| (k.clone(), *v)));
            }
        }

        Ok(features)
    }

    /// Declared profile names, sorted.
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}
