//! Playbook loading and validation.
//!
//! Every structural problem surfaces here, before anything runs.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{OrchestrateError, Result};
use crate::registry::{Selector, Step, StepRegistry};

use super::condition::Condition;
use super::schema::{Phase, PhaseFile, Playbook, PlaybookFile};

/// Binds playbook files to a step registry.
pub struct PlaybookLoader<'a> {
    registry: &'a StepRegistry,
}

impl<'a> PlaybookLoader<'a> {
    pub fn new(registry: &'a StepRegistry) -> Self {
        Self { registry }
    }

    /// Load a playbook file for the given profile.
    pub fn load(&self, path: &Path, profile: &str) -> Result<Playbook> {
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let content = fs::read_to_string(path).map_err(|e| OrchestrateError::PlaybookParse {
            playbook: fallback.clone(),
            message: format!("cannot read {}: {}", path.display(), e),
        })?;

        let mut playbook = self.load_str(&content, &fallback, profile)?;
        playbook.source = Some(path.to_path_buf());
        Ok(playbook)
    }

    /// Load playbook YAML (or JSON) text. `fallback_name` is used when the
    /// document has no `name`.
    pub fn load_str(&self, content: &str, fallback_name: &str, profile: &str) -> Result<Playbook> {
        let file: PlaybookFile =
            serde_yaml::from_str(content).map_err(|e| OrchestrateError::PlaybookParse {
                playbook: fallback_name.to_string(),
                message: e.to_string(),
            })?;
        self.bind(file, fallback_name, profile)
    }

    /// Validate a parsed playbook and resolve its selectors.
    pub fn bind(&self, file: PlaybookFile, fallback_name: &str, profile: &str) -> Result<Playbook> {
        let name = file
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        let invalid = |message: String| OrchestrateError::PlaybookParse {
            playbook: name.clone(),
            message,
        };

        if !file.profiles.is_empty() && !file.profiles.iter().any(|p| p == profile) {
            return Err(invalid(format!(
                "profile '{}' is not applicable (allowed: {})",
                profile,
                file.profiles.join(", ")
            )));
        }

        if file.phases.is_empty() {
            return Err(invalid("playbook has no phases".to_string()));
        }

        let mut seen = HashSet::new();
        let mut phases = Vec::with_capacity(file.phases.len());
        for phase in file.phases {
            if phase.name.trim().is_empty() {
                return Err(invalid("phase with an empty name".to_string()));
            }
            if !seen.insert(phase.name.clone()) {
                return Err(invalid(format!("duplicate phase name '{}'", phase.name)));
            }
            phases.push(self.bind_phase(phase, &invalid)?);
        }

        debug!(
            "Loaded playbook '{}' with {} phase(s)",
            name,
            phases.len()
        );

        Ok(Playbook {
            name,
            description: file.description,
            profiles: file.profiles,
            phases,
            source: None,
        })
    }

    fn bind_phase(
        &self,
        file: PhaseFile,
        invalid: &dyn Fn(String) -> OrchestrateError,
    ) -> Result<Phase> {
        let phase_name = file.name.clone();

        if file.max_concurrency == Some(0) {
            return Err(invalid(format!(
                "phase '{}' has max_concurrency 0",
                phase_name
            )));
        }

        let condition = file
            .condition
            .as_ref()
            .map(Condition::from_spec)
            .transpose()
            .map_err(|e| invalid(format!("phase '{}': {}", phase_name, e)))?;

        let steps = self.resolve_steps(&phase_name, &file.steps, invalid)?;

        let params = file
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.as_env_value()))
            .collect();

        let phase = Phase {
            name: file.name,
            description: file.description,
            steps,
            max_concurrency: file.max_concurrency.unwrap_or(1),
            continue_on_error: file.continue_on_error,
            requires: file.requires,
            independent: file.independent,
            condition,
            timeout_secs: file.timeout_secs,
            params,
        };

        check_params(&phase, invalid)?;
        Ok(phase)
    }

    fn resolve_steps(
        &self,
        phase: &str,
        selectors: &[String],
        invalid: &dyn Fn(String) -> OrchestrateError,
    ) -> Result<Vec<Step>> {
        let mut seen = HashSet::new();
        let mut steps = Vec::new();

        for raw in selectors {
            let selector: Selector = raw
                .parse()
                .map_err(|e| invalid(format!("phase '{}': {}", phase, e)))?;

            let matched = self.registry.resolve(&selector).map_err(|e| match e {
                OrchestrateError::UnknownStep { selector, .. } => OrchestrateError::UnknownStep {
                    selector,
                    phase: Some(phase.to_string()),
                },
                other => other,
            })?;

            for step in matched {
                if seen.insert(step.id.clone()) {
                    steps.push(step.clone());
                } else {
                    debug!("Step '{}' already in phase '{}'", step.id, phase);
                }
            }
        }

        Ok(steps)
    }
}

/// Every required parameter must be bound by the phase or have a default.
fn check_params(phase: &Phase, invalid: &dyn Fn(String) -> OrchestrateError) -> Result<()> {
    for step in &phase.steps {
        for spec in step.params.iter().filter(|p| p.required) {
            if !phase.params.contains_key(&spec.name) && spec.default.is_none() {
                return Err(invalid(format!(
                    "step '{}' in phase '{}' requires parameter '{}'",
                    step.id, phase.name, spec.name
                )));
            }
        }
    }

    for name in phase.params.keys() {
        if !phase.steps.iter().any(|s| s.param(name).is_some()) {
            warn!(
                "Parameter '{}' in phase '{}' is not declared by any of its steps",
                name, phase.name
            );
        }
    }

    Ok(())
}

/// Resolve a playbook argument to a file.
///
/// Anything that looks like a path is used as given (relative to the
/// project root). A bare name becomes `<playbook_dir>/<name>.yml`, falling
/// back to `.yaml` and `.json`.
pub fn resolve_playbook_path(project_root: &Path, playbook_dir: &Path, arg: &str) -> PathBuf {
    let given = Path::new(arg);
    let looks_like_path = given.extension().is_some() || given.components().count() > 1;

    if looks_like_path {
        return if given.is_absolute() {
            given.to_path_buf()
        } else {
            project_root.join(given)
        };
    }

    let dir = project_root.join(playbook_dir);
    ["yml", "yaml", "json"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", arg, ext)))
        .find(|p| p.exists())
        .unwrap_or_else(|| dir.join(format!("{}.yml", arg)))
}
