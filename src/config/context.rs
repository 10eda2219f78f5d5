//! Runtime configuration context.
//!
//! Answers feature questions for the active profile while a run is in
//! progress, and may ask the user to enable a feature through the
//! environment adapter.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::config::merger::set_path;
use crate::config::schema::OrchestrateConfig;
use crate::environment::EnvironmentAdapter;
use crate::error::{OrchestrateError, Result};

/// Prefix of environment variables overriding feature flags.
pub const FEATURE_ENV_PREFIX: &str = "ORCHESTRATE_FEATURE_";

/// Query/mutate contract the engine needs from configuration.
pub trait ConfigContext: Send + Sync {
    /// Active profile name.
    fn profile(&self) -> &str;

    /// Snapshot of every known feature value.
    fn features(&self) -> BTreeMap<String, bool>;

    /// Whether `name` is enabled. Unknown features are disabled.
    fn is_feature_enabled(&self, name: &str) -> bool;

    /// Enable `name` after asking the user.
    ///
    /// Returns `Ok(true)` without prompting when already enabled, and
    /// `Ok(false)` when declined or when nobody can be asked.
    fn request_feature_enable(&self, name: &str) -> Result<bool>;
}

/// Profile-backed [`ConfigContext`].
pub struct ProfileContext {
    profile: String,
    features: RwLock<BTreeMap<String, bool>>,
    adapter: Arc<dyn EnvironmentAdapter>,
    persist_path: Option<PathBuf>,
}

impl std::fmt::Debug for ProfileContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileContext")
            .field("profile", &self.profile)
            .field("features", &self.features)
            .field("persist_path", &self.persist_path)
            .finish_non_exhaustive()
    }
}

impl ProfileContext {
    /// Resolve `profile` from `config`, applying `ORCHESTRATE_FEATURE_*`
    /// overrides from the process environment.
    pub fn new(
        config: &OrchestrateConfig,
        profile: &str,
        adapter: Arc<dyn EnvironmentAdapter>,
    ) -> Result<Self> {
        Self::with_env(config, profile, adapter, std::env::vars())
    }

    /// Like [`new`](Self::new) with explicit environment variables (for testing).
    pub fn with_env<I>(
        config: &OrchestrateConfig,
        profile: &str,
        adapter: Arc<dyn EnvironmentAdapter>,
        env: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut features = config.resolve_features(profile)?;
        apply_env_overrides(&mut features, env);
        debug!("Profile '{}' features: {:?}", profile, features);

        Ok(Self {
            profile: profile.to_string(),
            features: RwLock::new(features),
            adapter,
            persist_path: None,
        })
    }

    /// Build directly from a feature map.
    pub fn from_features(
        profile: &str,
        features: BTreeMap<String, bool>,
        adapter: Arc<dyn EnvironmentAdapter>,
    ) -> Self {
        Self {
            profile: profile.to_string(),
            features: RwLock::new(features),
            adapter,
            persist_path: None,
        }
    }

    /// Persist accepted enables into this YAML file
    /// (normally `.orchestrate/config.local.yml`).
    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist_path = Some(path.into());
        self
    }

    fn persist(&self, path: &Path, name: &str) -> Result<()> {
        let mut doc = match fs::read_to_string(path) {
            Ok(content) => {
                serde_yaml::from_str(&content).map_err(|e| OrchestrateError::ConfigParse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => serde_yaml::Value::Null,
            Err(e) => return Err(e.into()),
        };

        set_path(
            &mut doc,
            &["profiles", self.profile.as_str(), "features", name],
            serde_yaml::Value::Bool(true),
        );

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(&doc).map_err(|e| anyhow::anyhow!(e))?;
        fs::write(path, content)?;
        debug!("Persisted feature '{}' to {}", name, path.display());
        Ok(())
    }
}

impl ConfigContext for ProfileContext {
    fn profile(&self) -> &str {
        &self.profile
    }

    fn features(&self) -> BTreeMap<String, bool> {
        self.features
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_feature_enabled(&self, name: &str) -> bool {
        self.features
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(false)
    }

    fn request_feature_enable(&self, name: &str) -> Result<bool> {
        if self.is_feature_enabled(name) {
            return Ok(true);
        }

        if !self.adapter.is_interactive() {
            info!(
                "Feature '{}' is disabled and cannot be requested non-interactively",
                name
            );
            return Ok(false);
        }

        let prompt = format!(
            "Feature '{}' is disabled for profile '{}'. Enable it?",
            name, self.profile
        );
        if !self.adapter.confirm(&prompt)? {
            return Ok(false);
        }

        self.features
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), true);
        info!("Enabled feature '{}' for profile '{}'", name, self.profile);

        if let Some(path) = &self.persist_path {
            if let Err(e) = self.persist(path, name) {
                warn!("Could not persist feature '{}': {}", name, e);
            }
        }

        Ok(true)
    }
}

/// Apply `ORCHESTRATE_FEATURE_<NAME>=1|0` overrides.
///
/// Names match case-insensitively with `-` treated as `_`.
pub fn apply_env_overrides<I>(features: &mut BTreeMap<String, bool>, env: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in env {
        let Some(suffix) = key.strip_prefix(FEATURE_ENV_PREFIX) else {
            continue;
        };
        let Some(enabled) = parse_flag(&value) else {
            warn!("Ignoring {}={}: expected 1 or 0", key, value);
            continue;
        };

        let existing = features
            .keys()
            .find(|name| env_key(name) == suffix)
            .cloned();
        let name = existing.unwrap_or_else(|| suffix.to_ascii_lowercase());
        features.insert(name, enabled);
    }
}

fn env_key(feature: &str) -> String {
    feature
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{MockAdapter, NonInteractiveAdapter};
    use tempfile::TempDir;

    fn config() -> OrchestrateConfig {
        serde_yaml::from_str(
            r#"
features:
  docker: false
  hot-reload: true
profiles:
  dev: {}
  ci:
    features:
      docker: true
"#,
        )
        .unwrap()
    }

    fn env(vars: &[(&str, &str)]) -> Vec<(String, String)> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn profile_features_are_resolved() {
        let ctx = ProfileContext::with_env(
            &config(),
            "ci",
            Arc::new(NonInteractiveAdapter::new()),
            env(&[]),
        )
        .unwrap();
        assert_eq!(ctx.profile(), "ci");
        assert!(ctx.is_feature_enabled("docker"));
        assert!(!ctx.is_feature_enabled("unknown"));
    }

    #[test]
    fn env_override_wins() {
        let ctx = ProfileContext::with_env(
            &config(),
            "dev",
            Arc::new(NonInteractiveAdapter::new()),
            env(&[
                ("ORCHESTRATE_FEATURE_DOCKER", "1"),
                ("ORCHESTRATE_FEATURE_HOT_RELOAD", "0"),
            ]),
        )
        .unwrap();
        assert!(ctx.is_feature_enabled("docker"));
        assert!(!ctx.is_feature_enabled("hot-reload"));
    }

    #[test]
    fn invalid_env_value_is_ignored() {
        let mut features = BTreeMap::new();
        apply_env_overrides(
            &mut features,
            env(&[("ORCHESTRATE_FEATURE_DOCKER", "maybe")]),
        );
        assert!(features.is_empty());
    }

    #[test]
    fn unknown_profile_fails() {
        let result = ProfileContext::with_env(
            &config(),
            "prod",
            Arc::new(NonInteractiveAdapter::new()),
            env(&[]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn request_on_enabled_feature_does_not_prompt() {
        let adapter = Arc::new(MockAdapter::interactive());
        let ctx = ProfileContext::from_features(
            "dev",
            BTreeMap::from([("docker".to_string(), true)]),
            adapter.clone(),
        );
        assert!(ctx.request_feature_enable("docker").unwrap());
        assert!(adapter.prompts().is_empty());
    }

    #[test]
    fn non_interactive_request_is_declined_without_prompt() {
        let adapter = Arc::new(MockAdapter::non_interactive());
        let ctx = ProfileContext::from_features("dev", BTreeMap::new(), adapter.clone());
        assert!(!ctx.request_feature_enable("docker").unwrap());
        assert!(adapter.prompts().is_empty());
        assert!(!ctx.is_feature_enabled("docker"));
    }

    #[test]
    fn accepted_request_enables_and_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".orchestrate").join("config.local.yml");

        let adapter = Arc::new(MockAdapter::interactive());
        adapter.set_default_response(true);
        let ctx = ProfileContext::from_features("dev", BTreeMap::new(), adapter.clone())
            .with_persist_path(&path);

        assert!(ctx.request_feature_enable("docker").unwrap());
        assert!(ctx.is_feature_enabled("docker"));
        assert_eq!(adapter.prompts().len(), 1);

        let saved: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["profiles"]["dev"]["features"]["docker"], true);
    }

    #[test]
    fn declined_request_leaves_feature_disabled() {
        let adapter = Arc::new(MockAdapter::interactive());
        let ctx = ProfileContext::from_features("dev", BTreeMap::new(), adapter);
        assert!(!ctx.request_feature_enable("docker").unwrap());
        assert!(!ctx.is_feature_enabled("docker"));
    }
}
