//! Configuration file discovery and loading.

use crate::config::merger::merge_configs;
use crate::config::schema::OrchestrateConfig;
use crate::error::{OrchestrateError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-project configuration directory.
pub const CONFIG_DIR: &str = ".orchestrate";

/// Configuration files in merge order (later overrides earlier).
///
/// 1. User global config (`~/.orchestrate/config.yml`)
/// 2. Project config (`.orchestrate/config.yml`)
/// 3. Local overrides (`.orchestrate/config.local.yml`)
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub user_global: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub project_local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover existing config files for the given project root.
    pub fn discover(project_root: &Path) -> Self {
        Self {
            user_global: dirs::home_dir()
                .map(|home| home.join(CONFIG_DIR).join("config.yml"))
                .filter(|p| p.exists()),
            project: existing(project_config_path(project_root)),
            project_local: existing(local_config_path(project_root)),
        }
    }

    /// All existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        [&self.user_global, &self.project, &self.project_local]
            .into_iter()
            .flatten()
            .collect()
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.exists().then_some(path)
}

/// `.orchestrate/config.yml` under `project_root`.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join("config.yml")
}

/// `.orchestrate/config.local.yml` under `project_root`.
///
/// Accepted feature enables are persisted here.
pub fn local_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join("config.local.yml")
}

/// Find the project root by walking up from `start`.
///
/// A directory containing `.orchestrate` wins; `.git` is the fallback.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(CONFIG_DIR).is_dir() {
            return Some(current);
        }

        if current.join(".git").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load a config file as a raw YAML value, for merging.
///
/// # Errors
///
/// `ConfigNotFound` if the file doesn't exist, `ConfigParse` if the YAML
/// is invalid.
pub fn load_config_value(path: &Path) -> Result<serde_yaml::Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OrchestrateError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            OrchestrateError::Io(e)
        }
    })?;

    serde_yaml::from_str(&content).map_err(|e| OrchestrateError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse a merged YAML value into the typed config.
pub fn parse_config_value(value: serde_yaml::Value, path: &Path) -> Result<OrchestrateConfig> {
    if value.is_null() {
        return Ok(OrchestrateConfig::default());
    }
    serde_yaml::from_value(value).map_err(|e| OrchestrateError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a single config file.
pub fn load_config_file(path: &Path) -> Result<OrchestrateConfig> {
    let value = load_config_value(path)?;
    parse_config_value(value, path)
}

/// Load and merge every config layer for a project.
///
/// Unlike a missing `--config` file, a project without any config is fine:
/// it runs with defaults.
pub fn load_merged_config(project_root: &Path) -> Result<OrchestrateConfig> {
    let paths = ConfigPaths::discover(project_root);

    let mut layers = Vec::new();
    for path in paths.all_existing() {
        layers.push(load_config_value(path)?);
    }

    let merged = merge_configs(&layers);
    parse_config_value(merged, &project_config_path(project_root))
}

/// Load config with optional path override.
///
/// With an override, only that file is loaded and nothing is merged.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<OrchestrateConfig> {
    match config_override {
        Some(path) => load_config_file(path),
        None => load_merged_config(project_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        temp
    }

    #[test]
    fn discover_finds_project_and_local() {
        let temp = project(&[("config.yml", ""), ("config.local.yml", "")]);
        let paths = ConfigPaths::discover(temp.path());
        assert!(paths.project.is_some());
        assert!(paths.project_local.is_some());
    }

    #[test]
    fn discover_returns_none_for_missing_configs() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::discover(temp.path());
        assert!(paths.project.is_none());
        assert!(paths.project_local.is_none());
    }

    #[test]
    fn find_project_root_prefers_config_dir() {
        let temp = project(&[]);
        let subdir = temp.path().join("a").join("b");
        fs::create_dir_all(&subdir).unwrap();
        assert_eq!(find_project_root(&subdir), Some(temp.path().to_path_buf()));
    }

    #[test]
    fn find_project_root_falls_back_to_git() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        let subdir = temp.path().join("src");
        fs::create_dir_all(&subdir).unwrap();
        assert_eq!(find_project_root(&subdir), Some(temp.path().to_path_buf()));
    }

    #[test]
    fn missing_project_config_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_merged_config(temp.path()).unwrap();
        assert_eq!(config.settings.max_concurrency, 4);
    }

    #[test]
    fn local_overrides_project() {
        let temp = project(&[
            (
                "config.yml",
                "settings:\n  max_concurrency: 8\nfeatures:\n  docker: false\n",
            ),
            ("config.local.yml", "features:\n  docker: true\n"),
        ]);
        let config = load_merged_config(temp.path()).unwrap();
        assert_eq!(config.settings.max_concurrency, 8);
        assert_eq!(config.features.get("docker"), Some(&true));
    }

    #[test]
    fn override_path_loads_only_that_file() {
        let temp = project(&[("config.yml", "settings:\n  max_concurrency: 8\n")]);
        let other = temp.path().join("other.yml");
        fs::write(&other, "settings:\n  default_profile: ci\n").unwrap();

        let config = load_config(temp.path(), Some(&other)).unwrap();
        assert_eq!(config.settings.default_profile, "ci");
        assert_eq!(config.settings.max_concurrency, 4);
    }

    #[test]
    fn missing_override_is_config_not_found() {
        let temp = TempDir::new().unwrap();
        let err = load_config(temp.path(), Some(&temp.path().join("nope.yml"))).unwrap_err();
        assert!(matches!(err, OrchestrateError::ConfigNotFound { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn invalid_yaml_is_parse_error() {
        let temp = project(&[("config.yml", "settings: [unclosed")]);
        let err = load_merged_config(temp.path()).unwrap_err();
        assert!(matches!(err, OrchestrateError::ConfigParse { .. }));
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let temp = project(&[("config.yml", "settings:\n  max_concurrency: lots\n")]);
        let err = load_merged_config(temp.path()).unwrap_err();
        assert!(matches!(err, OrchestrateError::ConfigParse { .. }));
    }
}
