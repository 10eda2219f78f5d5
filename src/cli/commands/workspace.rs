//! Project loading shared by the commands that need a catalog.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{load_config, OrchestrateConfig};
use crate::error::Result;
use crate::playbook::{resolve_playbook_path, Playbook, PlaybookLoader};
use crate::registry::{load_catalog, StepRegistry};

/// Where to look for configuration and the step catalog.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceOptions {
    pub root: PathBuf,
    /// `--config`: load only this file.
    pub config: Option<PathBuf>,
    /// `--catalog`: overrides `settings.catalog`.
    pub catalog: Option<PathBuf>,
}

/// Loaded configuration plus step registry.
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: OrchestrateConfig,
    pub registry: StepRegistry,
}

impl Workspace {
    pub fn load(options: &WorkspaceOptions) -> Result<Self> {
        let config = load_config(&options.root, options.config.as_deref())?;

        let catalog = match &options.catalog {
            Some(path) => path.clone(),
            None => options.root.join(&config.settings.catalog),
        };
        let registry = load_catalog(&catalog)?;
        debug!(
            "Loaded {} steps from {}",
            registry.len(),
            catalog.display()
        );

        Ok(Self {
            root: options.root.clone(),
            config,
            registry,
        })
    }

    /// The `--profile` argument, else the configured default.
    pub fn profile(&self, arg: Option<&str>) -> String {
        arg.map(str::to_string)
            .unwrap_or_else(|| self.config.settings.default_profile.clone())
    }

    pub fn playbook_path(&self, arg: &str) -> PathBuf {
        resolve_playbook_path(&self.root, &self.config.settings.playbook_dir, arg)
    }

    /// Load and bind a playbook against the registry.
    pub fn load_playbook(&self, arg: &str, profile: &str) -> Result<Playbook> {
        let path = self.playbook_path(arg);
        debug!("Loading playbook {}", path.display());
        PlaybookLoader::new(&self.registry).load(&path, profile)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestrateError;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".orchestrate/playbooks");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            temp.path().join(".orchestrate/config.yml"),
            "settings:\n  default_profile: ci\n",
        )
        .unwrap();
        fs::write(
            temp.path().join(".orchestrate/steps.yml"),
            "steps:\n  - id: hello\n    command: echo hello\n",
        )
        .unwrap();
        fs::write(
            dir.join("greet.yml"),
            "phases:\n  - name: main\n    steps: [hello]\n",
        )
        .unwrap();
        temp
    }

    #[test]
    fn loads_config_catalog_and_playbook() {
        let temp = project();
        let workspace = Workspace::load(&WorkspaceOptions {
            root: temp.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(workspace.registry.len(), 1);
        assert_eq!(workspace.profile(None), "ci");
        assert_eq!(workspace.profile(Some("dev")), "dev");

        let playbook = workspace.load_playbook("greet", "ci").unwrap();
        assert_eq!(playbook.name, "greet");
        assert_eq!(playbook.phases[0].steps[0].id, "hello");
    }

    #[test]
    fn missing_catalog_is_a_load_error() {
        let temp = TempDir::new().unwrap();
        let err = Workspace::load(&WorkspaceOptions {
            root: temp.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap_err();

        assert!(matches!(err, OrchestrateError::CatalogError { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn catalog_override_is_used() {
        let temp = project();
        let other = temp.path().join("other.yml");
        fs::write(&other, "steps:\n  - id: a\n    command: 'true'\n  - id: b\n    command: 'true'\n")
            .unwrap();

        let workspace = Workspace::load(&WorkspaceOptions {
            root: temp.path().to_path_buf(),
            config: None,
            catalog: Some(other),
        })
        .unwrap();
        assert_eq!(workspace.registry.len(), 2);
    }
}
