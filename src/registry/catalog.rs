//! The step registry and the catalog file it is built from.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OrchestrateError, Result};

use super::selector::{glob_to_regex, Selector, SelectorKind};
use super::step::Step;

/// On-disk catalog of available steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepCatalog {
    /// Catalog format version.
    #[serde(default = "default_catalog_version")]
    pub version: u32,

    /// Steps in declaration order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_catalog_version() -> u32 {
    1
}

/// Read-only index of every step known to the engine.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: Vec<Step>,
    index: HashMap<String, usize>,
}

impl StepRegistry {
    /// Build a registry, validating ids are unique and commands non-empty.
    ///
    /// `origin` names where the steps came from, for error messages.
    pub fn from_steps(steps: Vec<Step>, origin: &str) -> Result<Self> {
        let mut index = HashMap::with_capacity(steps.len());

        for (i, step) in steps.iter().enumerate() {
            let invalid = |message: String| OrchestrateError::CatalogError {
                origin: origin.to_string(),
                message,
            };

            if step.id.trim().is_empty() {
                return Err(invalid(format!("step #{} has an empty id", i + 1)));
            }
            if step.command.is_empty() {
                return Err(invalid(format!("step '{}' has an empty command", step.id)));
            }
            if index.insert(step.id.clone(), i).is_some() {
                return Err(invalid(format!("duplicate step id '{}'", step.id)));
            }
        }

        Ok(Self { steps, index })
    }

    /// Build a registry from steps defined in code.
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        Self::from_steps(steps, "inline catalog")
    }

    /// Look up a step by id.
    pub fn get(&self, id: &str) -> Option<&Step> {
        self.index.get(id).map(|&i| &self.steps[i])
    }

    /// All steps in declaration order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Distinct categories in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for step in &self.steps {
            if !seen.contains(&step.category.as_str()) {
                seen.push(&step.category);
            }
        }
        seen
    }

    /// Resolve a selector to the steps it names.
    ///
    /// Fails with [`OrchestrateError::UnknownStep`] when nothing matches and
    /// the selector is not optional.
    pub fn resolve(&self, selector: &Selector) -> Result<Vec<&Step>> {
        let matched: Vec<&Step> = match selector.kind() {
            SelectorKind::Id(id) => self.get(id).into_iter().collect(),
            SelectorKind::Category(category) => self
                .steps
                .iter()
                .filter(|s| &s.category == category)
                .collect(),
            SelectorKind::Tag(tag) => self
                .steps
                .iter()
                .filter(|s| s.tags.iter().any(|t| t == tag))
                .collect(),
            SelectorKind::Range { start, end } => {
                let mut in_range: Vec<(u32, &Step)> = self
                    .steps
                    .iter()
                    .filter_map(|s| s.ordinal().map(|n| (n, s)))
                    .filter(|(n, _)| (*start..=*end).contains(n))
                    .collect();
                // Stable sort keeps declaration order for equal ordinals.
                in_range.sort_by_key(|(n, _)| *n);
                in_range.into_iter().map(|(_, s)| s).collect()
            }
            SelectorKind::Pattern(glob) => match glob_to_regex(glob) {
                Some(re) => self.steps.iter().filter(|s| re.is_match(&s.id)).collect(),
                None => Vec::new(),
            },
        };

        if matched.is_empty() && !selector.is_optional() {
            return Err(OrchestrateError::UnknownStep {
                selector: selector.raw().to_string(),
                phase: None,
            });
        }

        tracing::debug!(
            "Selector '{}' matched {} step(s)",
            selector.raw(),
            matched.len()
        );

        Ok(matched)
    }
}

/// Parse catalog YAML into a registry.
pub fn parse_catalog(content: &str, origin: &str) -> Result<StepRegistry> {
    let catalog: StepCatalog =
        serde_yaml::from_str(content).map_err(|e| OrchestrateError::CatalogError {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
    StepRegistry::from_steps(catalog.steps, origin)
}

/// Load a catalog file into a registry.
pub fn load_catalog(path: &Path) -> Result<StepRegistry> {
    let origin = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| OrchestrateError::CatalogError {
        origin: origin.clone(),
        message: e.to_string(),
    })?;
    parse_catalog(&content, &origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CATALOG: &str = r#"
version: 1
steps:
  - id: "0101"
    name: Install toolchain
    category: install
    command: ./install.sh
  - id: "0205"
    category: test
    tags: [unit]
    command: cargo test
  - id: "0201"
    category: test
    tags: [unit, fast]
    command: cargo test --lib
  - id: git-sync
    category: git
    exclusive: true
    command: git pull --rebase
  - id: git-push
    category: git
    exclusive: true
    command: git push
"#;

    fn registry() -> StepRegistry {
        parse_catalog(CATALOG, "test").unwrap()
    }

    fn ids(steps: Vec<&Step>) -> Vec<&str> {
        steps.into_iter().map(|s| s.id.as_str()).collect()
    }

    fn sel(s: &str) -> Selector {
        s.parse().unwrap()
    }

    #[test]
    fn resolves_explicit_id() {
        let reg = registry();
        assert_eq!(ids(reg.resolve(&sel("git-sync")).unwrap()), vec!["git-sync"]);
    }

    #[test]
    fn unknown_id_fails() {
        let reg = registry();
        let err = reg.resolve(&sel("nope")).unwrap_err();
        assert!(matches!(err, OrchestrateError::UnknownStep { .. }));
    }

    #[test]
    fn optional_selector_may_match_nothing() {
        let reg = registry();
        assert!(reg.resolve(&sel("category:docker?")).unwrap().is_empty());
    }

    #[test]
    fn category_keeps_declaration_order() {
        let reg = registry();
        assert_eq!(
            ids(reg.resolve(&sel("category:test")).unwrap()),
            vec!["0205", "0201"]
        );
    }

    #[test]
    fn range_sorts_numerically() {
        let reg = registry();
        assert_eq!(
            ids(reg.resolve(&sel("0200-0299")).unwrap()),
            vec!["0201", "0205"]
        );
    }

    #[test]
    fn range_skips_non_numeric_ids() {
        let reg = registry();
        assert_eq!(
            ids(reg.resolve(&sel("range:0..9999")).unwrap()),
            vec!["0101", "0201", "0205"]
        );
    }

    #[test]
    fn tag_selector() {
        let reg = registry();
        assert_eq!(ids(reg.resolve(&sel("tag:fast")).unwrap()), vec!["0201"]);
    }

    #[test]
    fn glob_selector() {
        let reg = registry();
        assert_eq!(
            ids(reg.resolve(&sel("git-*")).unwrap()),
            vec!["git-sync", "git-push"]
        );
    }

    #[test]
    fn duplicate_ids_rejected() {
        let yaml = "steps:\n  - id: a\n    command: x\n  - id: a\n    command: y\n";
        let err = parse_catalog(yaml, "dup.yml").unwrap_err();
        assert!(err.to_string().contains("duplicate step id 'a'"));
    }

    #[test]
    fn empty_command_rejected() {
        let yaml = "steps:\n  - id: a\n    command: \"\"\n";
        assert!(parse_catalog(yaml, "empty.yml").is_err());
    }

    #[test]
    fn malformed_yaml_is_catalog_error() {
        let err = parse_catalog("steps: [", "bad.yml").unwrap_err();
        assert!(matches!(err, OrchestrateError::CatalogError { .. }));
    }

    #[test]
    fn categories_in_first_seen_order() {
        assert_eq!(registry().categories(), vec!["install", "test", "git"]);
    }

    #[test]
    fn load_catalog_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("steps.yml");
        fs::write(&path, CATALOG).unwrap();

        let reg = load_catalog(&path).unwrap();
        assert_eq!(reg.len(), 5);
        assert!(reg.get("0101").is_some());
    }

    #[test]
    fn missing_catalog_file_is_catalog_error() {
        let temp = TempDir::new().unwrap();
        let err = load_catalog(&temp.path().join("none.yml")).unwrap_err();
        assert!(err.is_load_error());
    }
}
