//! Deep merge for layered YAML configuration.
//!
//! - Mappings merge recursively
//! - Sequences are replaced, never concatenated
//! - `null` in the overlay removes the key from the base
//! - Scalars in the overlay replace scalars in the base

use serde_yaml::{Mapping, Value};

/// Deep merge two YAML values. `overlay` wins at the point of conflict.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();

            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    result.remove(key);
                } else if let Some(base_value) = base_map.get(key) {
                    result.insert(key.clone(), deep_merge(base_value, overlay_value));
                } else {
                    result.insert(key.clone(), overlay_value.clone());
                }
            }

            Value::Mapping(result)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Merge layers in order (later overrides earlier).
///
/// An empty YAML document parses to `null`; such layers are ignored rather
/// than wiping everything before them.
pub fn merge_configs(configs: &[Value]) -> Value {
    configs
        .iter()
        .filter(|config| !config.is_null())
        .fold(Value::Mapping(Mapping::new()), |acc, config| {
            deep_merge(&acc, config)
        })
}

/// Set a dotted path (`profiles.ci.features.docker`) inside a YAML document,
/// creating intermediate mappings as needed.
///
/// A non-mapping value on the way is replaced by a mapping.
pub fn set_path(root: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for key in parents {
        if !current.is_mapping() {
            *current = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(map) = current else {
            return;
        };
        current = map
            .entry(Value::String((*key).to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    if !current.is_mapping() {
        *current = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(map) = current {
        map.insert(Value::String((*last).to_string()), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn local_layer_overrides_single_setting() {
        let base = yaml("settings:\n  max_concurrency: 4\n  default_profile: dev\n");
        let overlay = yaml("settings:\n  max_concurrency: 2\n");

        let result = deep_merge(&base, &overlay);

        assert_eq!(result["settings"]["max_concurrency"], 2);
        assert_eq!(result["settings"]["default_profile"], "dev");
    }

    #[test]
    fn sequences_are_replaced() {
        let base = yaml("tags: [a, b]");
        let overlay = yaml("tags: [c]");

        let result = deep_merge(&base, &overlay);
        let tags = result["tags"].as_sequence().unwrap();

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0], "c");
    }

    #[test]
    fn null_removes_inherited_feature() {
        let base = yaml("features:\n  docker: true\n  lint: true\n");
        let overlay = yaml("features:\n  docker: null\n");

        let result = deep_merge(&base, &overlay);

        assert!(result["features"].get("docker").is_none());
        assert_eq!(result["features"]["lint"], true);
    }

    #[test]
    fn merge_configs_applies_layers_in_order() {
        let configs = vec![yaml("a: 1\nb: 2"), yaml("b: 3\nc: 4"), yaml("c: 5")];

        let result = merge_configs(&configs);

        assert_eq!(result["a"], 1);
        assert_eq!(result["b"], 3);
        assert_eq!(result["c"], 5);
    }

    #[test]
    fn empty_layer_is_ignored() {
        let configs = vec![yaml("a: 1"), yaml("")];
        let result = merge_configs(&configs);
        assert_eq!(result["a"], 1);
    }

    #[test]
    fn set_path_creates_intermediate_mappings() {
        let mut doc = yaml("{}");
        set_path(
            &mut doc,
            &["profiles", "ci", "features", "docker"],
            Value::Bool(true),
        );
        assert_eq!(doc["profiles"]["ci"]["features"]["docker"], true);
    }

    #[test]
    fn set_path_preserves_siblings() {
        let mut doc = yaml("profiles:\n  ci:\n    extends: dev\n    features:\n      lint: true\n");
        set_path(
            &mut doc,
            &["profiles", "ci", "features", "docker"],
            Value::Bool(true),
        );
        assert_eq!(doc["profiles"]["ci"]["extends"], "dev");
        assert_eq!(doc["profiles"]["ci"]["features"]["lint"], true);
        assert_eq!(doc["profiles"]["ci"]["features"]["docker"], true);
    }

    #[test]
    fn set_path_replaces_null_document() {
        let mut doc = Value::Null;
        set_path(&mut doc, &["features", "x"], Value::Bool(false));
        assert_eq!(doc["features"]["x"], false);
    }
}
