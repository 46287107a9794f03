//! Override overlay
//!
//! A machine-local JSON object merged on top of the synced OpenCode config
//! after every pull, and stripped back out before anything reaches the repo.

use std::path::Path;

use ocsync_fs::ConfigStore;
use serde_json::{Map, Value};

use crate::locations::SyncLocations;
use crate::{Error, Result};

/// Local-only override values, keyed like the OpenCode config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    values: Map<String, Value>,
}

impl Overrides {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Load the overrides file for these locations; a missing file is empty.
    pub fn load(locations: &SyncLocations) -> Result<Self> {
        Self::load_from(&locations.overrides_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let Some(document) = ConfigStore::new().load_optional::<Value>(path)? else {
            return Ok(Self::default());
        };
        match document {
            Value::Object(values) => {
                tracing::debug!(path = %path.display(), keys = values.len(), "loaded overrides");
                Ok(Self { values })
            }
            _ => Err(Error::InvalidOverrides {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// See [`apply`].
    pub fn apply(&self, materialized: &Value) -> Value {
        apply(materialized, self)
    }

    /// See [`strip`].
    pub fn strip(&self, local: &Value, base: Option<&Value>) -> Value {
        strip(local, self, base)
    }
}

/// Merge overrides into a materialized config; override values win at every depth.
pub fn apply(materialized: &Value, overrides: &Overrides) -> Value {
    let mut merged = materialized.clone();
    if !overrides.is_empty() {
        deep_merge_value(&mut merged, &Value::Object(overrides.values.clone()));
    }
    merged
}

/// Deep merge two JSON values
///
/// If both values are objects, merge them recursively with `other` taking precedence.
/// Otherwise, `other` replaces `base`.
fn deep_merge_value(base: &mut Value, other: &Value) {
    match (base, other) {
        (Value::Object(base_map), Value::Object(other_map)) => {
            for (key, other_val) in other_map {
                if let Some(base_val) = base_map.get_mut(key) {
                    deep_merge_value(base_val, other_val);
                } else {
                    base_map.insert(key.clone(), other_val.clone());
                }
            }
        }
        (base, other) => {
            *base = other.clone();
        }
    }
}

/// Remove override-originated values from a local config before committing.
///
/// For every key the overrides set, the `base` (current repo copy) value is
/// restored if it has one, otherwise the key is dropped. Objects present on
/// both sides are handled key by key; an object emptied this way disappears
/// unless the base had it.
pub fn strip(local: &Value, overrides: &Overrides, base: Option<&Value>) -> Value {
    let mut stripped = local.clone();
    if let Value::Object(local_map) = &mut stripped {
        strip_map(local_map, &overrides.values, base.and_then(Value::as_object));
    }
    stripped
}

fn strip_map(
    local: &mut Map<String, Value>,
    overrides: &Map<String, Value>,
    base: Option<&Map<String, Value>>,
) {
    for (key, override_val) in overrides {
        let base_val = base.and_then(|b| b.get(key));

        // Some(emptied) when both sides were objects and were stripped in place
        let nested = match (local.get_mut(key), override_val) {
            // Deleted locally; nothing to strip
            (None, _) => continue,
            (Some(Value::Object(local_child)), Value::Object(override_child)) => {
                strip_map(local_child, override_child, base_val.and_then(Value::as_object));
                Some(local_child.is_empty())
            }
            (Some(_), _) => None,
        };

        match (nested, base_val) {
            (Some(_), Some(b)) if !b.is_object() => {
                local.insert(key.clone(), b.clone());
            }
            (Some(true), None) | (None, None) => {
                local.remove(key);
            }
            (Some(_), _) => {}
            (None, Some(b)) => {
                local.insert(key.clone(), b.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn overrides(value: Value) -> Overrides {
        match value {
            Value::Object(map) => Overrides::new(map),
            _ => panic!("overrides must be an object"),
        }
    }

    #[test]
    fn override_wins_at_every_depth() {
        let synced = json!({
            "theme": "light",
            "provider": { "openai": { "options": { "timeout": 30, "baseURL": "https://api" } } },
            "keybinds": ["a", "b"]
        });
        let local = overrides(json!({
            "theme": "dark",
            "provider": { "openai": { "options": { "baseURL": "http://localhost:8080" } } },
            "keybinds": ["z"]
        }));

        let merged = apply(&synced, &local);

        assert_eq!(
            merged,
            json!({
                "theme": "dark",
                "provider": { "openai": { "options": { "timeout": 30, "baseURL": "http://localhost:8080" } } },
                "keybinds": ["z"]
            })
        );
    }

    #[test]
    fn empty_overrides_are_identity() {
        let synced = json!({ "model": "anthropic/claude" });
        assert_eq!(apply(&synced, &Overrides::default()), synced);
    }

    #[test]
    fn strip_restores_base_values_and_drops_added_keys() {
        let base = json!({ "theme": "light", "provider": { "openai": { "timeout": 30 } } });
        let local_overrides = overrides(json!({
            "theme": "dark",
            "provider": { "openai": { "baseURL": "http://localhost" }, "ollama": { "on": true } }
        }));
        let mut local = apply(&base, &local_overrides);
        local["share"] = json!("manual");

        let stripped = strip(&local, &local_overrides, Some(&base));

        assert_eq!(
            stripped,
            json!({ "theme": "light", "provider": { "openai": { "timeout": 30 } }, "share": "manual" })
        );
    }

    #[test]
    fn strip_without_base_removes_override_keys() {
        let local_overrides = overrides(json!({ "autoupdate": false }));
        let local = json!({ "autoupdate": false, "theme": "dark" });

        assert_eq!(strip(&local, &local_overrides, None), json!({ "theme": "dark" }));
    }

    #[test]
    fn strip_restores_scalar_replaced_by_object() {
        let base = json!({ "mcp": "off" });
        let local_overrides = overrides(json!({ "mcp": { "server": "local" } }));
        let local = apply(&base, &local_overrides);

        assert_eq!(strip(&local, &local_overrides, Some(&base)), base);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Overrides::load_from(&dir.path().join("opencode-synced.overrides.jsonc")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn load_rejects_non_object_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opencode-synced.overrides.jsonc");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            Overrides::load_from(&path),
            Err(Error::InvalidOverrides { .. })
        ));
    }

    #[test]
    fn load_accepts_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opencode-synced.overrides.jsonc");
        std::fs::write(&path, "{\n  // this laptop only\n  \"theme\": \"dark\"\n}").unwrap();

        let loaded = Overrides::load_from(&path).unwrap();
        assert_eq!(loaded.values().get("theme"), Some(&json!("dark")));
    }
}
