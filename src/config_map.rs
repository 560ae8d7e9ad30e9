use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Placeholder rendered wherever a secret value would otherwise be printed.
pub const SECRET_MASK: &str = "[secret]";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValue {
    pub value: String,

    #[serde(default)]
    pub secret: bool,
}

impl ConfigValue {
    pub fn plain(value: impl Into<String>) -> Self {
        return Self {
            value: value.into(),
            secret: false,
        };
    }

    pub fn secret(value: impl Into<String>) -> Self {
        return Self {
            value: value.into(),
            secret: true,
        };
    }

    /// Converts a stack output into a configuration value. Strings are passed
    /// through untouched, anything else is stored as its JSON encoding.
    pub fn from_output(output: &serde_json::Value, secret: bool) -> Self {
        let value = match output {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        };

        return Self { value, secret };
    }

    pub fn display_value(&self) -> &str {
        if self.secret {
            return SECRET_MASK;
        }

        return &self.value;
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.display_value());
    }
}

// Debug output ends up in tracing fields, so it masks secrets as well.
impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_struct("ConfigValue")
            .field("value", &self.display_value())
            .field("secret", &self.secret)
            .finish();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: ConfigValue,
}

/// Ordered configuration keyed by Pulumi config key. Inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap(IndexMap<String, ConfigValue>);

impl ConfigMap {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.0.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.insert(key, value);
        return self;
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        return self.0.get(key);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        return self.0.contains_key(key);
    }

    pub fn len(&self) -> usize {
        return self.0.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.0.is_empty();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        return self.0.iter();
    }

    /// Applies `other` on top of `self`, last write wins by key.
    pub fn extend(&mut self, other: &ConfigMap) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Global entries first, per-stack entries applied after so they override.
    pub fn merge(global: &ConfigMap, per_stack: &ConfigMap) -> ConfigMap {
        let mut merged = global.clone();
        merged.extend(per_stack);
        return merged;
    }

    /// Key to display value, with secrets replaced by [`SECRET_MASK`].
    pub fn masked(&self) -> IndexMap<String, String> {
        return self.0
            .iter()
            .map(|(key, value)| (key.clone(), value.display_value().to_string()))
            .collect();
    }
}

impl FromIterator<ConfigEntry> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = ConfigEntry>>(iter: I) -> Self {
        let mut map = ConfigMap::new();
        for entry in iter {
            map.insert(entry.key, entry.value);
        }
        return map;
    }
}

impl<K: Into<String>> FromIterator<(K, ConfigValue)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (K, ConfigValue)>>(iter: I) -> Self {
        let mut map = ConfigMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        return map;
    }
}
