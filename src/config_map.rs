//! Untyped, hierarchical configuration maps attached to graph entities.
//!
//! A [`ConfigMap`] is an ordered YAML mapping. Keys are strings in practice,
//! values nest arbitrarily as maps, lists and scalars.

use crate::error::ConfigError;
use serde_yaml::{Mapping, Value};

/// An entity configuration.
pub type ConfigMap = Mapping;

/// A single configuration value.
pub type ConfigItem = Value;

/// Parses a YAML document whose root must be a map.
pub fn parse_config_map(yaml: &str) -> Result<ConfigMap, ConfigError> {
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(map) => Ok(map),
        // An empty document is an empty configuration.
        Value::Null => Ok(ConfigMap::new()),
        _ => Err(ConfigError::NotAMap),
    }
}

/// Typed read access on top of [`ConfigMap`].
pub trait ConfigMapExt {
    fn has_key(&self, key: &str) -> bool;
    fn get_str(&self, key: &str) -> Option<&str>;
    fn get_map(&self, key: &str) -> Option<&ConfigMap>;
    fn get_seq(&self, key: &str) -> Option<&[ConfigItem]>;

    /// Merges `other` into `self`. Keys of `other` win; maps present on both
    /// sides are merged recursively.
    fn merge(&mut self, other: &ConfigMap);
}

impl ConfigMapExt for ConfigMap {
    fn has_key(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn get_map(&self, key: &str) -> Option<&ConfigMap> {
        self.get(key).and_then(Value::as_mapping)
    }

    fn get_seq(&self, key: &str) -> Option<&[ConfigItem]> {
        self.get(key).and_then(Value::as_sequence).map(Vec::as_slice)
    }

    fn merge(&mut self, other: &ConfigMap) {
        for (key, value) in other {
            if let Value::Mapping(theirs) = value
                && let Some(Value::Mapping(ours)) = self.get_mut(key)
            {
                ours.merge(theirs);
                continue;
            }
            self.insert(key.clone(), value.clone());
        }
    }
}
