//! Per-gear configuration and inheritance resolution
//!
//! A gear file is a flat property map. Any property whose value is the
//! literal string `"inherit"` takes the master property of the same name.

use crate::config::store::ValidatedConfig;
use crate::error::{CollinsError, ErrorKind, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Sentinel value requesting a property from the master config
pub const INHERIT_SENTINEL: &str = "inherit";

/// One property of a gear file, before resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Literal(Value),
    /// Take the master property with this name
    Inherit(String),
}

/// A gear configuration as read from disk
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "BTreeMap<String, Value>")]
pub struct GearConfig {
    properties: BTreeMap<String, ConfigValue>,
}

impl From<BTreeMap<String, Value>> for GearConfig {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        let properties = raw
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) if s == INHERIT_SENTINEL => ConfigValue::Inherit(name.clone()),
                    other => ConfigValue::Literal(other),
                };
                (name, value)
            })
            .collect();
        Self { properties }
    }
}

impl GearConfig {
    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.properties.get(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Names of the properties that inherit from the master config
    pub fn inherited(&self) -> impl Iterator<Item = &str> {
        self.properties.values().filter_map(|value| match value {
            ConfigValue::Inherit(master_key) => Some(master_key.as_str()),
            ConfigValue::Literal(_) => None,
        })
    }

    /// Resolves every inherited property against `master`.
    ///
    /// One unresolvable property rejects the whole file; nothing is partially
    /// applied.
    pub fn resolve(self, filename: &str, master: &ValidatedConfig) -> Result<ResolvedConfig> {
        let mut resolved = Map::new();
        for (name, value) in self.properties {
            let value = match value {
                ConfigValue::Literal(value) => value,
                ConfigValue::Inherit(master_key) => match master.get(&master_key) {
                    Some(value) => value.clone(),
                    None => {
                        return Err(CollinsError::with_details(
                            ErrorKind::InvalidConfig,
                            format!("{filename} has invalid key/value pair: '{name}' inherits a property the master config does not define"),
                        )
                        .with_context("file", filename)
                        .with_context("property", name));
                    }
                },
            };
            resolved.insert(name, value);
        }
        Ok(ResolvedConfig(resolved))
    }
}

/// A gear configuration with every inherited property filled in
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedConfig(Map<String, Value>);

impl ResolvedConfig {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self(properties)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}
