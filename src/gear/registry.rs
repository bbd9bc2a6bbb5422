//! Insertion-ordered registry of gears
//!
//! Registration order is the only processing order the pipeline uses.

use super::{GearCreator, ServiceGear};
use crate::config::naming::reduce_name;
use crate::config::{LogLevel, ResolvedConfig};
use crate::error::{CollinsError, ErrorKind, Result};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// State the host keeps for one registered gear
pub struct GearRecord {
    key: String,
    name: String,
    creator: GearCreator,
    config: Option<ResolvedConfig>,
    instance: Option<Box<dyn ServiceGear>>,
    log_level: Option<LogLevel>,
}

impl GearRecord {
    fn new(key: String, name: String, creator: GearCreator) -> Self {
        Self {
            key,
            name,
            creator,
            config: None,
            instance: None,
            log_level: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The name the gear was registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> Option<&ResolvedConfig> {
        self.config.as_ref()
    }

    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    pub fn instance(&self) -> Option<&dyn ServiceGear> {
        self.instance.as_deref()
    }

    pub fn instance_mut(&mut self) -> Option<&mut Box<dyn ServiceGear>> {
        self.instance.as_mut()
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.is_some()
    }

    /// Builds a new, uninitialized gear from the registered factory
    pub fn create(&self) -> Box<dyn ServiceGear> {
        (self.creator)()
    }

    pub(crate) fn set_config(&mut self, config: ResolvedConfig) {
        self.config = Some(config);
    }

    pub(crate) fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = Some(level);
    }

    /// Forgets config, log level and instance from an earlier run.
    pub(crate) fn reset(&mut self) {
        self.config = None;
        self.instance = None;
        self.log_level = None;
    }

    /// Stores a live instance; only allowed once a config is resolved.
    pub(crate) fn set_instance(&mut self, instance: Box<dyn ServiceGear>) -> Result<()> {
        if self.config.is_none() {
            return Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                format!("gear '{}' has no resolved config", self.key),
            ));
        }
        self.instance = Some(instance);
        Ok(())
    }
}

impl fmt::Debug for GearRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GearRecord")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("config", &self.config)
            .field("initialized", &self.instance.is_some())
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Registered gears keyed by canonical key
#[derive(Debug, Default)]
pub struct GearRegistry {
    records: IndexMap<String, GearRecord>,
}

impl GearRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gear factory under the canonical key derived from `name`.
    ///
    /// Returns the key. Fails with `Invalid:Input` if the key is taken or the
    /// name reduces to nothing.
    pub fn register<F>(&mut self, name: &str, creator: F) -> Result<String>
    where
        F: Fn() -> Box<dyn ServiceGear> + Send + Sync + 'static,
    {
        let key = reduce_name(name);
        if key.is_empty() {
            return Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                format!("gear name '{name}' does not reduce to a usable key"),
            ));
        }
        if let Some(existing) = self.records.get(&key) {
            return Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                format!(
                    "gear '{name}' reduces to key '{key}', already registered by '{}'",
                    existing.name
                ),
            ));
        }

        tracing::debug!("Registered gear {} as '{}'", name, key);
        let creator: GearCreator = Arc::new(creator);
        self.records
            .insert(key.clone(), GearRecord::new(key.clone(), name.to_string(), creator));
        Ok(key)
    }

    /// Keys in registration order
    pub fn keys(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Result<&GearRecord> {
        self.records.get(key).ok_or_else(|| unknown_gear(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut GearRecord> {
        self.records.get_mut(key).ok_or_else(|| unknown_gear(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GearRecord> {
        self.records.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GearRecord> {
        self.records.values_mut()
    }

    /// Returns every record to its just-registered state.
    pub(crate) fn reset(&mut self) {
        for record in self.records.values_mut() {
            record.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn unknown_gear(key: &str) -> CollinsError {
    CollinsError::with_details(ErrorKind::InvalidInput, format!("no gear registered as '{key}'"))
}
