//! Bootstrap pipeline
//!
//! Four stages run strictly in order against one [`PipelineContext`]:
//!
//! 1. **Resolve**: locate the config directory, discover files, validate the
//!    master config and build the logger
//! 2. **CrossCheck**: match registered gears to config files and resolve
//!    inherited properties
//! 3. **Initialize**: construct every gear and initialize it with its config
//! 4. **Connect**: connect every initialized gear
//!
//! A stage that fails stops the run. Inside a stage, every gear's work runs
//! to completion before the stage reports its first error (see [`fanout`]).
//! There is no timeout: a gear that never settles stalls the pipeline.

pub mod fanout;

use crate::config::naming::{config_key, ConfigTarget};
use crate::config::{ConfigStore, Conventions, LogLevel, ValidatedConfig};
use crate::error::{CollinsError, ErrorKind, Result};
use crate::gear::GearRegistry;
use crate::logging::Logger;
use fanout::{apply_settled, settle_all};
use indexmap::IndexSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    CrossCheck,
    Initialize,
    Connect,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Resolve,
        Stage::CrossCheck,
        Stage::Initialize,
        Stage::Connect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::CrossCheck => "cross-check",
            Stage::Initialize => "initialize",
            Stage::Connect => "connect",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the stages read and mutate
#[derive(Debug, Default)]
pub struct PipelineContext {
    pub store: ConfigStore,
    pub registry: GearRegistry,
    /// Built by the resolve stage
    pub logger: Option<Logger>,
    config_dir: Option<PathBuf>,
}

impl PipelineContext {
    pub fn new(conventions: Conventions) -> Self {
        Self {
            store: ConfigStore::new(conventions),
            ..Self::default()
        }
    }

    /// Directory the resolve stage uses when the store has no path yet
    pub fn set_config_dir(&mut self, dir: impl Into<PathBuf>) {
        self.config_dir = Some(dir.into());
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Clears everything a previous run produced so the stages can run
    /// again. Registrations and the store path are kept.
    pub fn reset(&mut self) {
        self.store.reset();
        self.registry.reset();
        self.logger = None;
    }

    fn log(&self, level: LogLevel, message: impl fmt::Display) {
        match &self.logger {
            Some(logger) => logger.log(level, message),
            None => tracing::debug!("{}", message),
        }
    }
}

fn master(store: &ConfigStore) -> Result<&ValidatedConfig> {
    store.master().ok_or_else(|| {
        CollinsError::with_details(
            ErrorKind::MissingConfig,
            "master config not loaded; the resolve stage must run first",
        )
    })
}

/// Runs `stages` in order, stopping at the first failing stage.
pub async fn run_stages(ctx: &mut PipelineContext, stages: &[Stage]) -> Result<()> {
    for stage in stages {
        ctx.log(LogLevel::Core, format_args!("Stage {stage} starting"));
        let result = match stage {
            Stage::Resolve => resolve(ctx).await,
            Stage::CrossCheck => cross_check(ctx).await,
            Stage::Initialize => initialize(ctx).await,
            Stage::Connect => connect(ctx).await,
        };
        if let Err(e) = result {
            ctx.log(LogLevel::Error, format_args!("Stage {stage} failed: {e}"));
            return Err(e);
        }
        ctx.log(LogLevel::Core, format_args!("Stage {stage} complete"));
    }
    Ok(())
}

/// Stage 1: config directory, file discovery, master validation, logger.
pub async fn resolve(ctx: &mut PipelineContext) -> Result<()> {
    if !ctx.store.has_path() {
        let dir = ctx.config_dir.clone().ok_or_else(|| {
            CollinsError::with_details(ErrorKind::MissingConfig, "no config path supplied")
        })?;
        ctx.store.set_path(dir).await?;
    }
    ctx.store.discover().await?;
    ctx.store.load_master().await?;

    let level = master(&ctx.store)?.log_level();
    ctx.logger = Some(Logger::new(level, "core"));
    ctx.log(
        LogLevel::Debug,
        format_args!("Logger bound at level '{level}'"),
    );
    Ok(())
}

/// Stage 2: cross-check registered gears against config files and resolve
/// inherited properties.
pub async fn cross_check(ctx: &mut PipelineContext) -> Result<()> {
    let declared = ctx.registry.keys();
    let gear_files = ctx.store.gear_files();
    let available: IndexSet<&str> = gear_files.iter().map(|f| config_key(f)).collect();

    let missing: Vec<&str> = declared
        .iter()
        .map(String::as_str)
        .filter(|key| !available.contains(key))
        .collect();
    if !missing.is_empty() {
        return Err(CollinsError::with_details(
            ErrorKind::MissingConfig,
            format!("missing config for gears: {}", missing.join(", ")),
        )
        .with_context("missing", missing));
    }

    let store = &ctx.store;
    let master = master(store)?;
    let items = declared
        .iter()
        .map(|key| {
            let load = async move {
                let filename = store
                    .conventions()
                    .build_config_filename(&ConfigTarget::Gear(key.clone()))?;
                let config = store.read_gear_config(key).await?;
                config.resolve(&filename, master)
            };
            (key.clone(), load)
        })
        .collect();
    let outcomes = settle_all(items).await;

    let logger = ctx.logger.clone();
    let registry = &mut ctx.registry;
    apply_settled(Stage::CrossCheck.as_str(), outcomes, |key, resolved| {
        if let Some(logger) = &logger {
            logger.verbose(format_args!("Resolved config for gear '{key}'"));
        }
        registry.get_mut(key)?.set_config(resolved);
        Ok(())
    })
}

/// Stage 3: construct and initialize every gear in registration order.
pub async fn initialize(ctx: &mut PipelineContext) -> Result<()> {
    let level = master(&ctx.store)?.log_level();
    for record in ctx.registry.iter_mut() {
        record.set_log_level(level);
    }

    let items = ctx
        .registry
        .iter()
        .map(|record| {
            let init = async move {
                let config = record.config().ok_or_else(|| {
                    CollinsError::with_details(
                        ErrorKind::InvalidInput,
                        format!("gear '{}' reached initialize without a config", record.key()),
                    )
                })?;
                let mut gear = record.create();
                gear.initialize(config, level).await?;
                Ok::<_, CollinsError>(gear)
            };
            (record.key().to_string(), init)
        })
        .collect();
    let outcomes = settle_all(items).await;

    let logger = ctx.logger.clone();
    let registry = &mut ctx.registry;
    apply_settled(Stage::Initialize.as_str(), outcomes, |key, gear| {
        registry.get_mut(key)?.set_instance(gear)?;
        if let Some(logger) = &logger {
            logger.scoped(key).gear("initialized");
        }
        Ok(())
    })
}

/// Stage 4: connect every initialized gear in registration order.
pub async fn connect(ctx: &mut PipelineContext) -> Result<()> {
    let items = ctx
        .registry
        .iter_mut()
        .filter_map(|record| {
            let key = record.key().to_string();
            record
                .instance_mut()
                .map(|gear| (key, async move { gear.connect().await }))
        })
        .collect();
    let outcomes = settle_all(items).await;

    let logger = ctx.logger.clone();
    apply_settled(Stage::Connect.as_str(), outcomes, |key, ()| {
        if let Some(logger) = &logger {
            logger.scoped(key).gear("connected");
        }
        Ok(())
    })
}
