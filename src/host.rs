//! The `Collins` host
//!
//! Owns the pipeline context and the event bus, takes gear registrations and
//! drives the pipeline: `configure` runs resolve, cross-check and initialize
//! and emits `ready`; `start` connects the gears and emits `started`. Any
//! failure emits `error:start` with the first error of the failing stage.
//!
//! A failed run does not roll anything back. Gears that initialized or
//! connected before the failure stay in the registry until the next
//! `configure`, which starts over from the resolve stage.

use crate::config::{ConfigStore, Conventions};
use crate::error::{CollinsError, ErrorKind, Result};
use crate::events::{EventBus, LifecycleEvent};
use crate::gear::{GearRegistry, ServiceGear};
use crate::logging::Logger;
use crate::pipeline::{self, PipelineContext, Stage};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

const CONFIGURE_STAGES: [Stage; 3] = [Stage::Resolve, Stage::CrossCheck, Stage::Initialize];
const START_STAGES: [Stage; 1] = [Stage::Connect];

pub struct Collins {
    context: PipelineContext,
    events: EventBus,
    configured: bool,
    started: bool,
}

impl Default for Collins {
    fn default() -> Self {
        Self::new()
    }
}

impl Collins {
    pub fn new() -> Self {
        Self::with_conventions(Conventions::default())
    }

    pub fn with_conventions(conventions: Conventions) -> Self {
        Self {
            context: PipelineContext::new(conventions),
            events: EventBus::default(),
            configured: false,
            started: false,
        }
    }

    /// Host reading its configuration from `dir` unless `configure_from`
    /// overrides it.
    pub fn with_path(dir: impl Into<PathBuf>) -> Self {
        let mut host = Self::new();
        host.context.set_config_dir(dir);
        host
    }

    /// Registers a gear; returns its canonical key.
    pub fn include<F>(&mut self, name: &str, creator: F) -> Result<String>
    where
        F: Fn() -> Box<dyn ServiceGear> + Send + Sync + 'static,
    {
        if self.configured {
            return Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                format!("cannot include gear '{name}' after configure"),
            ));
        }
        self.context.registry.register(name, creator)
    }

    /// Registers a gear type built with `Default::default`.
    pub fn include_default<G>(&mut self, name: &str) -> Result<String>
    where
        G: ServiceGear + Default + 'static,
    {
        self.include(name, || Box::new(G::default()) as Box<dyn ServiceGear>)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &GearRegistry {
        &self.context.registry
    }

    pub fn store(&self) -> &ConfigStore {
        &self.context.store
    }

    /// The core logger, available once the master config is validated
    pub fn logger(&self) -> Option<&Logger> {
        self.context.logger.as_ref()
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.context.config_dir()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Configures from `dir`, overriding any directory given at construction
    /// or used by an earlier failed attempt.
    pub async fn configure_from(&mut self, dir: impl Into<PathBuf>) -> Result<()> {
        if self.configured {
            return Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                "already configured",
            ));
        }
        let dir = dir.into();
        if let Err(e) = self.context.store.set_path(&dir).await {
            return self.fail(e);
        }
        self.context.set_config_dir(dir);
        self.configure().await
    }

    /// Resolves configuration and initializes every gear, then emits `ready`.
    pub async fn configure(&mut self) -> Result<()> {
        if self.configured {
            return Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                "already configured",
            ));
        }
        if self.context.config_dir().is_none() && !self.context.store.has_path() {
            return self.fail(CollinsError::with_details(
                ErrorKind::MissingConfig,
                "no config path supplied",
            ));
        }

        // a failed attempt may have left a loaded master or gear state behind
        self.context.reset();

        tracing::debug!(gears = self.context.registry.len(), "Configuring");
        if let Err(e) = pipeline::run_stages(&mut self.context, &CONFIGURE_STAGES).await {
            return self.fail(e);
        }

        self.configured = true;
        self.events
            .emit(LifecycleEvent::ready(self.context.registry.keys()));
        Ok(())
    }

    /// Connects every initialized gear, then emits `started`.
    pub async fn start(&mut self) -> Result<()> {
        if !self.configured {
            return self.fail(CollinsError::with_details(
                ErrorKind::InvalidInput,
                "start called before a successful configure",
            ));
        }
        if self.started {
            return Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                "already started",
            ));
        }

        if let Err(e) = pipeline::run_stages(&mut self.context, &START_STAGES).await {
            return self.fail(e);
        }

        self.started = true;
        if let Some(logger) = &self.context.logger {
            logger.core("Core#start complete");
        }
        self.events
            .emit(LifecycleEvent::started(self.context.registry.keys()));
        Ok(())
    }

    /// `configure` followed by `start`
    pub async fn run(&mut self) -> Result<()> {
        self.configure().await?;
        self.start().await
    }

    fn fail(&self, error: CollinsError) -> Result<()> {
        tracing::error!(kind = %error.kind(), "Collins start failed: {}", error);
        self.events.emit(LifecycleEvent::start_failed(error.clone()));
        Err(error)
    }
}
