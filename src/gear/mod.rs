//! Service gears and their registry
//!
//! A gear is an externally supplied unit that the host drives through
//! `initialize` and then `connect`. Gears only ever see their own resolved
//! configuration.

pub mod registry;

use crate::config::{LogLevel, ResolvedConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use registry::{GearRecord, GearRegistry};

/// Lifecycle contract every gear implements
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceGear: Send + Sync {
    /// Prepares the gear with its resolved configuration.
    async fn initialize(&mut self, config: &ResolvedConfig, log_level: LogLevel) -> Result<()>;

    /// Connects an initialized gear to whatever it serves.
    async fn connect(&mut self) -> Result<()>;
}

/// Factory producing a fresh gear instance
pub type GearCreator = Arc<dyn Fn() -> Box<dyn ServiceGear> + Send + Sync>;
