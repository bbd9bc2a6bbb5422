//! Configuration discovery, schema and per-gear resolution
//!
//! - `naming`: canonical keys, config filenames and load order
//! - `schema`: master config shape, defaults and validation
//! - `store`: directory discovery and the validated master config
//! - `gear`: per-gear property maps and inheritance resolution

pub mod gear;
pub mod naming;
pub mod schema;
pub mod store;

pub use gear::{ConfigValue, GearConfig, ResolvedConfig, INHERIT_SENTINEL};
pub use naming::{reduce_name, sort_config_files, ConfigTarget, Conventions};
pub use schema::{LogLevel, MasterConfig};
pub use store::{ConfigStore, ValidatedConfig};
