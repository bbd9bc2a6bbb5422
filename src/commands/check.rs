use crate::config::naming::{config_key, ConfigTarget};
use crate::config::{ConfigStore, Conventions};
use crate::error::{CollinsError, ErrorKind, Result};
use std::path::Path;
use tracing::{error, info, warn};

/// Result of checking one configuration directory
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Gear keys whose config resolved against the master config
    pub resolved: Vec<String>,
    /// Gear keys whose config failed to load or resolve
    pub failed: Vec<String>,
    /// Files more deeply qualified than a gear-level config
    pub skipped: Vec<String>,
}

/// Validates a configuration directory without any gears attached.
///
/// Runs master validation, then loads and resolves every gear-level file it
/// finds. Fails with the first gear error once every file has been checked.
pub async fn run_config_check(dir: &Path, conventions: Conventions) -> Result<CheckReport> {
    info!("Checking configuration in {}", dir.display());

    let mut store = ConfigStore::new(conventions);
    store.set_path(dir).await?;
    store.discover().await?;
    store.load_master().await?;

    let master = store.master().ok_or_else(|| {
        CollinsError::with_details(ErrorKind::MissingConfig, "master config not loaded")
    })?;
    info!("✓ {} is valid", store.conventions().master_filename());
    info!("  Name: {}", master.name());
    info!("  User agent: {}", master.user_agent());
    info!("  Log level: {}", master.log_level());

    let mut report = CheckReport::default();
    let mut first_error: Option<CollinsError> = None;

    for filename in store.gear_files() {
        let key = config_key(&filename).to_string();
        let expected = store
            .conventions()
            .build_config_filename(&ConfigTarget::Gear(key.clone()))?;
        if filename != expected {
            warn!("  ! {} skipped (only gear-level files are loaded)", filename);
            report.skipped.push(filename);
            continue;
        }

        let outcome = store.read_gear_config(&key).await.and_then(|config| {
            let inherited = config.inherited().count();
            config.resolve(&filename, master).map(|_| inherited)
        });

        match outcome {
            Ok(inherited) => {
                info!("  ✓ {} ({} inherited properties)", filename, inherited);
                report.resolved.push(key);
            }
            Err(e) => {
                error!("  ✗ {}: {}", filename, e);
                report.failed.push(key);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            info!("✓ All checks passed");
            Ok(report)
        }
    }
}
