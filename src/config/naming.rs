//! File and key naming conventions
//!
//! A gear registered as `CollinsSlack` is known everywhere else by its
//! canonical key `slack`, and its configuration lives in `slack.config.json`.
//! Everything that turns a name into a key or a key into a filename goes
//! through this module.

use crate::error::{CollinsError, ErrorKind, Result};

/// Namespace token shared by every gear name, stripped during reduction
pub const NAMESPACE_TOKEN: &str = "collins";

/// Joins the remaining name segments of a reduced gear name
pub const KEY_DELIMITER: &str = "-";

/// Default configuration file extension
pub const DEFAULT_EXTENSION: &str = "json";

/// Stem of the master configuration file
pub const MASTER_STEM: &str = "index";

/// Extensions with a parser behind them
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["json", "toml", "yaml", "yml"];

const GEAR_SUFFIX: &str = "config";

/// Naming conventions for one configuration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    /// Extension every recognized configuration file ends with
    pub extension: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl Conventions {
    /// Conventions for `extension`; fails with `Invalid:Input` unless it is
    /// one of [`SUPPORTED_EXTENSIONS`].
    pub fn with_extension(extension: impl Into<String>) -> Result<Self> {
        let extension = extension.into();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                format!(
                    "unsupported config extension '{extension}' (expected one of: {})",
                    SUPPORTED_EXTENSIONS.join(", ")
                ),
            ));
        }
        Ok(Self { extension })
    }

    /// Filename of the master configuration, e.g. `index.json`
    pub fn master_filename(&self) -> String {
        format!("{MASTER_STEM}.{}", self.extension)
    }

    /// Whether the final dot-segment of `filename` is the configured extension
    pub fn is_config_file(&self, filename: &str) -> bool {
        filename.rsplit('.').next() == Some(self.extension.as_str()) && filename.contains('.')
    }

    /// Builds the configuration filename for `target`.
    ///
    /// This is the only place the `<key>.config.<ext>` suffix is spelled out.
    pub fn build_config_filename(&self, target: &ConfigTarget) -> Result<String> {
        match target {
            ConfigTarget::Gear(key) if key.is_empty() || key.contains('.') => {
                Err(CollinsError::with_details(
                    ErrorKind::InvalidInput,
                    format!("invalid gear key for config filename: '{key}'"),
                ))
            }
            ConfigTarget::Gear(key) => Ok(format!("{key}.{GEAR_SUFFIX}.{}", self.extension)),
            ConfigTarget::Cog { gear, cog } => Err(CollinsError::with_details(
                ErrorKind::InvalidInput,
                format!("cog-level config files are not supported (gear '{gear}', cog '{cog}')"),
            )),
        }
    }
}

/// What a configuration filename is being built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigTarget {
    /// A gear-level file, keyed by canonical gear key
    Gear(String),
    /// A sub-component of a gear
    Cog { gear: String, cog: String },
}

/// Reduces a full gear name to its canonical key.
///
/// The name is split before every uppercase letter, each segment is
/// lower-cased, segments equal to [`NAMESPACE_TOKEN`] are dropped and the
/// rest are joined with [`KEY_DELIMITER`].
///
/// ```
/// use collins::config::naming::reduce_name;
///
/// assert_eq!(reduce_name("CollinsSlack"), "slack");
/// assert_eq!(reduce_name("CollinsWebHook"), "web-hook");
/// ```
pub fn reduce_name(full_name: &str) -> String {
    split_words(full_name)
        .into_iter()
        .map(|segment| segment.to_lowercase())
        .filter(|segment| segment != NAMESPACE_TOKEN)
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

fn split_words(name: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (index, ch) in name.char_indices() {
        if ch.is_uppercase() && index > start {
            segments.push(&name[start..index]);
            start = index;
        }
    }
    if start < name.len() {
        segments.push(&name[start..]);
    }
    segments
}

/// The canonical key a configuration filename belongs to (its first dot-segment)
pub fn config_key(filename: &str) -> &str {
    filename.split('.').next().unwrap_or(filename)
}

fn segment_count(filename: &str) -> usize {
    filename.split('.').count()
}

/// Orders configuration files so gear-level files come before any more deeply
/// qualified file of the same gear.
///
/// Primary order is dot-segment count ascending, then gear key, then the full
/// filename.
pub fn sort_config_files<S: AsRef<str>>(files: &[S]) -> Vec<String> {
    let mut sorted: Vec<String> = files.iter().map(|f| f.as_ref().to_string()).collect();
    sorted.sort_by(|a, b| {
        segment_count(a)
            .cmp(&segment_count(b))
            .then_with(|| config_key(a).cmp(config_key(b)))
            .then_with(|| a.cmp(b))
    });
    sorted
}
