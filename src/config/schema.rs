use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Severity set shared by the master schema and the logger.
///
/// Ordered from least to most verbose; a logger bound to a level emits every
/// message at that level or below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Core,
    Gear,
    Verbose,
    Debug,
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Core,
        LogLevel::Gear,
        LogLevel::Verbose,
        LogLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Core => "core",
            LogLevel::Gear => "gear",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == name)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level system configuration read from the master file.
///
/// Properties outside the schema are kept in `extra` so gear files can
/// inherit them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterConfig {
    /// Name of this instance of the application
    #[serde(default = "default_name")]
    pub name: String,

    /// User agent used while accessing networks
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Level at which to log events and errors
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Default value functions
fn default_name() -> String {
    "Collins".to_string()
}

fn default_user_agent() -> String {
    "collins".to_string()
}

fn default_log_level() -> LogLevel {
    LogLevel::Debug
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            user_agent: default_user_agent(),
            log_level: default_log_level(),
            extra: Map::new(),
        }
    }
}

impl MasterConfig {
    /// Checks constraints the serde shape can't express.
    ///
    /// Every violation is reported, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        if let Err(reason) = validate_no_space("name", &self.name) {
            violations.push(reason);
        }
        if let Err(reason) = validate_no_space("userAgent", &self.user_agent) {
            violations.push(reason);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Flattens the schema fields and the extra properties into one map,
    /// keyed by their file spelling (`userAgent`, `logLevel`, ...).
    pub fn to_properties(&self) -> Map<String, Value> {
        let mut properties = self.extra.clone();
        properties.insert("name".to_string(), Value::String(self.name.clone()));
        properties.insert(
            "userAgent".to_string(),
            Value::String(self.user_agent.clone()),
        );
        properties.insert(
            "logLevel".to_string(),
            Value::String(self.log_level.as_str().to_string()),
        );
        properties
    }
}

fn validate_no_space(field: &str, value: &str) -> Result<(), String> {
    if value.chars().any(char::is_whitespace) {
        Err(format!("{field}: must not contain spaces (got '{value}')"))
    } else {
        Ok(())
    }
}
