use crate::config::LogLevel;
use std::fmt;
use tracing_subscriber::EnvFilter;

/// Log sink bound to the level resolved from the master config.
///
/// Messages more verbose than the bound level are dropped; the rest are
/// forwarded to `tracing` with the severity name attached.
#[derive(Debug, Clone)]
pub struct Logger {
    level: LogLevel,
    source: String,
}

impl Logger {
    pub fn new(level: LogLevel, source: impl Into<String>) -> Self {
        Self {
            level,
            source: source.into(),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// A logger for another source at the same level
    pub fn scoped(&self, source: impl Into<String>) -> Self {
        Self::new(self.level, source)
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level
    }

    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        if !self.enabled(level) {
            return;
        }
        let source = self.source.as_str();
        let severity = level.as_str();
        match level {
            LogLevel::Error => tracing::error!(source, severity, "{}", message),
            LogLevel::Warn => tracing::warn!(source, severity, "{}", message),
            LogLevel::Info | LogLevel::Core => tracing::info!(source, severity, "{}", message),
            LogLevel::Gear | LogLevel::Verbose | LogLevel::Debug => {
                tracing::debug!(source, severity, "{}", message)
            }
        }
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, message);
    }

    pub fn core(&self, message: impl fmt::Display) {
        self.log(LogLevel::Core, message);
    }

    pub fn gear(&self, message: impl fmt::Display) {
        self.log(LogLevel::Gear, message);
    }

    pub fn verbose(&self, message: impl fmt::Display) {
        self.log(LogLevel::Verbose, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message);
    }
}

/// `tracing` filter directive matching a schema level
pub fn filter_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info | LogLevel::Core => "info",
        LogLevel::Gear | LogLevel::Verbose | LogLevel::Debug => "debug",
    }
}

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins when set. Returns `false` if a subscriber was already
/// installed.
pub fn init_tracing(level: LogLevel, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
