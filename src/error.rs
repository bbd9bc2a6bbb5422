use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Category of a [`CollinsError`], rendered as a dotted `Group:Name` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed caller-supplied argument (bad path, bad filename request)
    InvalidInput,
    /// I/O failure while enumerating the config directory
    MissingFile,
    /// A required config artifact is absent
    MissingConfig,
    /// Schema violation or an inheritance reference the master can't satisfy
    InvalidConfig,
    /// Category chosen by a gear for its own failures
    Custom(String),
}

impl ErrorKind {
    pub fn custom(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        if kind.trim().is_empty() {
            Self::Custom("Unknown:Error".to_string())
        } else {
            Self::Custom(kind)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidInput => "Invalid:Input",
            Self::MissingFile => "Missing:File",
            Self::MissingConfig => "Missing:Config",
            Self::InvalidConfig => "Invalid:Config",
            Self::Custom(kind) => kind,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error carried through every stage of the bootstrap pipeline.
///
/// `detail` is free-form context. Two keys shape the rendered message:
/// `details` (a single string) and `reasons` (an array, enumerated 1-based).
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct CollinsError {
    kind: ErrorKind,
    detail: Map<String, Value>,
    message: String,
}

impl CollinsError {
    pub fn new(kind: ErrorKind, detail: Map<String, Value>) -> Self {
        let message = render_message(&kind, &detail);
        Self {
            kind,
            detail,
            message,
        }
    }

    /// Error with a single `details` line.
    pub fn with_details(kind: ErrorKind, details: impl Into<String>) -> Self {
        let mut detail = Map::new();
        detail.insert("details".to_string(), Value::String(details.into()));
        Self::new(kind, detail)
    }

    /// Error with an enumerated list of `reasons`.
    pub fn with_reasons<I, S>(kind: ErrorKind, reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reasons = reasons
            .into_iter()
            .map(|r| Value::String(r.into()))
            .collect();
        let mut detail = Map::new();
        detail.insert("reasons".to_string(), Value::Array(reasons));
        Self::new(kind, detail)
    }

    /// Wraps a foreign error, keeping its message under `detail.details`.
    ///
    /// The kind is whatever the caller decides from its own context; nothing
    /// about the foreign error is used to classify it.
    pub fn convert<E: fmt::Display + ?Sized>(kind: ErrorKind, foreign: &E) -> Self {
        Self::with_details(kind, foreign.to_string())
    }

    /// Adds a context entry to the detail map and re-renders the message.
    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.detail.insert(key.to_string(), value.into());
        self.message = render_message(&self.kind, &self.detail);
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn detail(&self) -> &Map<String, Value> {
        &self.detail
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The `detail.details` string, when present.
    pub fn details(&self) -> Option<&str> {
        self.detail.get("details").and_then(Value::as_str)
    }
}

fn render_message(kind: &ErrorKind, detail: &Map<String, Value>) -> String {
    let mut message = format!("<{kind}> error message received");
    match detail.get("details").or_else(|| detail.get("reasons")) {
        Some(Value::Array(reasons)) => {
            message.push(':');
            for (index, reason) in reasons.iter().enumerate() {
                message.push_str(&format!(" {}> {}", index + 1, display_value(reason)));
            }
        }
        Some(value) => {
            message.push_str(": ");
            message.push_str(&display_value(value));
        }
        None => message.push('.'),
    }
    message
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, CollinsError>;
