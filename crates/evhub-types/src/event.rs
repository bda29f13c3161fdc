//! Event type distributed by the hub.
//!
//! An `Event` is immutable once handed to the hub and is shared read-only by
//! every listener whose filter accepts it. On the wire each event is one JSON
//! object per frame: `{type, timestamp, metadata, payload}` plus the optional
//! `project` and `location` fields when set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Instance and storage lifecycle notifications.
pub const TYPE_LIFECYCLE: &str = "lifecycle";

/// Background operation progress and completion.
pub const TYPE_OPERATION: &str = "operation";

/// Daemon log records forwarded to listeners.
pub const TYPE_LOGGING: &str = "logging";

/// A typed, timestamped unit of information published for distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type string used for listener filtering.
    #[serde(rename = "type")]
    pub event_type: String,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub metadata: Map<String, Value>,

    #[serde(default)]
    pub payload: Value,

    /// Project the event belongs to. Events without a project reach every listener.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Cluster member that originated the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Event {
    /// Create an event of the given type stamped with the current time.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now(),
            metadata: Map::new(),
            payload,
            project: None,
            location: None,
        }
    }

    /// Create a `logging` event carrying `level` and `message` in its metadata.
    pub fn logging(level: LogLevel, message: impl Into<String>) -> Self {
        Self::new(TYPE_LOGGING, Value::Null)
            .with_metadata("level", Value::String(level.as_str().to_string()))
            .with_metadata("message", Value::String(message.into()))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Level of a `logging` event, if present and recognised.
    pub fn log_level(&self) -> Option<LogLevel> {
        if self.event_type != TYPE_LOGGING {
            return None;
        }
        self.metadata
            .get("level")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

/// Severity of a `logging` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" | "dbug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" | "eror" | "crit" => Ok(LogLevel::Error),
            other => Err(format!("invalid log level '{other}'")),
        }
    }
}
