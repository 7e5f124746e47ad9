//! Structured event log: one JSON object per line, appended to `app.log`.
//!
//! The log is an explicit collaborator handed to the extractor and the HTTP
//! layer. Every record is also mirrored to the `log` facade so it shows up on
//! the console through `env_logger`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

/// File name of the event log inside the log directory
pub const LOG_FILE_NAME: &str = "app.log";

/// Severity of an event, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }

    fn as_log_level(&self) -> log::Level {
        match self {
            Level::Debug => log::Level::Debug,
            Level::Info => log::Level::Info,
            Level::Warn => log::Level::Warn,
            Level::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown level name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level `{0}` (expected debug, info, warn or error)")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Append-only JSON lines event log
#[derive(Debug)]
pub struct EventLog {
    min_level: Level,
    path: Option<PathBuf>,
    file: Option<Mutex<File>>,
}

impl EventLog {
    /// Open (creating if needed) `<dir>/app.log` for appending
    pub fn open(dir: impl AsRef<Path>, min_level: Level) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let path = dir.join(LOG_FILE_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            min_level,
            path: Some(path),
            file: Some(Mutex::new(file)),
        })
    }

    /// A log that only mirrors records to the `log` facade
    pub fn console_only(min_level: Level) -> Self {
        Self {
            min_level,
            path: None,
            file: None,
        }
    }

    /// Path of the log file, if there is one
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Minimum level that gets recorded
    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn debug(&self, message: &str, metadata: Value) {
        self.record(Level::Debug, message, metadata);
    }

    pub fn info(&self, message: &str, metadata: Value) {
        self.record(Level::Info, message, metadata);
    }

    pub fn warn(&self, message: &str, metadata: Value) {
        self.record(Level::Warn, message, metadata);
    }

    pub fn error(&self, message: &str, metadata: Value) {
        self.record(Level::Error, message, metadata);
    }

    /// Record an event if its level passes the threshold.
    ///
    /// Metadata must be a JSON object; its fields follow `timestamp`, `level`
    /// and `message` in the written line. Any other value is stored under
    /// `metadata`.
    pub fn record(&self, level: Level, message: &str, metadata: Value) {
        if level < self.min_level {
            return;
        }

        let line = format_record(level, message, metadata);
        log::log!(target: "event", level.as_log_level(), "{}", line);

        if let Some(file) = &self.file {
            // A poisoned lock only means another writer panicked mid-append
            let mut file = match file.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let mut appended = writeln!(file, "{}", line);
            if appended.is_ok() {
                appended = file.flush();
            }
            if let Err(e) = appended {
                log::warn!("Failed to append to event log: {}", e);
            }
        }
    }
}

/// Serialize one record as a single JSON line (without the newline)
pub fn format_record(level: Level, message: &str, metadata: Value) -> String {
    let mut entry = Map::new();
    entry.insert(
        "timestamp".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    entry.insert("level".to_string(), Value::String(level.to_string()));
    entry.insert("message".to_string(), Value::String(message.to_string()));

    match metadata {
        Value::Object(fields) => {
            for (key, value) in fields {
                // Reserved keys stay as written above
                if !entry.contains_key(&key) {
                    entry.insert(key, value);
                }
            }
        }
        Value::Null => {}
        other => {
            entry.insert("metadata".to_string(), other);
        }
    }

    Value::Object(entry).to_string()
}
