//! Append-only call log written by the `log` behaviour.
//!
//! One line per successful call:
//!
//! ```text
//! [2024-05-01 12:00:00] Date::now args=[] returned="2024-05-01"
//! ```

use crate::error::MockError;
use crate::registry::CallEvent;
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Type label used when a call is not attached to a mocked type.
pub const UNBOUND_TYPE: &str = "unbound";

#[derive(Debug, Clone)]
pub struct CallLog {
    path: PathBuf,
}

impl CallLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line for `event`, creating missing parent directories.
    pub fn append(&self, event: &CallEvent<'_>) -> Result<(), MockError> {
        let line = format_line(event, Local::now());
        self.write_line(&line).map_err(|e| MockError::LogWrite {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

pub fn format_line(event: &CallEvent<'_>, at: DateTime<Local>) -> String {
    let args = serde_json::to_string(event.args).unwrap_or_else(|_| "[]".to_string());
    let target = match event.type_name {
        Some(type_name) => format!("{type_name}::{}", event.method),
        None => format!("{UNBOUND_TYPE}::{}", event.method),
    };
    format!(
        "[{}] {} args={} returned={}",
        at.format("%Y-%m-%d %H:%M:%S"),
        target,
        args,
        event.result
    )
}
