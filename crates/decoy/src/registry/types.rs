//! Types recorded and emitted by the method registry.

use crate::error::MockError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Notification passed to observers after a successful invocation.
#[derive(Debug, Clone, Copy)]
pub struct CallEvent<'a> {
    /// Name of the mocked type, when the call was made on a bound instance
    pub type_name: Option<&'a str>,
    pub method: &'a str,
    pub args: &'a [Value],
    pub result: &'a Value,
}

/// Observer callback. An `Err` propagates to the caller of the invocation.
pub type Observer = Arc<dyn Fn(&CallEvent<'_>) -> Result<(), MockError> + Send + Sync>;

/// A successful invocation kept in the registry's call history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub method: String,
    pub args: Vec<Value>,
    pub result: Value,
    pub timestamp: DateTime<Utc>,
}

impl CallRecord {
    pub(crate) fn from_event(event: &CallEvent<'_>) -> Self {
        Self {
            method: event.method.to_string(),
            args: event.args.to_vec(),
            result: event.result.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Deferred minimum-call check registered by `at_least`.
#[derive(Debug, Clone)]
pub struct Expectation {
    method: String,
    minimum: usize,
    calls: Arc<AtomicUsize>,
}

impl Expectation {
    /// `calls` is the counter the wrapped pipeline increments.
    pub fn at_least(method: impl Into<String>, minimum: usize, calls: Arc<AtomicUsize>) -> Self {
        Self {
            method: method.into(),
            minimum,
            calls,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn is_met(&self) -> bool {
        self.calls() >= self.minimum
    }

    pub fn check(&self) -> Result<(), MockError> {
        let actual = self.calls();
        if actual >= self.minimum {
            return Ok(());
        }
        Err(MockError::AtLeastNotMet {
            method: self.method.clone(),
            expected: self.minimum,
            actual,
        })
    }
}
