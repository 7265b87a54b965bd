//! Error taxonomy shared by every mock component.
//!
//! All variants are cheap to clone so a pipeline can raise the same error
//! value on every call (see [`MockError::raised`]).

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Errors raised by registries, behaviours, proxies and the function mocker.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MockError {
    #[error("Method {method} not mocked")]
    MethodNotMocked { method: String },

    #[error("Unexpected method call: {method}. This method should never be invoked")]
    UnexpectedCall { method: String },

    #[error("Method {method} must be called at most {limit} times")]
    AtMostExceeded { method: String, limit: usize },

    #[error("{method} should be called at least {expected} times, but was called {actual} times")]
    AtLeastNotMet {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "Unexpected arguments for method {method}. Expected: {}, got: {}",
        render_values(.expected),
        render_values(.actual)
    )]
    ArgsMismatch {
        method: String,
        expected: Vec<Value>,
        actual: Vec<Value>,
    },

    #[error("Arguments don't match for method {method}")]
    ArgumentPredicateFailed { method: String },

    #[error("Method {method} called more than once")]
    OnceViolation { method: String },

    #[error("Method {method} timed out after {elapsed:?} (limit {timeout:?})")]
    TimedOut {
        method: String,
        timeout: Duration,
        elapsed: Duration,
    },

    #[error("Method {method} failed after {attempts} attempts: {last}")]
    MaxRetriesExceeded {
        method: String,
        attempts: u32,
        last: Box<MockError>,
    },

    #[error("{method} cannot be spied on: the mocked type has no real implementation")]
    SpyUnsupported { method: String },

    #[error("Consecutive responses for {method} exhausted after {served} calls")]
    ConsecutiveExhausted { method: String, served: usize },

    #[error("Method {method} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        method: String,
        expected: String,
        actual: usize,
    },

    #[error("Argument {index} of {method} could not be decoded: {message}")]
    ArgumentDecode {
        method: String,
        index: usize,
        message: String,
    },

    #[error("Method {method} returned {value}, which does not satisfy {expected}")]
    ReturnTypeMismatch {
        method: String,
        expected: String,
        value: Value,
    },

    #[error("Call to undefined method {type_name}::{method}()")]
    UndefinedMethod { type_name: String, method: String },

    #[error("Failed to synthesize proxy for {target}: {reason}")]
    SynthesisFailure { target: String, reason: String },

    #[error("Unknown mock environment: {0}")]
    UnknownEnvironment(String),

    #[error("Failed to write call log {}: {message}", .path.display())]
    LogWrite { path: PathBuf, message: String },

    /// A user supplied error, raised by `throws_exception` or a callable
    /// response.
    #[error("{0}")]
    Raised(Arc<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct RaisedMessage(String);

impl MockError {
    /// Wrap an arbitrary error so a pipeline can raise it.
    pub fn raised<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MockError::Raised(Arc::new(err))
    }

    /// Raise a plain message.
    pub fn message(msg: impl Into<String>) -> Self {
        MockError::Raised(Arc::new(RaisedMessage(msg.into())))
    }

    pub fn synthesis(target: impl Into<String>, reason: impl Into<String>) -> Self {
        MockError::SynthesisFailure {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn not_mocked(method: impl Into<String>) -> Self {
        MockError::MethodNotMocked {
            method: method.into(),
        }
    }

    /// The method or function name the error refers to, if any.
    pub fn method(&self) -> Option<&str> {
        match self {
            MockError::MethodNotMocked { method }
            | MockError::UnexpectedCall { method }
            | MockError::AtMostExceeded { method, .. }
            | MockError::AtLeastNotMet { method, .. }
            | MockError::ArgsMismatch { method, .. }
            | MockError::ArgumentPredicateFailed { method }
            | MockError::OnceViolation { method }
            | MockError::TimedOut { method, .. }
            | MockError::MaxRetriesExceeded { method, .. }
            | MockError::SpyUnsupported { method }
            | MockError::ConsecutiveExhausted { method, .. }
            | MockError::ArgumentCount { method, .. }
            | MockError::ArgumentDecode { method, .. }
            | MockError::ReturnTypeMismatch { method, .. }
            | MockError::UndefinedMethod { method, .. } => Some(method),
            _ => None,
        }
    }

    /// Downcast a [`MockError::Raised`] payload.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            MockError::Raised(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

fn render_values(values: &[Value]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| format!("{values:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("database offline")]
    struct Offline;

    #[test]
    fn test_args_mismatch_renders_json() {
        let err = MockError::ArgsMismatch {
            method: "save".to_string(),
            expected: vec![json!(1), json!("a")],
            actual: vec![json!(2)],
        };
        assert_eq!(
            err.to_string(),
            r#"Unexpected arguments for method save. Expected: [1,"a"], got: [2]"#
        );
    }

    #[test]
    fn test_raised_keeps_payload() {
        let err = MockError::raised(Offline);
        assert_eq!(err.to_string(), "database offline");
        assert!(err.downcast_ref::<Offline>().is_some());

        let copy = err.clone();
        assert!(copy.downcast_ref::<Offline>().is_some());
    }

    #[test]
    fn test_message_and_method_accessor() {
        let err = MockError::message("boom");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.method(), None);
        assert_eq!(MockError::not_mocked("getId").method(), Some("getId"));
    }

    #[test]
    fn test_max_retries_names_last_failure() {
        let err = MockError::MaxRetriesExceeded {
            method: "fetch".to_string(),
            attempts: 3,
            last: Box::new(MockError::message("connection refused")),
        };
        assert_eq!(
            err.to_string(),
            "Method fetch failed after 3 attempts: connection refused"
        );
    }
}
