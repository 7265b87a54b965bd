//! Behaviour combinators for mocked methods.
//!
//! Every behaviour wraps a [`Response`] (or an existing pipeline) in a new
//! [`Handler`](crate::response::Handler) and registers it under the method
//! name.
//!
//! # Supported Behaviors
//!
//! - `once` / `add_consecutive` / `after` / `throws_exception` /
//!   `apply_default_mock_methods` - this module
//! - `never` / `at_most` / `at_least` - call-count limits
//! - `with_args` / `with_arguments_matching` - argument checks
//! - `after_delay` / `before_delay` / `retry` / `with_timeout` - timing
//! - `spy_method` / `monitoring_method(s)` / `always` / `log` - observation

mod arguments;
mod counting;
mod observation;
mod timing;


use crate::config::MockConfig;
use crate::error::MockError;
use crate::registry::MethodRegistry;
use crate::response::Response;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Registers behaviour pipelines into a [`MethodRegistry`].
#[derive(Debug, Clone)]
pub struct BehaviorComposer {
    registry: Arc<MethodRegistry>,
    retry_backoff: Duration,
}

impl BehaviorComposer {
    pub fn new(registry: Arc<MethodRegistry>) -> Self {
        Self::with_config(registry, &MockConfig::default())
    }

    pub fn with_config(registry: Arc<MethodRegistry>, config: &MockConfig) -> Self {
        Self {
            registry,
            retry_backoff: config.retry_backoff(),
        }
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// Pause between failed `retry` attempts.
    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    /// Register `response` for `name` without any behaviour.
    pub fn method(&self, name: &str, response: impl Into<Response>) {
        self.registry.register(name, response);
    }

    /// Everything registered inside `configure` succeeds at most once.
    pub fn once<F: FnOnce(&Self)>(&self, configure: F) {
        self.registry.once(|_| configure(self));
    }

    /// Serve `returns` in order, one per call. Calls past the end fail with
    /// [`MockError::ConsecutiveExhausted`].
    pub fn add_consecutive<I, V>(&self, name: &str, returns: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let queue: VecDeque<Value> = returns.into_iter().map(Into::into).collect();
        let total = queue.len();
        let queue = Mutex::new(queue);
        let method = name.to_string();
        self.registry.register(
            name,
            Response::from_fn(move |_| {
                queue
                    .lock()
                    .pop_front()
                    .ok_or_else(|| MockError::ConsecutiveExhausted {
                        method: method.clone(),
                        served: total,
                    })
            }),
        );
    }

    /// Run `hook` with the result of every successful call to the pipeline
    /// currently registered for `name`.
    pub fn after<F>(&self, name: &str, hook: F) -> Result<(), MockError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let inner = self.registry.get_pipeline(name)?;
        self.registry.register(
            name,
            Response::from_fn(move |call| {
                let value = inner(call)?;
                hook(&value);
                Ok(value)
            }),
        );
        Ok(())
    }

    /// Register each default unless the method already has a pipeline.
    pub fn apply_default_mock_methods<I, K, R>(&self, defaults: I)
    where
        I: IntoIterator<Item = (K, R)>,
        K: AsRef<str>,
        R: Into<Response>,
    {
        for (name, response) in defaults {
            self.registry.add_if_not_defined(name.as_ref(), response);
        }
    }

    /// Every call raises a clone of `error`.
    pub fn throws_exception(&self, name: &str, error: MockError) {
        self.registry
            .register(name, Response::from_fn(move |_| Err(error.clone())));
    }
}
