//! Delays, retries and timeouts.

use super::BehaviorComposer;
use crate::error::MockError;
use crate::response::Response;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

impl BehaviorComposer {
    /// Produce the result, then block for `delay` before returning it.
    pub fn after_delay(&self, delay: Duration, name: &str, response: impl Into<Response>) {
        let inner = response.into().into_handler();
        self.registry.register(
            name,
            Response::from_fn(move |call| {
                let value = inner(call)?;
                thread::sleep(delay);
                Ok(value)
            }),
        );
    }

    /// Block for `delay`, then produce the result.
    pub fn before_delay(&self, delay: Duration, name: &str, response: impl Into<Response>) {
        let inner = response.into().into_handler();
        self.registry.register(
            name,
            Response::from_fn(move |call| {
                thread::sleep(delay);
                inner(call)
            }),
        );
    }

    /// Attempt `response` up to `max_attempts` times, pausing for the retry
    /// backoff between failures. Fails with
    /// [`MockError::MaxRetriesExceeded`] once every attempt has failed.
    pub fn retry(&self, max_attempts: u32, name: &str, response: impl Into<Response>) {
        let inner = response.into().into_handler();
        let method = name.to_string();
        let backoff = self.retry_backoff;
        self.registry.register(
            name,
            Response::from_fn(move |call| {
                let mut last = None;
                for attempt in 1..=max_attempts {
                    match inner(call) {
                        Ok(value) => return Ok(value),
                        Err(err) => {
                            debug!(method = %method, attempt, error = %err, "Attempt failed");
                            last = Some(err);
                        }
                    }
                    if attempt < max_attempts {
                        thread::sleep(backoff);
                    }
                }
                warn!(method = %method, attempts = max_attempts, "Retries exhausted");
                Err(MockError::MaxRetriesExceeded {
                    method: method.clone(),
                    attempts: max_attempts,
                    last: Box::new(last.unwrap_or_else(|| MockError::message("no attempts made"))),
                })
            }),
        );
    }

    /// Fail with [`MockError::TimedOut`] when producing the result took longer
    /// than `timeout`. The call always runs to completion first.
    pub fn with_timeout(&self, timeout: Duration, name: &str, response: impl Into<Response>) {
        let inner = response.into().into_handler();
        let method = name.to_string();
        self.registry.register(
            name,
            Response::from_fn(move |call| {
                let started = Instant::now();
                let value = inner(call)?;
                let elapsed = started.elapsed();
                if elapsed > timeout {
                    return Err(MockError::TimedOut {
                        method: method.clone(),
                        timeout,
                        elapsed,
                    });
                }
                Ok(value)
            }),
        );
    }
}
