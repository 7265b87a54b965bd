//! Call-count limits.

use super::BehaviorComposer;
use crate::error::MockError;
use crate::registry::Expectation;
use crate::response::Response;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

impl BehaviorComposer {
    /// Any call to `name` fails with [`MockError::UnexpectedCall`].
    pub fn never(&self, name: &str) {
        let method = name.to_string();
        self.registry.register(
            name,
            Response::from_fn(move |_| {
                Err(MockError::UnexpectedCall {
                    method: method.clone(),
                })
            }),
        );
    }

    /// Serve `response` for the first `limit` calls, then fail with
    /// [`MockError::AtMostExceeded`]. A call uses up its slot even when the
    /// response fails.
    pub fn at_most(&self, limit: usize, name: &str, response: impl Into<Response>) {
        let inner = response.into().into_handler();
        let attempted = AtomicUsize::new(0);
        let method = name.to_string();
        self.registry.register(
            name,
            Response::from_fn(move |call| {
                if attempted.fetch_add(1, Ordering::SeqCst) >= limit {
                    return Err(MockError::AtMostExceeded {
                        method: method.clone(),
                        limit,
                    });
                }
                inner(call)
            }),
        );
    }

    /// Serve `response` and require at least `minimum` successful calls by
    /// the time expectations are verified.
    pub fn at_least(&self, minimum: usize, name: &str, response: impl Into<Response>) {
        let inner = response.into().into_handler();
        let calls = Arc::new(AtomicUsize::new(0));
        self.registry
            .add_expectation(Expectation::at_least(name, minimum, calls.clone()));
        self.registry.register(
            name,
            Response::from_fn(move |call| {
                let value = inner(call)?;
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            }),
        );
    }
}
