//! Argument checks.

use super::BehaviorComposer;
use crate::error::MockError;
use crate::response::Response;
use serde_json::Value;

impl BehaviorComposer {
    /// Serve `response` only when the call's arguments equal `expected`
    /// exactly; otherwise fail with [`MockError::ArgsMismatch`].
    pub fn with_args(&self, name: &str, expected: Vec<Value>, response: impl Into<Response>) {
        let inner = response.into().into_handler();
        let method = name.to_string();
        self.registry.register(
            name,
            Response::from_fn(move |call| {
                if call.args != expected.as_slice() {
                    return Err(MockError::ArgsMismatch {
                        method: method.clone(),
                        expected: expected.clone(),
                        actual: call.args.to_vec(),
                    });
                }
                inner(call)
            }),
        );
    }

    /// Serve `response` only when `predicate` accepts the arguments;
    /// otherwise fail with [`MockError::ArgumentPredicateFailed`].
    pub fn with_arguments_matching<P>(&self, name: &str, predicate: P, response: impl Into<Response>)
    where
        P: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        let inner = response.into().into_handler();
        let method = name.to_string();
        self.registry.register(
            name,
            Response::from_fn(move |call| {
                if !predicate(call.args) {
                    return Err(MockError::ArgumentPredicateFailed {
                        method: method.clone(),
                    });
                }
                inner(call)
            }),
        );
    }
}
