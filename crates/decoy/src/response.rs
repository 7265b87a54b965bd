//! Pipelines and the values they are built from.
//!
//! A pipeline is a [`Handler`]: a shared closure that receives an
//! [`Invocation`] and yields a result value or a [`MockError`]. Callers
//! configure pipelines with a [`Response`], which is either a direct value
//! (returned as-is on every call) or a callable.

use crate::error::MockError;
use crate::proxy::BoundInstance;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Shared pipeline closure.
pub type Handler = Arc<dyn Fn(&Invocation<'_>) -> Result<Value, MockError> + Send + Sync>;

/// A single call flowing through a pipeline.
///
/// `args` holds only the caller's arguments; the proxy instance the call was
/// made on travels separately in `instance`.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub method: &'a str,
    pub args: &'a [Value],
    pub instance: Option<&'a BoundInstance>,
}

impl<'a> Invocation<'a> {
    pub fn new(method: &'a str, args: &'a [Value], instance: Option<&'a BoundInstance>) -> Self {
        Self {
            method,
            args,
            instance,
        }
    }

    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    /// Decode argument `index` into `T`. A missing argument decodes as `null`.
    pub fn arg_as<T: DeserializeOwned>(&self, index: usize) -> Result<T, MockError> {
        let value = self.args.get(index).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| MockError::ArgumentDecode {
            method: self.method.to_string(),
            index,
            message: e.to_string(),
        })
    }

    /// Name of the mocked type the call was made on.
    pub fn type_name(&self) -> Option<&'a str> {
        self.instance.map(|i| i.type_name())
    }
}

/// What a pipeline produces when called.
#[derive(Clone)]
pub enum Response {
    /// Returned verbatim on every call.
    Value(Value),
    /// Invoked with the call's [`Invocation`].
    Handler(Handler),
}

impl Response {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<Value, MockError> + Send + Sync + 'static,
    {
        Response::Handler(Arc::new(f))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Response::Handler(_))
    }

    pub fn resolve(&self, call: &Invocation<'_>) -> Result<Value, MockError> {
        match self {
            Response::Value(value) => Ok(value.clone()),
            Response::Handler(handler) => handler(call),
        }
    }

    /// Normalise into a pipeline. Direct values become constant pipelines.
    pub fn into_handler(self) -> Handler {
        match self {
            Response::Handler(handler) => handler,
            Response::Value(value) => Arc::new(move |_: &Invocation<'_>| Ok(value.clone())),
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Response::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl From<Value> for Response {
    fn from(value: Value) -> Self {
        Response::Value(value)
    }
}

impl From<Handler> for Response {
    fn from(handler: Handler) -> Self {
        Response::Handler(handler)
    }
}

impl From<()> for Response {
    fn from(_: ()) -> Self {
        Response::Value(Value::Null)
    }
}

macro_rules! response_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Response {
                fn from(value: $ty) -> Self {
                    Response::Value(Value::from(value))
                }
            }
        )*
    };
}

response_from_scalar!(&str, String, bool, i32, i64, u32, u64, usize, f64, Vec<Value>);
