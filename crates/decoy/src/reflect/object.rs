//! Real implementations behind class mocks.

use super::types::TypeDescriptor;
use crate::error::MockError;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A live instance of a mocked class. Proxies forward unmocked calls and
/// spy calls to it.
pub trait RealObject: Send + Sync {
    fn call(&self, method: &str, args: &[Value]) -> Result<Value, MockError>;
}

type RealMethod = Arc<dyn Fn(&[Value]) -> Result<Value, MockError> + Send + Sync>;

/// Builds the real instance from constructor parameters.
pub type Constructor = Arc<dyn Fn(&[Value]) -> Result<Arc<dyn RealObject>, MockError> + Send + Sync>;

/// Closure-backed [`RealObject`].
#[derive(Clone)]
pub struct MethodTable {
    type_name: String,
    methods: HashMap<String, RealMethod>,
}

impl MethodTable {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            methods: HashMap::new(),
        }
    }

    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, MockError> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(f));
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl RealObject for MethodTable {
    fn call(&self, method: &str, args: &[Value]) -> Result<Value, MockError> {
        match self.methods.get(method) {
            Some(f) => f(args),
            None => Err(MockError::UndefinedMethod {
                type_name: self.type_name.clone(),
                method: method.to_string(),
            }),
        }
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("MethodTable")
            .field("type_name", &self.type_name)
            .field("methods", &names)
            .finish()
    }
}

/// A class descriptor together with the constructor of its real instances.
#[derive(Clone)]
pub struct ClassDefinition {
    descriptor: TypeDescriptor,
    constructor: Constructor,
}

impl ClassDefinition {
    pub fn new<F>(descriptor: TypeDescriptor, constructor: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Arc<dyn RealObject>, MockError> + Send + Sync + 'static,
    {
        Self {
            descriptor,
            constructor: Arc::new(constructor),
        }
    }

    pub(crate) fn from_parts(descriptor: TypeDescriptor, constructor: Constructor) -> Self {
        Self {
            descriptor,
            constructor,
        }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn constructor(&self) -> &Constructor {
        &self.constructor
    }

    pub fn construct(&self, params: &[Value]) -> Result<Arc<dyn RealObject>, MockError> {
        (self.constructor)(params)
    }
}

impl fmt::Debug for ClassDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDefinition")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
