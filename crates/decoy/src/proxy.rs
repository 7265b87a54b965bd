//! Mock instances.
//!
//! A [`MockObject`] is what tests hold and call. It owns a [`BoundInstance`]
//! (the identity pipelines see as `Invocation::instance`) and a handle to the
//! shared [`MethodRegistry`].

use crate::error::MockError;
use crate::reflect::{RealObject, TargetKind};
use crate::registry::MethodRegistry;
use crate::synth::{Fallback, ProxyType};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

struct InstanceState {
    proxy: Arc<ProxyType>,
    base: Option<Arc<dyn RealObject>>,
    constructor_params: Vec<Value>,
}

/// Handle to a created proxy instance. Clones refer to the same instance.
#[derive(Clone)]
pub struct BoundInstance {
    inner: Arc<InstanceState>,
}

impl BoundInstance {
    pub fn new(
        proxy: Arc<ProxyType>,
        base: Option<Arc<dyn RealObject>>,
        constructor_params: Vec<Value>,
    ) -> Self {
        Self {
            inner: Arc::new(InstanceState {
                proxy,
                base,
                constructor_params,
            }),
        }
    }

    /// Name of the mocked type.
    pub fn type_name(&self) -> &str {
        self.inner.proxy.target()
    }

    pub fn proxy_name(&self) -> &str {
        self.inner.proxy.name()
    }

    pub fn kind(&self) -> TargetKind {
        self.inner.proxy.kind()
    }

    pub fn proxy_type(&self) -> &Arc<ProxyType> {
        &self.inner.proxy
    }

    /// Whether a real base instance backs this proxy.
    pub fn is_concrete(&self) -> bool {
        self.inner.base.is_some()
    }

    pub fn constructor_params(&self) -> &[Value] {
        &self.inner.constructor_params
    }

    /// Call the real implementation of `method`, bypassing the registry.
    ///
    /// Fails with [`MockError::SpyUnsupported`] when there is no real
    /// instance; yields `Null` when the target does not declare `method`.
    pub fn call_original(&self, method: &str, args: &[Value]) -> Result<Value, MockError> {
        let Some(base) = &self.inner.base else {
            return Err(MockError::SpyUnsupported {
                method: method.to_string(),
            });
        };
        if self.inner.proxy.method(method).is_none() {
            return Ok(Value::Null);
        }
        base.call(method, args)
    }

    pub fn same_instance(&self, other: &BoundInstance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for BoundInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundInstance")
            .field("proxy", &self.proxy_name())
            .field("target", &self.type_name())
            .field("kind", &self.kind())
            .field("concrete", &self.is_concrete())
            .finish()
    }
}

/// A mock instance created by [`MockObjectFactory`](crate::MockObjectFactory).
#[derive(Clone)]
pub struct MockObject {
    handle: BoundInstance,
    registry: Arc<MethodRegistry>,
    check_return_types: bool,
}

impl MockObject {
    pub(crate) fn new(
        handle: BoundInstance,
        registry: Arc<MethodRegistry>,
        check_return_types: bool,
    ) -> Self {
        Self {
            handle,
            registry,
            check_return_types,
        }
    }

    /// Call `method` on the mock.
    ///
    /// Declared methods bind their arguments against the signature, then run
    /// the registry pipeline if one is configured. Without a pipeline a class
    /// mock calls the real implementation and an interface mock fails with
    /// [`MockError::MethodNotMocked`]. Undeclared methods are dispatched to
    /// the registry by name.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, MockError> {
        let Some(declared) = self.handle.proxy_type().method(method) else {
            return self.registry.invoke(method, &args, Some(&self.handle));
        };

        let args = declared.bind_arguments(args)?;
        if self.registry.has(method) {
            let value = self.registry.invoke(method, &args, Some(&self.handle))?;
            if declared.is_void() {
                return Ok(Value::Null);
            }
            if self.check_return_types {
                declared.check_return(&value)?;
            }
            return Ok(value);
        }

        match declared.fallback {
            Fallback::Base => {
                let value = self.call_base(method, &args)?;
                if declared.is_void() {
                    Ok(Value::Null)
                } else {
                    Ok(value)
                }
            }
            Fallback::NotMocked => Err(MockError::not_mocked(method)),
        }
    }

    /// [`call`](Self::call) and decode the result.
    pub fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> Result<T, MockError> {
        let value = self.call(method, args)?;
        serde_json::from_value(value.clone()).map_err(|_| MockError::ReturnTypeMismatch {
            method: method.to_string(),
            expected: std::any::type_name::<T>().to_string(),
            value,
        })
    }

    fn call_base(&self, method: &str, args: &[Value]) -> Result<Value, MockError> {
        match &self.handle.inner.base {
            Some(base) => base.call(method, args),
            None => Err(MockError::not_mocked(method)),
        }
    }

    pub fn handle(&self) -> &BoundInstance {
        &self.handle
    }

    pub fn type_name(&self) -> &str {
        self.handle.type_name()
    }

    pub fn proxy_name(&self) -> &str {
        self.handle.proxy_name()
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// Whether the registry has a pipeline for `method`.
    pub fn is_mocked(&self, method: &str) -> bool {
        self.registry.has(method)
    }

    /// Whether `self` is the instance behind `instance`.
    pub fn is(&self, instance: &BoundInstance) -> bool {
        self.handle.same_instance(instance)
    }
}

impl fmt::Debug for MockObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockObject")
            .field("instance", &self.handle)
            .field("registry", &self.registry.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{
        ClassDefinition, MethodSignature, MethodTable, Parameter, TypeDescriptor, TypeTag,
    };
    use crate::response::Response;
    use crate::synth::{InProcessLoader, ProxyLoader, ProxySynthesizer};
    use serde_json::json;

    fn counter_class() -> ClassDefinition {
        let descriptor = TypeDescriptor::class("Counter")
            .with_method(MethodSignature::new("value").returns(TypeTag::Int))
            .with_method(
                MethodSignature::new("add")
                    .param(Parameter::new("n").typed(TypeTag::Int))
                    .returns(TypeTag::Int),
            )
            .with_method(MethodSignature::new("reset").returns(TypeTag::Void));
        ClassDefinition::new(descriptor, |_| {
            let table = MethodTable::new("Counter")
                .method("value", |_| Ok(json!(10)))
                .method("add", |args| Ok(json!(10 + args[0].as_i64().unwrap_or(0))))
                .method("reset", |_| Ok(json!("ignored")));
            Ok(Arc::new(table) as Arc<dyn RealObject>)
        })
    }

    fn build(class: Option<ClassDefinition>, descriptor: &TypeDescriptor, name: &str) -> MockObject {
        let definition = ProxySynthesizer::new()
            .synthesize(descriptor, name, false)
            .unwrap();
        let proxy = Arc::new(InProcessLoader.load(definition, class).unwrap());
        let base = proxy.construct_base(&[]).unwrap();
        let handle = BoundInstance::new(proxy, base, vec![]);
        let registry = Arc::new(MethodRegistry::new());
        registry.bind(handle.clone());
        MockObject::new(handle, registry, true)
    }

    fn counter_mock(name: &str) -> MockObject {
        let class = counter_class();
        let descriptor = class.descriptor().clone();
        build(Some(class), &descriptor, name)
    }

    #[test]
    fn test_unmocked_class_method_calls_base() {
        let mock = counter_mock("Mock_Counter_100");
        assert_eq!(mock.call("value", vec![]).unwrap(), json!(10));
        assert_eq!(mock.call("add", vec![json!(5)]).unwrap(), json!(15));
        assert_eq!(mock.call("reset", vec![]).unwrap(), Value::Null);
        // Base calls never reach the registry.
        assert_eq!(mock.registry().get_call_count("value"), 0);
    }

    #[test]
    fn test_mocked_method_overrides_base() {
        let mock = counter_mock("Mock_Counter_101");
        mock.registry().register("value", 99);
        mock.registry().register("reset", "discarded");

        assert_eq!(mock.call_as::<i64>("value", vec![]).unwrap(), 99);
        assert_eq!(mock.call("reset", vec![]).unwrap(), Value::Null);
        assert_eq!(mock.registry().get_call_count("value"), 1);
    }

    #[test]
    fn test_return_type_is_checked() {
        let mock = counter_mock("Mock_Counter_102");
        mock.registry().register("value", "not an int");
        let err = mock.call("value", vec![]).unwrap_err();
        assert!(matches!(err, MockError::ReturnTypeMismatch { .. }));
    }

    #[test]
    fn test_arity_is_checked_before_dispatch() {
        let mock = counter_mock("Mock_Counter_103");
        let err = mock.call("add", vec![]).unwrap_err();
        assert!(matches!(err, MockError::ArgumentCount { .. }));
    }

    #[test]
    fn test_pipeline_receives_own_instance() {
        let mock = counter_mock("Mock_Counter_104");
        mock.registry().register(
            "whoami",
            Response::from_fn(|call| {
                Ok(json!(call.instance.map(|i| i.proxy_name()).unwrap_or("none")))
            }),
        );
        assert_eq!(mock.call("whoami", vec![]).unwrap(), json!("Mock_Counter_104"));
        let bound = mock.registry().bound_instance().unwrap();
        assert!(mock.is(&bound));
    }

    #[test]
    fn test_interface_without_pipeline_is_not_mocked() {
        let contract = TypeDescriptor::interface("Clock")
            .with_method(MethodSignature::new("tick").returns(TypeTag::Int));
        let mock = build(None, &contract, "Mock_Clock_100");

        let err = mock.call("tick", vec![]).unwrap_err();
        assert!(matches!(err, MockError::MethodNotMocked { .. }));

        mock.registry().register("tick", 1);
        assert_eq!(mock.call("tick", vec![]).unwrap(), json!(1));
    }

    #[test]
    fn test_catch_all_dispatch() {
        let mock = counter_mock("Mock_Counter_105");
        assert!(matches!(
            mock.call("undeclared", vec![json!(1)]),
            Err(MockError::MethodNotMocked { .. })
        ));
        mock.registry().register("undeclared", Response::from_fn(|call| Ok(json!(call.args.len()))));
        assert_eq!(mock.call("undeclared", vec![json!(1), json!(2)]).unwrap(), json!(2));
    }

    #[test]
    fn test_call_original() {
        let mock = counter_mock("Mock_Counter_106");
        let handle = mock.handle();
        assert_eq!(handle.call_original("add", &[json!(1)]).unwrap(), json!(11));
        assert_eq!(handle.call_original("unknown", &[]).unwrap(), Value::Null);

        let contract = TypeDescriptor::interface("Clock");
        let interface_mock = build(None, &contract, "Mock_Clock_101");
        let err = interface_mock.handle().call_original("tick", &[]).unwrap_err();
        assert!(matches!(err, MockError::SpyUnsupported { .. }));
    }

    #[test]
    fn test_call_as_reports_decode_failure() {
        let mock = counter_mock("Mock_Counter_107");
        let err = mock.call_as::<String>("value", vec![]).unwrap_err();
        assert!(matches!(err, MockError::ReturnTypeMismatch { .. }));
    }
}
