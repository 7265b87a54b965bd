//! Runtime test doubles.
//!
//! `decoy` creates mock objects for types described by a [`Reflector`],
//! routes every call through a per-method pipeline in a [`MethodRegistry`]
//! and lets tests compose behaviours (call limits, argument checks, delays,
//! retries, timeouts, spies, monitors, call logs) on top of a base response.
//!
//! ## Module Structure
//!
//! - `registry` - pipelines, call counts, observers, expectations
//! - `behaviors` - the behaviour vocabulary built on the registry
//! - `reflect` - type descriptors and real implementations
//! - `synth` - proxy definitions, loading and source rendering
//! - `proxy` - mock instances
//! - `factory` - `MockObjectFactory`, the entry point for tests
//! - `function` - scoped interception of free functions

// ===== Core =====
pub mod error;
pub mod registry;
pub mod response;

// ===== Behaviours =====
pub mod behaviors;
pub mod call_log;

// ===== Proxies =====
pub mod factory;
pub mod proxy;
pub mod reflect;
pub mod synth;

// ===== Free functions =====
pub mod function;

pub mod config;

pub use behaviors::BehaviorComposer;
pub use call_log::CallLog;
pub use config::MockConfig;
pub use error::MockError;
pub use factory::MockObjectFactory;
pub use function::{intercept, CallCount, ScopeGuard, ScopedFunctionMocker};
pub use proxy::{BoundInstance, MockObject};
pub use reflect::{
    ClassDefinition, MethodSignature, MethodTable, Parameter, RealObject, Reflector, TargetKind,
    TypeCatalog, TypeDescriptor, TypeTag,
};
pub use registry::{CallEvent, CallRecord, MethodRegistry, INSTANCE_CREATED};
pub use response::{Handler, Invocation, Response};
pub use synth::{InProcessLoader, ProxyDefinition, ProxyLoader, ProxySynthesizer, ProxyType};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
