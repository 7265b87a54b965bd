//! MockObjectFactory - synthesis, instantiation and configuration of mocks.
//!
//! A factory owns one [`MethodRegistry`] and exposes the whole behaviour
//! vocabulary of [`BehaviorComposer`] directly, so tests rarely need to touch
//! the registry or composer.
//!
//! ```
//! use decoy::{MethodSignature, MockObjectFactory, TypeCatalog, TypeDescriptor, TypeTag};
//! use std::sync::Arc;
//!
//! let catalog = TypeCatalog::new();
//! catalog.register(
//!     TypeDescriptor::interface("Clock")
//!         .with_method(MethodSignature::new("now").returns(TypeTag::Int)),
//! );
//!
//! let factory = MockObjectFactory::new(Arc::new(catalog));
//! factory.method("now", 1_700_000_000);
//! let clock = factory.mock("Clock").unwrap();
//! assert_eq!(clock.call_as::<i64>("now", vec![]).unwrap(), 1_700_000_000);
//! ```

use crate::behaviors::BehaviorComposer;
use crate::config::MockConfig;
use crate::error::MockError;
use crate::proxy::{BoundInstance, MockObject};
use crate::reflect::{Reflector, TargetKind};
use crate::registry::{CallEvent, CallRecord, MethodRegistry, INSTANCE_CREATED};
use crate::response::{Invocation, Response};
use crate::synth::{InProcessLoader, ProxyLoader, ProxySynthesizer};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Proxy type names are unique across every factory in the process.
static PROXY_COUNTER: AtomicU64 = AtomicU64::new(1);

type Environment = Arc<dyn Fn(&MockObjectFactory) + Send + Sync>;

/// Creates mock objects that share one [`MethodRegistry`].
///
/// The registry's bound instance is the most recently created mock. Tests
/// that need independent mocks of the same type use one factory per mock.
pub struct MockObjectFactory {
    registry: Arc<MethodRegistry>,
    behaviors: BehaviorComposer,
    synthesizer: ProxySynthesizer,
    reflector: Arc<dyn Reflector>,
    loader: Arc<dyn ProxyLoader>,
    config: MockConfig,
    environments: RwLock<HashMap<String, Environment>>,
}

impl MockObjectFactory {
    pub fn new(reflector: Arc<dyn Reflector>) -> Self {
        Self::with_config(reflector, MockConfig::default())
    }

    pub fn with_config(reflector: Arc<dyn Reflector>, config: MockConfig) -> Self {
        let registry = Arc::new(MethodRegistry::from_config(&config));
        Self::from_registry(reflector, registry, config)
    }

    /// Build a factory over an existing registry. The lifecycle pipeline is
    /// only installed if the registry has none.
    pub fn from_registry(
        reflector: Arc<dyn Reflector>,
        registry: Arc<MethodRegistry>,
        config: MockConfig,
    ) -> Self {
        registry.add_if_not_defined(INSTANCE_CREATED, ());
        let behaviors = BehaviorComposer::with_config(registry.clone(), &config);
        Self {
            registry,
            behaviors,
            synthesizer: ProxySynthesizer::new(),
            reflector,
            loader: Arc::new(InProcessLoader),
            config,
            environments: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the loader that turns proxy definitions into proxy types.
    pub fn with_loader(mut self, loader: Arc<dyn ProxyLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    pub fn behaviors(&self) -> &BehaviorComposer {
        &self.behaviors
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    pub fn synthesizer(&self) -> &ProxySynthesizer {
        &self.synthesizer
    }

    // ===== Creation =====

    /// Synthesize a proxy for `target` and instantiate it.
    ///
    /// Class targets build their real base instance from `params`, unless
    /// `override_constructor` is set, in which case the base constructor gets
    /// no parameters. The lifecycle pipeline then runs with the new instance
    /// and `params`; its failure aborts creation.
    pub fn create_mock(
        &self,
        target: &str,
        params: Vec<Value>,
        override_constructor: bool,
    ) -> Result<MockObject, MockError> {
        let descriptor = self.reflector.reflect(target)?;
        let proxy_name = self.allocate_name(&descriptor.name);
        let definition =
            self.synthesizer
                .synthesize(&descriptor, &proxy_name, override_constructor)?;

        let class = match descriptor.kind {
            TargetKind::Class => self.reflector.class(&descriptor.name),
            TargetKind::Interface => None,
        };
        let proxy = Arc::new(self.loader.load(definition, class)?);
        let base = proxy.construct_base(&params)?;
        let handle = BoundInstance::new(proxy, base, params);

        self.registry
            .invoke_lifecycle(&handle, handle.constructor_params())?;
        self.registry.bind(handle.clone());

        debug!(
            mock = %self.config.name,
            proxy = %proxy_name,
            target = %descriptor.name,
            kind = %descriptor.kind,
            "Created mock instance"
        );
        Ok(MockObject::new(
            handle,
            self.registry.clone(),
            self.config.check_return_types,
        ))
    }

    /// [`create_mock`](Self::create_mock) without constructor parameters.
    pub fn mock(&self, target: &str) -> Result<MockObject, MockError> {
        self.create_mock(target, Vec::new(), false)
    }

    /// Rust source of a proxy for `target`, for checking in ahead of time.
    pub fn generate_code(
        &self,
        target: &str,
        override_constructor: bool,
    ) -> Result<String, MockError> {
        let descriptor = self.reflector.reflect(target)?;
        let proxy_name = self.allocate_name(&descriptor.name);
        let definition =
            self.synthesizer
                .synthesize(&descriptor, &proxy_name, override_constructor)?;
        Ok(definition.render())
    }

    fn allocate_name(&self, type_name: &str) -> String {
        let sanitized: String = type_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let n = PROXY_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{}{}_{}", self.config.proxy_prefix, sanitized, n)
    }

    /// Replace the lifecycle pipeline with `hook`, called with every new
    /// instance and its constructor parameters.
    pub fn on_mock_instance_created<F>(&self, hook: F)
    where
        F: Fn(&BoundInstance, &[Value]) -> Result<(), MockError> + Send + Sync + 'static,
    {
        self.registry.register(
            INSTANCE_CREATED,
            Response::from_fn(move |call: &Invocation<'_>| {
                if let Some(instance) = call.instance {
                    hook(instance, call.args)?;
                }
                Ok(Value::Null)
            }),
        );
    }

    // ===== Registry =====

    pub fn method(&self, name: &str, response: impl Into<Response>) {
        self.registry.register(name, response);
    }

    pub fn add_if_not_defined(&self, name: &str, response: impl Into<Response>) -> bool {
        self.registry.add_if_not_defined(name, response)
    }

    pub fn has_method_mock(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    pub fn get_call_count(&self, name: &str) -> usize {
        self.registry.get_call_count(name)
    }

    pub fn get_methods(&self) -> Vec<String> {
        self.registry.get_methods()
    }

    pub fn get_calls(&self) -> Vec<CallRecord> {
        self.registry.get_calls()
    }

    pub fn get_calls_for(&self, name: &str) -> Vec<CallRecord> {
        self.registry.get_calls_for(name)
    }

    /// Check every `at_least` expectation registered so far.
    pub fn verify_expectations(&self) -> Result<(), MockError> {
        self.registry.verify_expectations()
    }

    pub fn reset(&self) {
        self.registry.reset();
    }

    /// Everything registered inside `configure` succeeds at most once.
    pub fn once<F: FnOnce(&Self)>(&self, configure: F) {
        self.registry.once(|_| configure(self));
    }

    // ===== Behaviours =====

    pub fn never(&self, name: &str) {
        self.behaviors.never(name);
    }

    pub fn at_most(&self, limit: usize, name: &str, response: impl Into<Response>) {
        self.behaviors.at_most(limit, name, response);
    }

    pub fn at_least(&self, minimum: usize, name: &str, response: impl Into<Response>) {
        self.behaviors.at_least(minimum, name, response);
    }

    pub fn with_args(&self, name: &str, expected: Vec<Value>, response: impl Into<Response>) {
        self.behaviors.with_args(name, expected, response);
    }

    pub fn with_arguments_matching<P>(&self, name: &str, predicate: P, response: impl Into<Response>)
    where
        P: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        self.behaviors
            .with_arguments_matching(name, predicate, response);
    }

    pub fn after_delay(&self, delay: Duration, name: &str, response: impl Into<Response>) {
        self.behaviors.after_delay(delay, name, response);
    }

    pub fn before_delay(&self, delay: Duration, name: &str, response: impl Into<Response>) {
        self.behaviors.before_delay(delay, name, response);
    }

    pub fn after<F>(&self, name: &str, hook: F) -> Result<(), MockError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.behaviors.after(name, hook)
    }

    pub fn apply_default_mock_methods<I, K, R>(&self, defaults: I)
    where
        I: IntoIterator<Item = (K, R)>,
        K: AsRef<str>,
        R: Into<Response>,
    {
        self.behaviors.apply_default_mock_methods(defaults);
    }

    pub fn throws_exception(&self, name: &str, error: MockError) {
        self.behaviors.throws_exception(name, error);
    }

    pub fn retry(&self, max_attempts: u32, name: &str, response: impl Into<Response>) {
        self.behaviors.retry(max_attempts, name, response);
    }

    pub fn with_timeout(&self, timeout: Duration, name: &str, response: impl Into<Response>) {
        self.behaviors.with_timeout(timeout, name, response);
    }

    pub fn spy_method(&self, name: &str, response: impl Into<Response>) {
        self.behaviors.spy_method(name, response);
    }

    pub fn monitoring_method<F>(&self, name: &str, hook: F)
    where
        F: Fn(&CallEvent<'_>) + Send + Sync + 'static,
    {
        self.behaviors.monitoring_method(name, hook);
    }

    pub fn monitoring_methods<I, S, F>(&self, names: I, hook: F)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&CallEvent<'_>) + Send + Sync + 'static,
    {
        self.behaviors.monitoring_methods(names, hook);
    }

    pub fn always<F>(&self, hook: F)
    where
        F: Fn(&CallEvent<'_>) + Send + Sync + 'static,
    {
        self.behaviors.always(hook);
    }

    pub fn log(&self, path: impl Into<PathBuf>) {
        self.behaviors.log(path);
    }

    pub fn add_consecutive<I, V>(&self, name: &str, returns: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.behaviors.add_consecutive(name, returns);
    }

    // ===== Environments =====

    /// Register a named set of method configurations.
    pub fn add_environment<F>(&self, name: &str, configure: F)
    where
        F: Fn(&MockObjectFactory) + Send + Sync + 'static,
    {
        self.environments
            .write()
            .insert(name.to_string(), Arc::new(configure));
    }

    /// Drop all configured methods and apply environment `name`.
    pub fn set_environment(&self, name: &str) -> Result<(), MockError> {
        let environment = self
            .environments
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| MockError::UnknownEnvironment(name.to_string()))?;
        self.registry.clear_methods();
        environment(self);
        debug!(mock = %self.config.name, environment = name, "Environment applied");
        Ok(())
    }

    pub fn get_environments(&self) -> Vec<String> {
        let mut names: Vec<String> = self.environments.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Drop for MockObjectFactory {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        let pending = self.registry.pending_expectations();
        if pending > 0 {
            warn!(
                mock = %self.config.name,
                pending,
                "Mock factory dropped with unverified expectations; call verify_expectations()"
            );
        }
    }
}

impl std::fmt::Debug for MockObjectFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockObjectFactory")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("proxies", &self.synthesizer.len())
            .finish()
    }
}
