//! Scoped interception of free functions.
//!
//! Free functions cannot be overridden, so code under test routes the calls
//! it wants to make replaceable through [`intercept`] (or the
//! [`intercept!`](crate::intercept) macro). When a [`ScopedFunctionMocker`]
//! is installed on the current thread and in scope for the caller's module,
//! mocked names run their pipeline instead of the real function.
//!
//! ## Module Structure
//!
//! - `mod.rs` - `ScopedFunctionMocker`, `CallCount`
//! - `scope.rs` - thread-local installation, `ScopeGuard`, `intercept`
//! - `tests.rs` - unit tests

mod scope;

#[cfg(test)]
mod tests;

pub use scope::{intercept, ScopeGuard};

use crate::behaviors::BehaviorComposer;
use crate::call_log::CallLog;
use crate::config::MockConfig;
use crate::error::MockError;
use crate::registry::{CallEvent, MethodRegistry, Observer};
use crate::response::Response;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};

/// A real free-function implementation.
pub type RealFunction = Arc<dyn Fn(&[Value]) -> Result<Value, MockError> + Send + Sync>;

type Environment = Arc<dyn Fn(&ScopedFunctionMocker) + Send + Sync>;

/// Observer for one function name, or for every function when `None`.
type FunctionObserver = (Option<String>, Observer);

/// Calls of one function, split by whether they happened in scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCount {
    pub in_scope: usize,
    pub out_scope: usize,
}

impl CallCount {
    pub fn total(&self) -> usize {
        self.in_scope + self.out_scope
    }
}

#[derive(Debug, Default)]
struct ScopeState {
    active: bool,
    module: Option<String>,
}

/// Redirects free-function calls to mocked behaviours while in scope.
///
/// Mocked functions are pipelines in an internal [`MethodRegistry`], so the
/// whole behaviour vocabulary is available through
/// [`behaviors`](Self::behaviors).
pub struct ScopedFunctionMocker {
    registry: Arc<MethodRegistry>,
    behaviors: BehaviorComposer,
    reals: RwLock<HashMap<String, RealFunction>>,
    counts: RwLock<HashMap<String, CallCount>>,
    observers: RwLock<Vec<FunctionObserver>>,
    scope: RwLock<ScopeState>,
    environments: RwLock<HashMap<String, Environment>>,
}

impl ScopedFunctionMocker {
    pub fn new() -> Arc<Self> {
        Self::with_config(&MockConfig::default())
    }

    pub fn with_config(config: &MockConfig) -> Arc<Self> {
        let registry = Arc::new(MethodRegistry::from_config(config));
        let behaviors = BehaviorComposer::with_config(registry.clone(), config);
        Arc::new(Self {
            registry,
            behaviors,
            reals: RwLock::new(HashMap::new()),
            counts: RwLock::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
            scope: RwLock::new(ScopeState::default()),
            environments: RwLock::new(HashMap::new()),
        })
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    pub fn behaviors(&self) -> &BehaviorComposer {
        &self.behaviors
    }

    // ===== Configuration =====

    /// Mock function `name` with `response`.
    pub fn add(&self, name: &str, response: impl Into<Response>) {
        self.registry.register(name, response);
    }

    pub fn add_if_not_defined(&self, name: &str, response: impl Into<Response>) -> bool {
        self.registry.add_if_not_defined(name, response)
    }

    pub fn has(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    pub fn add_consecutive<I, V>(&self, name: &str, returns: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.behaviors.add_consecutive(name, returns);
    }

    /// Functions mocked inside `configure` succeed at most once in scope.
    pub fn once<F: FnOnce(&Self)>(&self, configure: F) {
        self.registry.once(|_| configure(self));
    }

    /// Observe every successful call of `name`, mocked or real, in or out
    /// of scope.
    pub fn monitoring<F>(&self, name: &str, hook: F)
    where
        F: Fn(&CallEvent<'_>) + Send + Sync + 'static,
    {
        self.observe(Some(name), move |event| {
            hook(event);
            Ok(())
        });
    }

    /// Observe every successful intercepted call.
    pub fn monitoring_all<F>(&self, hook: F)
    where
        F: Fn(&CallEvent<'_>) + Send + Sync + 'static,
    {
        self.observe(None, move |event| {
            hook(event);
            Ok(())
        });
    }

    /// Append a line per successful intercepted call to the file at `path`.
    pub fn log(&self, path: impl Into<PathBuf>) {
        let log = CallLog::new(path);
        self.observe(None, move |event| log.append(event));
    }

    fn observe<F>(&self, name: Option<&str>, observer: F)
    where
        F: Fn(&CallEvent<'_>) -> Result<(), MockError> + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);
        self.observers
            .write()
            .push((name.map(str::to_string), observer));
    }

    fn notify(&self, event: &CallEvent<'_>) -> Result<(), MockError> {
        let observers: Vec<Observer> = self
            .observers
            .read()
            .iter()
            .filter(|(name, _)| name.as_deref().map_or(true, |n| n == event.method))
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(event)?;
        }
        Ok(())
    }

    /// Record the real implementation of `name`, callable from mocks through
    /// [`call_real`](Self::call_real).
    pub fn real<F>(&self, name: &str, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, MockError> + Send + Sync + 'static,
    {
        self.reals.write().insert(name.to_string(), Arc::new(f));
    }

    pub fn call_real(&self, name: &str, args: &[Value]) -> Result<Value, MockError> {
        let real = self
            .reals
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| MockError::UndefinedMethod {
                type_name: "fn".to_string(),
                method: name.to_string(),
            })?;
        real(args)
    }

    /// Stop mocking `name`; in-scope calls run the real function again.
    pub fn restore_original_function(&self, name: &str) -> bool {
        let removed = self.registry.remove(name);
        if removed {
            debug!(function = name, "Restored original function");
        }
        removed
    }

    // ===== Counting =====

    pub fn get_called_count(&self, name: &str) -> CallCount {
        self.counts.read().get(name).copied().unwrap_or_default()
    }

    pub fn get_called_count_in_scope(&self, name: &str) -> usize {
        self.get_called_count(name).in_scope
    }

    pub fn get_called_count_out_scope(&self, name: &str) -> usize {
        self.get_called_count(name).out_scope
    }

    pub fn get_total_count(&self, name: &str) -> usize {
        self.get_called_count(name).total()
    }

    pub fn reset_counts(&self) {
        self.counts.write().clear();
    }

    /// Drop mocks, observers and counts. Real functions and environments
    /// are kept.
    pub fn reset(&self) {
        self.registry.reset();
        self.observers.write().clear();
        self.reset_counts();
    }

    // ===== Scope =====

    pub fn is_in_scope(&self) -> bool {
        self.scope.read().active
    }

    /// Module prefix the current scope is limited to.
    pub fn module_hint(&self) -> Option<String> {
        self.scope.read().module.clone()
    }

    /// Whether a call from `module` is currently redirected. A hint covers
    /// the module it names and its submodules.
    pub fn covers(&self, module: &str) -> bool {
        let scope = self.scope.read();
        scope.active && scope.module.as_deref().map_or(true, |hint| within(module, hint))
    }

    fn record(&self, name: &str, in_scope: bool) {
        let mut counts = self.counts.write();
        let count = counts.entry(name.to_string()).or_default();
        if in_scope {
            count.in_scope += 1;
        } else {
            count.out_scope += 1;
        }
    }

    pub(crate) fn dispatch<F>(
        &self,
        module: &str,
        name: &str,
        args: &[Value],
        real: F,
    ) -> Result<Value, MockError>
    where
        F: FnOnce(&[Value]) -> Result<Value, MockError>,
    {
        let in_scope = self.covers(module);
        let value = if in_scope && self.registry.has(name) {
            trace!(module, function = name, "Mocked function call");
            self.registry.invoke(name, args, None)?
        } else {
            real(args)?
        };
        self.record(name, in_scope);
        self.notify(&CallEvent {
            type_name: None,
            method: name,
            args,
            result: &value,
        })?;
        Ok(value)
    }

    // ===== Environments =====

    pub fn add_environment<F>(&self, name: &str, configure: F)
    where
        F: Fn(&ScopedFunctionMocker) + Send + Sync + 'static,
    {
        self.environments
            .write()
            .insert(name.to_string(), Arc::new(configure));
    }

    /// Drop all mocked functions and apply environment `name`.
    pub fn set_environment(&self, name: &str) -> Result<(), MockError> {
        let environment = self
            .environments
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| MockError::UnknownEnvironment(name.to_string()))?;
        self.registry.clear_methods();
        environment(self);
        debug!(environment = name, "Function environment applied");
        Ok(())
    }

    /// Apply environment `name`, then run `f` in scope for `module_hint`.
    pub fn execute_in_environment<R, F>(
        self: &Arc<Self>,
        name: &str,
        module_hint: Option<&str>,
        f: F,
    ) -> Result<R, MockError>
    where
        F: FnOnce() -> R,
    {
        self.set_environment(name)?;
        Ok(self.run_scoped(module_hint, f))
    }
}

fn within(module: &str, hint: &str) -> bool {
    let hint = hint.trim_end_matches("::");
    module
        .strip_prefix(hint)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl std::fmt::Debug for ScopedFunctionMocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scope = self.scope.read();
        f.debug_struct("ScopedFunctionMocker")
            .field("functions", &self.registry.get_methods())
            .field("in_scope", &scope.active)
            .field("module", &scope.module)
            .finish()
    }
}
