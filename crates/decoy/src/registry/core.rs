//! The method registry: named pipelines plus call bookkeeping.

use super::types::{CallEvent, CallRecord, Expectation, Observer};
use crate::config::MockConfig;
use crate::error::MockError;
use crate::proxy::BoundInstance;
use crate::response::{Handler, Invocation, Response};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Reserved pipeline run once per created mock instance.
pub const INSTANCE_CREATED: &str = "object.on.created";

/// Per-mock-family store of pipelines, counters and observers.
///
/// All state sits behind `parking_lot` locks. Locks are released before a
/// pipeline or observer runs, so pipelines may call back into the registry.
pub struct MethodRegistry {
    name: String,
    trace_calls: bool,
    pipelines: RwLock<HashMap<String, Handler>>,
    call_counts: RwLock<HashMap<String, usize>>,
    bound: RwLock<Option<BoundInstance>>,
    once_mode: AtomicBool,
    always: RwLock<Vec<Observer>>,
    monitors: RwLock<HashMap<String, Vec<Observer>>>,
    expectations: Mutex<Vec<Expectation>>,
    history: RwLock<Vec<CallRecord>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::from_config(&MockConfig::default())
    }

    pub fn from_config(config: &MockConfig) -> Self {
        Self {
            name: config.name.clone(),
            trace_calls: config.trace_calls,
            pipelines: RwLock::new(HashMap::new()),
            call_counts: RwLock::new(HashMap::new()),
            bound: RwLock::new(None),
            once_mode: AtomicBool::new(false),
            always: RwLock::new(Vec::new()),
            monitors: RwLock::new(HashMap::new()),
            expectations: Mutex::new(Vec::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Install or replace the pipeline for `name`.
    ///
    /// While once mode is active the pipeline is wrapped so its second
    /// successful call fails with [`MockError::OnceViolation`].
    pub fn register(&self, name: &str, response: impl Into<Response>) {
        let handler = response.into().into_handler();
        let once = self.once_mode.load(Ordering::SeqCst);
        let handler = if once {
            once_guard(name, handler)
        } else {
            handler
        };
        self.pipelines.write().insert(name.to_string(), handler);
        debug!(mock = %self.name, method = name, once, "Registered pipeline");
    }

    /// Register only if `name` has no pipeline yet. Returns whether it did.
    pub fn add_if_not_defined(&self, name: &str, response: impl Into<Response>) -> bool {
        if self.has(name) {
            return false;
        }
        self.register(name, response);
        true
    }

    pub fn has(&self, name: &str) -> bool {
        self.pipelines.read().contains_key(name)
    }

    /// Drop the pipeline for `name`. Returns whether one existed.
    pub fn remove(&self, name: &str) -> bool {
        self.pipelines.write().remove(name).is_some()
    }

    pub fn get_pipeline(&self, name: &str) -> Result<Handler, MockError> {
        self.pipelines
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| MockError::not_mocked(name))
    }

    /// Names of all configured pipelines, lifecycle pipeline excluded.
    pub fn get_methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .pipelines
            .read()
            .keys()
            .filter(|name| name.as_str() != INSTANCE_CREATED)
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn get_call_count(&self, name: &str) -> usize {
        self.call_counts.read().get(name).copied().unwrap_or(0)
    }

    /// Run the pipeline for `name`.
    ///
    /// `instance` defaults to the registry's bound instance. The call count
    /// is incremented only when the pipeline succeeds; observers then run in
    /// registration order, universal observers first.
    pub fn invoke(
        &self,
        name: &str,
        args: &[Value],
        instance: Option<&BoundInstance>,
    ) -> Result<Value, MockError> {
        let handler = self.get_pipeline(name)?;
        let fallback = match instance {
            Some(_) => None,
            None => self.bound.read().clone(),
        };
        let instance = instance.or(fallback.as_ref());

        let call = Invocation::new(name, args, instance);
        let result = match handler(&call) {
            Ok(value) => value,
            Err(err) => {
                debug!(mock = %self.name, method = name, error = %err, "Pipeline failed");
                return Err(err);
            }
        };

        self.increment(name);
        let event = CallEvent {
            type_name: instance.map(|i| i.type_name()),
            method: name,
            args,
            result: &result,
        };
        if self.trace_calls {
            info!(mock = %self.name, method = name, args = ?args, result = %result, "Mock called");
        } else {
            trace!(mock = %self.name, method = name, "Mock called");
        }
        self.history.write().push(CallRecord::from_event(&event));
        self.notify(&event)?;
        Ok(result)
    }

    /// Run the lifecycle pipeline for a freshly created instance. Neither
    /// counted nor observed.
    pub fn invoke_lifecycle(
        &self,
        instance: &BoundInstance,
        params: &[Value],
    ) -> Result<(), MockError> {
        let Some(handler) = self.pipelines.read().get(INSTANCE_CREATED).cloned() else {
            return Ok(());
        };
        handler(&Invocation::new(INSTANCE_CREATED, params, Some(instance)))?;
        Ok(())
    }

    fn increment(&self, name: &str) {
        *self
            .call_counts
            .write()
            .entry(name.to_string())
            .or_insert(0) += 1;
    }

    fn notify(&self, event: &CallEvent<'_>) -> Result<(), MockError> {
        let mut observers: Vec<Observer> = self.always.read().clone();
        if let Some(monitors) = self.monitors.read().get(event.method) {
            observers.extend(monitors.iter().cloned());
        }
        for observer in observers {
            observer(event)?;
        }
        Ok(())
    }

    /// Attach `instance` as the default receiver for calls made without one.
    pub fn bind(&self, instance: BoundInstance) {
        debug!(mock = %self.name, proxy = instance.proxy_name(), "Bound instance");
        *self.bound.write() = Some(instance);
    }

    pub fn bound_instance(&self) -> Option<BoundInstance> {
        self.bound.read().clone()
    }

    /// Run `configure` with once mode active, restoring the previous mode
    /// afterwards.
    pub fn once<F: FnOnce(&Self)>(&self, configure: F) {
        let _restore = OnceModeGuard {
            flag: &self.once_mode,
            previous: self.once_mode.swap(true, Ordering::SeqCst),
        };
        configure(self);
    }

    pub fn is_once_mode(&self) -> bool {
        self.once_mode.load(Ordering::SeqCst)
    }

    /// Observer notified after every successful invocation.
    pub fn add_always<F>(&self, observer: F)
    where
        F: Fn(&CallEvent<'_>) -> Result<(), MockError> + Send + Sync + 'static,
    {
        self.always.write().push(Arc::new(observer));
    }

    /// Observer notified after successful invocations of `name`.
    pub fn add_monitor<F>(&self, name: &str, observer: F)
    where
        F: Fn(&CallEvent<'_>) -> Result<(), MockError> + Send + Sync + 'static,
    {
        self.monitors
            .write()
            .entry(name.to_string())
            .or_default()
            .push(Arc::new(observer));
    }

    pub fn add_expectation(&self, expectation: Expectation) {
        self.expectations.lock().push(expectation);
    }

    pub fn pending_expectations(&self) -> usize {
        self.expectations.lock().len()
    }

    /// Check and discard every registered expectation. Returns the first
    /// unmet one; each expectation is checked exactly once.
    pub fn verify_expectations(&self) -> Result<(), MockError> {
        let expectations = std::mem::take(&mut *self.expectations.lock());
        let mut first_failure = None;
        for expectation in expectations {
            if let Err(err) = expectation.check() {
                debug!(mock = %self.name, error = %err, "Expectation not met");
                first_failure.get_or_insert(err);
            }
        }
        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn get_calls(&self) -> Vec<CallRecord> {
        self.history.read().clone()
    }

    pub fn get_calls_for(&self, name: &str) -> Vec<CallRecord> {
        self.history
            .read()
            .iter()
            .filter(|record| record.method == name)
            .cloned()
            .collect()
    }

    /// Drop every configured pipeline except the lifecycle pipeline.
    pub fn clear_methods(&self) {
        self.pipelines
            .write()
            .retain(|name, _| name == INSTANCE_CREATED);
    }

    /// Return to the freshly created state, keeping only the lifecycle
    /// pipeline.
    pub fn reset(&self) {
        self.clear_methods();
        self.call_counts.write().clear();
        self.history.write().clear();
        self.always.write().clear();
        self.monitors.write().clear();
        self.expectations.lock().clear();
        self.once_mode.store(false, Ordering::SeqCst);
        *self.bound.write() = None;
        debug!(mock = %self.name, "Registry reset");
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("name", &self.name)
            .field("methods", &self.get_methods())
            .field("once_mode", &self.is_once_mode())
            .finish()
    }
}

/// Puts back the previous once mode, also when the configurator panics.
struct OnceModeGuard<'a> {
    flag: &'a AtomicBool,
    previous: bool,
}

impl Drop for OnceModeGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::SeqCst);
    }
}

fn once_guard(name: &str, inner: Handler) -> Handler {
    let method = name.to_string();
    let served = AtomicBool::new(false);
    Arc::new(move |call: &Invocation<'_>| {
        if served.load(Ordering::SeqCst) {
            return Err(MockError::OnceViolation {
                method: method.clone(),
            });
        }
        let value = inner(call)?;
        served.store(true, Ordering::SeqCst);
        Ok(value)
    })
}
