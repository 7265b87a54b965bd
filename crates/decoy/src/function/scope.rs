use super::ScopedFunctionMocker;
use crate::error::MockError;
use serde_json::Value;
use std::cell::RefCell;
use std::sync::Arc;
use tracing::debug;

thread_local! {
    static ACTIVE: RefCell<Option<Arc<ScopedFunctionMocker>>> = const { RefCell::new(None) };
}

fn active() -> Option<Arc<ScopedFunctionMocker>> {
    ACTIVE.with(|slot| slot.borrow().clone())
}

/// Route a free-function call through the mocker installed on this thread.
///
/// Without an installed mocker `real` runs untouched and nothing is counted.
pub fn intercept<F>(module: &str, name: &str, args: &[Value], real: F) -> Result<Value, MockError>
where
    F: FnOnce(&[Value]) -> Result<Value, MockError>,
{
    match active() {
        Some(mocker) => mocker.dispatch(module, name, args, real),
        None => real(args),
    }
}

/// [`intercept`] with the caller's module path.
///
/// ```
/// use decoy::{intercept, ScopedFunctionMocker};
/// use serde_json::json;
///
/// fn now() -> i64 {
///     intercept!("now", [], |_| Ok(json!(42)))
///         .ok()
///         .and_then(|v| v.as_i64())
///         .unwrap_or_default()
/// }
///
/// let mocker = ScopedFunctionMocker::new();
/// mocker.add("now", 7);
/// assert_eq!(mocker.run_scoped(None, now), 7);
/// assert_eq!(now(), 42);
/// ```
#[macro_export]
macro_rules! intercept {
    ($name:expr, [$($arg:expr),* $(,)?], $real:expr) => {
        $crate::function::intercept(
            module_path!(),
            $name,
            &[$($crate::__private::serde_json::json!($arg)),*],
            $real,
        )
    };
}

impl ScopedFunctionMocker {
    /// Install on this thread and start redirecting calls from modules
    /// starting with `module_hint` (every module when `None`).
    pub fn scope(self: &Arc<Self>, module_hint: Option<&str>) {
        {
            let mut scope = self.scope.write();
            scope.active = true;
            scope.module = module_hint.map(str::to_string);
        }
        ACTIVE.with(|slot| *slot.borrow_mut() = Some(self.clone()));
        debug!(module = ?module_hint, "Function scope started");
    }

    /// Stop redirecting. The mocker stays installed and keeps counting
    /// out-of-scope calls.
    pub fn end_scope(&self) {
        self.scope.write().active = false;
        debug!("Function scope ended");
    }

    /// Detach from this thread if installed.
    pub fn uninstall(self: &Arc<Self>) {
        self.end_scope();
        ACTIVE.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().is_some_and(|m| Arc::ptr_eq(m, self)) {
                *slot = None;
            }
        });
    }

    /// Whether this mocker is the one installed on the current thread.
    pub fn is_installed(self: &Arc<Self>) -> bool {
        active().is_some_and(|m| Arc::ptr_eq(&m, self))
    }

    /// [`scope`](Self::scope) until the guard drops.
    pub fn enter_scope(self: &Arc<Self>, module_hint: Option<&str>) -> ScopeGuard {
        self.scope(module_hint);
        ScopeGuard {
            mocker: self.clone(),
        }
    }

    /// Run `f` in scope, ending the scope afterwards even if `f` panics.
    pub fn run_scoped<R, F: FnOnce() -> R>(self: &Arc<Self>, module_hint: Option<&str>, f: F) -> R {
        let _guard = self.enter_scope(module_hint);
        f()
    }
}

/// Ends the mocker's scope on drop.
#[must_use = "the scope ends when the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard {
    mocker: Arc<ScopedFunctionMocker>,
}

impl ScopeGuard {
    pub fn mocker(&self) -> &Arc<ScopedFunctionMocker> {
        &self.mocker
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.mocker.end_scope();
    }
}
