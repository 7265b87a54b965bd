//! Spies, monitors and call logging.

use super::BehaviorComposer;
use crate::call_log::CallLog;
use crate::error::MockError;
use crate::registry::CallEvent;
use crate::response::Response;
use std::path::PathBuf;

impl BehaviorComposer {
    /// Call the real implementation first, discard its result, then serve
    /// `response`. Fails with [`MockError::SpyUnsupported`] when no real
    /// instance is attached to the call.
    pub fn spy_method(&self, name: &str, response: impl Into<Response>) {
        let inner = response.into().into_handler();
        let method = name.to_string();
        self.registry.register(
            name,
            Response::from_fn(move |call| {
                let Some(instance) = call.instance else {
                    return Err(MockError::SpyUnsupported {
                        method: method.clone(),
                    });
                };
                instance.call_original(&method, call.args)?;
                inner(call)
            }),
        );
    }

    /// Observe successful calls to `name`.
    pub fn monitoring_method<F>(&self, name: &str, hook: F)
    where
        F: Fn(&CallEvent<'_>) + Send + Sync + 'static,
    {
        self.registry.add_monitor(name, move |event| {
            hook(event);
            Ok(())
        });
    }

    /// Observe successful calls to every name in `names` with one hook.
    pub fn monitoring_methods<I, S, F>(&self, names: I, hook: F)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&CallEvent<'_>) + Send + Sync + 'static,
    {
        let hook = std::sync::Arc::new(hook);
        for name in names {
            let hook = hook.clone();
            self.monitoring_method(name.as_ref(), move |event| hook(event));
        }
    }

    /// Observe every successful call.
    pub fn always<F>(&self, hook: F)
    where
        F: Fn(&CallEvent<'_>) + Send + Sync + 'static,
    {
        self.registry.add_always(move |event| {
            hook(event);
            Ok(())
        });
    }

    /// Append a line per successful call to the file at `path`.
    ///
    /// Write failures surface as [`MockError::LogWrite`] from the call that
    /// triggered them.
    pub fn log(&self, path: impl Into<PathBuf>) {
        let log = CallLog::new(path);
        self.registry.add_always(move |event| log.append(event));
    }
}
