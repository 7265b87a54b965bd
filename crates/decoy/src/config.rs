//! Mock configuration.
//!
//! Configuration can be built in code (`MockConfig::default()` plus field
//! updates) or loaded from YAML:
//!
//! ```yaml
//! name: checkout-tests
//! proxyPrefix: Mock_
//! retryBackoffMs: 1
//! checkReturnTypes: true
//! traceCalls: false
//! ```

use crate::reflect::is_identifier;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfig {
    /// Name attached to log events of registries built from this config
    #[serde(default = "default_name")]
    pub name: String,
    /// Prefix of generated proxy type names
    #[serde(default = "default_proxy_prefix")]
    pub proxy_prefix: String,
    /// Pause between `retry` attempts, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Validate mocked results against declared return types
    #[serde(default = "default_true")]
    pub check_return_types: bool,
    /// Log every invocation at info level
    #[serde(default)]
    pub trace_calls: bool,
}

fn default_name() -> String {
    "default".to_string()
}

fn default_proxy_prefix() -> String {
    "Mock_".to_string()
}

fn default_retry_backoff_ms() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            proxy_prefix: default_proxy_prefix(),
            retry_backoff_ms: default_retry_backoff_ms(),
            check_return_types: true,
            trace_calls: false,
        }
    }
}

impl MockConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        let config: MockConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Mock name must not be empty");
        }
        if !is_identifier(&self.proxy_prefix) {
            anyhow::bail!(
                "Invalid proxy prefix '{}': must start with a letter or '_' and contain only letters, digits and '_'",
                self.proxy_prefix
            );
        }
        Ok(())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
