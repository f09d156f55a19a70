//! Store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for a single store.
///
/// All fields have defaults, so a partial JSON document is enough:
///
/// ```rust
/// use tickstore_core::StoreConfig;
///
/// let config = StoreConfig::from_json(r#"{ "name": "session" }"#).unwrap();
/// assert_eq!(config.name, "session");
/// assert_eq!(config.slow_listener_ms, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name used in log fields and error messages.
    pub name: String,

    /// Listeners that run longer than this many milliseconds are reported
    /// with a `warn` event. `None` disables the check.
    pub slow_listener_ms: Option<u64>,
}

impl StoreConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Set the store name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the slow-listener threshold.
    pub fn with_slow_listener(mut self, threshold: Duration) -> Self {
        self.slow_listener_ms = Some(u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub(crate) fn slow_listener_threshold(&self) -> Option<Duration> {
        self.slow_listener_ms.map(Duration::from_millis)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            slow_listener_ms: None,
        }
    }
}
