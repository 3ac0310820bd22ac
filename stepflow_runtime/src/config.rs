//! Runtime configuration.
//!
//! Values come from built-in defaults, then environment variables:
//!
//! - `STEPFLOW_STORE`: snapshot file holding all workflows (default: `stepflow.json`)
//! - `STEPFLOW_LOG`: tracing filter directive (default: `warn`)
//!
//! Command-line flags override both.

use std::path::PathBuf;

/// Runtime configuration for the store and logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Snapshot file loaded before and saved after each command
    pub store_path: PathBuf,
    /// Filter passed to the tracing subscriber
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("stepflow.json"),
            log_filter: "warn".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Loads configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("STEPFLOW_STORE").filter(|v| !v.trim().is_empty()) {
            config.store_path = PathBuf::from(path);
        }
        if let Some(filter) = lookup("STEPFLOW_LOG").filter(|v| !v.trim().is_empty()) {
            config.log_filter = filter;
        }

        config
    }

    /// Sets the snapshot path.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Sets the log filter.
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}
