//! Runtime Configuration
//!
//! Process-wide switches consulted by the engine. The defaults describe an
//! interactive development build: warnings on, server rendering off.
//!
//! ```rust,ignore
//! use ripple_core::Config;
//!
//! Config::update(|config| config.warnings = false);
//!
//! let config = Config::from_json(r#"{ "server_rendering": true }"#)?;
//! config.install();
//! ```

use std::sync::OnceLock;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Result;

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

fn global() -> &'static RwLock<Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default()))
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Emit development warnings for unsupported mutations.
    pub warnings: bool,

    /// Non-interactive rendering environment. While set, `observe` never
    /// wraps new values.
    pub server_rendering: bool,

    /// How deep a watcher may re-enter itself through synchronous
    /// notification before further re-runs are refused.
    pub max_update_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            warnings: true,
            server_rendering: false,
            max_update_depth: 100,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Snapshot of the active configuration.
    pub fn current() -> Self {
        global().read().clone()
    }

    /// Replace the active configuration.
    pub fn install(self) {
        tracing::debug!(config = ?self, "installing configuration");
        *global().write() = self;
    }

    /// Modify the active configuration in place.
    pub fn update<F>(f: F)
    where
        F: FnOnce(&mut Config),
    {
        f(&mut global().write());
    }
}

/// Whether development warnings are enabled.
pub(crate) fn warnings_enabled() -> bool {
    global().read().warnings
}

/// The environment gate: are we rendering non-interactively?
pub(crate) fn is_server_rendering() -> bool {
    global().read().server_rendering
}

pub(crate) fn max_update_depth() -> usize {
    global().read().max_update_depth
}
