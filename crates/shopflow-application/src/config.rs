//! Controller configuration.

use serde::{Deserialize, Serialize};
use shopflow_core::error::{Result, ShopflowError};

fn default_phrasing_timeout_secs() -> u64 {
    20
}

fn default_clarify_retry_limit() -> u8 {
    1
}

/// Tunables for the turn pipeline, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Seconds to wait on the phrasing capability before falling back to
    /// the deterministic templates.
    #[serde(default = "default_phrasing_timeout_secs")]
    pub phrasing_timeout_secs: u64,
    /// Deterministic re-prompts before escalating an unparseable answer to
    /// a generative clarification.
    #[serde(default = "default_clarify_retry_limit")]
    pub clarify_retry_limit: u8,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            phrasing_timeout_secs: default_phrasing_timeout_secs(),
            clarify_retry_limit: default_clarify_retry_limit(),
        }
    }
}

impl ControllerConfig {
    /// Parses a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ShopflowError::config(e.to_string()))
    }
}
