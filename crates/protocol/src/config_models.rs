//! Global configuration models for `.team-kit/config.toml`.
//!
//! This module defines the structure of the global configuration file that
//! controls project-wide settings for team-kit.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Turn ceiling applied to teams that do not set their own.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Represents global settings from `.team-kit/config.toml`.
///
/// # Example
///
/// ```toml
/// # .team-kit/config.toml
/// default-max-iterations = 10
/// history-window = 5
/// log-level = "info"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalConfig {
    /// Turn ceiling for teams that do not declare `max-iterations`.
    #[serde(default = "default_max_iterations")]
    pub default_max_iterations: u32,

    /// Number of most recent messages sent to the gateway on each call.
    ///
    /// `None` sends the whole transcript.
    #[serde(default)]
    pub history_window: Option<usize>,

    /// Log filter used by the CLI when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_max_iterations: DEFAULT_MAX_ITERATIONS,
            history_window: None,
            log_level: default_log_level(),
        }
    }
}
