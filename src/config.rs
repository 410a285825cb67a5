use std::time::Duration;

use anyhow::{Context, Result};

/// Public CSV the dashboard reads when nothing else is configured.
pub const DEFAULT_SOURCE: &str = "https://raw.githubusercontent.com/twrighta/scottish-water-sewage-dashapp/main/no_missing_scottish_sewage_spills.csv";
pub const DEFAULT_LOG_FILE: &str = "logs/spill_dash.log";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime settings, read from the environment (and `.env`, once `main`
/// has loaded it).
///
/// | Variable                  | Default                 |
/// |---------------------------|-------------------------|
/// | `SPILL_DASH_SOURCE`       | [`DEFAULT_SOURCE`]      |
/// | `SPILL_DASH_TIMEOUT_SECS` | `30`                    |
/// | `LOG_FILE_PATH`           | [`DEFAULT_LOG_FILE`]    |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashConfig {
    pub source: String,
    pub timeout: Duration,
    pub log_file_path: String,
}

impl DashConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match get("SPILL_DASH_TIMEOUT_SECS") {
            Some(v) => v.trim().parse::<u64>().with_context(|| {
                format!("SPILL_DASH_TIMEOUT_SECS must be whole seconds, got '{v}'")
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(DashConfig {
            source: get("SPILL_DASH_SOURCE").unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            log_file_path: get("LOG_FILE_PATH").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
        })
    }

    /// Replaces the configured source when `source` is given.
    pub fn with_source(mut self, source: Option<String>) -> Self {
        if let Some(s) = source {
            self.source = s;
        }
        self
    }
}
