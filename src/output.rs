//! Output formatting and persistence for rendered dashboards.
//!
//! Rendered JSON goes to stdout or a file; logging goes through `tracing`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::dashboard::Dashboard;

/// Logs a dashboard using Rust's debug pretty-print format.
pub fn print_pretty(dashboard: &Dashboard) {
    debug!("{:#?}", dashboard);
}

/// Serializes `value` as JSON, either pretty-printed or as a single line.
pub fn to_json(value: &impl Serialize, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Writes `value` as pretty JSON to `path`, replacing any existing file and
/// creating missing parent directories.
pub fn write_json(path: &str, value: &impl Serialize) -> Result<()> {
    let path_ref = Path::new(path);
    if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }

    let json = to_json(value, true)?;
    fs::write(path_ref, json).with_context(|| format!("writing {path}"))?;
    info!(path, "Wrote JSON output");
    Ok(())
}
