//! Configuration for the watch subsystem.
//!
//! Values are injected into the components at construction time. Nothing
//! here reads the process environment at use sites, so tests and
//! deployments can override limits per instance.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for the watch registry and notification store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Ceiling on subscriptions per item. Subscribe attempts beyond this
    /// fail with `CapacityExceeded`.
    #[serde(default = "default_max_watchers")]
    pub max_watchers_per_item: u32,
    /// Cap on the per-item unread detail list returned by watchlist
    /// queries; unread beyond the cap are reported as an overflow count.
    #[serde(default = "default_detail_limit")]
    pub detail_limit: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            max_watchers_per_item: default_max_watchers(),
            detail_limit: default_detail_limit(),
        }
    }
}

const fn default_max_watchers() -> u32 {
    50
}

const fn default_detail_limit() -> u32 {
    20
}

/// Load `taskwatch.toml` from the given directory, falling back to
/// defaults when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(dir: &Path) -> Result<WatchConfig> {
    let path = dir.join("taskwatch.toml");
    if !path.exists() {
        return Ok(WatchConfig::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config: WatchConfig =
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))?;
    Ok(config)
}
