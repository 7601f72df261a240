//! Command handlers and the shared execution context.

pub mod init;
pub mod item;
pub mod read;
pub mod seed;
pub mod watch;
pub mod watchlist;

use anyhow::{Context as _, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use taskwatch_core::{WatchConfig, WatchError, config, db};

/// Shared state every command handler needs: an open store and the
/// effective configuration.
pub struct Ctx {
    pub conn: Connection,
    pub config: WatchConfig,
}

impl Ctx {
    /// Open the store at `db_path` and load `taskwatch.toml` from the
    /// store's directory (defaults when absent).
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the config
    /// file exists but cannot be parsed.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = db::open_store(db_path)?;
        let config_dir = db_path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let config = config::load_config(&config_dir).context("load taskwatch.toml")?;
        Ok(Self { conn, config })
    }
}

/// Resolve the acting user: `--as` flag first, then `TASKWATCH_USER`.
/// The auth collaborator would normally supply this.
///
/// # Errors
///
/// Returns `Validation` when neither source yields a user id.
pub fn require_identity(flag: Option<&str>) -> Result<String> {
    if let Some(user_id) = flag {
        return Ok(user_id.to_string());
    }
    if let Ok(user_id) = std::env::var("TASKWATCH_USER") {
        if !user_id.trim().is_empty() {
            return Ok(user_id);
        }
    }
    Err(WatchError::Validation(
        "acting user required: pass --as <user-id> or set TASKWATCH_USER".into(),
    )
    .into())
}
