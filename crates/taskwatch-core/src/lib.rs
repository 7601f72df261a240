//! taskwatch-core: the watch/notify subsystem of the task tracker.
//!
//! Four components over one SQLite store:
//! - [`registry::WatchRegistry`] — subscription records, membership /
//!   uniqueness / capacity enforcement
//! - [`notifier::EventNotifier`] — per-watcher fan-out of item events
//! - [`notify_store::NotificationStore`] — read/unread state and counts
//! - [`watchlist`] — the aggregated "what do I watch, what's unread"
//!   query under filtering, sorting, and pagination
//!
//! # Conventions
//!
//! - **Errors**: core operations return [`error::WatchResult`]; infra
//!   helpers (open/migrate/config) return `anyhow::Result` with context.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **Time**: integer microseconds since the Unix epoch (`*_at_us`).

pub mod activity;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod notifier;
pub mod notify_store;
pub mod registry;
pub mod watchlist;

pub use config::WatchConfig;
pub use error::{ErrorCode, WatchError, WatchResult};
