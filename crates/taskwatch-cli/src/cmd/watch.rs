//! `tw watchers`, `tw watch`, `tw unwatch` — subscription management.

use crate::cmd::{Ctx, require_identity};
use crate::output::{OutputMode, micros_to_rfc3339, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use taskwatch_core::activity::TracingActivityLog;
use taskwatch_core::db::items;
use taskwatch_core::model::Watcher;
use taskwatch_core::registry::WatchRegistry;

#[derive(Args, Debug)]
pub struct WatchersArgs {
    /// Item id.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Item id.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct UnwatchArgs {
    /// Item id.
    pub id: String,
}

#[derive(Debug, Serialize)]
struct WatchersOutput {
    item_id: String,
    count: usize,
    watchers: Vec<Watcher>,
}

/// # Errors
///
/// Returns `ItemNotFound` for a missing item, or a storage error.
pub fn watchers(ctx: &Ctx, args: &WatchersArgs, mode: OutputMode) -> Result<()> {
    // Listing a missing item is an error, not an empty list.
    items::get_item(&ctx.conn, &args.id)?;

    let activity = TracingActivityLog;
    let registry = WatchRegistry::new(&ctx.conn, ctx.config, &activity);
    let watchers = registry.list(&args.id)?;

    let output = WatchersOutput {
        item_id: args.id.clone(),
        count: watchers.len(),
        watchers,
    };
    render(mode, &output, |o, w| {
        writeln!(w, "{} watcher(s) on {}", o.count, o.item_id)?;
        for watcher in &o.watchers {
            writeln!(
                w,
                "  {}  {} <{}>  since {}",
                watcher.avatar,
                watcher.name,
                watcher.email,
                micros_to_rfc3339(watcher.subscribed_at_us)
            )?;
        }
        Ok(())
    })
}

/// # Errors
///
/// Surfaces the registry's subscribe failures: missing item or user,
/// membership, duplicate subscription, or the watcher ceiling.
pub fn watch(ctx: &Ctx, args: &WatchArgs, as_user: Option<&str>, mode: OutputMode) -> Result<()> {
    let user_id = require_identity(as_user)?;
    let activity = TracingActivityLog;
    let registry = WatchRegistry::new(&ctx.conn, ctx.config, &activity);
    let subscription = registry.subscribe(&user_id, &args.id)?;

    render(mode, &subscription, |s, w| {
        writeln!(w, "{} is now watching {}", s.user_id, s.item_id)
    })
}

/// # Errors
///
/// Returns `NotSubscribed` when no matching subscription exists.
pub fn unwatch(
    ctx: &Ctx,
    args: &UnwatchArgs,
    as_user: Option<&str>,
    mode: OutputMode,
) -> Result<()> {
    let user_id = require_identity(as_user)?;
    let activity = TracingActivityLog;
    let registry = WatchRegistry::new(&ctx.conn, ctx.config, &activity);
    registry.unsubscribe(&user_id, &args.id)?;

    let output = serde_json::json!({ "ok": true, "item_id": args.id, "user_id": user_id });
    render(mode, &output, |o, w| {
        writeln!(
            w,
            "{} stopped watching {}",
            o["user_id"].as_str().unwrap_or_default(),
            o["item_id"].as_str().unwrap_or_default()
        )
    })
}
