//! `tw read` and `tw unread` — notification read state.

use crate::cmd::{Ctx, require_identity};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use taskwatch_core::WatchError;
use taskwatch_core::activity::TracingActivityLog;
use taskwatch_core::db::items;
use taskwatch_core::notify_store::NotificationStore;
use taskwatch_core::registry::WatchRegistry;

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Item id.
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ReadOutput {
    ok: bool,
    item_id: String,
    marked_read: u64,
}

#[derive(Debug, Serialize)]
struct UnreadOutput {
    user_id: String,
    unread: u64,
}

/// Mark all of the acting user's notifications on an item as read.
/// Only a current watcher may do this.
///
/// # Errors
///
/// Returns `ItemNotFound` for a missing item, `NotSubscribed` when the
/// acting user is not watching it.
pub fn read(ctx: &Ctx, args: &ReadArgs, as_user: Option<&str>, mode: OutputMode) -> Result<()> {
    let user_id = require_identity(as_user)?;
    items::get_item(&ctx.conn, &args.id)?;

    let activity = TracingActivityLog;
    let registry = WatchRegistry::new(&ctx.conn, ctx.config, &activity);
    if !registry.is_watching(&user_id, &args.id)? {
        return Err(WatchError::NotSubscribed.into());
    }

    let store = NotificationStore::new(&ctx.conn, ctx.config);
    let marked_read = store.mark_item_read(&args.id, &user_id)?;

    let output = ReadOutput {
        ok: true,
        item_id: args.id.clone(),
        marked_read,
    };
    render(mode, &output, |o, w| {
        writeln!(w, "marked {} notification(s) read on {}", o.marked_read, o.item_id)
    })
}

/// Total unread notifications for the acting user, across all items.
///
/// # Errors
///
/// Returns an error if the acting user cannot be resolved or storage
/// fails.
pub fn unread(ctx: &Ctx, as_user: Option<&str>, mode: OutputMode) -> Result<()> {
    let user_id = require_identity(as_user)?;
    let store = NotificationStore::new(&ctx.conn, ctx.config);
    let unread = store.count_unread(&user_id)?;

    let output = UnreadOutput {
        user_id: user_id.clone(),
        unread,
    };
    render(mode, &output, |o, w| {
        writeln!(w, "{} unread notification(s)", o.unread)
    })
}
