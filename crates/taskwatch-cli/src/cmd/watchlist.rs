//! `tw watchlist` — filtered, sorted, paginated view of watched items.

use crate::cmd::{Ctx, require_identity};
use crate::output::{OutputMode, micros_to_rfc3339, render};
use anyhow::Result;
use clap::Args;
use std::str::FromStr;
use taskwatch_core::WatchError;
use taskwatch_core::activity::TracingActivityLog;
use taskwatch_core::model::Status;
use taskwatch_core::notify_store::NotificationStore;
use taskwatch_core::registry::WatchRegistry;
use taskwatch_core::watchlist::{self, PageParams, WatchlistFilter, WatchlistSort};

#[derive(Args, Debug)]
pub struct WatchlistArgs {
    /// Filter: pending | in_progress | finished
    #[arg(long)]
    pub status: Option<String>,
    /// Filter: owning team id.
    #[arg(long)]
    pub team: Option<String>,
    /// Filter: only items updated at or after this RFC 3339 instant.
    #[arg(long)]
    pub updated_since: Option<String>,
    /// Sort field; only updated_at is honored.
    #[arg(long)]
    pub sort: Option<String>,
    /// asc | desc (unknown values fall back to desc).
    #[arg(long)]
    pub dir: Option<String>,
    /// 1-based page number.
    #[arg(long)]
    pub page: Option<u64>,
    #[arg(long)]
    pub page_size: Option<u64>,
}

/// # Errors
///
/// Returns `Validation` for an unparseable `--status` or
/// `--updated-since` value, or a storage error.
pub fn run(ctx: &Ctx, args: &WatchlistArgs, as_user: Option<&str>, mode: OutputMode) -> Result<()> {
    let user_id = require_identity(as_user)?;

    let status = args
        .status
        .as_deref()
        .map(|raw| Status::from_str(raw).map_err(|e| WatchError::Validation(e.to_string())))
        .transpose()?;
    let updated_since_us = args
        .updated_since
        .as_deref()
        .map(|raw| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .map(|ts| ts.timestamp_micros())
                .map_err(|e| {
                    WatchError::Validation(format!(
                        "invalid --updated-since '{raw}': {e} (expected RFC 3339)"
                    ))
                })
        })
        .transpose()?;

    let filter = WatchlistFilter {
        status,
        team_id: args.team.clone(),
        updated_since_us,
        sort: WatchlistSort::resolve(args.sort.as_deref(), args.dir.as_deref()),
    };
    let page = PageParams::new(args.page, args.page_size);

    let activity = TracingActivityLog;
    let registry = WatchRegistry::new(&ctx.conn, ctx.config, &activity);
    let store = NotificationStore::new(&ctx.conn, ctx.config);
    let result = watchlist::watchlist(&ctx.conn, &registry, &store, &user_id, &filter, page)?;

    render(mode, &result, |page, w| {
        writeln!(
            w,
            "page {}/{} ({} watched item(s))",
            page.pagination.page, page.pagination.total_pages, page.pagination.total
        )?;
        for row in &page.rows {
            let due = row
                .due_at_us
                .map_or_else(|| "-".to_string(), micros_to_rfc3339);
            writeln!(
                w,
                "  {}  [{}] {}  team={}  due={}{}  unread={}{}",
                row.item_id,
                row.status,
                row.title,
                row.team.name,
                due,
                if row.is_overdue { " (overdue)" } else { "" },
                row.unread_notifications,
                if row.notifications_overflow > 0 {
                    format!(" (+{} older)", row.notifications_overflow)
                } else {
                    String::new()
                }
            )?;
        }
        Ok(())
    })
}
