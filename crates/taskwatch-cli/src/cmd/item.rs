//! `tw item` — work-item collaborator operations.
//!
//! Every mutating subcommand writes through the item store first and
//! then calls the event notifier explicitly, excluding the acting user
//! from the fan-out. The fan-out count is part of the command output so
//! producers can observe delivery.

use crate::cmd::{Ctx, require_identity};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::str::FromStr;
use taskwatch_core::WatchError;
use taskwatch_core::activity::TracingActivityLog;
use taskwatch_core::db::items;
use taskwatch_core::model::{Priority, Status};
use taskwatch_core::notifier::{EventNotifier, ItemEvent};
use taskwatch_core::registry::WatchRegistry;

#[derive(Args, Debug)]
pub struct ItemArgs {
    #[command(subcommand)]
    pub command: ItemCommand,
}

#[derive(Subcommand, Debug)]
pub enum ItemCommand {
    #[command(
        about = "Create a work item",
        after_help = "EXAMPLES:\n    tw --as <user> item add --team <team> --title \"Fix login flow\""
    )]
    Add(ItemAddArgs),

    #[command(about = "Change an item's status and notify watchers")]
    Status(ItemStatusArgs),

    #[command(about = "Change an item's priority and notify watchers")]
    Priority(ItemPriorityArgs),

    #[command(about = "Rename an item and notify watchers")]
    Title(ItemTitleArgs),

    #[command(about = "Set or clear an item's due date and notify watchers")]
    Due(ItemDueArgs),

    #[command(about = "Assign or unassign an item and notify watchers")]
    Assign(ItemAssignArgs),

    #[command(
        about = "Comment on an item and notify watchers",
        after_help = "EXAMPLES:\n    tw --as <user> item comment <item> \"Root cause found\""
    )]
    Comment(ItemCommentArgs),

    #[command(about = "Delete an item (subscriptions and notifications cascade)")]
    Delete(ItemDeleteArgs),
}

#[derive(Args, Debug)]
pub struct ItemAddArgs {
    #[arg(long)]
    pub team: String,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    /// low | medium | high
    #[arg(long)]
    pub priority: Option<String>,
    /// RFC 3339 due date.
    #[arg(long)]
    pub due: Option<String>,
    /// Assignee user id.
    #[arg(long)]
    pub assignee: Option<String>,
}

#[derive(Args, Debug)]
pub struct ItemStatusArgs {
    /// Item id.
    pub id: String,
    /// pending | in_progress | finished
    pub status: String,
}

#[derive(Args, Debug)]
pub struct ItemPriorityArgs {
    pub id: String,
    /// low | medium | high
    pub priority: String,
}

#[derive(Args, Debug)]
pub struct ItemTitleArgs {
    pub id: String,
    pub title: String,
}

#[derive(Args, Debug)]
pub struct ItemDueArgs {
    pub id: String,
    /// RFC 3339 due date; omit together with --clear to fail validation.
    #[arg(long, conflicts_with = "clear")]
    pub due: Option<String>,
    /// Remove the due date.
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args, Debug)]
pub struct ItemAssignArgs {
    pub id: String,
    /// New assignee user id.
    #[arg(long, conflicts_with = "clear")]
    pub to: Option<String>,
    /// Unassign the item.
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args, Debug)]
pub struct ItemCommentArgs {
    pub id: String,
    pub body: String,
}

#[derive(Args, Debug)]
pub struct ItemDeleteArgs {
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ChangeOutput {
    ok: bool,
    item_id: String,
    event_type: String,
    notified: usize,
}

fn parse_due(raw: &str) -> Result<i64> {
    let parsed = chrono::DateTime::parse_from_rfc3339(raw).map_err(|e| {
        WatchError::Validation(format!("invalid due date '{raw}': {e} (expected RFC 3339)"))
    })?;
    Ok(parsed.timestamp_micros())
}

fn parse_status(raw: &str) -> Result<Status> {
    Status::from_str(raw).map_err(|e| WatchError::Validation(e.to_string()).into())
}

fn parse_priority(raw: &str) -> Result<Priority> {
    Priority::from_str(raw).map_err(|e| WatchError::Validation(e.to_string()).into())
}

/// Run the write, then fan the event out excluding the actor.
fn change(
    ctx: &Ctx,
    actor: &str,
    item_id: &str,
    event: &ItemEvent,
    mode: OutputMode,
) -> Result<()> {
    let activity = TracingActivityLog;
    let registry = WatchRegistry::new(&ctx.conn, ctx.config, &activity);
    let notifier = EventNotifier::new(&ctx.conn);
    let notified = notifier.notify(&registry, item_id, event, Some(actor))?;

    let output = ChangeOutput {
        ok: true,
        item_id: item_id.to_string(),
        event_type: event.event_type().to_string(),
        notified,
    };
    render(mode, &output, |o, w| {
        writeln!(
            w,
            "{} on {}: notified {} watcher(s)",
            o.event_type, o.item_id, o.notified
        )
    })
}

/// # Errors
///
/// Returns an error if the acting user cannot be resolved, an argument
/// fails validation, the item does not exist, or storage fails.
pub fn run(ctx: &Ctx, args: &ItemArgs, as_user: Option<&str>, mode: OutputMode) -> Result<()> {
    let actor = require_identity(as_user)?;

    match &args.command {
        ItemCommand::Add(add) => {
            let priority = add
                .priority
                .as_deref()
                .map(parse_priority)
                .transpose()?
                .unwrap_or_default();
            let due_at_us = add.due.as_deref().map(parse_due).transpose()?;
            let item = items::create_item(
                &ctx.conn,
                &items::NewItem {
                    team_id: &add.team,
                    title: &add.title,
                    description: add.description.as_deref(),
                    priority,
                    due_at_us,
                    created_by: &actor,
                    assignee_id: add.assignee.as_deref(),
                },
            )?;
            render(mode, &item, |i, w| {
                writeln!(w, "created item {} ({})", i.item_id, i.title)
            })
        }
        ItemCommand::Status(status_args) => {
            let status = parse_status(&status_args.status)?;
            let (old, new) = items::set_status(&ctx.conn, &status_args.id, status)?;
            change(
                ctx,
                &actor,
                &status_args.id,
                &ItemEvent::StatusChange { old, new },
                mode,
            )
        }
        ItemCommand::Priority(priority_args) => {
            let priority = parse_priority(&priority_args.priority)?;
            let (old, new) = items::set_priority(&ctx.conn, &priority_args.id, priority)?;
            change(
                ctx,
                &actor,
                &priority_args.id,
                &ItemEvent::PriorityChange { old, new },
                mode,
            )
        }
        ItemCommand::Title(title_args) => {
            let old = items::set_title(&ctx.conn, &title_args.id, &title_args.title)?;
            change(
                ctx,
                &actor,
                &title_args.id,
                &ItemEvent::TitleChange {
                    old,
                    new: title_args.title.clone(),
                },
                mode,
            )
        }
        ItemCommand::Due(due_args) => {
            if due_args.due.is_none() && !due_args.clear {
                return Err(WatchError::Validation(
                    "pass --due <rfc3339> or --clear".into(),
                )
                .into());
            }
            let new_us = due_args.due.as_deref().map(parse_due).transpose()?;
            let old_us = items::set_due_date(&ctx.conn, &due_args.id, new_us)?;
            change(
                ctx,
                &actor,
                &due_args.id,
                &ItemEvent::DueDateChange { old_us, new_us },
                mode,
            )
        }
        ItemCommand::Assign(assign_args) => {
            if assign_args.to.is_none() && !assign_args.clear {
                return Err(
                    WatchError::Validation("pass --to <user-id> or --clear".into()).into(),
                );
            }
            let new = assign_args.to.clone();
            let old = items::set_assignee(&ctx.conn, &assign_args.id, new.as_deref())?;
            change(
                ctx,
                &actor,
                &assign_args.id,
                &ItemEvent::Assignment { old, new },
                mode,
            )
        }
        ItemCommand::Comment(comment_args) => {
            let comment =
                items::add_comment(&ctx.conn, &comment_args.id, &actor, &comment_args.body)?;
            change(
                ctx,
                &actor,
                &comment_args.id,
                &ItemEvent::comment(&comment.comment_id, &comment.body, &comment.author_id),
                mode,
            )
        }
        ItemCommand::Delete(delete_args) => {
            items::delete_item(&ctx.conn, &delete_args.id)?;
            let output = serde_json::json!({ "ok": true, "item_id": delete_args.id });
            render(mode, &output, |o, w| {
                writeln!(w, "deleted item {}", o["item_id"].as_str().unwrap_or_default())
            })
        }
    }
}
