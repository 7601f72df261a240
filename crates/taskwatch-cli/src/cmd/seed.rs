//! `tw seed` — create users, teams, and memberships.
//!
//! These are collaborator entities the watch subsystem joins against;
//! in the full product they are owned by other services.

use crate::cmd::Ctx;
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::{Args, Subcommand};
use taskwatch_core::db::directory;

#[derive(Args, Debug)]
pub struct SeedArgs {
    #[command(subcommand)]
    pub command: SeedCommand,
}

#[derive(Subcommand, Debug)]
pub enum SeedCommand {
    #[command(about = "Create a user")]
    User(SeedUserArgs),
    #[command(about = "Create a team")]
    Team(SeedTeamArgs),
    #[command(about = "Add or update a team membership")]
    Member(SeedMemberArgs),
}

#[derive(Args, Debug)]
pub struct SeedUserArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub avatar: Option<String>,
}

#[derive(Args, Debug)]
pub struct SeedTeamArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug)]
pub struct SeedMemberArgs {
    /// Team id.
    #[arg(long)]
    pub team: String,
    /// User id.
    #[arg(long)]
    pub user: String,
    /// Mark the membership inactive instead of active.
    #[arg(long)]
    pub deactivate: bool,
}

/// # Errors
///
/// Returns an error on duplicate emails, missing users, or storage
/// failure.
pub fn run(ctx: &Ctx, args: &SeedArgs, mode: OutputMode) -> Result<()> {
    match &args.command {
        SeedCommand::User(user_args) => {
            let user = directory::create_user(
                &ctx.conn,
                &user_args.name,
                &user_args.email,
                user_args.avatar.as_deref(),
            )?;
            render(mode, &user, |u, w| {
                writeln!(w, "created user {} ({})", u.user_id, u.name)
            })
        }
        SeedCommand::Team(team_args) => {
            let team =
                directory::create_team(&ctx.conn, &team_args.name, team_args.color.as_deref())?;
            render(mode, &team, |t, w| {
                writeln!(w, "created team {} ({})", t.team_id, t.name)
            })
        }
        SeedCommand::Member(member_args) => {
            if member_args.deactivate {
                directory::deactivate_member(&ctx.conn, &member_args.team, &member_args.user)?;
            } else {
                directory::add_member(&ctx.conn, &member_args.team, &member_args.user)?;
            }
            let output = serde_json::json!({
                "ok": true,
                "team_id": member_args.team,
                "user_id": member_args.user,
                "is_active": !member_args.deactivate,
            });
            render(mode, &output, |o, w| {
                writeln!(
                    w,
                    "membership {} -> {} ({})",
                    o["user_id"].as_str().unwrap_or_default(),
                    o["team_id"].as_str().unwrap_or_default(),
                    if o["is_active"].as_bool().unwrap_or(false) {
                        "active"
                    } else {
                        "inactive"
                    }
                )
            })
        }
    }
}
