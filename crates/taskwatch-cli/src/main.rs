#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tw: work-item watch and notification tracker",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Path to the store database.
    #[arg(long, global = true, default_value = "taskwatch.db")]
    db: PathBuf,

    /// Acting user id (falls back to TASKWATCH_USER).
    #[arg(long = "as", global = true, value_name = "USER_ID")]
    as_user: Option<String>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }

    fn as_user_flag(&self) -> Option<&str> {
        self.as_user.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Initialize the store and apply migrations",
        after_help = "EXAMPLES:\n    tw init\n    tw --db team.db init --json"
    )]
    Init,

    #[command(
        next_help_heading = "Lifecycle",
        about = "Seed users, teams, and memberships",
        after_help = "EXAMPLES:\n    tw seed user --name Ana --email ana@example.com\n    tw seed member --team <team> --user <user>"
    )]
    Seed(cmd::seed::SeedArgs),

    #[command(
        next_help_heading = "Items",
        about = "Create and update work items",
        after_help = "EXAMPLES:\n    tw --as <user> item add --team <team> --title \"Fix login flow\"\n    tw --as <user> item status <item> finished"
    )]
    Item(cmd::item::ItemArgs),

    #[command(
        next_help_heading = "Watching",
        about = "List an item's watchers",
        after_help = "EXAMPLES:\n    tw watchers <item>\n    tw watchers <item> --json"
    )]
    Watchers(cmd::watch::WatchersArgs),

    #[command(
        next_help_heading = "Watching",
        about = "Start watching an item",
        after_help = "EXAMPLES:\n    tw --as <user> watch <item>"
    )]
    Watch(cmd::watch::WatchArgs),

    #[command(
        next_help_heading = "Watching",
        about = "Stop watching an item",
        after_help = "EXAMPLES:\n    tw --as <user> unwatch <item>"
    )]
    Unwatch(cmd::watch::UnwatchArgs),

    #[command(
        next_help_heading = "Read",
        about = "List watched items with unread summaries",
        after_help = "EXAMPLES:\n    tw --as <user> watchlist\n    tw --as <user> watchlist --status pending --dir asc --page 2"
    )]
    Watchlist(cmd::watchlist::WatchlistArgs),

    #[command(
        next_help_heading = "Notifications",
        about = "Mark an item's notifications as read",
        after_help = "EXAMPLES:\n    tw --as <user> read <item>"
    )]
    Read(cmd::read::ReadArgs),

    #[command(
        next_help_heading = "Notifications",
        about = "Count unread notifications",
        after_help = "EXAMPLES:\n    tw --as <user> unread"
    )]
    Unread,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TASKWATCH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "taskwatch=debug,info"
        } else {
            "taskwatch=info,warn"
        })
    });

    let format = env::var("TASKWATCH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mode = cli.output_mode();

    if let Commands::Init = cli.command {
        return cmd::init::run(&cli.db, mode);
    }

    let ctx = cmd::Ctx::open(&cli.db)?;
    match &cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Seed(args) => cmd::seed::run(&ctx, args, mode),
        Commands::Item(args) => cmd::item::run(&ctx, args, cli.as_user_flag(), mode),
        Commands::Watchers(args) => cmd::watch::watchers(&ctx, args, mode),
        Commands::Watch(args) => cmd::watch::watch(&ctx, args, cli.as_user_flag(), mode),
        Commands::Unwatch(args) => cmd::watch::unwatch(&ctx, args, cli.as_user_flag(), mode),
        Commands::Watchlist(args) => cmd::watchlist::run(&ctx, args, cli.as_user_flag(), mode),
        Commands::Read(args) => cmd::read::read(&ctx, args, cli.as_user_flag(), mode),
        Commands::Unread => cmd::read::unread(&ctx, cli.as_user_flag(), mode),
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    if let Err(error) = run(&cli) {
        output::render_error(&error);
        std::process::exit(1);
    }
}
