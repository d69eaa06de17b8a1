//! Thin command-line caller over [`CounterStore`].
//!
//! Every invocation is an independent session: it opens the shared table,
//! performs one operation under the store's locking rules and exits. Run
//! several at once against the same `--data-file` and the totals still add up.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};

use crate::config;
use crate::store::CounterStore;
use crate::Result;

mod commands;
mod render;

/// Custom amounts are bounded to this range.
pub const MAX_AMOUNT: i64 = 10_000;

// =============================================================================
// Entry + global options
// =============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    about = "Shared per-user running totals",
    infer_subcommands = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Counter table to use (default: config, then $TALLY_DATA_FILE, then the XDG data dir).
    #[arg(long, global = true, value_name = "PATH")]
    pub data_file: Option<PathBuf>,

    /// Machine-readable JSON output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a user (no-op if they already exist) and show their total.
    #[command(alias = "login")]
    Join(NameArgs),

    /// Add an amount to a user's total.
    Add(AddArgs),

    /// Reset a user's total to zero.
    Reset(ResetArgs),

    /// Show one user's total.
    Show(NameArgs),

    /// List every user and total.
    #[command(alias = "ls")]
    List,

    /// Follow a user's total, printing each change.
    Watch(WatchArgs),
}

// =============================================================================
// Per-command args
// =============================================================================

#[derive(Args, Debug)]
pub struct NameArgs {
    /// User name; case and surrounding whitespace are ignored.
    pub name: String,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("how_much").required(true).args(["amount", "quick"])))]
pub struct AddArgs {
    pub name: String,

    /// Custom amount (1..=10000).
    #[arg(value_parser = clap::value_parser!(i64).range(1..=MAX_AMOUNT))]
    pub amount: Option<i64>,

    /// One of the quick amounts: 10, 50 or 100.
    #[arg(long, value_parser = parse_quick)]
    pub quick: Option<i64>,
}

impl AddArgs {
    fn delta(&self) -> i64 {
        self.amount.or(self.quick).unwrap_or_default()
    }
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    pub name: String,

    /// Confirm the reset; without it nothing is changed.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    pub name: String,

    /// Poll period in milliseconds (default: `poll.interval_ms` from config).
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: Option<u64>,

    /// Exit after printing this many updates.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

// =============================================================================
// Public API
// =============================================================================

pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}

/// Run the CLI (used by bin).
pub fn run(cli: Cli) -> Result<()> {
    // Must be read before any helper thread exists.
    let offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);

    let cfg = config::load_or_default();
    let path = cli.data_file.unwrap_or_else(|| cfg.store.data_path());
    let store = CounterStore::open_with(path, cfg.store.options())?;
    let ctx = Ctx {
        store,
        json: cli.json,
        poll_interval: cfg.poll.interval(),
        offset,
    };

    match cli.command {
        Commands::Join(args) => commands::join::handle(&ctx, args),
        Commands::Add(args) => commands::add::handle(&ctx, args),
        Commands::Reset(args) => commands::reset::handle(&ctx, args),
        Commands::Show(args) => commands::show::handle(&ctx, args),
        Commands::List => commands::list::handle(&ctx),
        Commands::Watch(args) => commands::watch::handle(&ctx, args),
    }
}

// =============================================================================
// Context + helpers
// =============================================================================

struct Ctx {
    store: CounterStore,
    json: bool,
    poll_interval: Duration,
    offset: time::UtcOffset,
}

impl Ctx {
    fn watch_interval(&self, override_ms: Option<u64>) -> Duration {
        override_ms
            .map(Duration::from_millis)
            .unwrap_or(self.poll_interval)
    }
}

fn print_line(ctx: &Ctx, human: impl FnOnce() -> String, json: impl FnOnce() -> serde_json::Value) -> Result<()> {
    let line = if ctx.json {
        json().to_string()
    } else {
        human()
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{line}").and_then(|()| stdout.flush())
        && e.kind() != std::io::ErrorKind::BrokenPipe
    {
        return Err(e.into());
    }
    Ok(())
}

fn parse_quick(raw: &str) -> std::result::Result<i64, String> {
    match raw.trim() {
        "10" => Ok(10),
        "50" => Ok(50),
        "100" => Ok(100),
        other => Err(format!("quick amount must be 10, 50 or 100 (got {other:?})")),
    }
}
