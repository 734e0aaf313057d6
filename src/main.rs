// ABOUTME: whoop-sync CLI - fetch WHOOP health data as JSON from the command line
// ABOUTME: Wires clap subcommands to the retrieval layer and maps errors to exit codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line entry point.
//!
//! Usage:
//! ```bash
//! # Last 7 days of sleep
//! whoop-sync sleep
//!
//! # Recovery for one WHOOP day (04:00-04:00 UTC)
//! whoop-sync recovery --date 2024-03-01
//!
//! # Several domains in one composite snapshot
//! whoop-sync --sleep --recovery --cycle --days 14
//!
//! # Single record lookup
//! whoop-sync get workout 3b241101-e2bb-4255-8caf-4136c566a962
//!
//! # Revoke API access and forget local credentials
//! whoop-sync revoke
//! ```

use std::env;
use std::process;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use whoop_sync::auth::{StaticTokenSource, TokenSource, TokenStore};
use whoop_sync::errors::{Error, Result};
use whoop_sync::models::Domain;
use whoop_sync::range::{self, RangeSelector};
use whoop_sync::{FetchOptions, WhoopClient};

#[derive(Parser)]
#[command(
    name = "whoop-sync",
    about = "CLI for WHOOP health data - fetch, paginate, and aggregate",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Include sleep data (root multi-domain fetch)
    #[arg(long)]
    sleep: bool,

    /// Include recovery data
    #[arg(long)]
    recovery: bool,

    /// Include workout data
    #[arg(long)]
    workout: bool,

    /// Include cycle/strain data
    #[arg(long)]
    cycle: bool,

    /// Include profile data
    #[arg(long)]
    profile: bool,

    /// Include body measurements
    #[arg(long)]
    body: bool,

    #[command(flatten)]
    data: DataArgs,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Args, Clone)]
struct DataArgs {
    /// Number of days to fetch, ending now (default: 7)
    #[arg(short = 'n', long)]
    days: Option<u32>,

    /// Specific date (YYYY-MM-DD), expanded to the WHOOP 4am-4am day
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Start date for a range query (YYYY-MM-DD)
    #[arg(short, long)]
    start: Option<NaiveDate>,

    /// End date for a range query (YYYY-MM-DD)
    #[arg(short, long)]
    end: Option<NaiveDate>,

    /// Max results per page (must be positive)
    #[arg(short, long, default_value_t = 25, value_parser = clap::value_parser!(u32).range(1..))]
    limit: u32,

    /// Follow pagination to the end; pass --all=false for the first page only
    #[arg(
        short,
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    all: bool,

    /// Pretty-print the JSON output
    #[arg(short, long)]
    pretty: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Get sleep data (default: last 7 days)
    Sleep(DataArgs),
    /// Get recovery data (default: last 7 days)
    Recovery(DataArgs),
    /// Get workout data (default: last 7 days)
    Workout(DataArgs),
    /// Get cycle/strain data (default: last 7 days)
    Cycle(DataArgs),
    /// Get user profile
    Profile(DataArgs),
    /// Get body measurements
    Body(DataArgs),

    /// Fetch a single record by ID
    Get {
        /// Record type
        #[arg(value_enum)]
        record: RecordType,
        /// Record ID (UUID for sleep/workout, integer for cycle)
        id: String,
    },

    /// Get the sleep record linked to a cycle
    CycleSleep {
        /// Cycle ID (integer)
        cycle_id: i64,
    },

    /// Get the recovery record linked to a cycle
    CycleRecovery {
        /// Cycle ID (integer)
        cycle_id: i64,
    },

    /// Revoke API access and remove stored credentials
    Revoke,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RecordType {
    Sleep,
    Workout,
    Cycle,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let token_source = build_token_source().await?;
    let client = WhoopClient::new(Arc::clone(&token_source))?;

    match cli.command {
        Some(Command::Sleep(args)) => fetch_domains(&client, &[Domain::Sleep], &args).await,
        Some(Command::Recovery(args)) => fetch_domains(&client, &[Domain::Recovery], &args).await,
        Some(Command::Workout(args)) => fetch_domains(&client, &[Domain::Workout], &args).await,
        Some(Command::Cycle(args)) => fetch_domains(&client, &[Domain::Cycle], &args).await,
        Some(Command::Profile(args)) => fetch_domains(&client, &[Domain::Profile], &args).await,
        Some(Command::Body(args)) => fetch_domains(&client, &[Domain::Body], &args).await,
        Some(Command::Get { record, id }) => match record {
            RecordType::Sleep => print_json(&client.get_sleep_by_id(&id).await?, false),
            RecordType::Workout => print_json(&client.get_workout_by_id(&id).await?, false),
            RecordType::Cycle => {
                let cycle_id = parse_cycle_id(&id)?;
                print_json(&client.get_cycle_by_id(cycle_id).await?, false)
            }
        },
        Some(Command::CycleSleep { cycle_id }) => {
            print_json(&client.get_sleep_for_cycle(cycle_id).await?, false)
        }
        Some(Command::CycleRecovery { cycle_id }) => {
            print_json(&client.get_recovery_for_cycle(cycle_id).await?, false)
        }
        Some(Command::Revoke) => revoke(&client).await,
        None => {
            let domains = selected_domains(&cli);
            if domains.is_empty() {
                // Mirrors the original tool: bare invocation prints help
                use clap::CommandFactory;
                let _ = Cli::command().print_help();
                return Ok(());
            }
            fetch_domains(&client, &domains, &cli.data).await
        }
    }
}

/// Root-level domain flags, in the snapshot's merge order
fn selected_domains(cli: &Cli) -> Vec<Domain> {
    let mut domains = Vec::new();
    for domain in Domain::ALL {
        let selected = match domain {
            Domain::Profile => cli.profile,
            Domain::Body => cli.body,
            Domain::Sleep => cli.sleep,
            Domain::Recovery => cli.recovery,
            Domain::Workout => cli.workout,
            Domain::Cycle => cli.cycle,
        };
        if selected {
            domains.push(domain);
        }
    }
    domains
}

async fn fetch_domains(client: &WhoopClient, domains: &[Domain], args: &DataArgs) -> Result<()> {
    let selector = RangeSelector {
        days: args.days,
        date: args.date,
        start: args.start,
        end: args.end,
    };
    let window = range::resolve(&selector, Utc::now())?;
    let options = FetchOptions {
        limit: args.limit,
        fetch_all: args.all,
    };

    let snapshot = client.fetch(domains, &window, &options).await?;
    print_json(&snapshot, args.pretty)
}

async fn revoke(client: &WhoopClient) -> Result<()> {
    client.revoke_access().await?;
    let store = TokenStore::open(TokenStore::default_path()).await?;
    store.clear().await;
    info!("WHOOP access revoked and stored credentials removed");
    println!("Access revoked.");
    Ok(())
}

/// Prefer an explicit token from the environment; otherwise use the file store
async fn build_token_source() -> Result<Arc<dyn TokenSource>> {
    if let Ok(token) = env::var("WHOOP_ACCESS_TOKEN") {
        return Ok(Arc::new(StaticTokenSource::new(token)));
    }
    let store = TokenStore::open(TokenStore::default_path()).await?;
    Ok(Arc::new(store))
}

fn parse_cycle_id(id: &str) -> Result<i64> {
    id.parse()
        .map_err(|_| Error::InvalidArgument(format!("cycle ID must be an integer, got '{id}'")))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| Error::Internal(format!("failed to encode output: {e}")))?;
    println!("{rendered}");
    Ok(())
}
