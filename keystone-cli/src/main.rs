//! Keystone CLI - create, read and refresh sessions in a DynamoDB table.
//!
//! # Commands
//!
//! - `keystone create --id <ID>` - Create a session and print it
//! - `keystone get --id <ID> --session-id <SID>` - Fetch an unexpired session
//! - `keystone refresh --id <ID> --session-id <SID>` - Extend a session by one hour
//! - `keystone demo` - Create, wait, fetch and refresh a session
//!
//! The table is chosen with `--endpoint`, `--table` and `--region`, layered
//! over `DYNAMODB_ENDPOINT`, `DYNAMODB_TABLE` and `AWS_REGION` /
//! `AWS_DEFAULT_REGION` through [`SessionConfig::from_lookup`]. A `.env` file
//! in the working directory is loaded first.

use std::time::Duration;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use keystone_session::config::{ENDPOINT_ENV, REGION_ENV, TABLE_ENV};
use keystone_session::{Session, SessionConfig, SessionResult, SessionTable, TIMESTAMP_FORMAT};
use tracing::debug;

mod commands;
mod error;
mod logging;

use error::CliResult;

/// Keystone CLI - DynamoDB session table tools
#[derive(Debug, Parser)]
#[command(name = "keystone")]
#[command(version)]
#[command(about = "Create, read and refresh sessions stored in DynamoDB")]
#[command(propagate_version = true)]
#[command(after_help = format!(
    "{}\n  {} DYNAMODB_ENDPOINT=http://localhost:4566 DYNAMODB_TABLE=Session keystone demo\n  {} keystone --table Session get --id 1234 --session-id abcde",
    "Examples:".bright_cyan().bold(),
    "$".dimmed(),
    "$".dimmed(),
))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    store: StoreArgs,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// DynamoDB endpoint URL [env: DYNAMODB_ENDPOINT] (empty uses the regional endpoint)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Session table name [env: DYNAMODB_TABLE]
    #[arg(long, global = true)]
    table: Option<String>,

    /// AWS region [env: AWS_REGION, AWS_DEFAULT_REGION] [default: ap-northeast-1]
    #[arg(long, global = true)]
    region: Option<String>,
}

impl StoreArgs {
    /// Flags layered over the process environment.
    fn session_config(&self) -> SessionResult<SessionConfig> {
        self.session_config_from(|key| std::env::var(key).ok())
    }

    fn session_config_from<F>(&self, env: F) -> SessionResult<SessionConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        SessionConfig::from_lookup(|key| {
            let flag = match key {
                ENDPOINT_ENV => self.endpoint.clone(),
                TABLE_ENV => self.table.clone(),
                REGION_ENV => self.region.clone(),
                _ => None,
            };
            flag.or_else(|| env(key))
        })
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a session and print it
    #[command(alias = "c")]
    Create(CreateArgs),

    /// Fetch a session that has not expired
    #[command(alias = "g")]
    Get(GetArgs),

    /// Move a session's expiration to one hour from now
    #[command(alias = "r")]
    Refresh(KeyArgs),

    /// Create a session, wait, fetch it and refresh it
    Demo(DemoArgs),
}

#[derive(Debug, Args)]
struct KeyArgs {
    /// Owning subject (partition key)
    #[arg(long)]
    id: String,

    /// Session instance (sort key)
    #[arg(long)]
    session_id: String,
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// Owning subject (partition key)
    #[arg(long)]
    id: String,

    /// Session instance; a random one is generated when omitted
    #[arg(long)]
    session_id: Option<String>,
}

#[derive(Debug, Args)]
struct GetArgs {
    #[command(flatten)]
    key: KeyArgs,

    /// Reference time "YYYY-MM-DD HH:MM:SS" (defaults to now)
    #[arg(long, value_parser = parse_timestamp)]
    at: Option<String>,
}

#[derive(Debug, Args)]
struct DemoArgs {
    /// Owning subject
    #[arg(long, default_value = "1234")]
    id: String,

    /// Seconds to wait between creating and fetching
    #[arg(long, default_value_t = 5)]
    wait_secs: u64,
}

fn parse_timestamp(value: &str) -> Result<String, String> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|_| value.to_string())
        .map_err(|e| format!("expected \"YYYY-MM-DD HH:MM:SS\": {}", e))
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn success(msg: &str) {
    eprintln!("  {} {}", "✓".green().bold(), msg.green());
}

fn info(msg: &str) {
    eprintln!("  {} {}", "→".cyan(), msg);
}

fn print_session(session: &Session) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(session)?);
    Ok(())
}

// =============================================================================
// MAIN
// =============================================================================

async fn run(cli: Cli) -> CliResult<()> {
    let config = cli.store.session_config()?;
    debug!(table = %config.table, endpoint = ?config.endpoint, region = %config.region, "Connecting");
    let table = SessionTable::connect(config).await?;

    let session = match cli.command {
        Commands::Create(args) => commands::create::run(&table, &args.id, args.session_id).await?,
        Commands::Get(args) => {
            commands::get::run(&table, &args.key.id, &args.key.session_id, args.at.as_deref())
                .await?
        }
        Commands::Refresh(args) => {
            commands::refresh::run(&table, &args.id, &args.session_id).await?
        }
        Commands::Demo(args) => {
            commands::demo::run(&table, &args.id, Duration::from_secs(args.wait_secs)).await?
        }
    };

    print_session(&session)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("\n  {} {}\n", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
