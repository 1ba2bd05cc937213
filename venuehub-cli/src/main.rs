//! VenueHub cache demo
//!
//! Runs the two-process cache scenario against the in-memory store and
//! prints what each side observed.
//!
//! Usage:
//!   venuehub-demo --commit-delay-ms 120 --settle poll
//!
//! `RUST_LOG` overrides the log level.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use venuehub_cache::SettleStrategy;
use venuehub_cli::{ScenarioOptions, load_config, run_scenario};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Settle {
    None,
    Fixed,
    Poll,
}

#[derive(Parser, Debug)]
#[command(name = "venuehub-demo")]
#[command(about = "Runs the VenueHub cache scenario against an in-memory store")]
struct Args {
    /// Milliseconds before the store resolves commit timestamps
    #[arg(long, default_value = "50")]
    commit_delay_ms: u64,

    /// How writes wait for their commit time (overrides the config file)
    #[arg(long, value_enum)]
    settle: Option<Settle>,

    /// Delay or poll interval for --settle, in milliseconds
    #[arg(long, default_value = "50")]
    settle_ms: u64,

    /// Keep the observer on forced reloads instead of a live subscription
    #[arg(long)]
    no_live: bool,

    /// JSON cache configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let mut cache = load_config(args.config.as_deref())?;
    let interval = Duration::from_millis(args.settle_ms);
    match args.settle {
        Some(Settle::None) => cache.settle = SettleStrategy::None,
        Some(Settle::Fixed) => cache.settle = SettleStrategy::fixed(interval),
        Some(Settle::Poll) => {
            cache.settle = SettleStrategy::poll(interval, SettleStrategy::DEFAULT_POLL_ATTEMPTS);
        }
        None => {}
    }
    info!("Settle strategy: {:?}", cache.settle);

    let report = run_scenario(ScenarioOptions {
        commit_delay_ms: args.commit_delay_ms,
        live: !args.no_live,
        cache,
    })
    .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n========================================");
    println!("  VenueHub cache scenario");
    println!("========================================");
    println!("  Hotel:        {}", report.hotel_id);
    println!("  City:         {} -> {}", report.city_before, report.city_after);
    println!("  Created at:   {}", report.created_at);
    println!("  Updated at:   {}", report.updated_at);
    println!("  Own write:    {}", report.writer_read_own_write);
    println!("  Observer:     {} (saw create: {})", report.observer_mode, report.observer_saw_create);
    println!("  Account:      {} ({})", report.account_email, report.login_role);
    println!(
        "  Store calls:  {} point reads, {} queries, {} writes",
        report.store_point_reads, report.store_queries, report.store_writes
    );
    println!("========================================\n");
    Ok(())
}
