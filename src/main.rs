//! # Content Index CLI (`cidx`)
//!
//! The `cidx` binary rebuilds the content index and answers queries against
//! it.
//!
//! ## Usage
//!
//! ```bash
//! cidx --config ./config/cidx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cidx init` | Create the SQLite database and run schema migrations |
//! | `cidx rebuild` | Rebuild the index from the content tree |
//! | `cidx search "<query>"` | Rebuild, then run a paginated search |
//! | `cidx watch` | Rebuild on startup and on every interval until Ctrl-C |
//!
//! Logs go to stderr and honour `RUST_LOG`; command output goes to stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use content_index::config::{self, Config};
use content_index::events::{IndexEventListener, JsonEventListener};
use content_index::migrate;
use content_index::models::SearchResultsPage;
use content_index::trigger::{RebuildTrigger, TriggerReason};
use content_index::IndexService;

/// Content Index CLI: a rebuildable full-text index over a
/// version-controlled content tree.
#[derive(Parser)]
#[command(
    name = "cidx",
    about = "Content Index: rebuild and search a full-text index over a content tree",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cidx.toml")]
    config: PathBuf,

    /// Emit rebuild events as JSON lines on stderr.
    #[arg(long, global = true)]
    json_events: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Rebuild the index from the content tree.
    ///
    /// Fetches a fresh checkout first when `source.reset_on_rebuild` is set.
    Rebuild,

    /// Search the index.
    ///
    /// The in-memory index lives only as long as the process, so this
    /// rebuilds before querying. Results are ordered newest first.
    Search {
        /// The search query string.
        query: String,

        /// Number of results to skip.
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum results on the page. Defaults to `search.default_page_size`.
        #[arg(long)]
        page_size: Option<usize>,

        /// Include unlisted items.
        #[arg(long)]
        all: bool,

        /// Print the page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Keep the index fresh.
    ///
    /// Rebuilds once at startup, then treats every tick as a "content
    /// updated" notification. Overlapping triggers are coalesced.
    Watch {
        /// Seconds between rebuild triggers.
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("initialized {}", cfg.db.path.display());
        }
        Commands::Rebuild => {
            let service = open_service(&cfg, cli.json_events).await?;
            let status = service.rebuild().await.context("rebuild failed")?;
            println!(
                "rebuilt {} items at {}",
                status.count,
                status.completed_at.to_rfc3339()
            );
        }
        Commands::Search {
            query,
            offset,
            page_size,
            all,
            json,
        } => {
            let service = open_service(&cfg, cli.json_events).await?;
            service.rebuild().await.context("rebuild failed")?;

            let page_size = page_size.unwrap_or(cfg.search.default_page_size);
            let page = service.search(&query, offset, page_size, !all).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_page(&page);
            }
        }
        Commands::Watch { interval_secs } => {
            run_watch(&cfg, cli.json_events, interval_secs).await?;
        }
    }

    Ok(())
}

async fn open_service(cfg: &Config, json_events: bool) -> Result<IndexService> {
    let mut extra: Vec<Arc<dyn IndexEventListener>> = Vec::new();
    if json_events {
        extra.push(Arc::new(JsonEventListener));
    }
    IndexService::from_config(cfg, extra).await
}

fn print_page(page: &SearchResultsPage) {
    if page.items.is_empty() {
        println!("No results. (total: {})", page.total);
        return;
    }

    println!(
        "{} results, showing {}-{}",
        page.total,
        page.offset + 1,
        page.offset + page.items.len()
    );
    println!();
    for (i, item) in page.items.iter().enumerate() {
        println!("{}. {}", page.offset + i + 1, item.title);
        println!("    date: {}", item.date.format("%Y-%m-%d"));
        println!("    path: {}", item.path);
        if !item.listed {
            println!("    unlisted");
        }
        println!();
    }
}

async fn run_watch(cfg: &Config, json_events: bool, interval_secs: u64) -> Result<()> {
    if interval_secs == 0 {
        anyhow::bail!("--interval-secs must be > 0");
    }

    let service = Arc::new(open_service(cfg, json_events).await?);
    let trigger = RebuildTrigger::spawn(service);
    trigger.trigger(TriggerReason::Startup);

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    // The first tick completes immediately; startup already covers it.
    ticker.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                trigger.trigger(TriggerReason::ContentUpdated);
            }
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    trigger.shutdown().await;
    Ok(())
}
