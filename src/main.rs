//! newswire — command-line entrypoint.
//! Wires config, logging, metrics, source and store, then runs one mode or
//! the scheduler until ctrl-c.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use newswire_ingest::ingest::providers::FixtureSource;
use newswire_ingest::ingest::scheduler::{Job, Scheduler};
use newswire_ingest::store::{FileStore, MemoryStore};
use newswire_ingest::{
    AppConfig, ArticleStore, FetchFilter, Ingestor, NewsSource, RunLogStore, RunReport, TimeRange,
};

#[derive(Parser, Debug)]
#[command(name = "newswire", version, about = "Exactly-once news headline ingestion")]
struct Cli {
    /// Config file (overrides $NEWSWIRE_CONFIG_PATH and config/newswire.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read stories from a JSON fixture instead of the remote API
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Debug logging (unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Category to scope the fetch to (always tagged first)
    #[arg(long)]
    category: Option<String>,
    /// ISO 639-1 language restriction
    #[arg(long)]
    language: Option<String>,
    /// Extra free-text query
    #[arg(long)]
    query: Option<String>,
}

impl From<FilterArgs> for FetchFilter {
    fn from(a: FilterArgs) -> Self {
        FetchFilter {
            category: a.category,
            language: a.language,
            query: a.query,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a single page
    Fetch {
        #[command(flatten)]
        filter: FilterArgs,
        /// Page size (capped at the source maximum)
        #[arg(long)]
        count: Option<usize>,
        #[arg(long, value_parser = parse_when)]
        start: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_when)]
        end: Option<DateTime<Utc>>,
    },
    /// Exhaustively fetch [start, end] page by page
    FetchAll {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_parser = parse_when)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_when)]
        end: Option<DateTime<Utc>>,
    },
    /// Walk backward from end (default now) to start
    Backfill {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_parser = parse_when)]
        start: DateTime<Utc>,
        #[arg(long, value_parser = parse_when)]
        end: Option<DateTime<Utc>>,
    },
    /// Fetch everything newer than the latest stored item
    Incremental,
    /// Print store statistics
    Stats,
    /// Fetch bodies for stored items that have none
    RefillBodies {
        /// Only items tagged with this category
        #[arg(long)]
        category: Option<String>,
        /// At most this many items, newest first
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete items older than the retention window
    Cleanup {
        /// Days to keep (default: schedule.retention_days)
        #[arg(long)]
        days: Option<i64>,
    },
    /// Run the periodic jobs until ctrl-c
    Schedule {
        /// Run one job now and exit: latest, daily, maintenance or health
        #[arg(long)]
        job: Option<Job>,
    },
}

/// RFC 3339 timestamp or a plain `YYYY-MM-DD` (midnight UTC).
fn parse_when(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| format!("expected RFC 3339 or YYYY-MM-DD, got {s:?}"))
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(p) => AppConfig::load_from(p),
        None => AppConfig::load_default(),
    }
}

fn build_source(cli: &Cli, cfg: &AppConfig) -> Result<Arc<dyn NewsSource>> {
    match &cli.fixture {
        Some(path) => Ok(Arc::new(FixtureSource::from_path(path)?)),
        None => remote_source(cfg),
    }
}

#[cfg(feature = "ingest-http")]
fn remote_source(cfg: &AppConfig) -> Result<Arc<dyn NewsSource>> {
    use newswire_ingest::ingest::providers::HttpSource;
    Ok(Arc::new(HttpSource::from_config(&cfg.source)?))
}

#[cfg(not(feature = "ingest-http"))]
fn remote_source(_cfg: &AppConfig) -> Result<Arc<dyn NewsSource>> {
    anyhow::bail!("no source available: pass --fixture or build with feature `ingest-http`")
}

type Stores = (Arc<dyn ArticleStore>, Arc<dyn RunLogStore>);

fn build_stores(cfg: &AppConfig) -> Result<Stores> {
    match &cfg.store.path {
        Some(dir) => {
            let s = Arc::new(
                FileStore::open(dir).with_context(|| format!("opening store {}", dir.display()))?,
            );
            let articles: Arc<dyn ArticleStore> = s.clone();
            Ok((articles, s))
        }
        None => {
            tracing::warn!("store.path not set; using a volatile in-memory store");
            let s = Arc::new(MemoryStore::new());
            let articles: Arc<dyn ArticleStore> = s.clone();
            Ok((articles, s))
        }
    }
}

fn report(r: &RunReport) -> bool {
    println!("{r}");
    r.is_success()
}

async fn run(cli: Cli) -> Result<bool> {
    let cfg = Arc::new(load_config(cli.config.as_ref())?);
    newswire_ingest::telemetry::init(&cfg.logging, cli.verbose);
    if let Some(addr) = &cfg.metrics.listen_addr {
        newswire_ingest::metrics::install_exporter(addr)?;
    }

    let source = build_source(&cli, &cfg)?;
    let (articles, runs) = build_stores(&cfg)?;
    let ingestor = Arc::new(Ingestor::new(cfg.clone(), source, articles, runs)?);

    let cancel = ingestor.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received; stopping after the current page");
            cancel.cancel();
        }
    });

    let ok = match cli.command {
        Command::Fetch {
            filter,
            count,
            start,
            end,
        } => {
            let range = TimeRange { start, end };
            report(&ingestor.fetch_once(&filter.into(), count, range).await)
        }
        Command::FetchAll { filter, start, end } => {
            report(&ingestor.fetch_range(start, end, &filter.into()).await)
        }
        Command::Backfill { filter, start, end } => {
            report(&ingestor.backfill(start, end, &filter.into()).await)
        }
        Command::Incremental => {
            let reports = ingestor.fetch_since_latest().await?;
            reports.iter().map(report).fold(true, |acc, ok| acc && ok)
        }
        Command::Stats => {
            let s = ingestor.stats().await?;
            println!("{}", serde_json::to_string_pretty(&s)?);
            let runs = ingestor.fetch_log().runs()?;
            println!("runs recorded: {}", runs.len());
            if let Some(last) = ingestor.fetch_log().last_success()? {
                println!(
                    "last successful run: #{} at {}",
                    last.run_id,
                    last.finished_at.map(|t| t.to_rfc3339()).unwrap_or_default()
                );
            }
            true
        }
        Command::RefillBodies { category, limit } => {
            report(&ingestor.refill_bodies(category.as_deref(), limit).await)
        }
        Command::Cleanup { days } => {
            let days = days.unwrap_or(cfg.schedule.retention_days);
            let removed = ingestor.cleanup(days).await?;
            println!("removed {removed} items older than {days} days");
            true
        }
        Command::Schedule { job: Some(job) } => {
            Scheduler::new(ingestor.clone()).run_once(job).await
        }
        Command::Schedule { job: None } => {
            Scheduler::new(ingestor.clone()).spawn().await?;
            true
        }
    };
    Ok(ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
