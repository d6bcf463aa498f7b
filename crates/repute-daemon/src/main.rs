// crates/repute-daemon/src/main.rs
//
// Binary entrypoint for the Repute daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, wires the
// pipeline context (collector, score log, publisher), and either runs a
// single cycle (--once) or hands the context to the cycle scheduler.

mod config;
mod scheduler;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use config::DaemonConfig;
use scheduler::CycleScheduler;

use repute_core::error::ReputeError;
use repute_core::traits::{Collector, ScoreStore};
use repute_pipeline::{run_cycle, HttpFeedCollector, JsonFilePublisher, MockCollector, PipelineContext};
use repute_store::{InMemoryScoreLog, RocksScoreLog};

/// Repute daemon: scores tracked subjects on a schedule and publishes the comparison.
#[derive(Parser, Debug)]
#[command(name = "repute-daemon", version = "0.1.0", about = "Repute reputation scoring daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.repute/config.toml")]
    config: String,

    /// Run a single cycle, print the published snapshot as JSON, and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration before tracing so the configured level applies;
    // the load error is reported once the subscriber is up.
    let config_path = expand_tilde(&args.config);
    let loaded = DaemonConfig::load(&config_path);
    let daemon_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => DaemonConfig::default(),
    };

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    match &loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", config_path),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            config_path,
            e
        ),
    }

    tracing::info!("Repute Daemon v0.1.0");
    tracing::info!("Data directory: {}", daemon_config.data_dir);
    tracing::info!("Publish directory: {}", daemon_config.publish_dir);
    tracing::info!(
        "Sources: {}",
        daemon_config
            .pipeline
            .sources
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let collector = build_collector(&daemon_config)?;
    let scores = open_score_log(&daemon_config, args.once);
    let publisher = Arc::new(JsonFilePublisher::new(expand_tilde(&daemon_config.publish_dir)));

    let ctx = PipelineContext::new(daemon_config.pipeline.clone(), collector, scores, publisher)?;

    if args.once {
        let report = run_cycle(&ctx, Utc::now()).await?;
        println!("{}", serde_json::to_string_pretty(&report.result)?);
        return Ok(());
    }

    let mut scheduler = CycleScheduler::new(
        ctx,
        Duration::from_secs(daemon_config.cycle_interval_secs.max(1)),
        daemon_config.sweep_every_cycles,
    );
    scheduler.run().await?;

    tracing::info!("Repute daemon shut down after {} cycles", scheduler.cycles_run());
    Ok(())
}

/// Pick the collection layer from config. A missing feed URL falls back
/// to the synthetic collector.
fn build_collector(config: &DaemonConfig) -> Result<Arc<dyn Collector>, ReputeError> {
    if !config.use_mock_collector {
        if let Some(url) = &config.feed_url {
            tracing::info!("Collecting from HTTP feed at {}", url);
            let timeout = Duration::from_secs(config.pipeline.fetch_timeout_secs);
            return Ok(Arc::new(HttpFeedCollector::new(url, timeout)?));
        }
        tracing::warn!("use_mock_collector is false but no feed_url is set; using the mock collector");
    }
    Ok(match config.mock_seed {
        Some(seed) => {
            tracing::info!("Using mock collector (seed {})", seed);
            Arc::new(MockCollector::seeded(seed))
        }
        None => {
            tracing::info!("Using mock collector");
            Arc::new(MockCollector::new())
        }
    })
}

/// Open the durable score log, or an in-memory one if that fails (or for
/// one-shot runs without an existing data directory).
fn open_score_log(config: &DaemonConfig, once: bool) -> Arc<dyn ScoreStore> {
    let data_dir = expand_tilde(&config.data_dir);
    if once && !Path::new(&data_dir).exists() {
        tracing::info!("No data directory at {}; using an in-memory score log", data_dir);
        return Arc::new(InMemoryScoreLog::new());
    }
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::warn!("Cannot create {}: {}. History will not persist.", data_dir, e);
        return Arc::new(InMemoryScoreLog::new());
    }
    let db_path = format!("{}/scores_rocksdb", data_dir);
    match RocksScoreLog::open(&db_path) {
        Ok(log) => {
            tracing::info!("Score log opened at {}", db_path);
            Arc::new(log)
        }
        Err(e) => {
            tracing::warn!("Failed to open score log: {}. History will not persist.", e);
            Arc::new(InMemoryScoreLog::new())
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{}", home.display(), &path[1..]);
        }
    }
    path.to_string()
}
