// crates/repute-daemon/src/config.rs
//
// Runtime configuration for the Repute daemon.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

use repute_pipeline::PipelineConfig;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Log level used when RUST_LOG is unset: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for local data storage (the RocksDB score log).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory published snapshots are written to.
    #[serde(default = "default_publish_dir")]
    pub publish_dir: String,

    /// Seconds between analysis cycles.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Run the retention sweep after every N cycles. 0 disables it.
    #[serde(default = "default_sweep_every_cycles")]
    pub sweep_every_cycles: u64,

    /// Use the synthetic collector instead of the HTTP feed.
    #[serde(default = "default_use_mock_collector")]
    pub use_mock_collector: bool,

    /// Seed for the synthetic collector. Unset means OS entropy.
    #[serde(default)]
    pub mock_seed: Option<u64>,

    /// Base URL of the HTTP feed service (e.g., "http://127.0.0.1:8080/feeds").
    #[serde(default)]
    pub feed_url: Option<String>,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    "~/.repute/data".to_string()
}

fn default_publish_dir() -> String {
    "~/.repute/published".to_string()
}

fn default_cycle_interval_secs() -> u64 {
    3600
}

fn default_sweep_every_cycles() -> u64 {
    24
}

fn default_use_mock_collector() -> bool {
    true
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            publish_dir: default_publish_dir(),
            cycle_interval_secs: default_cycle_interval_secs(),
            sweep_every_cycles: default_sweep_every_cycles(),
            use_mock_collector: default_use_mock_collector(),
            mock_seed: None,
            feed_url: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: DaemonConfig = toml::from_str(contents)?;
        Ok(config)
    }
}
