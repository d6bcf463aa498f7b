// crates/repute-pipeline/src/config.rs
//
// Pipeline and scoring configuration.
// Deserialized from the `[pipeline]` and `[pipeline.scoring]` TOML tables;
// every field has a default.

use serde::{Deserialize, Serialize};

use repute_core::error::ReputeError;
use repute_core::signal::SignalSource;
use repute_core::subject::Subject;
use repute_reputation::aggregator::{ComponentWeights, ReputationAggregator, UncertaintyModel};
use repute_reputation::decay::DecayFunction;
use repute_reputation::eigentrust::EigenTrustConfig;
use repute_reputation::scorers::ScorerSet;
use repute_reputation::trust_matrix::TrustMatrix;

/// Upper bound on every day-denominated window (ten years).
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Configuration of one analysis cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sources fetched every cycle.
    #[serde(default = "default_sources")]
    pub sources: Vec<SignalSource>,

    /// Maximum records requested per (subject, source).
    #[serde(default = "default_collect_limit")]
    pub collect_limit: usize,

    /// How far back each fetch (and the trust matrix) looks.
    #[serde(default = "default_collect_window_days")]
    pub collect_window_days: i64,

    /// Hard per-fetch timeout.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Window of ReputationScores fed to comparison and trend analysis.
    #[serde(default = "default_comparison_window_hours")]
    pub comparison_window_hours: i64,

    /// Signals older than this many days are removed by the retention sweep.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

fn default_sources() -> Vec<SignalSource> {
    SignalSource::ALL.to_vec()
}

fn default_collect_limit() -> usize {
    50
}

fn default_collect_window_days() -> i64 {
    7
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_comparison_window_hours() -> i64 {
    168
}

fn default_retention_days() -> i64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            collect_limit: default_collect_limit(),
            collect_window_days: default_collect_window_days(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            comparison_window_hours: default_comparison_window_hours(),
            retention_days: default_retention_days(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ReputeError> {
        check_window("collect_window_days", self.collect_window_days, MAX_WINDOW_DAYS)?;
        check_window("comparison_window_hours", self.comparison_window_hours, MAX_WINDOW_DAYS * 24)?;
        check_window("retention_days", self.retention_days, MAX_WINDOW_DAYS)?;
        if self.fetch_timeout_secs == 0 {
            return Err(ReputeError::Validation(
                "fetch_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.scoring.validate()
    }
}

fn check_window(name: &str, value: i64, max: i64) -> Result<(), ReputeError> {
    if value <= 0 || value > max {
        return Err(ReputeError::Validation(format!(
            "{} must be in 1..={}, got {}",
            name, max, value
        )));
    }
    Ok(())
}

/// Constants of trust propagation and reputation scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_damping_factor")]
    pub damping_factor: f64,

    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Time constant of the default exponential sentiment decay.
    #[serde(default = "default_sentiment_decay_hours")]
    pub sentiment_decay_hours: f64,

    /// Explicit decay function; takes precedence over `sentiment_decay_hours`.
    #[serde(default)]
    pub decay: Option<DecayFunction>,

    /// Observations in the economic "recent" average.
    #[serde(default = "default_economic_recent_window")]
    pub economic_recent_window: usize,

    #[serde(default)]
    pub weights: ComponentWeights,

    /// Assumed standard deviation of the fixed uncertainty model.
    #[serde(default = "default_interval_std_dev")]
    pub interval_std_dev: f64,

    /// Explicit uncertainty model; takes precedence over `interval_std_dev`.
    #[serde(default)]
    pub uncertainty: Option<UncertaintyModel>,

    /// Minimum score movement for an improving/declining trend.
    #[serde(default = "default_trend_threshold")]
    pub trend_threshold: f64,

    /// Number of future periods predicted for each subject's trend.
    #[serde(default = "default_prediction_periods")]
    pub prediction_periods: usize,

    /// Base relationship matrix added to observed interactions, rows and
    /// columns in `Subject::ALL` order.
    #[serde(default)]
    pub base_trust_matrix: Option<Vec<Vec<f64>>>,
}

fn default_damping_factor() -> f64 {
    0.85
}

fn default_convergence_threshold() -> f64 {
    1e-6
}

fn default_max_iterations() -> u32 {
    100
}

fn default_sentiment_decay_hours() -> f64 {
    24.0
}

fn default_economic_recent_window() -> usize {
    7
}

fn default_interval_std_dev() -> f64 {
    5.0
}

fn default_trend_threshold() -> f64 {
    1.0
}

fn default_prediction_periods() -> usize {
    7
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            damping_factor: default_damping_factor(),
            convergence_threshold: default_convergence_threshold(),
            max_iterations: default_max_iterations(),
            sentiment_decay_hours: default_sentiment_decay_hours(),
            decay: None,
            economic_recent_window: default_economic_recent_window(),
            weights: ComponentWeights::default(),
            interval_std_dev: default_interval_std_dev(),
            uncertainty: None,
            trend_threshold: default_trend_threshold(),
            prediction_periods: default_prediction_periods(),
            base_trust_matrix: None,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ReputeError> {
        self.eigentrust().validate()?;
        self.weights.validate()?;
        if !(self.sentiment_decay_hours > 0.0) {
            return Err(ReputeError::Validation(format!(
                "sentiment_decay_hours must be positive, got {}",
                self.sentiment_decay_hours
            )));
        }
        self.aggregator()?;
        self.base_matrix(&Subject::ALL)?;
        Ok(())
    }

    pub fn eigentrust(&self) -> EigenTrustConfig {
        EigenTrustConfig {
            damping_factor: self.damping_factor,
            max_iterations: self.max_iterations,
            convergence_threshold: self.convergence_threshold,
        }
    }

    pub fn decay_function(&self) -> DecayFunction {
        self.decay.clone().unwrap_or(DecayFunction::TimeConstant {
            hours: self.sentiment_decay_hours,
        })
    }

    pub fn uncertainty_model(&self) -> UncertaintyModel {
        self.uncertainty.clone().unwrap_or(UncertaintyModel::Fixed {
            std_dev: self.interval_std_dev,
        })
    }

    pub fn scorer_set(&self) -> ScorerSet {
        ScorerSet::new(self.decay_function(), self.economic_recent_window)
    }

    pub fn aggregator(&self) -> Result<ReputationAggregator, ReputeError> {
        ReputationAggregator::new(self.weights, self.uncertainty_model())
    }

    pub fn base_matrix(&self, subjects: &[Subject]) -> Result<Option<TrustMatrix>, ReputeError> {
        self.base_trust_matrix
            .as_ref()
            .map(|rows| TrustMatrix::from_rows(subjects, rows.clone()))
            .transpose()
    }
}
