// crates/repute-core/src/score.rs
//
// Computed score types: per-cycle TrustScores and ReputationScores (kept as
// an immutable time series), and the derived comparison and published
// snapshot (recomputed on every read, never authoritative state).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::subject::Subject;

/// Neutral midpoint used by every scorer when data is absent.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Global trust for one subject from one propagation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScore {
    pub timestamp: DateTime<Utc>,
    pub subject: Subject,
    /// Converged global trust in [0.0, 1.0].
    pub trust_score: f64,
    /// Mean normalized local trust the subject receives.
    pub local_trust: f64,
    /// Prior trust the iteration was anchored on.
    pub pre_trust: f64,
}

/// Combined reputation for one subject from one analysis cycle.
///
/// `overall_score` is the fixed-weight sum of the four components, each
/// clamped to [0, 100] before weighting; `low <= overall_score <= high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationScore {
    pub timestamp: DateTime<Utc>,
    pub subject: Subject,
    pub overall_score: f64,
    pub sentiment_component: f64,
    pub economic_component: f64,
    pub social_component: f64,
    pub trust_component: f64,
    pub confidence_interval: (f64, f64),
}

impl ReputationScore {
    /// A score with every component at the neutral midpoint and a
    /// degenerate interval.
    pub fn neutral(subject: Subject, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            subject,
            overall_score: NEUTRAL_SCORE,
            sentiment_component: NEUTRAL_SCORE,
            economic_component: NEUTRAL_SCORE,
            social_component: NEUTRAL_SCORE,
            trust_component: NEUTRAL_SCORE,
            confidence_interval: (NEUTRAL_SCORE, NEUTRAL_SCORE),
        }
    }
}

/// Outcome of a comparison: a leading subject or a tie.
///
/// Serialized as the subject's name or `"tie"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Subject(Subject),
    Tie,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Subject(s) => write!(f, "{}", s),
            Winner::Tie => f.write_str("tie"),
        }
    }
}

impl Serialize for Winner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Winner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "tie" {
            return Ok(Winner::Tie);
        }
        s.parse::<Subject>()
            .map(Winner::Subject)
            .map_err(serde::de::Error::custom)
    }
}

/// Summary statistics for one subject's score series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    pub subject: Subject,
    pub mean_score: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// `1 / (1 + std_dev)`; higher is more consistent.
    pub consistency: f64,
    pub data_points: usize,
}

/// Derived comparison between two subjects' score series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub winner: Winner,
    /// `|mean_a - mean_b|`, 0.0 on a tie.
    pub margin: f64,
    pub subject_a: SubjectSummary,
    pub subject_b: SubjectSummary,
    pub more_consistent: Winner,
    /// `min(0.9, (n_a + n_b) / 200)`.
    pub confidence: f64,
}

/// Direction of a subject's score series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Improving,
    Declining,
    Stable,
    Unknown,
}

/// Trend statistics over a score series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub trend: TrendLabel,
    pub direction: f64,
    pub strength: f64,
    pub current_avg: f64,
    pub historical_avg: f64,
    pub volatility: f64,
    pub confidence: f64,
    /// Extrapolated overall scores for the next periods, nearest first.
    #[serde(default)]
    pub predictions: Vec<f64>,
}

/// Positive/negative/neutral split of a subject's mentions.
///
/// Percentages are rounded to one decimal and are all 0.0 when there are
/// no mentions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub total_mentions: usize,
    pub positive_mentions: usize,
    pub negative_mentions: usize,
    pub neutral_mentions: usize,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub neutral_pct: f64,
}

/// The artifact published at the end of a successful cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedResult {
    pub timestamp: DateTime<Utc>,
    pub subject_a: ReputationScore,
    pub subject_b: ReputationScore,
    pub comparison_metrics: ComparisonResult,
    #[serde(default)]
    pub trends: BTreeMap<Subject, TrendReport>,
    /// Mention split over the collection window.
    #[serde(default)]
    pub sentiment_distribution: BTreeMap<Subject, SentimentDistribution>,
    /// Subjects whose score was carried over from a previous cycle.
    #[serde(default)]
    pub stale_subjects: Vec<Subject>,
    /// Timestamp of the newest signal the cycle saw.
    pub data_freshness: DateTime<Utc>,
}
