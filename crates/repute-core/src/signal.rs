// crates/repute-core/src/signal.rs
//
// Raw signal types: the records produced by the collection layer and the
// validated, immutable Observations and SentimentSamples derived from them.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReputeError;
use crate::subject::Subject;

/// A feed that observations are collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Fred,
    Ycharts,
    MichiganSentiment,
    OurWorldInData,
    Census,
    #[serde(rename = "openrank")]
    OpenRank,
    SocialMedia,
    News,
}

/// Which component scorer consumes a source's observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    /// Macro/market time series (FRED, YCharts, consumer sentiment, ...).
    Economic,
    /// Engagement and mention volume.
    Social,
    /// Pairwise interaction strength feeding the trust matrix.
    Trust,
}

impl SignalSource {
    /// Every source, in canonical order.
    pub const ALL: [SignalSource; 8] = [
        SignalSource::Fred,
        SignalSource::Ycharts,
        SignalSource::MichiganSentiment,
        SignalSource::OurWorldInData,
        SignalSource::Census,
        SignalSource::OpenRank,
        SignalSource::SocialMedia,
        SignalSource::News,
    ];

    pub fn category(&self) -> SourceCategory {
        match self {
            SignalSource::Fred
            | SignalSource::Ycharts
            | SignalSource::MichiganSentiment
            | SignalSource::OurWorldInData
            | SignalSource::Census => SourceCategory::Economic,
            SignalSource::SocialMedia | SignalSource::News => SourceCategory::Social,
            SignalSource::OpenRank => SourceCategory::Trust,
        }
    }

    /// Stable lowercase identifier, used in feed URLs and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Fred => "fred",
            SignalSource::Ycharts => "ycharts",
            SignalSource::MichiganSentiment => "michigan_sentiment",
            SignalSource::OurWorldInData => "our_world_in_data",
            SignalSource::Census => "census",
            SignalSource::OpenRank => "openrank",
            SignalSource::SocialMedia => "social_media",
            SignalSource::News => "news",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days` days ending at `now` (inclusive of `now`).
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Result<Self, ReputeError> {
        let span = Duration::try_days(days)
            .ok_or_else(|| ReputeError::Validation(format!("window of {} days is out of range", days)))?;
        Self::ending_at(now, span)
    }

    /// The `hours` hours ending at `now` (inclusive of `now`).
    pub fn last_hours(now: DateTime<Utc>, hours: i64) -> Result<Self, ReputeError> {
        let span = Duration::try_hours(hours)
            .ok_or_else(|| ReputeError::Validation(format!("window of {} hours is out of range", hours)))?;
        Self::ending_at(now, span)
    }

    fn ending_at(now: DateTime<Utc>, span: Duration) -> Result<Self, ReputeError> {
        let start = now
            .checked_sub_signed(span)
            .ok_or_else(|| ReputeError::Validation(format!("window start before {} is out of range", now)))?;
        let end = now
            .checked_add_signed(Duration::milliseconds(1))
            .ok_or_else(|| ReputeError::Validation(format!("window end after {} is out of range", now)))?;
        Ok(Self::new(start, end))
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.start && *ts < self.end
    }
}

/// A record as returned by a collector, before validation.
///
/// Text records become SentimentSamples (through the text classifier),
/// value records become Observations. A record may carry both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A numeric observation about a subject. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub subject: Subject,
    pub source: SignalSource,
    pub value: f64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, subject: Subject, source: SignalSource, value: f64) -> Self {
        Self {
            timestamp,
            subject,
            source,
            value,
            metadata: HashMap::new(),
            confidence: None,
        }
    }

    /// Attach a metadata entry (builder style).
    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Build an Observation from a raw record's numeric value.
    pub fn from_raw(subject: Subject, source: SignalSource, raw: &RawRecord) -> Result<Self, ReputeError> {
        let timestamp = raw.timestamp.ok_or_else(|| {
            ReputeError::Validation(format!("{}/{} record is missing a timestamp", subject, source))
        })?;
        let value = raw.value.ok_or_else(|| {
            ReputeError::Validation(format!("{}/{} record is missing a value", subject, source))
        })?;
        let obs = Self {
            timestamp,
            subject,
            source,
            value,
            metadata: raw.metadata.clone(),
            confidence: raw.confidence,
        };
        obs.validate()?;
        Ok(obs)
    }

    /// Check the value is finite and the confidence (if any) lies in [0, 1].
    pub fn validate(&self) -> Result<(), ReputeError> {
        if !self.value.is_finite() {
            return Err(ReputeError::Validation(format!(
                "{}/{} observation has non-finite value {}",
                self.subject, self.source, self.value
            )));
        }
        if let Some(c) = self.confidence {
            validate_unit_interval("observation confidence", c)?;
        }
        Ok(())
    }

    /// The subject named by the `target` metadata key, if present and known.
    ///
    /// Trust-category observations use it to point an interaction at another
    /// subject; without it the interaction is self-directed.
    pub fn target(&self) -> Option<Subject> {
        self.metadata
            .get("target")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

/// A scored piece of text about a subject. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSample {
    pub timestamp: DateTime<Utc>,
    pub subject: Subject,
    /// Sentiment in [-1.0, 1.0].
    pub sentiment: f64,
    /// Classifier confidence in [0.0, 1.0].
    pub confidence: f64,
    pub source_text: String,
    /// Origin of the text ("news", "social_media", ...).
    pub source_type: String,
}

impl SentimentSample {
    /// Check sentiment lies in [-1, 1] and confidence in [0, 1].
    pub fn validate(&self) -> Result<(), ReputeError> {
        if !self.sentiment.is_finite() || !(-1.0..=1.0).contains(&self.sentiment) {
            return Err(ReputeError::Validation(format!(
                "{} sentiment {} outside [-1, 1]",
                self.subject, self.sentiment
            )));
        }
        validate_unit_interval("sentiment confidence", self.confidence)
    }
}

fn validate_unit_interval(label: &str, value: f64) -> Result<(), ReputeError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ReputeError::Validation(format!(
            "{} {} outside [0, 1]",
            label, value
        )));
    }
    Ok(())
}
