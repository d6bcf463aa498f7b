// crates/repute-pipeline/src/collectors.rs
//
// Collection-layer implementations.
//
// MockCollector synthesizes plausible mentions and numeric samples for
// offline runs and tests. HttpFeedCollector reads normalized records from
// a JSON feed service.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use repute_core::error::ReputeError;
use repute_core::signal::{RawRecord, SignalSource, SourceCategory, TimeRange};
use repute_core::subject::Subject;
use repute_core::traits::Collector;

const POSITIVE_PATTERNS: &[&str] = &[
    "is doing great work on",
    "has an innovative plan for",
    "showed impressive leadership on",
    "got strong support for",
];

const NEGATIVE_PATTERNS: &[&str] = &[
    "is a disaster on",
    "made a terrible call on",
    "was irresponsible about",
    "got the worst reviews for",
];

const NEUTRAL_PATTERNS: &[&str] = &[
    "said something today about",
    "announced news on",
    "was mentioned in a report on",
];

fn topics(subject: Subject) -> &'static [&'static str] {
    match subject {
        Subject::Musk => &["Tesla", "SpaceX", "X", "Neuralink", "electric vehicles", "Mars"],
        Subject::Trump => &["the economy", "trade", "the election", "immigration", "tariffs", "the rally"],
    }
}

fn display_name(subject: Subject) -> &'static str {
    match subject {
        Subject::Musk => "Elon Musk",
        Subject::Trump => "Donald Trump",
    }
}

/// Typical level of a numeric source, before noise.
fn baseline(source: SignalSource) -> f64 {
    match source {
        SignalSource::Fred => 100.0,
        SignalSource::Ycharts => 250.0,
        SignalSource::MichiganSentiment => 70.0,
        SignalSource::OurWorldInData => 40.0,
        SignalSource::Census => 330.0,
        SignalSource::SocialMedia => 55.0,
        SignalSource::News => 50.0,
        SignalSource::OpenRank => 0.5,
    }
}

/// Synthetic collector for offline runs. Seedable for reproducible output.
pub struct MockCollector {
    rng: Mutex<StdRng>,
}

impl MockCollector {
    /// A collector seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// A deterministic collector.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn timestamp_in(rng: &mut StdRng, range: &TimeRange) -> chrono::DateTime<chrono::Utc> {
        let span = (range.end - range.start).num_milliseconds().max(1);
        range.start + ChronoDuration::milliseconds(rng.gen_range(0..span))
    }

    fn mention(rng: &mut StdRng, subject: Subject) -> String {
        let pattern = match rng.gen_range(0..3) {
            0 => POSITIVE_PATTERNS.choose(rng),
            1 => NEGATIVE_PATTERNS.choose(rng),
            _ => NEUTRAL_PATTERNS.choose(rng),
        }
        .copied()
        .unwrap_or("said");
        let topic = topics(subject).choose(rng).copied().unwrap_or("the news");
        format!("{} {} {}", display_name(subject), pattern, topic)
    }

    fn record(rng: &mut StdRng, subject: Subject, source: SignalSource, range: &TimeRange) -> RawRecord {
        let timestamp = Some(Self::timestamp_in(rng, range));
        let mut metadata = HashMap::new();
        metadata.insert("generator".to_string(), serde_json::json!("mock"));

        match source.category() {
            SourceCategory::Economic => {
                let base = baseline(source);
                RawRecord {
                    value: Some(base * rng.gen_range(0.9..1.1)),
                    timestamp,
                    metadata,
                    ..RawRecord::default()
                }
            }
            SourceCategory::Trust => {
                let target = *Subject::ALL.choose(rng).unwrap_or(&subject);
                metadata.insert("target".to_string(), serde_json::json!(target.as_str()));
                RawRecord {
                    value: Some(rng.gen_range(0.0..1.0)),
                    confidence: Some(rng.gen_range(0.5..1.0)),
                    timestamp,
                    metadata,
                    ..RawRecord::default()
                }
            }
            SourceCategory::Social => {
                metadata.insert("platform".to_string(), serde_json::json!(source.as_str()));
                // Social posts carry an engagement score as well as text.
                let value = match source {
                    SignalSource::SocialMedia => Some((baseline(source) + rng.gen_range(-20.0..20.0)).clamp(0.0, 100.0)),
                    _ => None,
                };
                RawRecord {
                    text: Some(Self::mention(rng, subject)),
                    value,
                    timestamp,
                    metadata,
                    ..RawRecord::default()
                }
            }
        }
    }
}

impl Default for MockCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for MockCollector {
    async fn collect(
        &self,
        subject: Subject,
        source: SignalSource,
        limit: usize,
        range: TimeRange,
    ) -> Result<Vec<RawRecord>, ReputeError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ReputeError::SourceUnavailable("mock generator lock poisoned".to_string()))?;
        let count = if limit == 0 { 0 } else { rng.gen_range(1..=limit) };
        let mut records: Vec<RawRecord> = (0..count)
            .map(|_| Self::record(&mut rng, subject, source, &range))
            .collect();
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        tracing::trace!("Mock collector produced {} records for {}/{}", records.len(), subject, source);
        Ok(records)
    }
}

/// Reads records from `GET {base_url}/{source}/{subject}?limit=N`.
///
/// The feed returns a JSON array of raw records; records outside the
/// requested range are dropped client-side.
#[derive(Debug, Clone)]
pub struct HttpFeedCollector {
    /// Base URL of the feed service (e.g., "http://127.0.0.1:8080/feeds").
    pub base_url: String,
    client: reqwest::Client,
}

impl HttpFeedCollector {
    /// Fails if the HTTP client cannot be built with the given timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ReputeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReputeError::Validation(format!("Failed to build feed client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, subject: Subject, source: SignalSource, limit: usize) -> String {
        format!("{}/{}/{}?limit={}", self.base_url, source, subject, limit)
    }
}

#[async_trait]
impl Collector for HttpFeedCollector {
    async fn collect(
        &self,
        subject: Subject,
        source: SignalSource,
        limit: usize,
        range: TimeRange,
    ) -> Result<Vec<RawRecord>, ReputeError> {
        let url = self.url(subject, source, limit);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReputeError::SourceUnavailable(format!("feed request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReputeError::SourceUnavailable(format!(
                "feed {} returned {}: {}",
                url, status, body
            )));
        }

        let records: Vec<RawRecord> = response
            .json()
            .await
            .map_err(|e| ReputeError::SourceUnavailable(format!("feed {} sent malformed records: {}", url, e)))?;

        Ok(records
            .into_iter()
            .filter(|r| r.timestamp.map_or(true, |ts| range.contains(&ts)))
            .take(limit)
            .collect())
    }
}
