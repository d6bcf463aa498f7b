// crates/repute-store/src/signals.rs
//
// SignalStore: in-memory, queryable collection of Observations and
// SentimentSamples.
//
// Records are append-only. Each record is written whole under the write
// lock, so a concurrent query sees either the pre- or post-append state of
// every record. The only deletion path is the age-based retention sweep,
// which holds both write locks for its whole duration and swaps in the
// retained sets at once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use repute_core::error::ReputeError;
use repute_core::signal::{Observation, SentimentSample, SignalSource, SourceCategory, TimeRange};
use repute_core::subject::Subject;

/// Filter for `SignalStore::query_observations`. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct SignalQuery {
    pub subject: Option<Subject>,
    pub source: Option<SignalSource>,
    pub category: Option<SourceCategory>,
    pub range: Option<TimeRange>,
}

impl SignalQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn source(mut self, source: SignalSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn category(mut self, category: SourceCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    fn matches(&self, obs: &Observation) -> bool {
        self.subject.map_or(true, |s| obs.subject == s)
            && self.source.map_or(true, |s| obs.source == s)
            && self.category.map_or(true, |c| obs.source.category() == c)
            && self.range.map_or(true, |r| r.contains(&obs.timestamp))
    }
}

/// Counts from a batch append. Invalid records are skipped, not fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: usize,
}

impl IngestReport {
    pub fn merge(&mut self, other: IngestReport) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
    }
}

/// Result of a retention sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionReport {
    /// Total records removed (observations + sentiment samples).
    pub deleted_count: usize,
    pub deleted_observations: usize,
    pub deleted_sentiments: usize,
    /// Records strictly older than this were removed.
    pub cutoff: DateTime<Utc>,
}

/// Per-subject collection statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectStats {
    pub observations: usize,
    pub sentiment_samples: usize,
    /// Mean observation value; 0.0 when there are none.
    pub avg_value: f64,
    pub sources: Vec<SignalSource>,
}

/// Statistics about the signals collected within a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_records: usize,
    pub by_subject: BTreeMap<Subject, SubjectStats>,
    pub latest_timestamp: Option<DateTime<Utc>>,
    pub oldest_timestamp: Option<DateTime<Utc>>,
}

/// In-memory signal store.
#[derive(Debug, Default)]
pub struct SignalStore {
    observations: RwLock<Vec<Observation>>,
    sentiments: RwLock<Vec<SentimentSample>>,
}

fn poisoned(what: &str) -> ReputeError {
    ReputeError::Persistence(format!("{} lock poisoned", what))
}

impl SignalStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one observation after validating it.
    pub fn append_observation(&self, obs: Observation) -> Result<(), ReputeError> {
        obs.validate()?;
        self.observations
            .write()
            .map_err(|_| poisoned("observation"))?
            .push(obs);
        Ok(())
    }

    /// Append one sentiment sample after validating it.
    pub fn append_sentiment(&self, sample: SentimentSample) -> Result<(), ReputeError> {
        sample.validate()?;
        self.sentiments
            .write()
            .map_err(|_| poisoned("sentiment"))?
            .push(sample);
        Ok(())
    }

    /// Append a batch of observations, skipping (and logging) invalid ones.
    pub fn append_observations<I>(&self, batch: I) -> Result<IngestReport, ReputeError>
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut report = IngestReport::default();
        let mut valid = Vec::new();
        for obs in batch {
            match obs.validate() {
                Ok(()) => valid.push(obs),
                Err(e) => {
                    tracing::warn!("Rejected observation: {}", e);
                    report.rejected += 1;
                }
            }
        }
        report.accepted = valid.len();
        self.observations
            .write()
            .map_err(|_| poisoned("observation"))?
            .extend(valid);
        Ok(report)
    }

    /// Append a batch of sentiment samples, skipping (and logging) invalid ones.
    pub fn append_sentiments<I>(&self, batch: I) -> Result<IngestReport, ReputeError>
    where
        I: IntoIterator<Item = SentimentSample>,
    {
        let mut report = IngestReport::default();
        let mut valid = Vec::new();
        for sample in batch {
            match sample.validate() {
                Ok(()) => valid.push(sample),
                Err(e) => {
                    tracing::warn!("Rejected sentiment sample: {}", e);
                    report.rejected += 1;
                }
            }
        }
        report.accepted = valid.len();
        self.sentiments
            .write()
            .map_err(|_| poisoned("sentiment"))?
            .extend(valid);
        Ok(report)
    }

    /// Observations matching `query`, ascending by timestamp.
    ///
    /// Result size is unbounded; callers narrow with a time range.
    pub fn query_observations(&self, query: &SignalQuery) -> Result<Vec<Observation>, ReputeError> {
        let guard = self.observations.read().map_err(|_| poisoned("observation"))?;
        let mut out: Vec<Observation> = guard.iter().filter(|o| query.matches(o)).cloned().collect();
        drop(guard);
        out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(out)
    }

    /// Sentiment samples for an optional subject and range, ascending by timestamp.
    pub fn query_sentiments(
        &self,
        subject: Option<Subject>,
        range: Option<TimeRange>,
    ) -> Result<Vec<SentimentSample>, ReputeError> {
        let guard = self.sentiments.read().map_err(|_| poisoned("sentiment"))?;
        let mut out: Vec<SentimentSample> = guard
            .iter()
            .filter(|s| subject.map_or(true, |want| s.subject == want))
            .filter(|s| range.map_or(true, |r| r.contains(&s.timestamp)))
            .cloned()
            .collect();
        drop(guard);
        out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(out)
    }

    /// Total number of stored records.
    pub fn len(&self) -> usize {
        let obs = self.observations.read().map(|g| g.len()).unwrap_or(0);
        let sent = self.sentiments.read().map(|g| g.len()).unwrap_or(0);
        obs + sent
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete every record with a timestamp strictly before `cutoff`.
    ///
    /// Both collections are locked before anything is removed, so either all
    /// qualifying records go or (on a lock failure) none do.
    pub fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> Result<RetentionReport, ReputeError> {
        let mut observations = self.observations.write().map_err(|_| poisoned("observation"))?;
        let mut sentiments = self.sentiments.write().map_err(|_| poisoned("sentiment"))?;

        let before_obs = observations.len();
        let before_sent = sentiments.len();

        let kept_obs: Vec<Observation> = observations
            .iter()
            .filter(|o| o.timestamp >= cutoff)
            .cloned()
            .collect();
        let kept_sent: Vec<SentimentSample> = sentiments
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .cloned()
            .collect();

        let deleted_observations = before_obs - kept_obs.len();
        let deleted_sentiments = before_sent - kept_sent.len();
        *observations = kept_obs;
        *sentiments = kept_sent;

        let report = RetentionReport {
            deleted_count: deleted_observations + deleted_sentiments,
            deleted_observations,
            deleted_sentiments,
            cutoff,
        };
        tracing::info!(
            "Retention sweep removed {} records older than {}",
            report.deleted_count,
            cutoff
        );
        Ok(report)
    }

    /// Delete every record older than `retention_days` days before `now`.
    /// Fails with `Validation`, deleting nothing, when the cutoff is not a
    /// representable time.
    pub fn sweep_retention(&self, now: DateTime<Utc>, retention_days: i64) -> Result<RetentionReport, ReputeError> {
        let cutoff = Duration::try_days(retention_days)
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(|| {
                ReputeError::Validation(format!("retention of {} days is out of range", retention_days))
            })?;
        self.sweep_older_than(cutoff)
    }

    /// Newest timestamp across all stored records.
    pub fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, ReputeError> {
        let obs = self.observations.read().map_err(|_| poisoned("observation"))?;
        let sent = self.sentiments.read().map_err(|_| poisoned("sentiment"))?;
        Ok(obs
            .iter()
            .map(|o| o.timestamp)
            .chain(sent.iter().map(|s| s.timestamp))
            .max())
    }

    /// Collection statistics for records within `range`.
    pub fn stats(&self, range: TimeRange) -> Result<CollectionStats, ReputeError> {
        let obs = self.query_observations(&SignalQuery::new().range(range))?;
        let sent = self.query_sentiments(None, Some(range))?;

        let mut by_subject = BTreeMap::new();
        for subject in Subject::ALL {
            let values: Vec<&Observation> = obs.iter().filter(|o| o.subject == subject).collect();
            let sources: BTreeSet<SignalSource> = values.iter().map(|o| o.source).collect();
            let avg_value = if values.is_empty() {
                0.0
            } else {
                values.iter().map(|o| o.value).sum::<f64>() / values.len() as f64
            };
            by_subject.insert(
                subject,
                SubjectStats {
                    observations: values.len(),
                    sentiment_samples: sent.iter().filter(|s| s.subject == subject).count(),
                    avg_value,
                    sources: sources.into_iter().collect(),
                },
            );
        }

        let timestamps = obs.iter().map(|o| o.timestamp).chain(sent.iter().map(|s| s.timestamp));
        let (mut latest, mut oldest) = (None, None);
        for ts in timestamps {
            latest = Some(latest.map_or(ts, |l: DateTime<Utc>| l.max(ts)));
            oldest = Some(oldest.map_or(ts, |o: DateTime<Utc>| o.min(ts)));
        }

        Ok(CollectionStats {
            total_records: obs.len() + sent.len(),
            by_subject,
            latest_timestamp: latest,
            oldest_timestamp: oldest,
        })
    }
}
