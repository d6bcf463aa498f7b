// crates/repute-core/src/traits.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReputeError;
use crate::score::{PublishedResult, ReputationScore, TrustScore};
use crate::signal::{RawRecord, SignalSource, TimeRange};
use crate::subject::Subject;

/// Trait for the external collection layer.
///
/// Implemented by repute-pipeline (mock generator, HTTP feed). A failing
/// source returns an error; the cycle isolates it and carries on.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Fetch up to `limit` raw records for `subject` from `source` within `range`.
    async fn collect(
        &self,
        subject: Subject,
        source: SignalSource,
        limit: usize,
        range: TimeRange,
    ) -> Result<Vec<RawRecord>, ReputeError>;
}

/// Trait for sentiment text classification.
///
/// Implemented by repute-reputation (`LexiconClassifier`).
pub trait TextClassifier: Send + Sync {
    /// Classify a text. Returns `(sentiment in [-1, 1], confidence in [0, 1])`.
    fn classify(&self, text: &str) -> (f64, f64);
}

/// Trait for the append-only score log.
///
/// A cycle's rows are first staged, invisible to every load, and only join
/// the log when the cycle commits them. At most one cycle is staged at a
/// time. Implemented by repute-store (RocksDB and in-memory backends).
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Stage one cycle's scores, replacing anything already staged.
    /// Either every row is staged or none is.
    async fn stage_cycle(
        &self,
        trust: &[TrustScore],
        reputation: &[ReputationScore],
    ) -> Result<(), ReputeError>;

    /// Move the staged rows into the log in one atomic write. Returns the
    /// number of rows committed.
    async fn commit_staged(&self) -> Result<usize, ReputeError>;

    /// Drop any staged rows. Returns the number of rows dropped.
    async fn discard_staged(&self) -> Result<usize, ReputeError>;

    /// Stage and commit in one step.
    async fn append_cycle(
        &self,
        trust: &[TrustScore],
        reputation: &[ReputationScore],
    ) -> Result<(), ReputeError> {
        self.stage_cycle(trust, reputation).await?;
        self.commit_staged().await.map(|_| ())
    }

    /// Load a subject's TrustScores within `range`, ascending by timestamp.
    async fn load_trust_scores(
        &self,
        subject: Subject,
        range: TimeRange,
    ) -> Result<Vec<TrustScore>, ReputeError>;

    /// Load a subject's ReputationScores within `range`, ascending by timestamp.
    async fn load_reputation_scores(
        &self,
        subject: Subject,
        range: TimeRange,
    ) -> Result<Vec<ReputationScore>, ReputeError>;

    /// The most recent ReputationScore for a subject, if any.
    async fn latest_reputation(&self, subject: Subject) -> Result<Option<ReputationScore>, ReputeError>;

    /// The most recent TrustScore for a subject, if any.
    async fn latest_trust(&self, subject: Subject) -> Result<Option<TrustScore>, ReputeError>;
}

/// What a publisher did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    /// The snapshot was written.
    Published,
    /// An identical snapshot for this timestamp was already published.
    Unchanged,
}

/// Trait for the result publisher. Publishing the same snapshot twice
/// must have no additional observable effect.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, result: &PublishedResult) -> Result<PublishOutcome, ReputeError>;
}
