// crates/repute-store/src/rocks.rs
//
// RocksDB-backed append-only score log.
//
// Key format:
//   - `trust:{subject}:{millis:020}:{uuid}`      -> JSON-serialized TrustScore
//   - `reputation:{subject}:{millis:020}:{uuid}` -> JSON-serialized ReputationScore
//
//   - `staged:{row key}`                          -> a row of an uncommitted cycle
//
// Zero-padded millisecond timestamps make lexicographic key order equal to
// time order within a subject, so range loads are a single forward scan and
// "latest" is a single reverse seek. The v7 UUID suffix keeps keys unique,
// so existing rows are never overwritten. Staged rows live outside the
// `trust:` and `reputation:` keyspaces, so no load can see them; commit
// renames them into place in one WriteBatch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use repute_core::error::ReputeError;
use repute_core::score::{ReputationScore, TrustScore};
use repute_core::signal::TimeRange;
use repute_core::subject::Subject;
use repute_core::traits::ScoreStore;

const TRUST_TAG: &str = "trust";
const REPUTATION_TAG: &str = "reputation";
const STAGED_PREFIX: &str = "staged:";

/// RocksDB wrapper implementing the `ScoreStore` trait.
#[derive(Debug)]
pub struct RocksScoreLog {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksScoreLog {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, ReputeError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path).map_err(|e| {
            ReputeError::Persistence(format!("Failed to open RocksDB at {}: {}", path, e))
        })?;

        Ok(Self { db })
    }

    /// Build a row key: `{tag}:{subject}:{millis:020}:{uuid}`.
    fn row_key(tag: &str, subject: Subject, timestamp: &DateTime<Utc>) -> Vec<u8> {
        format!("{}:{}", Self::time_prefix(tag, subject, timestamp), Uuid::now_v7()).into_bytes()
    }

    /// Key prefix up to and including the timestamp component.
    fn time_prefix(tag: &str, subject: Subject, timestamp: &DateTime<Utc>) -> String {
        format!("{}:{}:{:020}", tag, subject, timestamp.timestamp_millis().max(0))
    }

    /// Prefix shared by every row of one kind for one subject.
    fn subject_prefix(tag: &str, subject: Subject) -> String {
        format!("{}:{}:", tag, subject)
    }

    /// Scan a subject's rows of one kind within `range`, in time order.
    fn scan_range<T: DeserializeOwned>(
        &self,
        tag: &str,
        subject: Subject,
        range: TimeRange,
    ) -> Result<Vec<T>, ReputeError> {
        let prefix = Self::subject_prefix(tag, subject);
        let start = Self::time_prefix(tag, subject, &range.start);
        let end = Self::time_prefix(tag, subject, &range.end);

        let mut rows = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(start.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, value) = item
                .map_err(|e| ReputeError::Persistence(format!("RocksDB iteration error: {}", e)))?;

            // Stop at the end of this subject's keyspace or past the range end.
            if !key.starts_with(prefix.as_bytes()) || key.as_ref() >= end.as_bytes() {
                break;
            }
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    /// The newest row of one kind for a subject.
    fn scan_latest<T: DeserializeOwned>(&self, tag: &str, subject: Subject) -> Result<Option<T>, ReputeError> {
        let prefix = Self::subject_prefix(tag, subject);
        // ';' sorts directly after ':', so seeking backwards from here lands on
        // the last key carrying the prefix.
        let upper = format!("{};", prefix.trim_end_matches(':'));
        let mut iter = self
            .db
            .iterator(IteratorMode::From(upper.as_bytes(), Direction::Reverse));
        match iter.next() {
            Some(item) => {
                let (key, value) = item
                    .map_err(|e| ReputeError::Persistence(format!("RocksDB iteration error: {}", e)))?;
                if key.starts_with(prefix.as_bytes()) {
                    Ok(Some(serde_json::from_slice(&value)?))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Every staged key with its value.
    fn staged_rows(&self) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>, ReputeError> {
        let iter = self
            .db
            .iterator(IteratorMode::From(STAGED_PREFIX.as_bytes(), Direction::Forward));
        let mut rows = Vec::new();
        for item in iter {
            let (key, value) = item
                .map_err(|e| ReputeError::Persistence(format!("RocksDB iteration error: {}", e)))?;
            if !key.starts_with(STAGED_PREFIX.as_bytes()) {
                break;
            }
            rows.push((key, value));
        }
        Ok(rows)
    }

    fn write(&self, batch: WriteBatch) -> Result<(), ReputeError> {
        self.db
            .write(batch)
            .map_err(|e| ReputeError::Persistence(format!("RocksDB batch write failed: {}", e)))
    }

    /// Replace the staged cycle in a single atomic batch.
    pub fn stage_cycle_sync(
        &self,
        trust: &[TrustScore],
        reputation: &[ReputationScore],
    ) -> Result<(), ReputeError> {
        let mut batch = WriteBatch::default();
        for (key, _) in self.staged_rows()? {
            batch.delete(key);
        }
        for score in trust {
            let mut key = STAGED_PREFIX.as_bytes().to_vec();
            key.extend(Self::row_key(TRUST_TAG, score.subject, &score.timestamp));
            batch.put(key, serde_json::to_vec(score)?);
        }
        for score in reputation {
            let mut key = STAGED_PREFIX.as_bytes().to_vec();
            key.extend(Self::row_key(REPUTATION_TAG, score.subject, &score.timestamp));
            batch.put(key, serde_json::to_vec(score)?);
        }
        self.write(batch)
    }

    /// Move every staged row to its log key in a single atomic batch.
    pub fn commit_staged_sync(&self) -> Result<usize, ReputeError> {
        let rows = self.staged_rows()?;
        let mut batch = WriteBatch::default();
        for (key, value) in &rows {
            batch.put(&key[STAGED_PREFIX.len()..], value);
            batch.delete(key);
        }
        self.write(batch)?;
        Ok(rows.len())
    }

    /// Delete every staged row.
    pub fn discard_staged_sync(&self) -> Result<usize, ReputeError> {
        let rows = self.staged_rows()?;
        let mut batch = WriteBatch::default();
        for (key, _) in &rows {
            batch.delete(key);
        }
        self.write(batch)?;
        Ok(rows.len())
    }
}

#[async_trait]
impl ScoreStore for RocksScoreLog {
    async fn stage_cycle(
        &self,
        trust: &[TrustScore],
        reputation: &[ReputationScore],
    ) -> Result<(), ReputeError> {
        self.stage_cycle_sync(trust, reputation)
    }

    async fn commit_staged(&self) -> Result<usize, ReputeError> {
        self.commit_staged_sync()
    }

    async fn discard_staged(&self) -> Result<usize, ReputeError> {
        self.discard_staged_sync()
    }

    async fn load_trust_scores(
        &self,
        subject: Subject,
        range: TimeRange,
    ) -> Result<Vec<TrustScore>, ReputeError> {
        self.scan_range(TRUST_TAG, subject, range)
    }

    async fn load_reputation_scores(
        &self,
        subject: Subject,
        range: TimeRange,
    ) -> Result<Vec<ReputationScore>, ReputeError> {
        self.scan_range(REPUTATION_TAG, subject, range)
    }

    async fn latest_reputation(&self, subject: Subject) -> Result<Option<ReputationScore>, ReputeError> {
        self.scan_latest(REPUTATION_TAG, subject)
    }

    async fn latest_trust(&self, subject: Subject) -> Result<Option<TrustScore>, ReputeError> {
        self.scan_latest(TRUST_TAG, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn temp_db_path(label: &str) -> String {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("repute_test_{}_{}", label, Uuid::now_v7()));
        path.to_string_lossy().to_string()
    }

    fn reputation_at(subject: Subject, timestamp: DateTime<Utc>, overall: f64) -> ReputationScore {
        ReputationScore {
            overall_score: overall,
            ..ReputationScore::neutral(subject, timestamp)
        }
    }

    #[test]
    fn row_keys_are_time_ordered_and_unique() {
        let t = Utc::now();
        let a = RocksScoreLog::row_key(TRUST_TAG, Subject::Musk, &t);
        let b = RocksScoreLog::row_key(TRUST_TAG, Subject::Musk, &t);
        let later = RocksScoreLog::row_key(TRUST_TAG, Subject::Musk, &(t + Duration::seconds(1)));
        assert_ne!(a, b);
        assert!(a < later && b < later);
        let key = String::from_utf8(a).unwrap();
        assert!(key.starts_with("trust:musk:"));
        assert_eq!(key.split(':').count(), 4);
    }

    #[tokio::test]
    async fn range_load_is_ordered_and_scoped_to_subject() {
        let log = RocksScoreLog::open(&temp_db_path("range")).unwrap();
        let now = Utc::now();
        let rows = vec![
            reputation_at(Subject::Musk, now - Duration::hours(2), 40.0),
            reputation_at(Subject::Musk, now - Duration::hours(30), 10.0),
            reputation_at(Subject::Trump, now - Duration::hours(1), 70.0),
            reputation_at(Subject::Musk, now - Duration::hours(1), 60.0),
        ];
        log.append_cycle(&[], &rows).await.unwrap();

        let loaded = log
            .load_reputation_scores(Subject::Musk, TimeRange::last_hours(now, 24).unwrap())
            .await
            .unwrap();
        let values: Vec<f64> = loaded.iter().map(|r| r.overall_score).collect();
        assert_eq!(values, vec![40.0, 60.0]);
    }

    #[tokio::test]
    async fn latest_returns_newest_row_per_subject() {
        let log = RocksScoreLog::open(&temp_db_path("latest")).unwrap();
        let now = Utc::now();
        assert!(log.latest_reputation(Subject::Musk).await.unwrap().is_none());

        let trust = vec![
            TrustScore {
                timestamp: now - Duration::hours(1),
                subject: Subject::Musk,
                trust_score: 0.3,
                local_trust: 0.5,
                pre_trust: 0.5,
            },
            TrustScore {
                timestamp: now,
                subject: Subject::Musk,
                trust_score: 0.6,
                local_trust: 0.5,
                pre_trust: 0.5,
            },
        ];
        let reputation = vec![
            reputation_at(Subject::Musk, now - Duration::hours(5), 20.0),
            reputation_at(Subject::Musk, now, 80.0),
            reputation_at(Subject::Trump, now + Duration::hours(1), 99.0),
        ];
        log.append_cycle(&trust, &reputation).await.unwrap();

        let latest = log.latest_reputation(Subject::Musk).await.unwrap().unwrap();
        assert_eq!(latest.overall_score, 80.0);
        let latest_trust = log.latest_trust(Subject::Musk).await.unwrap().unwrap();
        assert!((latest_trust.trust_score - 0.6).abs() < 1e-12);
        assert!(log.latest_trust(Subject::Trump).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn appends_never_overwrite_rows_with_equal_timestamps() {
        let log = RocksScoreLog::open(&temp_db_path("append")).unwrap();
        let now = Utc::now();
        log.append_cycle(&[], &[reputation_at(Subject::Trump, now, 1.0)]).await.unwrap();
        log.append_cycle(&[], &[reputation_at(Subject::Trump, now, 2.0)]).await.unwrap();
        let loaded = log
            .load_reputation_scores(Subject::Trump, TimeRange::last_hours(now, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn staged_cycle_survives_reopen_but_stays_invisible() {
        let path = temp_db_path("staged");
        let now = Utc::now();
        let range = TimeRange::last_hours(now, 1).unwrap();
        {
            let log = RocksScoreLog::open(&path).unwrap();
            log.append_cycle(&[], &[reputation_at(Subject::Musk, now, 10.0)]).await.unwrap();
            log.stage_cycle(&[], &[reputation_at(Subject::Musk, now, 90.0)]).await.unwrap();
            let loaded = log.load_reputation_scores(Subject::Musk, range).await.unwrap();
            assert_eq!(loaded.len(), 1);
            let latest = log.latest_reputation(Subject::Musk).await.unwrap().unwrap();
            assert_eq!(latest.overall_score, 10.0);
        }

        let log = RocksScoreLog::open(&path).unwrap();
        assert_eq!(log.discard_staged().await.unwrap(), 1);
        assert_eq!(log.commit_staged().await.unwrap(), 0);
        assert_eq!(log.load_reputation_scores(Subject::Musk, range).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn restaging_replaces_the_previous_stage() {
        let log = RocksScoreLog::open(&temp_db_path("restage")).unwrap();
        let now = Utc::now();
        log.stage_cycle(&[], &[reputation_at(Subject::Trump, now, 1.0)]).await.unwrap();
        log.stage_cycle(&[], &[reputation_at(Subject::Trump, now, 2.0)]).await.unwrap();
        assert_eq!(log.commit_staged().await.unwrap(), 1);

        let loaded = log
            .load_reputation_scores(Subject::Trump, TimeRange::last_hours(now, 1).unwrap())
            .await
            .unwrap();
        let values: Vec<f64> = loaded.iter().map(|r| r.overall_score).collect();
        assert_eq!(values, vec![2.0]);
    }
}
