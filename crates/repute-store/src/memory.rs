// crates/repute-store/src/memory.rs
//
// In-memory score log implementing the `ScoreStore` trait.
//
// Used by tests and by `--once` runs that do not need durable history.

use std::sync::RwLock;

use async_trait::async_trait;

use repute_core::error::ReputeError;
use repute_core::score::{ReputationScore, TrustScore};
use repute_core::signal::TimeRange;
use repute_core::subject::Subject;
use repute_core::traits::ScoreStore;

/// Rows of a cycle that has not committed yet.
#[derive(Debug, Default)]
struct Staged {
    trust: Vec<TrustScore>,
    reputation: Vec<ReputationScore>,
}

impl Staged {
    fn len(&self) -> usize {
        self.trust.len() + self.reputation.len()
    }
}

/// Append-only score log held in memory.
#[derive(Debug, Default)]
pub struct InMemoryScoreLog {
    trust: RwLock<Vec<TrustScore>>,
    reputation: RwLock<Vec<ReputationScore>>,
    staged: RwLock<Staged>,
}

impl InMemoryScoreLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reputation rows recorded.
    pub fn reputation_len(&self) -> usize {
        self.reputation.read().map(|g| g.len()).unwrap_or(0)
    }

    /// Number of trust rows recorded.
    pub fn trust_len(&self) -> usize {
        self.trust.read().map(|g| g.len()).unwrap_or(0)
    }

    /// Number of rows staged but not yet committed.
    pub fn staged_len(&self) -> usize {
        self.staged.read().map(|g| g.len()).unwrap_or(0)
    }
}

fn poisoned() -> ReputeError {
    ReputeError::Persistence("score log lock poisoned".to_string())
}

#[async_trait]
impl ScoreStore for InMemoryScoreLog {
    async fn stage_cycle(
        &self,
        trust: &[TrustScore],
        reputation: &[ReputationScore],
    ) -> Result<(), ReputeError> {
        let mut staged = self.staged.write().map_err(|_| poisoned())?;
        *staged = Staged {
            trust: trust.to_vec(),
            reputation: reputation.to_vec(),
        };
        Ok(())
    }

    async fn commit_staged(&self) -> Result<usize, ReputeError> {
        // Take every lock before writing so the cycle lands as a unit.
        let mut staged = self.staged.write().map_err(|_| poisoned())?;
        let mut trust_rows = self.trust.write().map_err(|_| poisoned())?;
        let mut reputation_rows = self.reputation.write().map_err(|_| poisoned())?;
        let committed = std::mem::take(&mut *staged);
        let count = committed.len();
        trust_rows.extend(committed.trust);
        reputation_rows.extend(committed.reputation);
        Ok(count)
    }

    async fn discard_staged(&self) -> Result<usize, ReputeError> {
        let mut staged = self.staged.write().map_err(|_| poisoned())?;
        Ok(std::mem::take(&mut *staged).len())
    }

    async fn load_trust_scores(
        &self,
        subject: Subject,
        range: TimeRange,
    ) -> Result<Vec<TrustScore>, ReputeError> {
        let rows = self.trust.read().map_err(|_| poisoned())?;
        let mut out: Vec<TrustScore> = rows
            .iter()
            .filter(|t| t.subject == subject && range.contains(&t.timestamp))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(out)
    }

    async fn load_reputation_scores(
        &self,
        subject: Subject,
        range: TimeRange,
    ) -> Result<Vec<ReputationScore>, ReputeError> {
        let rows = self.reputation.read().map_err(|_| poisoned())?;
        let mut out: Vec<ReputationScore> = rows
            .iter()
            .filter(|r| r.subject == subject && range.contains(&r.timestamp))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(out)
    }

    async fn latest_reputation(&self, subject: Subject) -> Result<Option<ReputationScore>, ReputeError> {
        let rows = self.reputation.read().map_err(|_| poisoned())?;
        Ok(rows
            .iter()
            .filter(|r| r.subject == subject)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
            .cloned())
    }

    async fn latest_trust(&self, subject: Subject) -> Result<Option<TrustScore>, ReputeError> {
        let rows = self.trust.read().map_err(|_| poisoned())?;
        Ok(rows
            .iter()
            .filter(|t| t.subject == subject)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn loads_are_sorted_and_filtered() {
        let log = InMemoryScoreLog::new();
        let now = Utc::now();
        let mut late = ReputationScore::neutral(Subject::Musk, now);
        late.overall_score = 70.0;
        let mut early = ReputationScore::neutral(Subject::Musk, now - Duration::hours(3));
        early.overall_score = 30.0;
        let other = ReputationScore::neutral(Subject::Trump, now);
        log.append_cycle(&[], &[late, early, other]).await.unwrap();

        let loaded = log
            .load_reputation_scores(Subject::Musk, TimeRange::last_hours(now, 24).unwrap())
            .await
            .unwrap();
        let values: Vec<f64> = loaded.iter().map(|r| r.overall_score).collect();
        assert_eq!(values, vec![30.0, 70.0]);

        let latest = log.latest_reputation(Subject::Musk).await.unwrap().unwrap();
        assert_eq!(latest.overall_score, 70.0);
        assert_eq!(log.reputation_len(), 3);
        assert_eq!(log.trust_len(), 0);
    }

    #[tokio::test]
    async fn staged_rows_stay_invisible_until_committed() {
        let log = InMemoryScoreLog::new();
        let now = Utc::now();
        log.stage_cycle(&[], &[ReputationScore::neutral(Subject::Musk, now)])
            .await
            .unwrap();

        let range = TimeRange::last_hours(now, 1).unwrap();
        assert!(log.load_reputation_scores(Subject::Musk, range).await.unwrap().is_empty());
        assert!(log.latest_reputation(Subject::Musk).await.unwrap().is_none());
        assert_eq!(log.staged_len(), 1);

        assert_eq!(log.commit_staged().await.unwrap(), 1);
        assert_eq!(log.load_reputation_scores(Subject::Musk, range).await.unwrap().len(), 1);
        assert_eq!(log.staged_len(), 0);
        assert_eq!(log.commit_staged().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn discarded_rows_never_reach_the_log() {
        let log = InMemoryScoreLog::new();
        let now = Utc::now();
        log.stage_cycle(&[], &[ReputationScore::neutral(Subject::Trump, now)])
            .await
            .unwrap();
        assert_eq!(log.discard_staged().await.unwrap(), 1);
        assert_eq!(log.commit_staged().await.unwrap(), 0);
        assert_eq!(log.reputation_len(), 0);
    }
}
