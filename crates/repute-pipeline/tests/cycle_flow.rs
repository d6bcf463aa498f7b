// crates/repute-pipeline/tests/cycle_flow.rs
//
// End-to-end tests of the analysis cycle.
//
// Each test wires a PipelineContext from in-memory (or temp-dir RocksDB)
// collaborators plus small scripted doubles for failure injection, and
// drives `run_cycle` through its public API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use uuid::Uuid;

use repute_core::error::ReputeError;
use repute_core::score::{PublishedResult, ReputationScore, TrustScore};
use repute_core::signal::{Observation, RawRecord, SignalSource, TimeRange};
use repute_core::subject::Subject;
use repute_core::traits::{Collector, PublishOutcome, Publisher, ScoreStore};
use repute_pipeline::{
    run_cycle, sweep_retention, CycleState, JsonFilePublisher, MemoryPublisher, MockCollector,
    PipelineConfig, PipelineContext,
};
use repute_store::{InMemoryScoreLog, RocksScoreLog};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory path using UUID to avoid conflicts.
fn temp_path(label: &str) -> String {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("repute_test_{}_{}", label, Uuid::now_v7()));
    path.to_string_lossy().to_string()
}

/// How a scripted source behaves.
#[derive(Clone)]
enum Script {
    Records(Vec<RawRecord>),
    Fail(String),
    Stall,
}

/// Collector that replays canned responses per (subject, source).
/// Unscripted pairs return no records.
#[derive(Default)]
struct ScriptedCollector {
    scripts: HashMap<(Subject, SignalSource), Script>,
}

impl ScriptedCollector {
    fn with(mut self, subject: Subject, source: SignalSource, script: Script) -> Self {
        self.scripts.insert((subject, source), script);
        self
    }
}

#[async_trait]
impl Collector for ScriptedCollector {
    async fn collect(
        &self,
        subject: Subject,
        source: SignalSource,
        _limit: usize,
        _range: TimeRange,
    ) -> Result<Vec<RawRecord>, ReputeError> {
        match self.scripts.get(&(subject, source)).cloned() {
            Some(Script::Records(records)) => Ok(records),
            Some(Script::Fail(reason)) => Err(ReputeError::SourceUnavailable(reason)),
            Some(Script::Stall) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Score log whose writes always fail.
#[derive(Default)]
struct BrokenScoreLog {
    inner: InMemoryScoreLog,
}

#[async_trait]
impl ScoreStore for BrokenScoreLog {
    async fn stage_cycle(&self, _: &[TrustScore], _: &[ReputationScore]) -> Result<(), ReputeError> {
        Err(ReputeError::Persistence("disk full".to_string()))
    }

    async fn commit_staged(&self) -> Result<usize, ReputeError> {
        self.inner.commit_staged().await
    }

    async fn discard_staged(&self) -> Result<usize, ReputeError> {
        self.inner.discard_staged().await
    }

    async fn load_trust_scores(&self, subject: Subject, range: TimeRange) -> Result<Vec<TrustScore>, ReputeError> {
        self.inner.load_trust_scores(subject, range).await
    }

    async fn load_reputation_scores(
        &self,
        subject: Subject,
        range: TimeRange,
    ) -> Result<Vec<ReputationScore>, ReputeError> {
        self.inner.load_reputation_scores(subject, range).await
    }

    async fn latest_reputation(&self, subject: Subject) -> Result<Option<ReputationScore>, ReputeError> {
        self.inner.latest_reputation(subject).await
    }

    async fn latest_trust(&self, subject: Subject) -> Result<Option<TrustScore>, ReputeError> {
        self.inner.latest_trust(subject).await
    }
}

/// Publisher that always fails.
struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, _: &PublishedResult) -> Result<PublishOutcome, ReputeError> {
        Err(ReputeError::Publish("bucket unreachable".to_string()))
    }
}

/// Publisher that never completes.
struct StallingPublisher;

#[async_trait]
impl Publisher for StallingPublisher {
    async fn publish(&self, _: &PublishedResult) -> Result<PublishOutcome, ReputeError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(PublishOutcome::Published)
    }
}

fn value_at(value: f64, timestamp: DateTime<Utc>) -> RawRecord {
    RawRecord {
        value: Some(value),
        timestamp: Some(timestamp),
        ..RawRecord::default()
    }
}

fn text_at(text: &str, timestamp: DateTime<Utc>) -> RawRecord {
    RawRecord {
        text: Some(text.to_string()),
        timestamp: Some(timestamp),
        ..RawRecord::default()
    }
}

fn context(
    config: PipelineConfig,
    collector: Arc<dyn Collector>,
    scores: Arc<dyn ScoreStore>,
    publisher: Arc<dyn Publisher>,
) -> PipelineContext {
    PipelineContext::new(config, collector, scores, publisher).unwrap()
}

fn assert_bounded(score: &ReputationScore) {
    for v in [
        score.overall_score,
        score.sentiment_component,
        score.economic_component,
        score.social_component,
        score.trust_component,
    ] {
        assert!((0.0..=100.0).contains(&v), "{} out of range", v);
    }
    let (low, high) = score.confidence_interval;
    assert!(0.0 <= low && low <= score.overall_score);
    assert!(score.overall_score <= high && high <= 100.0);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_cycle_with_mock_collector_publishes() {
    let log = Arc::new(InMemoryScoreLog::new());
    let publisher = Arc::new(MemoryPublisher::new());
    let ctx = context(
        PipelineConfig::default(),
        Arc::new(MockCollector::seeded(11)),
        log.clone(),
        publisher.clone(),
    );

    let now = Utc::now();
    let report = run_cycle(&ctx, now).await.unwrap();

    assert_eq!(report.publish_outcome, PublishOutcome::Published);
    assert!(report.failed_sources.is_empty());
    assert!(report.ingest.accepted > 0);
    assert_eq!(report.trust_converged, Some(true));
    assert!(report.stale_subjects.is_empty());

    let published = ctx.latest_snapshot().await.unwrap();
    assert_eq!(published, report.result);
    assert_eq!(published.subject_a.subject, Subject::Musk);
    assert_eq!(published.subject_b.subject, Subject::Trump);
    assert_bounded(&published.subject_a);
    assert_bounded(&published.subject_b);
    assert_eq!(published.comparison_metrics.subject_a.data_points, 1);
    assert_eq!(published.trends.len(), 2);
    // One point per subject: the prediction holds the current score flat.
    for score in [&published.subject_a, &published.subject_b] {
        let trend = &published.trends[&score.subject];
        assert_eq!(trend.predictions, vec![score.overall_score; 7]);
    }
    assert_eq!(published.sentiment_distribution.len(), 2);
    for (subject, dist) in &published.sentiment_distribution {
        let stored = ctx
            .signals
            .query_sentiments(Some(*subject), Some(TimeRange::last_days(now, 7).unwrap()))
            .unwrap();
        assert!(dist.total_mentions > 0);
        assert_eq!(dist.total_mentions, stored.len());
        assert_eq!(
            dist.positive_mentions + dist.negative_mentions + dist.neutral_mentions,
            dist.total_mentions
        );
    }
    assert!(published.data_freshness <= now);

    assert_eq!(log.reputation_len(), 2);
    assert_eq!(log.trust_len(), 2);
    assert_eq!(publisher.snapshots().len(), 1);
    assert_eq!(ctx.cycle_state(), CycleState::Idle);

    // Both subjects interacted, so the propagated trust is a distribution.
    let range = TimeRange::last_days(now, 1).unwrap();
    let mut total = 0.0;
    for subject in Subject::ALL {
        let rows = log.load_trust_scores(subject, range).await.unwrap();
        assert_eq!(rows.len(), 1);
        total += rows[0].trust_score;
    }
    assert!((total - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn empty_sources_score_exactly_neutral() {
    let ctx = context(
        PipelineConfig::default(),
        Arc::new(ScriptedCollector::default()),
        Arc::new(InMemoryScoreLog::new()),
        Arc::new(MemoryPublisher::new()),
    );
    let report = run_cycle(&ctx, Utc::now()).await.unwrap();
    let result = report.result.clone();

    // No signals at all: no propagation and every component neutral.
    assert_eq!(report.trust_converged, None);
    for score in [&result.subject_a, &result.subject_b] {
        assert_eq!(score.sentiment_component, 50.0);
        assert_eq!(score.economic_component, 50.0);
        assert_eq!(score.social_component, 50.0);
        assert_eq!(score.trust_component, 50.0);
        assert!((score.overall_score - 50.0).abs() < 1e-9);
    }
    assert_eq!(result.comparison_metrics.winner.to_string(), "tie");
    assert_eq!(result.comparison_metrics.margin, 0.0);
}

#[tokio::test]
async fn failing_and_slow_sources_are_isolated() {
    let now = Utc::now();
    let collector = ScriptedCollector::default()
        .with(Subject::Musk, SignalSource::Fred, Script::Fail("503 from upstream".to_string()))
        .with(Subject::Trump, SignalSource::News, Script::Stall)
        .with(
            Subject::Trump,
            SignalSource::Fred,
            Script::Records(
                [10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 30.0]
                    .iter()
                    .enumerate()
                    .map(|(i, v)| value_at(*v, now - ChronoDuration::hours(8 - i as i64)))
                    .collect(),
            ),
        )
        .with(
            Subject::Musk,
            SignalSource::News,
            Script::Records(vec![text_at("a brilliant and impressive launch", now)]),
        );

    let mut config = PipelineConfig::default();
    config.sources = vec![SignalSource::Fred, SignalSource::News];
    config.fetch_timeout_secs = 1;

    let publisher = Arc::new(MemoryPublisher::new());
    let ctx = context(config, Arc::new(collector), Arc::new(InMemoryScoreLog::new()), publisher.clone());
    let report = run_cycle(&ctx, now).await.unwrap();

    assert_eq!(report.failed_sources.len(), 2);
    let reasons: Vec<&str> = report.failed_sources.iter().map(|f| f.reason.as_str()).collect();
    assert!(reasons.iter().any(|r| r.contains("503")));
    assert!(reasons.iter().any(|r| r.contains("timed out")));

    // The healthy sources still shaped the scores.
    assert!(report.result.subject_a.sentiment_component > 50.0);
    assert!(report.result.subject_b.economic_component > 50.0);
    assert_eq!(publisher.snapshots().len(), 1);
}

#[tokio::test]
async fn persistence_failure_publishes_nothing() {
    let publisher = Arc::new(MemoryPublisher::new());
    let ctx = context(
        PipelineConfig::default(),
        Arc::new(MockCollector::seeded(3)),
        Arc::new(BrokenScoreLog::default()),
        publisher.clone(),
    );

    let err = run_cycle(&ctx, Utc::now()).await.unwrap_err();
    assert!(matches!(err, ReputeError::Persistence(_)));
    assert!(publisher.snapshots().is_empty());
    assert!(ctx.latest_snapshot().await.is_none());
    assert_eq!(ctx.cycle_state(), CycleState::Failed);
}

#[tokio::test]
async fn cancelled_cycle_leaves_last_published_untouched() {
    let log = Arc::new(InMemoryScoreLog::new());
    let ctx = context(
        PipelineConfig::default(),
        Arc::new(MockCollector::seeded(5)),
        log.clone(),
        Arc::new(MemoryPublisher::new()),
    );
    let first = run_cycle(&ctx, Utc::now()).await.unwrap().result;

    // Same shared state, but the publisher never returns.
    let mut stalled = ctx.clone();
    stalled.publisher = Arc::new(StallingPublisher);
    let later = Utc::now() + ChronoDuration::hours(1);
    let cancelled = tokio::time::timeout(Duration::from_millis(300), run_cycle(&stalled, later)).await;
    assert!(cancelled.is_err());

    assert_eq!(ctx.latest_snapshot().await, Some(first.clone()));
    assert_eq!(ctx.cycle_state(), CycleState::Failed);

    // The cancelled cycle's scores never joined the history.
    assert_eq!(log.reputation_len(), 2);
    assert_eq!(log.trust_len(), 2);

    // The next cycle recovers from the failed state and only compares
    // committed cycles.
    let next = run_cycle(&ctx, later + ChronoDuration::hours(1)).await.unwrap();
    assert_ne!(next.result, first);
    assert_eq!(ctx.cycle_state(), CycleState::Idle);
    assert_eq!(next.result.comparison_metrics.subject_a.data_points, 2);
    assert_eq!(log.reputation_len(), 4);
    assert_eq!(log.staged_len(), 0);
}

#[tokio::test]
async fn failed_publish_records_no_scores() {
    let log = Arc::new(InMemoryScoreLog::new());
    let ctx = context(
        PipelineConfig::default(),
        Arc::new(MockCollector::seeded(13)),
        log.clone(),
        Arc::new(FailingPublisher),
    );

    let now = Utc::now();
    let err = run_cycle(&ctx, now).await.unwrap_err();
    assert!(matches!(err, ReputeError::Publish(_)));
    assert_eq!(log.reputation_len(), 0);
    assert_eq!(log.trust_len(), 0);
    assert_eq!(log.staged_len(), 0);
    assert!(ctx.latest_snapshot().await.is_none());

    let mut working = ctx.clone();
    working.publisher = Arc::new(MemoryPublisher::new());
    let report = run_cycle(&working, now + ChronoDuration::hours(1)).await.unwrap();
    assert!(report.history_committed);
    assert_eq!(report.result.comparison_metrics.subject_a.data_points, 1);
    assert_eq!(report.result.comparison_metrics.subject_b.data_points, 1);
    assert_eq!(log.reputation_len(), 2);
}

#[tokio::test]
async fn oversized_windows_are_refused_without_panicking() {
    let mut config = PipelineConfig::default();
    config.retention_days = 1_000_000_000;
    let refused = PipelineContext::new(
        config.clone(),
        Arc::new(ScriptedCollector::default()),
        Arc::new(InMemoryScoreLog::new()),
        Arc::new(MemoryPublisher::new()),
    );
    assert!(matches!(refused, Err(ReputeError::Validation(_))));

    // Even a context holding an unchecked config reports an error.
    let mut ctx = context(
        PipelineConfig::default(),
        Arc::new(ScriptedCollector::default()),
        Arc::new(InMemoryScoreLog::new()),
        Arc::new(MemoryPublisher::new()),
    );
    config.comparison_window_hours = i64::MAX;
    ctx.config = Arc::new(config);
    let now = Utc::now();
    assert!(matches!(sweep_retention(&ctx, now), Err(ReputeError::Validation(_))));
    assert!(matches!(run_cycle(&ctx, now).await, Err(ReputeError::Validation(_))));
    assert_eq!(ctx.cycle_state(), CycleState::Failed);
}

#[tokio::test]
async fn republishing_a_snapshot_is_a_no_op() {
    let dir = temp_path("publish");
    let publisher = Arc::new(JsonFilePublisher::new(&dir));
    let ctx = context(
        PipelineConfig::default(),
        Arc::new(MockCollector::seeded(9)),
        Arc::new(InMemoryScoreLog::new()),
        publisher.clone(),
    );

    let report = run_cycle(&ctx, Utc::now()).await.unwrap();
    assert_eq!(report.publish_outcome, PublishOutcome::Published);
    let before = std::fs::read(publisher.latest_path()).unwrap();

    let again = publisher.publish(&report.result).await.unwrap();
    assert_eq!(again, PublishOutcome::Unchanged);
    assert_eq!(std::fs::read(publisher.latest_path()).unwrap(), before);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn numerical_failures_fall_back_and_flag_staleness() {
    let now = Utc::now();
    // Two huge engagement values overflow the social mean.
    let collector = ScriptedCollector::default().with(
        Subject::Musk,
        SignalSource::SocialMedia,
        Script::Records(vec![value_at(1e308, now), value_at(1e308, now)]),
    );
    let mut config = PipelineConfig::default();
    config.sources = vec![SignalSource::SocialMedia];
    config.scoring.base_trust_matrix = Some(vec![vec![f64::NAN, 1.0], vec![1.0, 0.0]]);

    let log = Arc::new(InMemoryScoreLog::new());
    let ctx = context(config, Arc::new(collector), log.clone(), Arc::new(MemoryPublisher::new()));
    let report = run_cycle(&ctx, now).await.unwrap();

    // Trust propagation failed: nothing new recorded, cycle carried on.
    assert_eq!(report.trust_converged, None);
    assert_eq!(log.trust_len(), 0);

    // Musk fell back to the neutral score and is flagged; Trump scored.
    assert_eq!(report.stale_subjects, vec![Subject::Musk]);
    assert_eq!(report.result.stale_subjects, vec![Subject::Musk]);
    assert_eq!(report.result.subject_a, ReputationScore::neutral(Subject::Musk, now));
    assert_eq!(log.reputation_len(), 1);
}

#[tokio::test]
async fn rocksdb_history_feeds_comparison_window() {
    let path = temp_path("cycle_rocks");
    let log = Arc::new(RocksScoreLog::open(&path).unwrap());
    let ctx = context(
        PipelineConfig::default(),
        Arc::new(MockCollector::seeded(21)),
        log.clone(),
        Arc::new(MemoryPublisher::new()),
    );

    let t0 = Utc::now();
    run_cycle(&ctx, t0).await.unwrap();
    let second = run_cycle(&ctx, t0 + ChronoDuration::hours(1)).await.unwrap();

    let metrics = &second.result.comparison_metrics;
    assert_eq!(metrics.subject_a.data_points, 2);
    assert_eq!(metrics.subject_b.data_points, 2);
    assert!((metrics.confidence - 0.02).abs() < 1e-12);

    let trust = log
        .load_trust_scores(Subject::Trump, TimeRange::last_days(t0 + ChronoDuration::hours(1), 1).unwrap())
        .await
        .unwrap();
    assert_eq!(trust.len(), 2);
    assert!(trust[0].timestamp < trust[1].timestamp);
}

#[tokio::test]
async fn retention_sweep_uses_configured_window() {
    let ctx = context(
        PipelineConfig::default(),
        Arc::new(ScriptedCollector::default()),
        Arc::new(InMemoryScoreLog::new()),
        Arc::new(MemoryPublisher::new()),
    );
    let now = Utc::now();
    for age in [5, 40, 60] {
        ctx.signals
            .append_observation(Observation::new(
                now - ChronoDuration::days(age),
                Subject::Trump,
                SignalSource::Census,
                1.0,
            ))
            .unwrap();
    }

    let report = sweep_retention(&ctx, now).unwrap();
    assert_eq!(report.deleted_count, 2);
    assert_eq!(ctx.signals.len(), 1);
}
