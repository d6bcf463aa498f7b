// crates/repute-pipeline/src/cycle.rs
//
// One analysis cycle: collect -> ingest -> propagate trust -> score ->
// stage -> compare -> publish -> commit.
//
// Publishing is the single commit point. The cycle's scores are staged in
// the score log before publishing, so a persistence failure aborts the
// cycle with nothing published, and they join the log only after the
// publish succeeds. An error (or dropping the future) before that leaves
// `last_published` and the committed score history exactly as they were;
// whatever a dead cycle staged is discarded when the next cycle starts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use repute_core::error::ReputeError;
use repute_core::score::{PublishedResult, ReputationScore, TrustScore};
use repute_core::signal::TimeRange;
use repute_core::subject::Subject;
use repute_core::traits::PublishOutcome;
use repute_reputation::classifier::LexiconClassifier;
use repute_reputation::eigentrust::propagate;
use repute_reputation::scorers::ScoringInputs;
use repute_reputation::trust_matrix::TrustMatrix;
use repute_store::signals::{IngestReport, RetentionReport, SignalQuery};

use crate::collect::{collect_all, ingest_all, SourceFailure};
use crate::context::PipelineContext;
use crate::state::CycleState;

/// What a completed cycle did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub ingest: IngestReport,
    pub failed_sources: Vec<SourceFailure>,
    /// None when propagation was skipped or failed and prior trust was kept.
    pub trust_converged: Option<bool>,
    pub trust_iterations: u32,
    pub stale_subjects: Vec<Subject>,
    pub publish_outcome: PublishOutcome,
    /// Whether this cycle's scores joined the score log after publishing.
    pub history_committed: bool,
    pub result: PublishedResult,
}

/// Marks the state machine Failed unless the cycle reached Idle.
/// Runs on early return and on cancellation alike.
struct CycleGuard<'a> {
    ctx: &'a PipelineContext,
    finished: bool,
}

impl<'a> CycleGuard<'a> {
    fn begin(ctx: &'a PipelineContext) -> Result<Self, ReputeError> {
        let mut sm = ctx
            .state
            .lock()
            .map_err(|_| ReputeError::InvalidState("cycle state lock poisoned".to_string()))?;
        if sm.in_flight() {
            return Err(ReputeError::InvalidState(format!(
                "a cycle is already running ({})",
                sm.current
            )));
        }
        if sm.current == CycleState::Failed {
            sm.transition(CycleState::Idle)?;
        }
        sm.transition(CycleState::Collecting)?;
        Ok(Self { ctx, finished: false })
    }

    fn advance(&self, next: CycleState) -> Result<(), ReputeError> {
        self.ctx.transition(next)
    }

    fn finish(mut self) -> Result<(), ReputeError> {
        self.finished = true;
        self.ctx.transition(CycleState::Idle)
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Ok(mut sm) = self.ctx.state.lock() {
                let _ = sm.transition(CycleState::Failed);
            }
        }
    }
}

/// Run one full analysis cycle at `now`.
pub async fn run_cycle(ctx: &PipelineContext, now: DateTime<Utc>) -> Result<CycleReport, ReputeError> {
    let guard = CycleGuard::begin(ctx)?;
    tracing::info!("Starting analysis cycle at {}", now);

    let result = execute(ctx, &guard, now).await;
    match result {
        Ok(report) => {
            guard.finish()?;
            tracing::info!(
                "Cycle complete: {} accepted, {} rejected, {} failed sources, publish {:?}",
                report.ingest.accepted,
                report.ingest.rejected,
                report.failed_sources.len(),
                report.publish_outcome
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!("Cycle failed: {}", e);
            Err(e)
        }
    }
}

async fn execute(
    ctx: &PipelineContext,
    guard: &CycleGuard<'_>,
    now: DateTime<Utc>,
) -> Result<CycleReport, ReputeError> {
    let (subject_a, subject_b) = ctx.pair()?;
    let window = TimeRange::last_days(now, ctx.config.collect_window_days)?;
    let comparison_range = TimeRange::last_hours(now, ctx.config.comparison_window_hours)?;

    let abandoned = ctx.scores.discard_staged().await?;
    if abandoned > 0 {
        tracing::warn!("Discarded {} score rows staged by an unfinished cycle", abandoned);
    }

    // Collect and ingest.
    let outcome = collect_all(ctx, window).await;
    let ingest = ingest_all(ctx, &outcome)?;
    tracing::info!(
        "Ingested {} records ({} rejected) from {} batches",
        ingest.accepted,
        ingest.rejected,
        outcome.batches.len()
    );

    // Trust propagation.
    guard.advance(CycleState::Scoring)?;
    let window_obs = ctx.signals.query_observations(&SignalQuery::new().range(window))?;
    let matrix = TrustMatrix::from_observations(&ctx.subjects, &window_obs, ctx.base_matrix.as_deref())?;
    let (new_trust, trust_converged, trust_iterations) = if !matrix.has_interactions() {
        tracing::debug!("No trust interactions in the window, skipping propagation");
        (Vec::new(), None, 0)
    } else {
        match propagate(&matrix, None, &ctx.eigentrust) {
            Ok(prop) => {
                tracing::info!(
                    "Trust propagation: {} iterations, converged={}",
                    prop.iterations,
                    prop.converged
                );
                (prop.to_scores(now), Some(prop.converged), prop.iterations)
            }
            Err(ReputeError::Numerical(msg)) => {
                tracing::warn!("Trust propagation failed, keeping prior trust: {}", msg);
                (Vec::new(), None, 0)
            }
            Err(e) => return Err(e),
        }
    };

    let mut trust_history: Vec<TrustScore> = new_trust.clone();
    for subject in &ctx.subjects {
        if !trust_history.iter().any(|t| t.subject == *subject) {
            if let Some(prior) = ctx.scores.latest_trust(*subject).await? {
                trust_history.push(prior);
            }
        }
    }

    // Scoring.
    let observations = ctx.signals.query_observations(&SignalQuery::new())?;
    let sentiments = ctx.signals.query_sentiments(None, None)?;
    let inputs = ScoringInputs {
        observations: &observations,
        sentiments: &sentiments,
        trust_history: &trust_history,
        now,
    };

    let mut fresh: Vec<ReputationScore> = Vec::new();
    let mut current: BTreeMap<Subject, ReputationScore> = BTreeMap::new();
    let mut stale_subjects = Vec::new();
    for subject in &ctx.subjects {
        let scored = ctx
            .scorers
            .score_all(&inputs, *subject)
            .and_then(|components| ctx.aggregator.aggregate(*subject, &components, now));
        match scored {
            Ok(score) => {
                tracing::debug!("{} overall score {:.2}", subject, score.overall_score);
                current.insert(*subject, score.clone());
                fresh.push(score);
            }
            Err(ReputeError::Numerical(msg)) => {
                tracing::warn!("Scoring {} failed, using last known score: {}", subject, msg);
                let fallback = ctx
                    .scores
                    .latest_reputation(*subject)
                    .await?
                    .unwrap_or_else(|| ReputationScore::neutral(*subject, now));
                current.insert(*subject, fallback);
                stale_subjects.push(*subject);
            }
            Err(e) => return Err(e),
        }
    }

    // Stage. Nothing is published if this fails.
    guard.advance(CycleState::Persisting)?;
    ctx.scores.stage_cycle(&new_trust, &fresh).await?;

    // Compare committed history in the window plus this cycle's scores.
    let mut series: BTreeMap<Subject, Vec<ReputationScore>> = BTreeMap::new();
    for subject in [subject_a, subject_b] {
        let mut loaded = ctx.scores.load_reputation_scores(subject, comparison_range).await?;
        match fresh.iter().find(|score| score.subject == subject) {
            Some(score) => loaded.push(score.clone()),
            None if loaded.is_empty() => {
                if let Some(score) = current.get(&subject) {
                    loaded.push(score.clone());
                }
            }
            None => {}
        }
        series.insert(subject, loaded);
    }
    let empty = Vec::new();
    let series_a = series.get(&subject_a).unwrap_or(&empty);
    let series_b = series.get(&subject_b).unwrap_or(&empty);
    let comparison_metrics = ctx.comparison.compare(subject_a, series_a, subject_b, series_b)?;

    let trends = series
        .iter()
        .map(|(subject, scores)| (*subject, ctx.trends.analyze_scores(scores)))
        .collect();

    let mut sentiment_distribution = BTreeMap::new();
    for subject in [subject_a, subject_b] {
        let mentions = ctx.signals.query_sentiments(Some(subject), Some(window))?;
        sentiment_distribution.insert(subject, LexiconClassifier::distribution(&mentions));
    }

    let score_of = |subject: Subject| {
        current
            .get(&subject)
            .cloned()
            .ok_or_else(|| ReputeError::Validation(format!("no score computed for {}", subject)))
    };
    let result = PublishedResult {
        timestamp: now,
        subject_a: score_of(subject_a)?,
        subject_b: score_of(subject_b)?,
        comparison_metrics,
        trends,
        sentiment_distribution,
        stale_subjects: stale_subjects.clone(),
        data_freshness: ctx.signals.latest_timestamp()?.unwrap_or(now),
    };

    // Commit point.
    guard.advance(CycleState::Publishing)?;
    let publish_outcome = match ctx.publisher.publish(&result).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Err(discard) = ctx.scores.discard_staged().await {
                tracing::warn!("Could not discard staged scores: {}", discard);
            }
            return Err(e);
        }
    };
    *ctx.last_published.write().await = Some(result.clone());

    let history_committed = match ctx.scores.commit_staged().await {
        Ok(rows) => {
            tracing::debug!("Committed {} score rows", rows);
            true
        }
        Err(e) => {
            tracing::error!("Published snapshot {} but its scores were not recorded: {}", now, e);
            false
        }
    };

    Ok(CycleReport {
        timestamp: now,
        ingest,
        failed_sources: outcome.failures,
        trust_converged,
        trust_iterations,
        stale_subjects,
        publish_outcome,
        history_committed,
        result,
    })
}

/// Remove signals older than the configured retention window.
pub fn sweep_retention(ctx: &PipelineContext, now: DateTime<Utc>) -> Result<RetentionReport, ReputeError> {
    ctx.signals.sweep_retention(now, ctx.config.retention_days)
}
