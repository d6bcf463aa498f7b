// crates/repute-pipeline/src/collect.rs
//
// Fan-out collection and ingestion.
//
// Every (subject, source) fetch runs as its own task under a hard timeout.
// A failing or slow source is logged and contributes nothing; the rest of
// the cycle carries on. Ingestion turns raw records into Observations and
// SentimentSamples, rejecting malformed records one at a time.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use repute_core::error::ReputeError;
use repute_core::signal::{Observation, RawRecord, SentimentSample, SignalSource, TimeRange};
use repute_core::subject::Subject;
use repute_core::traits::{Collector, TextClassifier};
use repute_store::signals::{IngestReport, SignalStore};

use crate::context::PipelineContext;

/// Records fetched from one (subject, source) pair.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub subject: Subject,
    pub source: SignalSource,
    pub records: Vec<RawRecord>,
}

/// A fetch that failed or timed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub subject: Option<Subject>,
    pub source: Option<SignalSource>,
    pub reason: String,
}

/// Fan-in of one collection round.
#[derive(Debug, Default)]
pub struct CollectionOutcome {
    pub batches: Vec<SourceBatch>,
    pub failures: Vec<SourceFailure>,
}

async fn fetch_one(
    collector: Arc<dyn Collector>,
    subject: Subject,
    source: SignalSource,
    limit: usize,
    range: TimeRange,
    timeout: Duration,
) -> Result<Vec<RawRecord>, ReputeError> {
    match tokio::time::timeout(timeout, collector.collect(subject, source, limit, range)).await {
        Ok(Ok(records)) => Ok(records),
        Ok(Err(ReputeError::SourceUnavailable(msg))) => Err(ReputeError::SourceUnavailable(msg)),
        Ok(Err(e)) => Err(ReputeError::SourceUnavailable(format!("{}/{}: {}", subject, source, e))),
        Err(_) => Err(ReputeError::SourceUnavailable(format!(
            "{}/{} timed out after {:?}",
            subject, source, timeout
        ))),
    }
}

/// Fetch every configured source for every subject concurrently.
pub async fn collect_all(ctx: &PipelineContext, range: TimeRange) -> CollectionOutcome {
    let timeout = Duration::from_secs(ctx.config.fetch_timeout_secs);
    let limit = ctx.config.collect_limit;

    let mut tasks = JoinSet::new();
    for subject in &ctx.subjects {
        for source in &ctx.config.sources {
            let collector = Arc::clone(&ctx.collector);
            let (subject, source) = (*subject, *source);
            tasks.spawn(async move {
                let result = fetch_one(collector, subject, source, limit, range, timeout).await;
                (subject, source, result)
            });
        }
    }

    let mut outcome = CollectionOutcome::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((subject, source, Ok(records))) => {
                tracing::debug!("Collected {} records from {}/{}", records.len(), subject, source);
                outcome.batches.push(SourceBatch {
                    subject,
                    source,
                    records,
                });
            }
            Ok((subject, source, Err(e))) => {
                tracing::warn!("Source {}/{} unavailable: {}", subject, source, e);
                outcome.failures.push(SourceFailure {
                    subject: Some(subject),
                    source: Some(source),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("Collection task aborted: {}", e);
                outcome.failures.push(SourceFailure {
                    subject: None,
                    source: None,
                    reason: e.to_string(),
                });
            }
        }
    }

    // Task completion order is arbitrary.
    outcome
        .batches
        .sort_by(|a, b| (a.subject, a.source).cmp(&(b.subject, b.source)));
    outcome
}

/// Convert one batch into signals and append them to `store`.
///
/// A record with text becomes a SentimentSample (via `classifier`); a record
/// with a value becomes an Observation; a record may yield both. Records
/// with neither, or without a timestamp, are rejected.
pub fn ingest_batch(
    store: &SignalStore,
    classifier: &dyn TextClassifier,
    batch: &SourceBatch,
) -> Result<IngestReport, ReputeError> {
    let mut report = IngestReport::default();
    let mut observations = Vec::new();
    let mut sentiments = Vec::new();

    for raw in &batch.records {
        let text = raw.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
        if text.is_none() && raw.value.is_none() {
            tracing::trace!("Rejected empty record from {}/{}", batch.subject, batch.source);
            report.rejected += 1;
            continue;
        }
        let Some(timestamp) = raw.timestamp else {
            tracing::warn!("Rejected {}/{} record without a timestamp", batch.subject, batch.source);
            report.rejected += 1;
            continue;
        };

        if let Some(text) = text {
            let (sentiment, confidence) = classifier.classify(text);
            sentiments.push(SentimentSample {
                timestamp,
                subject: batch.subject,
                sentiment,
                confidence,
                source_text: text.to_string(),
                source_type: batch.source.as_str().to_string(),
            });
        }
        if raw.value.is_some() {
            match Observation::from_raw(batch.subject, batch.source, raw) {
                Ok(obs) => observations.push(obs),
                Err(e) => {
                    tracing::warn!("Rejected record: {}", e);
                    report.rejected += 1;
                }
            }
        }
    }

    report.merge(store.append_sentiments(sentiments)?);
    report.merge(store.append_observations(observations)?);
    Ok(report)
}

/// Ingest every batch of a collection round.
pub fn ingest_all(ctx: &PipelineContext, outcome: &CollectionOutcome) -> Result<IngestReport, ReputeError> {
    let mut report = IngestReport::default();
    for batch in &outcome.batches {
        report.merge(ingest_batch(&ctx.signals, ctx.classifier.as_ref(), batch)?);
    }
    Ok(report)
}
