// crates/repute-reputation/src/sentiment.rs
//
// Time-decayed, confidence-weighted sentiment aggregation.
//
// weight(sample) = confidence * decay(hours_since(sample))
// aggregate      = sum(normalized * weight) / sum(weight)
// normalized     = (sentiment + 1) * 50, mapping [-1, 1] onto [0, 100]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use repute_core::score::NEUTRAL_SCORE;
use repute_core::signal::SentimentSample;
use repute_core::subject::Subject;

use crate::decay::{apply_decay, hours_between, DecayFunction};

/// Map a sentiment in [-1, 1] onto the 0-100 scale.
pub fn normalize_sentiment(sentiment: f64) -> f64 {
    ((sentiment + 1.0) * 50.0).clamp(0.0, 100.0)
}

/// Aggregated sentiment for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAggregate {
    pub subject: Subject,
    /// Weighted score in [0, 100]; 50.0 when there is nothing to weigh.
    pub score: f64,
    /// Mean sample weight in [0, 1]; 0.0 when there are no samples.
    pub confidence: f64,
    pub sample_count: usize,
}

impl SentimentAggregate {
    fn neutral(subject: Subject, sample_count: usize) -> Self {
        Self {
            subject,
            score: NEUTRAL_SCORE,
            confidence: 0.0,
            sample_count,
        }
    }
}

/// Aggregates SentimentSamples into a single per-subject value.
#[derive(Debug, Clone, Default)]
pub struct SentimentAggregator {
    decay: DecayFunction,
}

impl SentimentAggregator {
    pub fn new(decay: DecayFunction) -> Self {
        Self { decay }
    }

    pub fn decay(&self) -> &DecayFunction {
        &self.decay
    }

    /// Weight of one sample as seen from `now`.
    pub fn weight(&self, sample: &SentimentSample, now: DateTime<Utc>) -> f64 {
        let hours = hours_between(sample.timestamp, now);
        apply_decay(sample.confidence.clamp(0.0, 1.0), hours, &self.decay)
    }

    /// Aggregate every sample belonging to `subject`.
    ///
    /// Samples for other subjects and samples with non-finite fields are
    /// skipped. No samples, or a zero total weight, yields the neutral 50.0
    /// with zero confidence.
    pub fn aggregate(
        &self,
        samples: &[SentimentSample],
        subject: Subject,
        now: DateTime<Utc>,
    ) -> SentimentAggregate {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        let mut count = 0usize;

        for sample in samples.iter().filter(|s| s.subject == subject) {
            if !sample.sentiment.is_finite() || !sample.confidence.is_finite() {
                continue;
            }
            count += 1;
            let w = self.weight(sample, now);
            weighted_sum += normalize_sentiment(sample.sentiment) * w;
            total_weight += w;
        }

        if count == 0 || total_weight <= 0.0 {
            return SentimentAggregate::neutral(subject, count);
        }

        SentimentAggregate {
            subject,
            score: (weighted_sum / total_weight).clamp(0.0, 100.0),
            confidence: (total_weight / count as f64).clamp(0.0, 1.0),
            sample_count: count,
        }
    }
}
