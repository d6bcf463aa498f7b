// crates/repute-reputation/src/trend.rs
//
// Trend detection and short-horizon prediction over a score series.

use repute_core::score::{ReputationScore, TrendLabel, TrendReport};

use crate::comparison::mean_std;

/// Number of most recent points treated as "current".
pub const RECENT_POINTS: usize = 10;

/// Number of trailing differences averaged for prediction.
const PREDICT_DIFFS: usize = 4;

/// Default number of future periods attached to each report.
pub const DEFAULT_PREDICTION_PERIODS: usize = 7;

#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    /// Minimum |direction| (score points) for a non-stable trend.
    threshold: f64,
    prediction_periods: usize,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            prediction_periods: DEFAULT_PREDICTION_PERIODS,
        }
    }
}

impl TrendAnalyzer {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.abs(),
            prediction_periods: DEFAULT_PREDICTION_PERIODS,
        }
    }

    pub fn with_prediction_periods(mut self, periods: usize) -> Self {
        self.prediction_periods = periods;
        self
    }

    /// Analyze a subject's ReputationScores by overall score, oldest first.
    pub fn analyze_scores(&self, scores: &[ReputationScore]) -> TrendReport {
        let mut sorted: Vec<&ReputationScore> = scores.iter().collect();
        sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let values: Vec<f64> = sorted.iter().map(|s| s.overall_score).collect();
        self.analyze(&values)
    }

    /// Analyze a series ordered oldest first.
    ///
    /// The last ten points are compared against everything before them.
    /// With ten points or fewer there is no separate history and the trend
    /// is stable.
    pub fn analyze(&self, values: &[f64]) -> TrendReport {
        let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let predictions = self.predict(&values, self.prediction_periods);
        if values.is_empty() {
            return TrendReport {
                trend: TrendLabel::Unknown,
                direction: 0.0,
                strength: 0.0,
                current_avg: 0.0,
                historical_avg: 0.0,
                volatility: 0.0,
                confidence: 0.0,
                predictions,
            };
        }

        let split = values.len().saturating_sub(RECENT_POINTS);
        let recent = &values[split..];
        let historical = if split == 0 { recent } else { &values[..split] };

        let (current_avg, volatility) = mean_std(recent);
        let (historical_avg, _) = mean_std(historical);
        let direction = current_avg - historical_avg;

        let trend = if direction > self.threshold {
            TrendLabel::Improving
        } else if direction < -self.threshold {
            TrendLabel::Declining
        } else {
            TrendLabel::Stable
        };

        TrendReport {
            trend,
            direction,
            strength: direction.abs(),
            current_avg,
            historical_avg,
            volatility,
            confidence: (values.len() as f64 / 100.0).min(0.9),
            predictions,
        }
    }

    /// Extrapolate `periods` future values from the mean of the last (up
    /// to) four step differences. Each prediction is clamped to [0, 100].
    /// With fewer than two points the series is held flat at its only
    /// value, or at 0.0 when empty. Non-finite values are skipped.
    pub fn predict(&self, values: &[f64], periods: usize) -> Vec<f64> {
        let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if values.len() < 2 {
            let held = values.first().copied().unwrap_or(0.0).clamp(0.0, 100.0);
            return vec![held; periods];
        }
        let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let tail = &diffs[diffs.len().saturating_sub(PREDICT_DIFFS)..];
        let step = tail.iter().sum::<f64>() / tail.len() as f64;

        let last = values[values.len() - 1];
        (1..=periods)
            .map(|k| (last + step * k as f64).clamp(0.0, 100.0))
            .collect()
    }
}
