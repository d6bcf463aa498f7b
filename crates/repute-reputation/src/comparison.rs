// crates/repute-reputation/src/comparison.rs
//
// Head-to-head comparison of two subjects' reputation series.
// Results are derived on every call and never cached.

use repute_core::error::ReputeError;
use repute_core::score::{ComparisonResult, ReputationScore, SubjectSummary, Winner};
use repute_core::subject::Subject;

/// Means closer than this are a tie.
pub const TIE_TOLERANCE: f64 = 1e-9;

/// Population mean and standard deviation. Caller guarantees non-empty input.
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Summarize one subject's series. Scores for other subjects are ignored.
pub fn summarize(subject: Subject, series: &[ReputationScore]) -> Result<SubjectSummary, ReputeError> {
    let values: Vec<f64> = series
        .iter()
        .filter(|s| s.subject == subject)
        .map(|s| s.overall_score)
        .collect();
    if values.is_empty() {
        return Err(ReputeError::Validation(format!(
            "no reputation scores for {} in the comparison window",
            subject
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ReputeError::Numerical(format!(
            "non-finite reputation score in {}'s series",
            subject
        )));
    }
    let (mean_score, std_dev) = mean_std(&values);
    Ok(SubjectSummary {
        subject,
        mean_score,
        std_dev,
        consistency: 1.0 / (1.0 + std_dev),
        data_points: values.len(),
    })
}

fn pick(a: Subject, b: Subject, value_a: f64, value_b: f64) -> Winner {
    if (value_a - value_b).abs() <= TIE_TOLERANCE {
        Winner::Tie
    } else if value_a > value_b {
        Winner::Subject(a)
    } else {
        Winner::Subject(b)
    }
}

/// Compares two subjects' ReputationScore series.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonEngine;

impl ComparisonEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compare `a` against `b`.
    ///
    /// winner is the higher mean (tie within tolerance, margin 0.0 then);
    /// more_consistent is the higher `1 / (1 + std)`;
    /// confidence = min(0.9, (n_a + n_b) / 200).
    pub fn compare(
        &self,
        a: Subject,
        series_a: &[ReputationScore],
        b: Subject,
        series_b: &[ReputationScore],
    ) -> Result<ComparisonResult, ReputeError> {
        let summary_a = summarize(a, series_a)?;
        let summary_b = summarize(b, series_b)?;

        let winner = pick(a, b, summary_a.mean_score, summary_b.mean_score);
        let margin = match winner {
            Winner::Tie => 0.0,
            Winner::Subject(_) => (summary_a.mean_score - summary_b.mean_score).abs(),
        };
        let more_consistent = pick(a, b, summary_a.consistency, summary_b.consistency);
        let confidence = ((summary_a.data_points + summary_b.data_points) as f64 / 200.0).min(0.9);

        Ok(ComparisonResult {
            winner,
            margin,
            subject_a: summary_a,
            subject_b: summary_b,
            more_consistent,
            confidence,
        })
    }
}
