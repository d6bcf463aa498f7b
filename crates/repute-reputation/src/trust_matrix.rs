// crates/repute-reputation/src/trust_matrix.rs
//
// Trust matrix: M[i][j] relationship strength between subjects.
//
// Each entry M(from, to) approximates how much subject `from`'s behavior is
// trusted toward subject `to`, accumulated from trust-category observations.
// The matrix is rebuilt every cycle and never patched in place.

use serde::{Deserialize, Serialize};

use repute_core::error::ReputeError;
use repute_core::signal::{Observation, SourceCategory};
use repute_core::subject::Subject;

/// A dense, non-negative trust matrix over a closed subject set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustMatrix {
    /// Row/column labels, in index order.
    subjects: Vec<Subject>,
    /// Dense entries: entries[from_idx][to_idx].
    entries: Vec<Vec<f64>>,
}

impl TrustMatrix {
    /// Create a zero matrix over `subjects`.
    pub fn new(subjects: &[Subject]) -> Self {
        let n = subjects.len();
        Self {
            subjects: subjects.to_vec(),
            entries: vec![vec![0.0; n]; n],
        }
    }

    /// Create a matrix from explicit rows. Rows must form a square matrix
    /// matching `subjects`.
    pub fn from_rows(subjects: &[Subject], rows: Vec<Vec<f64>>) -> Result<Self, ReputeError> {
        let n = subjects.len();
        if rows.len() != n || rows.iter().any(|r| r.len() != n) {
            return Err(ReputeError::Validation(format!(
                "trust matrix must be {}x{} to match the subject set",
                n, n
            )));
        }
        Ok(Self {
            subjects: subjects.to_vec(),
            entries: rows,
        })
    }

    /// Build the matrix for one cycle: an optional base matrix plus every
    /// trust-category observation, weighted by its confidence (default 1.0).
    ///
    /// An observation's `target` metadata names the trusted subject; without
    /// it the interaction is self-directed. Subjects outside the set are ignored.
    pub fn from_observations(
        subjects: &[Subject],
        observations: &[Observation],
        base: Option<&TrustMatrix>,
    ) -> Result<Self, ReputeError> {
        let mut matrix = match base {
            Some(b) => Self::from_rows(subjects, b.entries.clone())?,
            None => Self::new(subjects),
        };

        for obs in observations {
            if obs.source.category() != SourceCategory::Trust {
                continue;
            }
            let to = obs.target().unwrap_or(obs.subject);
            let weight = obs.confidence.unwrap_or(1.0);
            matrix.add_interaction(obs.subject, to, obs.value * weight);
        }

        Ok(matrix)
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    fn index_of(&self, subject: Subject) -> Option<usize> {
        self.subjects.iter().position(|s| *s == subject)
    }

    /// Set the entry from `from` to `to`.
    ///
    /// Finite values are floored at 0.0. Non-finite values are stored as-is
    /// so `validate` can reject the matrix instead of hiding them.
    pub fn set_trust(&mut self, from: Subject, to: Subject, value: f64) {
        if let (Some(i), Some(j)) = (self.index_of(from), self.index_of(to)) {
            self.entries[i][j] = floor_finite(value);
        }
    }

    /// Add interaction strength from `from` to `to`.
    pub fn add_interaction(&mut self, from: Subject, to: Subject, strength: f64) {
        if let (Some(i), Some(j)) = (self.index_of(from), self.index_of(to)) {
            self.entries[i][j] += floor_finite(strength);
        }
    }

    /// Get the entry from `from` to `to`. Returns 0.0 for unknown subjects.
    pub fn get_trust(&self, from: Subject, to: Subject) -> f64 {
        match (self.index_of(from), self.index_of(to)) {
            (Some(i), Some(j)) => self.entries[i][j],
            _ => 0.0,
        }
    }

    /// True if any entry is non-zero (including non-finite entries).
    pub fn has_interactions(&self) -> bool {
        self.entries.iter().flatten().any(|v| *v != 0.0)
    }

    /// Raw rows, in subject index order.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.entries
    }

    /// Fail with `Numerical` if any entry is NaN or infinite.
    pub fn validate(&self) -> Result<(), ReputeError> {
        for (i, row) in self.entries.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                if !v.is_finite() {
                    return Err(ReputeError::Numerical(format!(
                        "trust matrix entry ({}, {}) is {}",
                        self.subjects[i], self.subjects[j], v
                    )));
                }
            }
        }
        Ok(())
    }

    /// Row-normalized copy of the matrix (see `row_normalize`).
    pub fn row_normalized(&self) -> Result<Vec<Vec<f64>>, ReputeError> {
        self.validate()?;
        let mut c = self.entries.clone();
        row_normalize(&mut c);
        Ok(c)
    }
}

fn floor_finite(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        value
    }
}

/// Divide every row by its sum so it sums to 1.0.
///
/// Rows that sum to 0 stay all-zero: they are not redistributed uniformly.
pub fn row_normalize(rows: &mut [Vec<f64>]) {
    for row in rows.iter_mut() {
        let row_sum: f64 = row.iter().sum();
        if row_sum > 0.0 {
            for v in row.iter_mut() {
                *v /= row_sum;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use repute_core::signal::SignalSource;

    const PAIR: [Subject; 2] = [Subject::Musk, Subject::Trump];

    #[test]
    fn normalized_rows_sum_to_one_or_zero() {
        let mut tm = TrustMatrix::new(&PAIR);
        tm.set_trust(Subject::Musk, Subject::Musk, 0.3);
        tm.set_trust(Subject::Musk, Subject::Trump, 0.9);
        let c = tm.row_normalized().unwrap();
        assert!((c[0].iter().sum::<f64>() - 1.0).abs() < 1e-9);
        // Trump's row was all zero and must stay that way.
        assert_eq!(c[1], vec![0.0, 0.0]);
    }

    #[test]
    fn row_normalize_handles_assorted_rows() {
        let mut rows = vec![
            vec![1.0, 2.0, 3.0],
            vec![0.0, 0.0, 0.0],
            vec![1e-12, 0.0, 5e6],
        ];
        row_normalize(&mut rows);
        for (i, row) in rows.iter().enumerate() {
            let sum: f64 = row.iter().sum();
            if i == 1 {
                assert_eq!(sum, 0.0);
            } else {
                assert!((sum - 1.0).abs() < 1e-9, "row {} sums to {}", i, sum);
            }
        }
    }

    #[test]
    fn negative_values_are_floored() {
        let mut tm = TrustMatrix::new(&PAIR);
        tm.set_trust(Subject::Musk, Subject::Trump, -4.0);
        assert_eq!(tm.get_trust(Subject::Musk, Subject::Trump), 0.0);
    }

    #[test]
    fn non_finite_entry_is_numerical_error() {
        let mut tm = TrustMatrix::new(&PAIR);
        tm.set_trust(Subject::Trump, Subject::Musk, f64::NAN);
        let err = tm.row_normalized().unwrap_err();
        assert!(matches!(err, ReputeError::Numerical(_)));

        let mut tm = TrustMatrix::new(&PAIR);
        tm.add_interaction(Subject::Musk, Subject::Musk, f64::INFINITY);
        assert!(matches!(tm.validate(), Err(ReputeError::Numerical(_))));
    }

    #[test]
    fn interactions_include_non_finite_entries() {
        let mut tm = TrustMatrix::new(&PAIR);
        assert!(!tm.has_interactions());
        tm.set_trust(Subject::Musk, Subject::Trump, f64::NAN);
        assert!(tm.has_interactions());
    }

    #[test]
    fn from_rows_rejects_wrong_shape() {
        let err = TrustMatrix::from_rows(&PAIR, vec![vec![1.0, 0.0]]).unwrap_err();
        assert!(matches!(err, ReputeError::Validation(_)));
    }

    #[test]
    fn observations_build_directed_interactions() {
        let now = Utc::now();
        let observations = vec![
            Observation::new(now, Subject::Musk, SignalSource::OpenRank, 2.0)
                .with_metadata("target", serde_json::json!("trump")),
            Observation::new(now, Subject::Musk, SignalSource::OpenRank, 1.0),
            // Non-trust sources never enter the matrix.
            Observation::new(now, Subject::Trump, SignalSource::Fred, 100.0),
        ];
        let tm = TrustMatrix::from_observations(&PAIR, &observations, None).unwrap();
        assert_eq!(tm.get_trust(Subject::Musk, Subject::Trump), 2.0);
        assert_eq!(tm.get_trust(Subject::Musk, Subject::Musk), 1.0);
        assert_eq!(tm.get_trust(Subject::Trump, Subject::Trump), 0.0);
    }

    #[test]
    fn base_matrix_is_added_to_observations() {
        let now = Utc::now();
        let base = TrustMatrix::from_rows(&PAIR, vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let mut weighted = Observation::new(now, Subject::Trump, SignalSource::OpenRank, 4.0)
            .with_metadata("target", serde_json::json!("musk"));
        weighted.confidence = Some(0.5);
        let tm = TrustMatrix::from_observations(&PAIR, &[weighted], Some(&base)).unwrap();
        assert_eq!(tm.get_trust(Subject::Trump, Subject::Musk), 3.0);
        assert_eq!(tm.get_trust(Subject::Musk, Subject::Trump), 1.0);
    }
}
