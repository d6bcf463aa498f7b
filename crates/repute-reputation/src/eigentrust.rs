// crates/repute-reputation/src/eigentrust.rs
//
// EigenTrust power iteration over a row-normalized trust matrix.
//
// trust_{k+1} = (1 - d) * pre_trust + d * C^T * trust_k, starting from
// trust_0 = pre_trust, until the L1 change drops below the convergence
// threshold or the iteration cap is reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use repute_core::error::ReputeError;
use repute_core::score::TrustScore;
use repute_core::subject::Subject;

use crate::trust_matrix::TrustMatrix;

/// Configuration for the EigenTrust propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenTrustConfig {
    /// Weight of propagated trust vs. the pre-trust anchor. Default: 0.85.
    pub damping_factor: f64,
    /// Hard iteration cap. Default: 100.
    pub max_iterations: u32,
    /// Convergence threshold (L1 norm of the change). Default: 1e-6.
    pub convergence_threshold: f64,
}

impl Default for EigenTrustConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            max_iterations: 100,
            convergence_threshold: 1e-6,
        }
    }
}

impl EigenTrustConfig {
    pub fn validate(&self) -> Result<(), ReputeError> {
        if !(0.0..=1.0).contains(&self.damping_factor) {
            return Err(ReputeError::Validation(format!(
                "damping factor {} outside [0, 1]",
                self.damping_factor
            )));
        }
        if self.max_iterations == 0 {
            return Err(ReputeError::Validation("max_iterations must be positive".to_string()));
        }
        if !(self.convergence_threshold > 0.0) {
            return Err(ReputeError::Validation(format!(
                "convergence threshold {} must be positive",
                self.convergence_threshold
            )));
        }
        Ok(())
    }
}

/// Result of one propagation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustPropagation {
    pub subjects: Vec<Subject>,
    /// Converged global trust per subject, each in [0, 1].
    pub trust: Vec<f64>,
    /// Mean normalized local trust each subject receives.
    pub local_trust: Vec<f64>,
    pub pre_trust: Vec<f64>,
    pub iterations: u32,
    pub converged: bool,
}

impl TrustPropagation {
    /// One TrustScore per subject, stamped with `timestamp`.
    pub fn to_scores(&self, timestamp: DateTime<Utc>) -> Vec<TrustScore> {
        self.subjects
            .iter()
            .enumerate()
            .map(|(i, &subject)| TrustScore {
                timestamp,
                subject,
                trust_score: self.trust[i],
                local_trust: self.local_trust[i],
                pre_trust: self.pre_trust[i],
            })
            .collect()
    }

    /// Global trust for `subject`, if it was part of the run.
    pub fn trust_of(&self, subject: Subject) -> Option<f64> {
        self.subjects
            .iter()
            .position(|s| *s == subject)
            .map(|i| self.trust[i])
    }
}

/// Uniform prior over `n` subjects.
pub fn uniform_pre_trust(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Check a pre-trust vector: right length, finite, non-negative, sums to 1.
pub fn validate_pre_trust(pre_trust: &[f64], n: usize) -> Result<(), ReputeError> {
    if pre_trust.len() != n {
        return Err(ReputeError::Validation(format!(
            "pre-trust has {} entries, expected {}",
            pre_trust.len(),
            n
        )));
    }
    if pre_trust.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(ReputeError::Validation(
            "pre-trust entries must be finite and non-negative".to_string(),
        ));
    }
    let sum: f64 = pre_trust.iter().sum();
    if (sum - 1.0).abs() > 1e-9 {
        return Err(ReputeError::Validation(format!("pre-trust sums to {}, expected 1", sum)));
    }
    Ok(())
}

/// One damped iteration: `(1 - d) * p + d * C^T * t`.
pub fn step(c: &[Vec<f64>], pre_trust: &[f64], t: &[f64], damping: f64) -> Vec<f64> {
    let n = pre_trust.len();
    let mut next = vec![0.0_f64; n];
    for (j, slot) in next.iter_mut().enumerate() {
        let mut sum = 0.0;
        for i in 0..n {
            sum += c[i][j] * t[i];
        }
        *slot = (1.0 - damping) * pre_trust[j] + damping * sum;
    }
    next
}

/// L1 distance between two vectors.
pub fn l1_delta(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Run EigenTrust over `matrix`.
///
/// `pre_trust` defaults to uniform. Fails with `Numerical` if the matrix (or
/// an iterate) contains a non-finite value, and with `Validation` on a bad
/// config or pre-trust vector.
pub fn propagate(
    matrix: &TrustMatrix,
    pre_trust: Option<&[f64]>,
    config: &EigenTrustConfig,
) -> Result<TrustPropagation, ReputeError> {
    config.validate()?;
    let n = matrix.len();
    let p = match pre_trust {
        Some(p) => {
            validate_pre_trust(p, n)?;
            p.to_vec()
        }
        None => uniform_pre_trust(n),
    };

    let c = matrix.row_normalized()?;

    let local_trust: Vec<f64> = (0..n)
        .map(|j| c.iter().map(|row| row[j]).sum::<f64>() / n as f64)
        .collect();

    let mut t = p.clone();
    let mut iterations = 0;
    let mut converged = n == 0;

    while !converged && iterations < config.max_iterations {
        let next = step(&c, &p, &t, config.damping_factor);
        iterations += 1;
        let delta = l1_delta(&t, &next);
        t = next;
        if !delta.is_finite() {
            return Err(ReputeError::Numerical(format!(
                "trust iteration diverged at step {}",
                iterations
            )));
        }
        converged = delta < config.convergence_threshold;
    }

    if !converged {
        tracing::warn!(
            "EigenTrust hit the iteration cap ({}) without converging",
            config.max_iterations
        );
    } else {
        tracing::debug!("EigenTrust converged after {} iterations", iterations);
    }

    let trust = t.into_iter().map(|v| v.clamp(0.0, 1.0)).collect();

    Ok(TrustPropagation {
        subjects: matrix.subjects().to_vec(),
        trust,
        local_trust,
        pre_trust: p,
        iterations,
        converged,
    })
}
