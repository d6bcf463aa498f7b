// crates/repute-reputation/src/decay.rs
//
// Time-decay functions for signal weighting.
//
// Older sentiment samples count for less. The default is an exponential
// with a 24-hour time constant: weight = exp(-hours / 24).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decay function for attenuating a weight over elapsed hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayFunction {
    /// Exponential decay: value * exp(-elapsed / hours).
    TimeConstant {
        /// e-folding time in hours.
        hours: f64,
    },
    /// Exponential decay: value * 0.5^(elapsed / hours).
    HalfLife {
        /// Hours for the value to halve.
        hours: f64,
    },
    /// Linear decay: max(0, value - per_hour * elapsed).
    Linear {
        /// Amount lost per hour.
        per_hour: f64,
    },
}

impl Default for DecayFunction {
    fn default() -> Self {
        DecayFunction::TimeConstant { hours: 24.0 }
    }
}

/// Apply a decay function to a value.
///
/// # Arguments
/// * `value` - The undecayed value.
/// * `hours_elapsed` - Age in hours; negative ages are treated as 0.
/// * `function` - The decay function to apply.
///
/// # Returns
/// The decayed value, never negative for a non-negative input.
pub fn apply_decay(value: f64, hours_elapsed: f64, function: &DecayFunction) -> f64 {
    let elapsed = hours_elapsed.max(0.0);
    match function {
        DecayFunction::TimeConstant { hours } => {
            if *hours <= 0.0 {
                return 0.0;
            }
            value * (-elapsed / hours).exp()
        }
        DecayFunction::HalfLife { hours } => {
            if *hours <= 0.0 {
                return 0.0;
            }
            value * (0.5_f64).powf(elapsed / hours)
        }
        DecayFunction::Linear { per_hour } => (value - per_hour * elapsed).max(0.0),
    }
}

/// Hours from `earlier` to `later`, floored at 0 for future timestamps.
pub fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let millis = (later - earlier).num_milliseconds();
    (millis as f64 / 3_600_000.0).max(0.0)
}
