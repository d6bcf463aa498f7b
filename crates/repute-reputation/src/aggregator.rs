// crates/repute-reputation/src/aggregator.rs
//
// Fixed-weight combination of the four components into a ReputationScore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use repute_core::error::ReputeError;
use repute_core::score::ReputationScore;
use repute_core::subject::Subject;

use crate::scorers::{Component, ComponentScores};

/// z-value of a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Default assumed standard deviation of the overall score.
pub const DEFAULT_STD_DEV: f64 = 5.0;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Component weights. Must be non-negative and sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentWeights {
    pub sentiment: f64,
    pub economic: f64,
    pub social: f64,
    pub trust: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            sentiment: 0.25,
            economic: 0.30,
            social: 0.20,
            trust: 0.25,
        }
    }
}

impl ComponentWeights {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Sentiment => self.sentiment,
            Component::Economic => self.economic,
            Component::Social => self.social,
            Component::Trust => self.trust,
        }
    }

    pub fn sum(&self) -> f64 {
        Component::ALL.iter().map(|c| self.get(*c)).sum()
    }

    pub fn validate(&self) -> Result<(), ReputeError> {
        for component in Component::ALL {
            let w = self.get(component);
            if !w.is_finite() || w < 0.0 {
                return Err(ReputeError::Validation(format!(
                    "weight for {} must be a non-negative number, got {}",
                    component, w
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ReputeError::Validation(format!(
                "component weights must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }
}

/// How the confidence interval half-width is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UncertaintyModel {
    /// overall +/- 1.96 * std_dev, a fixed placeholder.
    Fixed { std_dev: f64 },
    /// overall +/- 1.96 * population std of the four components.
    ComponentSpread,
}

impl Default for UncertaintyModel {
    fn default() -> Self {
        UncertaintyModel::Fixed {
            std_dev: DEFAULT_STD_DEV,
        }
    }
}

impl UncertaintyModel {
    fn std_dev(&self, components: &[f64; 4]) -> f64 {
        match self {
            UncertaintyModel::Fixed { std_dev } => *std_dev,
            UncertaintyModel::ComponentSpread => {
                let mean = components.iter().sum::<f64>() / 4.0;
                let var = components.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / 4.0;
                var.sqrt()
            }
        }
    }
}

/// Combines component scores into an overall ReputationScore.
#[derive(Debug, Clone)]
pub struct ReputationAggregator {
    weights: ComponentWeights,
    uncertainty: UncertaintyModel,
}

impl ReputationAggregator {
    /// Weights are checked here, once, not on every call.
    pub fn new(weights: ComponentWeights, uncertainty: UncertaintyModel) -> Result<Self, ReputeError> {
        weights.validate()?;
        if let UncertaintyModel::Fixed { std_dev } = uncertainty {
            if !std_dev.is_finite() || std_dev < 0.0 {
                return Err(ReputeError::Validation(format!(
                    "interval std_dev must be a finite non-negative number, got {}",
                    std_dev
                )));
            }
        }
        Ok(Self { weights, uncertainty })
    }

    pub fn weights(&self) -> &ComponentWeights {
        &self.weights
    }

    /// Build the score. Components are clamped to [0, 100] before
    /// weighting; interval bounds are clamped to [0, 100].
    pub fn aggregate(
        &self,
        subject: Subject,
        components: &ComponentScores,
        timestamp: DateTime<Utc>,
    ) -> Result<ReputationScore, ReputeError> {
        let mut clamped = [0.0; 4];
        for (slot, component) in clamped.iter_mut().zip(Component::ALL) {
            let value = components.get(component);
            if !value.is_finite() {
                return Err(ReputeError::Numerical(format!(
                    "{} component for {} is {}",
                    component, subject, value
                )));
            }
            *slot = value.clamp(0.0, 100.0);
        }

        let overall: f64 = Component::ALL
            .iter()
            .zip(clamped.iter())
            .map(|(c, v)| self.weights.get(*c) * v)
            .sum::<f64>()
            .clamp(0.0, 100.0);

        let half_width = Z_95 * self.uncertainty.std_dev(&clamped);
        let low = (overall - half_width).clamp(0.0, 100.0);
        let high = (overall + half_width).clamp(0.0, 100.0);

        Ok(ReputationScore {
            timestamp,
            subject,
            overall_score: overall,
            sentiment_component: clamped[0],
            economic_component: clamped[1],
            social_component: clamped[2],
            trust_component: clamped[3],
            confidence_interval: (low, high),
        })
    }
}

impl Default for ReputationAggregator {
    fn default() -> Self {
        Self {
            weights: ComponentWeights::default(),
            uncertainty: UncertaintyModel::default(),
        }
    }
}
