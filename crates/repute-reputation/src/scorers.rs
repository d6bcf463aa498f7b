// crates/repute-reputation/src/scorers.rs
//
// Component scorers: sentiment, economic, social, trust.
//
// Each scorer maps a read-only slice of signals to a value in [0, 100] and
// falls back to the neutral 50.0 when it has no data. Scorers share nothing
// but their inputs. The set is closed; `scorer_for` is the only factory.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use repute_core::error::ReputeError;
use repute_core::score::{TrustScore, NEUTRAL_SCORE};
use repute_core::signal::{Observation, SentimentSample, SourceCategory};
use repute_core::subject::Subject;

use crate::decay::DecayFunction;
use crate::sentiment::SentimentAggregator;

/// Default number of most recent economic observations in the recent average.
pub const DEFAULT_RECENT_WINDOW: usize = 7;

/// The four reputation components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Sentiment,
    Economic,
    Social,
    Trust,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Sentiment,
        Component::Economic,
        Component::Social,
        Component::Trust,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Sentiment => "sentiment",
            Component::Economic => "economic",
            Component::Social => "social",
            Component::Trust => "trust",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only signals handed to every scorer.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInputs<'a> {
    pub observations: &'a [Observation],
    pub sentiments: &'a [SentimentSample],
    pub trust_history: &'a [TrustScore],
    pub now: DateTime<Utc>,
}

/// A scorer for one component.
pub trait ComponentScorer: Send + Sync {
    fn component(&self) -> Component;

    /// Score `subject` in [0, 100]. Fails with `Numerical` instead of
    /// returning a non-finite value.
    fn score(&self, inputs: &ScoringInputs<'_>, subject: Subject) -> Result<f64, ReputeError>;
}

fn finite_clamped(component: Component, subject: Subject, value: f64) -> Result<f64, ReputeError> {
    if !value.is_finite() {
        return Err(ReputeError::Numerical(format!(
            "{} component for {} is {}",
            component, subject, value
        )));
    }
    Ok(value.clamp(0.0, 100.0))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Observation values for `subject` in `category`, ascending by timestamp.
fn category_values(observations: &[Observation], subject: Subject, category: SourceCategory) -> Vec<f64> {
    let mut matching: Vec<&Observation> = observations
        .iter()
        .filter(|o| o.subject == subject && o.source.category() == category)
        .collect();
    matching.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    matching.iter().map(|o| o.value).collect()
}

/// Delegates to the sentiment aggregator.
#[derive(Debug, Clone, Default)]
pub struct SentimentScorer {
    aggregator: SentimentAggregator,
}

impl SentimentScorer {
    pub fn new(decay: DecayFunction) -> Self {
        Self {
            aggregator: SentimentAggregator::new(decay),
        }
    }
}

impl ComponentScorer for SentimentScorer {
    fn component(&self) -> Component {
        Component::Sentiment
    }

    fn score(&self, inputs: &ScoringInputs<'_>, subject: Subject) -> Result<f64, ReputeError> {
        let agg = self.aggregator.aggregate(inputs.sentiments, subject, inputs.now);
        finite_clamped(Component::Sentiment, subject, agg.score)
    }
}

/// 50 * recent_avg / historical_avg over economic-category observations.
#[derive(Debug, Clone)]
pub struct EconomicScorer {
    recent_window: usize,
}

impl EconomicScorer {
    pub fn new(recent_window: usize) -> Self {
        Self {
            recent_window: recent_window.max(1),
        }
    }
}

impl Default for EconomicScorer {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_WINDOW)
    }
}

impl ComponentScorer for EconomicScorer {
    fn component(&self) -> Component {
        Component::Economic
    }

    fn score(&self, inputs: &ScoringInputs<'_>, subject: Subject) -> Result<f64, ReputeError> {
        let values = category_values(inputs.observations, subject, SourceCategory::Economic);
        if values.is_empty() {
            return Ok(NEUTRAL_SCORE);
        }
        let historical_avg = mean(&values);
        if historical_avg == 0.0 {
            return Ok(NEUTRAL_SCORE);
        }
        let start = values.len().saturating_sub(self.recent_window);
        let recent_avg = mean(&values[start..]);
        finite_clamped(Component::Economic, subject, NEUTRAL_SCORE * (recent_avg / historical_avg))
    }
}

/// Mean of social-category observation values.
#[derive(Debug, Clone, Default)]
pub struct SocialScorer;

impl ComponentScorer for SocialScorer {
    fn component(&self) -> Component {
        Component::Social
    }

    fn score(&self, inputs: &ScoringInputs<'_>, subject: Subject) -> Result<f64, ReputeError> {
        let values = category_values(inputs.observations, subject, SourceCategory::Social);
        if values.is_empty() {
            return Ok(NEUTRAL_SCORE);
        }
        finite_clamped(Component::Social, subject, mean(&values))
    }
}

/// Most recent TrustScore * 100.
#[derive(Debug, Clone, Default)]
pub struct TrustScorer;

impl ComponentScorer for TrustScorer {
    fn component(&self) -> Component {
        Component::Trust
    }

    fn score(&self, inputs: &ScoringInputs<'_>, subject: Subject) -> Result<f64, ReputeError> {
        let latest = inputs
            .trust_history
            .iter()
            .filter(|t| t.subject == subject)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp));
        match latest {
            Some(t) => finite_clamped(Component::Trust, subject, t.trust_score * 100.0),
            None => Ok(NEUTRAL_SCORE),
        }
    }
}

/// Closed set of scorers, dispatched statically.
#[derive(Debug, Clone)]
pub enum Scorer {
    Sentiment(SentimentScorer),
    Economic(EconomicScorer),
    Social(SocialScorer),
    Trust(TrustScorer),
}

impl ComponentScorer for Scorer {
    fn component(&self) -> Component {
        match self {
            Scorer::Sentiment(s) => s.component(),
            Scorer::Economic(s) => s.component(),
            Scorer::Social(s) => s.component(),
            Scorer::Trust(s) => s.component(),
        }
    }

    fn score(&self, inputs: &ScoringInputs<'_>, subject: Subject) -> Result<f64, ReputeError> {
        match self {
            Scorer::Sentiment(s) => s.score(inputs, subject),
            Scorer::Economic(s) => s.score(inputs, subject),
            Scorer::Social(s) => s.score(inputs, subject),
            Scorer::Trust(s) => s.score(inputs, subject),
        }
    }
}

/// Default-configured scorer for a component.
pub fn scorer_for(component: Component) -> Scorer {
    match component {
        Component::Sentiment => Scorer::Sentiment(SentimentScorer::default()),
        Component::Economic => Scorer::Economic(EconomicScorer::default()),
        Component::Social => Scorer::Social(SocialScorer),
        Component::Trust => Scorer::Trust(TrustScorer),
    }
}

/// One subject's four component values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub sentiment: f64,
    pub economic: f64,
    pub social: f64,
    pub trust: f64,
}

impl ComponentScores {
    pub fn neutral() -> Self {
        Self {
            sentiment: NEUTRAL_SCORE,
            economic: NEUTRAL_SCORE,
            social: NEUTRAL_SCORE,
            trust: NEUTRAL_SCORE,
        }
    }

    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Sentiment => self.sentiment,
            Component::Economic => self.economic,
            Component::Social => self.social,
            Component::Trust => self.trust,
        }
    }

    fn set(&mut self, component: Component, value: f64) {
        match component {
            Component::Sentiment => self.sentiment = value,
            Component::Economic => self.economic = value,
            Component::Social => self.social = value,
            Component::Trust => self.trust = value,
        }
    }
}

/// The four scorers, configured together.
#[derive(Debug, Clone)]
pub struct ScorerSet {
    scorers: [Scorer; 4],
}

impl Default for ScorerSet {
    fn default() -> Self {
        Self {
            scorers: Component::ALL.map(scorer_for),
        }
    }
}

impl ScorerSet {
    pub fn new(decay: DecayFunction, economic_recent_window: usize) -> Self {
        Self {
            scorers: [
                Scorer::Sentiment(SentimentScorer::new(decay)),
                Scorer::Economic(EconomicScorer::new(economic_recent_window)),
                Scorer::Social(SocialScorer),
                Scorer::Trust(TrustScorer),
            ],
        }
    }

    /// Run every scorer for `subject`. The first numerical failure aborts
    /// the subject.
    pub fn score_all(&self, inputs: &ScoringInputs<'_>, subject: Subject) -> Result<ComponentScores, ReputeError> {
        let mut scores = ComponentScores::neutral();
        for scorer in &self.scorers {
            let value = scorer.score(inputs, subject)?;
            scores.set(scorer.component(), value);
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use repute_core::signal::SignalSource;

    fn inputs<'a>(
        observations: &'a [Observation],
        sentiments: &'a [SentimentSample],
        trust_history: &'a [TrustScore],
        now: DateTime<Utc>,
    ) -> ScoringInputs<'a> {
        ScoringInputs {
            observations,
            sentiments,
            trust_history,
            now,
        }
    }

    fn series(subject: Subject, source: SignalSource, values: &[f64], now: DateTime<Utc>) -> Vec<Observation> {
        let n = values.len() as i64;
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::new(now - Duration::hours(n - i as i64), subject, source, *v))
            .collect()
    }

    #[test]
    fn empty_inputs_are_exactly_neutral() {
        let now = Utc::now();
        let scores = ScorerSet::default()
            .score_all(&inputs(&[], &[], &[], now), Subject::Musk)
            .unwrap();
        assert_eq!(scores, ComponentScores::neutral());
    }

    #[test]
    fn recent_economic_uptick_scores_above_neutral() {
        let now = Utc::now();
        let obs = series(
            Subject::Musk,
            SignalSource::Fred,
            &[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 20.0],
            now,
        );
        let score = EconomicScorer::default()
            .score(&inputs(&obs, &[], &[], now), Subject::Musk)
            .unwrap();
        // recent 80/7 over historical 90/8
        let expected = 50.0 * ((80.0 / 7.0) / (90.0 / 8.0));
        assert!((score - expected).abs() < 1e-9);
        assert!(score > 50.0);
    }

    #[test]
    fn economic_zero_history_is_neutral() {
        let now = Utc::now();
        let obs = series(Subject::Trump, SignalSource::Census, &[0.0, 0.0], now);
        let score = EconomicScorer::default()
            .score(&inputs(&obs, &[], &[], now), Subject::Trump)
            .unwrap();
        assert_eq!(score, 50.0);
    }

    #[test]
    fn economic_ratio_is_clamped() {
        let now = Utc::now();
        let obs = series(Subject::Musk, SignalSource::Ycharts, &[1.0, 1.0, 1.0, 1000.0], now);
        let score = EconomicScorer::new(1)
            .score(&inputs(&obs, &[], &[], now), Subject::Musk)
            .unwrap();
        assert_eq!(score, 100.0);
    }

    #[test]
    fn social_mean_is_clamped() {
        let now = Utc::now();
        let obs = series(Subject::Musk, SignalSource::SocialMedia, &[60.0, 80.0], now);
        let score = SocialScorer.score(&inputs(&obs, &[], &[], now), Subject::Musk).unwrap();
        assert!((score - 70.0).abs() < 1e-12);

        let obs = series(Subject::Musk, SignalSource::News, &[-40.0], now);
        let score = SocialScorer.score(&inputs(&obs, &[], &[], now), Subject::Musk).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn trust_uses_latest_score() {
        let now = Utc::now();
        let history = vec![
            TrustScore {
                timestamp: now,
                subject: Subject::Trump,
                trust_score: 0.62,
                local_trust: 0.5,
                pre_trust: 0.5,
            },
            TrustScore {
                timestamp: now - Duration::hours(1),
                subject: Subject::Trump,
                trust_score: 0.1,
                local_trust: 0.5,
                pre_trust: 0.5,
            },
        ];
        let score = TrustScorer.score(&inputs(&[], &[], &history, now), Subject::Trump).unwrap();
        assert!((score - 62.0).abs() < 1e-9);
        let score = TrustScorer.score(&inputs(&[], &[], &history, now), Subject::Musk).unwrap();
        assert_eq!(score, 50.0);
    }

    #[test]
    fn non_finite_component_is_numerical_error() {
        let now = Utc::now();
        let obs = series(Subject::Musk, SignalSource::News, &[f64::NAN], now);
        let err = ScorerSet::default()
            .score_all(&inputs(&obs, &[], &[], now), Subject::Musk)
            .unwrap_err();
        assert!(matches!(err, ReputeError::Numerical(_)));
    }

    #[test]
    fn registry_returns_matching_component() {
        for component in Component::ALL {
            assert_eq!(scorer_for(component).component(), component);
        }
    }
}
