// crates/repute-pipeline/src/context.rs
//
// PipelineContext: every collaborator a cycle needs, constructed once and
// passed into each `run_cycle` call. There is no process-wide state.

use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;

use repute_core::error::ReputeError;
use repute_core::score::PublishedResult;
use repute_core::subject::Subject;
use repute_core::traits::{Collector, Publisher, ScoreStore, TextClassifier};
use repute_reputation::aggregator::ReputationAggregator;
use repute_reputation::classifier::LexiconClassifier;
use repute_reputation::comparison::ComparisonEngine;
use repute_reputation::eigentrust::EigenTrustConfig;
use repute_reputation::scorers::ScorerSet;
use repute_reputation::trend::TrendAnalyzer;
use repute_reputation::trust_matrix::TrustMatrix;
use repute_store::signals::SignalStore;

use crate::config::PipelineConfig;
use crate::state::{CycleState, CycleStateMachine};

/// Shared pipeline dependencies. Cheap to clone.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<PipelineConfig>,
    /// Scored subjects; the first two are compared.
    pub subjects: Vec<Subject>,
    pub signals: Arc<SignalStore>,
    pub scores: Arc<dyn ScoreStore>,
    pub collector: Arc<dyn Collector>,
    pub classifier: Arc<dyn TextClassifier>,
    pub publisher: Arc<dyn Publisher>,
    pub scorers: Arc<ScorerSet>,
    pub aggregator: Arc<ReputationAggregator>,
    pub comparison: ComparisonEngine,
    pub trends: Arc<TrendAnalyzer>,
    pub eigentrust: EigenTrustConfig,
    pub base_matrix: Option<Arc<TrustMatrix>>,
    /// The committed snapshot. Only a successful publish replaces it.
    pub last_published: Arc<RwLock<Option<PublishedResult>>>,
    pub state: Arc<Mutex<CycleStateMachine>>,
}

impl PipelineContext {
    /// Build a context over `Subject::ALL` with the lexicon classifier and
    /// an empty signal store. The configuration is validated here.
    pub fn new(
        config: PipelineConfig,
        collector: Arc<dyn Collector>,
        scores: Arc<dyn ScoreStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self, ReputeError> {
        config.validate()?;
        let subjects = Subject::ALL.to_vec();
        let scoring = &config.scoring;

        Ok(Self {
            subjects: subjects.clone(),
            signals: Arc::new(SignalStore::new()),
            scores,
            collector,
            classifier: Arc::new(LexiconClassifier::new()),
            publisher,
            scorers: Arc::new(scoring.scorer_set()),
            aggregator: Arc::new(scoring.aggregator()?),
            comparison: ComparisonEngine::new(),
            trends: Arc::new(
                TrendAnalyzer::new(scoring.trend_threshold)
                    .with_prediction_periods(scoring.prediction_periods),
            ),
            eigentrust: scoring.eigentrust(),
            base_matrix: scoring.base_matrix(&subjects)?.map(Arc::new),
            last_published: Arc::new(RwLock::new(None)),
            state: Arc::new(Mutex::new(CycleStateMachine::new())),
            config: Arc::new(config),
        })
    }

    /// Replace the text classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn TextClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Share an existing signal store.
    pub fn with_signal_store(mut self, signals: Arc<SignalStore>) -> Self {
        self.signals = signals;
        self
    }

    /// The two subjects compared in the published snapshot.
    pub fn pair(&self) -> Result<(Subject, Subject), ReputeError> {
        match self.subjects.as_slice() {
            [a, b, ..] => Ok((*a, *b)),
            _ => Err(ReputeError::Validation(
                "comparison needs at least two subjects".to_string(),
            )),
        }
    }

    /// Current cycle phase.
    pub fn cycle_state(&self) -> CycleState {
        self.state
            .lock()
            .map(|sm| sm.current)
            .unwrap_or(CycleState::Failed)
    }

    /// Move the cycle state machine.
    pub fn transition(&self, next: CycleState) -> Result<(), ReputeError> {
        self.state
            .lock()
            .map_err(|_| ReputeError::InvalidState("cycle state lock poisoned".to_string()))?
            .transition(next)
    }

    /// Snapshot of the last published result.
    pub async fn latest_snapshot(&self) -> Option<PublishedResult> {
        self.last_published.read().await.clone()
    }
}
