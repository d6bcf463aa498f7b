// crates/repute-reputation/src/lib.rs
//
// repute-reputation: Trust propagation and reputation scoring for Repute.
//
// Builds the per-cycle trust matrix and runs EigenTrust power iteration,
// aggregates time-decayed sentiment, scores the four reputation components,
// combines them into a ReputationScore, and derives comparison and trend
// metrics between subjects. Everything here is pure computation over
// read-only inputs; storage and I/O live in other crates.

pub mod aggregator;
pub mod classifier;
pub mod comparison;
pub mod decay;
pub mod eigentrust;
pub mod scorers;
pub mod sentiment;
pub mod trend;
pub mod trust_matrix;

pub use aggregator::{ComponentWeights, ReputationAggregator, UncertaintyModel};
pub use classifier::{LexiconClassifier, SentimentLabel};
pub use comparison::ComparisonEngine;
pub use decay::DecayFunction;
pub use eigentrust::{propagate, EigenTrustConfig, TrustPropagation};
pub use scorers::{scorer_for, Component, ComponentScorer, ComponentScores, ScorerSet, ScoringInputs};
pub use sentiment::{SentimentAggregate, SentimentAggregator};
pub use trend::TrendAnalyzer;
pub use trust_matrix::TrustMatrix;
