// crates/repute-core/src/lib.rs
//
// repute-core: Core types, errors, and collaborator traits for Repute.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines the signal and score data model, the pipeline-wide error type,
// and the trait interfaces of the external collaborators (collection layer,
// text classifier, score log, publisher).

pub mod error;
pub mod score;
pub mod signal;
pub mod subject;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use repute_core::Observation;`

pub use error::ReputeError;
pub use score::{
    ComparisonResult, PublishedResult, ReputationScore, SubjectSummary, TrendLabel, TrendReport,
    TrustScore, Winner, NEUTRAL_SCORE,
};
pub use signal::{Observation, RawRecord, SentimentSample, SignalSource, SourceCategory, TimeRange};
pub use subject::Subject;
pub use traits::{Collector, PublishOutcome, Publisher, ScoreStore, TextClassifier};
