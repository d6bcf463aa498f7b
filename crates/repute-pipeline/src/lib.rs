// crates/repute-pipeline/src/lib.rs
//
// repute-pipeline: The Repute analysis cycle.
//
// Wires the collection layer, signal store, scoring algorithms, score log,
// and publisher together behind an explicit PipelineContext, and runs the
// collect -> score -> persist -> compare -> publish cycle as a unit.

pub mod collect;
pub mod collectors;
pub mod config;
pub mod context;
pub mod cycle;
pub mod publisher;
pub mod state;

pub use collectors::{HttpFeedCollector, MockCollector};
pub use config::{PipelineConfig, ScoringConfig};
pub use context::PipelineContext;
pub use cycle::{run_cycle, sweep_retention, CycleReport};
pub use publisher::{JsonFilePublisher, MemoryPublisher};
pub use state::{CycleState, CycleStateMachine};
