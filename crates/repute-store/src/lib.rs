// crates/repute-store/src/lib.rs
//
// repute-store: Storage layer for Repute.
//
// Provides the in-memory SignalStore (observations and sentiment samples,
// retention sweeps, collection stats) and two implementations of the
// append-only `ScoreStore` log: RocksDB-backed for durable history and
// in-memory for tests and one-shot runs.

pub mod memory;
pub mod rocks;
pub mod signals;

// Re-export key types for ergonomic access from downstream crates.
pub use memory::InMemoryScoreLog;
pub use rocks::RocksScoreLog;
pub use signals::{
    CollectionStats, IngestReport, RetentionReport, SignalQuery, SignalStore, SubjectStats,
};
