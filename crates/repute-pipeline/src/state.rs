// crates/repute-pipeline/src/state.rs
//
// Cycle state machine.
//
// Valid transitions:
//   Idle -> Collecting -> Scoring -> Persisting -> Publishing -> Idle
//   Any state -> Failed
//   Failed -> Idle

use std::fmt;

use repute_core::error::ReputeError;

/// Phases of an analysis cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// No cycle in flight.
    Idle,
    /// Fetching and ingesting signals.
    Collecting,
    /// Propagating trust and scoring subjects.
    Scoring,
    /// Appending the cycle's scores to the log.
    Persisting,
    /// Committing the snapshot.
    Publishing,
    /// The last cycle errored or was cancelled.
    Failed,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleState::Idle => write!(f, "Idle"),
            CycleState::Collecting => write!(f, "Collecting"),
            CycleState::Scoring => write!(f, "Scoring"),
            CycleState::Persisting => write!(f, "Persisting"),
            CycleState::Publishing => write!(f, "Publishing"),
            CycleState::Failed => write!(f, "Failed"),
        }
    }
}

/// State machine tracking the phase of the current cycle.
#[derive(Debug)]
pub struct CycleStateMachine {
    pub current: CycleState,
}

impl CycleStateMachine {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self {
            current: CycleState::Idle,
        }
    }

    /// True while a cycle is between Collecting and Publishing.
    pub fn in_flight(&self) -> bool {
        !matches!(self.current, CycleState::Idle | CycleState::Failed)
    }

    /// Attempt to transition to a new state.
    pub fn transition(&mut self, new_state: CycleState) -> Result<(), ReputeError> {
        if new_state == CycleState::Failed {
            tracing::debug!("Cycle state: {} -> {}", self.current, new_state);
            self.current = new_state;
            return Ok(());
        }

        let valid = matches!(
            (self.current, new_state),
            (CycleState::Idle, CycleState::Collecting)
                | (CycleState::Collecting, CycleState::Scoring)
                | (CycleState::Scoring, CycleState::Persisting)
                | (CycleState::Persisting, CycleState::Publishing)
                | (CycleState::Publishing, CycleState::Idle)
                | (CycleState::Failed, CycleState::Idle)
        );

        if valid {
            tracing::debug!("Cycle state: {} -> {}", self.current, new_state);
            self.current = new_state;
            Ok(())
        } else {
            Err(ReputeError::InvalidState(format!(
                "Invalid cycle transition: {} -> {}",
                self.current, new_state
            )))
        }
    }
}

impl Default for CycleStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
