// crates/repute-core/src/subject.rs
//
// The closed set of tracked subjects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReputeError;

/// A tracked subject. The set is closed; algorithms iterate `Subject::ALL`
/// (or any slice of subjects) and never assume a particular size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Musk,
    Trump,
}

impl Subject {
    /// Every subject, in canonical order.
    pub const ALL: [Subject; 2] = [Subject::Musk, Subject::Trump];

    /// Stable lowercase identifier, used in storage keys and feed URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Musk => "musk",
            Subject::Trump => "trump",
        }
    }

    /// Position of this subject in `Subject::ALL`.
    pub fn index(&self) -> usize {
        match self {
            Subject::Musk => 0,
            Subject::Trump => 1,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = ReputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "musk" => Ok(Subject::Musk),
            "trump" => Ok(Subject::Trump),
            other => Err(ReputeError::Validation(format!("unknown subject: {:?}", other))),
        }
    }
}
