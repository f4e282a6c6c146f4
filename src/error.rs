// SleepWatch Companion: Error Taxonomy
//
// Every error here is recoverable at tick granularity. Nothing in the core
// is fatal; the caller decides what to surface to the user.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure reported by a scoring back-end.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("model error: {0}")]
    Model(String),

    #[error("scorer did not answer within {0:?}")]
    Timeout(Duration),

    #[error("scorer worker disconnected")]
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Window not full yet. Expected while the buffer warms up.
    #[error("insufficient data: need {needed} samples, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("inference failed: {0}")]
    InferenceFailed(#[from] ScoringError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("clock anomaly: sample at {current} is older than previous sample at {previous}")]
    ClockAnomaly {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}
