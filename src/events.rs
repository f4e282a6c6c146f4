// SleepWatch Companion: Data Types & Pipeline Events

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ActuationPrefs, AlarmConfig, Settings};
use crate::gate::GateState;

// ---------------------------------------------------------------------------
// Sensor sample (one tick from the wearable: heart rate + 3-axis accel)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub heart_rate: f64,
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, heart_rate: f64, accel: [f64; 3]) -> Self {
        Self {
            timestamp,
            heart_rate,
            accel_x: accel[0],
            accel_y: accel[1],
            accel_z: accel[2],
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier labels
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SleepState {
    Asleep,
    Awake,
}

impl SleepState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Asleep => "asleep",
            Self::Awake => "awake",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SleepStage {
    Awake,
    Core,
    Deep,
    Rem,
    Unspecified,
}

impl SleepStage {
    pub const ALL: [SleepStage; 5] = [
        SleepStage::Awake,
        SleepStage::Core,
        SleepStage::Deep,
        SleepStage::Rem,
        SleepStage::Unspecified,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Awake => "awake",
            Self::Core => "core",
            Self::Deep => "deep",
            Self::Rem => "rem",
            Self::Unspecified => "unspecified",
        }
    }
}

/// Which of the two detectors produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classifier {
    Binary,
    Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictedLabel {
    Sleep(SleepState),
    Stage(SleepStage),
}

impl PredictedLabel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sleep(state) => state.name(),
            Self::Stage(stage) => stage.name(),
        }
    }
}

impl fmt::Display for PredictedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Prediction record (appended to the in-memory result log)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub timestamp: DateTime<Utc>,
    pub classifier: Classifier,
    pub label: PredictedLabel,
    /// Per-label probability, keyed by label name.
    pub probabilities: BTreeMap<String, f64>,
}

impl PredictionResult {
    /// Probability of the winning label (0.0 when the model omitted it).
    pub fn confidence(&self) -> f64 {
        self.probabilities
            .get(self.label.name())
            .copied()
            .unwrap_or(0.0)
    }

}

// ---------------------------------------------------------------------------
// Observer events emitted by the core
// ---------------------------------------------------------------------------

/// Several consecutive "asleep" outcomes; `onset` is the oldest of them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StableSleepOnset {
    pub onset: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
}

/// The stage detector saw the wake-trigger stage inside the gating window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakeTrigger {
    pub at: DateTime<Utc>,
    pub stage: SleepStage,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Prediction(PredictionResult),
    StableSleepOnset(StableSleepOnset),
    GateChanged {
        from: GateState,
        to: GateState,
        at: DateTime<Utc>,
    },
    WakeTrigger(WakeTrigger),
}

// ---------------------------------------------------------------------------
// Messages consumed by the core tick loop
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    Alarm(AlarmConfig),
    Actuation(ActuationPrefs),
    Replace(Settings),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineMsg {
    /// A decoded batch from the wearable relay, in arrival order.
    Samples(Vec<Sample>),
    Config(ConfigUpdate),
    /// Periodic gate re-check.
    Timer(DateTime<Utc>),
    /// New sleep cycle: clears the latch and the onset tracker.
    Reset,
    Shutdown,
}
