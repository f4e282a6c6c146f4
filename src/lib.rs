// SleepWatch Companion: Library Root
//
// Sleep-monitoring core for the phone side of the watch pairing. Samples
// relayed from the watch are windowed into features, scored by a binary
// sleep/wake detector and a sleep-stage detector, and the stage detector's
// output, gated to a window before the alarm, decides when to fire the wake
// light and the local alert.

pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod export;
pub mod features;
pub mod gate;
pub mod orchestrator;
pub mod pipeline;
pub mod scorer;
pub mod settings;
pub mod stats;
pub mod tasks;
pub mod tracker;

pub use config::{ActuationPrefs, AlarmConfig, Settings};
pub use error::{PipelineError, ScoringError};
pub use events::{PipelineEvent, PipelineMsg, PredictionResult, Sample, SleepStage, SleepState};
pub use gate::GateState;
pub use orchestrator::Orchestrator;
pub use pipeline::Pipeline;
pub use scorer::{HeuristicScorer, Scorer};
