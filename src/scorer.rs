// SleepWatch Companion: Classifier Interface
//
// The two detectors are opaque scoring functions behind the `Scorer` trait.
// A model back-end implements both methods; the orchestrator never sees more
// than a winning label and its probability map.
//
// `HeuristicScorer` is the built-in back-end: a rule-of-thumb model that lets
// the rest of the pipeline run end to end before a trained model is plugged in.

use crate::error::ScoringError;
use crate::events::{SleepState, SleepStage};
use crate::features::{BinaryFeatures, StageFeatures};

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

/// Raw classifier output: winning label plus per-label probability.
#[derive(Debug, Clone, PartialEq)]
pub struct RawScore<L> {
    pub label: L,
    pub probabilities: Vec<(L, f64)>,
}

impl<L: Copy> RawScore<L> {
    /// Pick the highest-probability label.
    ///
    /// Fails on an empty map or a non-finite probability, both of which mean
    /// the model produced garbage.
    pub fn from_probabilities(probabilities: Vec<(L, f64)>) -> Result<Self, ScoringError> {
        if let Some((_, p)) = probabilities.iter().find(|(_, p)| !p.is_finite()) {
            return Err(ScoringError::Model(format!("non-finite probability {p}")));
        }
        let label = probabilities
            .iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(label, _)| *label)
            .ok_or_else(|| ScoringError::Model("empty probability map".into()))?;
        Ok(Self {
            label,
            probabilities,
        })
    }
}

/// One method per classifier type. Implementations must be shareable with a
/// worker thread so the orchestrator can bound their latency.
pub trait Scorer: Send + Sync {
    fn score_binary(&self, features: &BinaryFeatures) -> Result<RawScore<SleepState>, ScoringError>;

    fn score_stage(&self, features: &StageFeatures) -> Result<RawScore<SleepStage>, ScoringError>;
}

// ---------------------------------------------------------------------------
// Heuristic back-end
// ---------------------------------------------------------------------------

/// Thresholds for the rule-of-thumb model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicScorer {
    /// Heart rate (bpm) above which the subject looks awake.
    pub resting_heart_rate: f64,
    /// Summed per-axis accel std-dev above which the subject is moving.
    pub movement_threshold: f64,
    /// HR std-dev over the long window above which REM is plausible.
    pub rem_hr_variability: f64,
    /// HR std-dev below which the subject is in deep sleep.
    pub deep_hr_variability: f64,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self {
            resting_heart_rate: 62.0,
            movement_threshold: 0.05,
            rem_hr_variability: 3.0,
            deep_hr_variability: 1.5,
        }
    }
}

impl Scorer for HeuristicScorer {
    fn score_binary(&self, f: &BinaryFeatures) -> Result<RawScore<SleepState>, ScoringError> {
        let movement = f.accx_variability + f.accy_variability + f.accz_variability;

        // Each term is roughly "how many thresholds above resting".
        let z = (f.heart_rate - self.resting_heart_rate) / 6.0
            + (movement - self.movement_threshold) / self.movement_threshold.max(f64::EPSILON);
        let p_awake = 1.0 / (1.0 + (-z).exp());

        log::debug!(
            "heuristic binary: hr = {:.1}, movement = {:.3}, p(awake) = {:.2}",
            f.heart_rate,
            movement,
            p_awake
        );
        RawScore::from_probabilities(vec![
            (SleepState::Asleep, 1.0 - p_awake),
            (SleepState::Awake, p_awake),
        ])
    }

    fn score_stage(&self, f: &StageFeatures) -> Result<RawScore<SleepStage>, ScoringError> {
        let rising = f.hr_moving_avg_30 > f.hr_moving_avg_90;

        // [awake, core, deep, rem, unspecified]
        let preds = if f.accel_variability_sum_90 > self.movement_threshold * 3.0 {
            [0.80, 0.10, 0.02, 0.05, 0.03] // awake
        } else if rising && f.hr_variability_90 >= self.rem_hr_variability {
            [0.05, 0.15, 0.02, 0.75, 0.03] // rem
        } else if !rising && f.hr_variability_90 < self.deep_hr_variability {
            [0.02, 0.20, 0.72, 0.03, 0.03] // deep
        } else {
            [0.05, 0.75, 0.10, 0.07, 0.03] // core
        };

        log::debug!(
            "heuristic stage: hr_var = {:.2}, accel_var = {:.3}, preds = {:?}",
            f.hr_variability_90,
            f.accel_variability_sum_90,
            preds
        );
        RawScore::from_probabilities(SleepStage::ALL.iter().copied().zip(preds).collect())
    }
}
