// SleepWatch Companion: Inference Pipeline
//
// Owns every piece of mutable core state (sample buffer, onset tracker, gate,
// result log, health) and advances it one tick at a time:
//
//   buffer ─▶ features ─▶ orchestrator ─▶ { tracker, gate } ─▶ dispatcher
//
// Each inference step computes its outcome first and commits afterwards, so
// a failed or timed-out scorer call leaves the tracker and gate untouched.

use chrono::{DateTime, TimeZone, Utc};

use crate::buffer::SampleBuffer;
use crate::config::{Settings, CONSECUTIVE_DEPTH, DEGRADED_AFTER_FAILURES, WINDOW_LONG, WINDOW_SHORT};
use crate::dispatch::{on_wake_trigger, WakeActions};
use crate::error::PipelineError;
use crate::events::{PipelineEvent, PredictedLabel, PredictionResult, Sample, WakeTrigger};
use crate::features::{build_binary_features, build_stage_features};
use crate::gate::{GateState, TemporalGate};
use crate::orchestrator::Orchestrator;
use crate::tracker::ConsecutiveTracker;

/// Observable health signal for the surrounding application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Health {
    pub ticks: u64,
    pub predictions: u64,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub clock_anomalies: u64,
    pub last_error: Option<PipelineError>,
}

/// Everything one tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub events: Vec<PipelineEvent>,
    pub wake: Option<WakeActions>,
    /// Recoverable errors hit during the tick, `InsufficientData` included.
    pub errors: Vec<PipelineError>,
}

impl TickReport {
    pub fn predictions(&self) -> impl Iterator<Item = &PredictionResult> {
        self.events.iter().filter_map(|e| match e {
            PipelineEvent::Prediction(p) => Some(p),
            _ => None,
        })
    }

    fn absorb(&mut self, step: Result<StepOutput, PipelineError>) {
        match step {
            Ok(out) => {
                self.events.extend(out.events);
                if out.wake.is_some() {
                    self.wake = out.wake;
                }
            }
            Err(err) => self.errors.push(err),
        }
    }
}

#[derive(Debug, Default)]
struct StepOutput {
    events: Vec<PipelineEvent>,
    wake: Option<WakeActions>,
}

pub struct Pipeline {
    buffer: SampleBuffer,
    orchestrator: Orchestrator,
    tracker: ConsecutiveTracker,
    gate: TemporalGate,
    results: Vec<PredictionResult>,
    health: Health,
    degraded_after: u32,
}

impl Pipeline {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            buffer: SampleBuffer::new(),
            orchestrator,
            tracker: ConsecutiveTracker::new(CONSECUTIVE_DEPTH),
            gate: TemporalGate::new(),
            results: Vec::new(),
            health: Health::default(),
            degraded_after: DEGRADED_AFTER_FAILURES,
        }
    }

    pub fn with_tracker_depth(mut self, depth: usize) -> Self {
        self.tracker = ConsecutiveTracker::new(depth);
        self
    }

    pub fn with_degraded_after(mut self, failures: u32) -> Self {
        self.degraded_after = failures.max(1);
        self
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Append a decoded batch in arrival order. Returns how many samples
    /// arrived with a timestamp older than their predecessor.
    pub fn ingest<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut anomalies = 0;
        for sample in batch {
            if let Err(err) = self.buffer.append(sample) {
                log::warn!("{}", err);
                anomalies += 1;
                self.health.last_error = Some(err);
            }
        }
        self.health.clock_anomalies += anomalies as u64;
        anomalies
    }

    // -----------------------------------------------------------------------
    // Ticks
    // -----------------------------------------------------------------------

    /// Data tick: binary detector, then the gate with stage inference.
    /// Settings that fail validation skip the gate step and leave it as it
    /// was; the binary detector still runs.
    pub fn tick<Tz: TimeZone>(&mut self, now: DateTime<Tz>, settings: &Settings) -> TickReport {
        let mut report = TickReport::default();
        let binary = self.run_binary(now.with_timezone(&Utc));
        self.record(&binary);
        report.absorb(binary);

        let gate = self.run_gate(now, settings, true);
        self.record(&gate);
        report.absorb(gate);

        self.health.ticks += 1;
        report
    }

    /// Timer tick: window re-check only, no inference.
    pub fn check_gate<Tz: TimeZone>(&mut self, now: DateTime<Tz>, settings: &Settings) -> TickReport {
        let mut report = TickReport::default();
        let gate = self.run_gate(now, settings, false);
        self.record(&gate);
        report.absorb(gate);
        report
    }

    fn run_binary(&mut self, now: DateTime<Utc>) -> Result<StepOutput, PipelineError> {
        let window = self.buffer.require_window(WINDOW_LONG)?;
        let features = build_binary_features(&window).ok_or(PipelineError::InsufficientData {
            needed: WINDOW_LONG,
            available: window.len(),
        })?;
        let result = self.orchestrator.predict_binary(&features, now)?;

        // Commit.
        let mut out = StepOutput::default();
        if let PredictedLabel::Sleep(state) = result.label {
            if let Some(onset) = self.tracker.observe(state, result.timestamp) {
                log::info!("Stable sleep onset at {} (detected {})", onset.onset, onset.detected_at);
                out.events.push(PipelineEvent::StableSleepOnset(onset));
            }
        }
        self.results.push(result.clone());
        out.events.insert(0, PipelineEvent::Prediction(result));
        Ok(out)
    }

    fn run_gate<Tz: TimeZone>(
        &mut self,
        now: DateTime<Tz>,
        settings: &Settings,
        infer: bool,
    ) -> Result<StepOutput, PipelineError> {
        settings.validate()?;
        let now_utc = now.with_timezone(&Utc);
        let next = self.gate.advance(now.time(), &settings.alarm);

        let stage = if infer && next == GateState::Armed {
            self.stage_prediction(now_utc)?
        } else {
            None
        };

        // Commit.
        let observed = stage.as_ref().and_then(|r| match r.label {
            PredictedLabel::Stage(s) => Some(s),
            PredictedLabel::Sleep(_) => None,
        });
        let confidence = stage.as_ref().map(|r| r.confidence()).unwrap_or(0.0);
        let step = self.gate.commit(next, observed);

        let mut out = StepOutput::default();
        if let Some(result) = stage {
            self.results.push(result.clone());
            out.events.push(PipelineEvent::Prediction(result));
        }
        if step.changed() {
            log::info!("Gate {} -> {}", step.from, step.to);
            out.events.push(PipelineEvent::GateChanged {
                from: step.from,
                to: step.to,
                at: now_utc,
            });
        }
        if step.triggered {
            let trigger = WakeTrigger {
                at: now_utc,
                stage: crate::gate::WAKE_TRIGGER_STAGE,
                confidence,
            };
            log::info!("Wake trigger at {} ({:.1}%)", trigger.at, trigger.confidence * 100.0);
            out.events.push(PipelineEvent::WakeTrigger(trigger));
            out.wake = Some(on_wake_trigger(&trigger, &settings.actuation));
        }
        Ok(out)
    }

    /// `Ok(None)` while the windows are still filling: the gate may arm
    /// before there is anything to classify.
    fn stage_prediction(&mut self, now: DateTime<Utc>) -> Result<Option<PredictionResult>, PipelineError> {
        let (Some(w90), Some(w30)) = (self.buffer.window(WINDOW_LONG), self.buffer.window(WINDOW_SHORT))
        else {
            return Ok(None);
        };
        match build_stage_features(&w90, &w30) {
            Some(features) => self.orchestrator.predict_stage(&features, now).map(Some),
            None => Ok(None),
        }
    }

    fn record(&mut self, step: &Result<StepOutput, PipelineError>) {
        match step {
            Ok(out) => {
                let produced = out
                    .events
                    .iter()
                    .filter(|e| matches!(e, PipelineEvent::Prediction(_)))
                    .count();
                if produced > 0 {
                    self.health.predictions += produced as u64;
                    self.health.consecutive_failures = 0;
                }
            }
            Err(PipelineError::InsufficientData { .. }) => {}
            Err(err @ PipelineError::InvalidConfig(_)) => {
                log::warn!("Gate step skipped: {}", err);
                self.health.last_error = Some(err.clone());
            }
            Err(err) => {
                log::warn!("Tick skipped: {}", err);
                self.health.consecutive_failures += 1;
                self.health.total_failures += 1;
                self.health.last_error = Some(err.clone());
                if self.health.consecutive_failures == self.degraded_after {
                    log::error!(
                        "{} consecutive inference failures; predictions have stopped",
                        self.degraded_after
                    );
                }
            }
        }
    }

    /// New sleep cycle: clear the latch and the onset history. Buffered
    /// samples and the result log are kept.
    pub fn reset(&mut self) {
        log::info!("Pipeline reset (gate was {})", self.gate.state());
        self.gate.reset();
        self.tracker.clear();
    }

    // -----------------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------------

    pub fn results(&self) -> &[PredictionResult] {
        &self.results
    }

    pub fn gate(&self) -> &TemporalGate {
        &self.gate
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn tracker(&self) -> &ConsecutiveTracker {
        &self.tracker
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn is_degraded(&self) -> bool {
        self.health.consecutive_failures >= self.degraded_after
    }
}
