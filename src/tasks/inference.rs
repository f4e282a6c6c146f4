// SleepWatch Companion: Inference Task
//
// The single owner of the pipeline. Drains `PipelineMsg`s in order: every
// sample batch is a data tick (binary detector + gate), every timer message a
// gate re-check. Wake actions go to the actuator task; all other events are
// forwarded to an optional observer.
//
// Data ticks are stamped with the newest sample's timestamp, so a replayed
// night behaves exactly like the live one. In replay mode timer messages are
// dropped: wall-clock re-checks would interleave with sample time and move
// the gate out of step with the recording.

use std::sync::mpsc::{Receiver, Sender};

use chrono::FixedOffset;

use crate::dispatch::WakeActions;
use crate::events::{PipelineEvent, PipelineMsg};
use crate::pipeline::{Pipeline, TickReport};
use crate::settings::SettingsStore;

pub struct InferenceTask {
    pub pipeline: Pipeline,
    pub settings: SettingsStore,
    /// Offset used to reduce instants to the user's wall-clock time of day.
    pub utc_offset: FixedOffset,
    /// Sample timestamps are the only clock; `Timer` messages are ignored.
    pub replay: bool,
}

impl InferenceTask {
    pub fn new(pipeline: Pipeline, settings: SettingsStore, utc_offset: FixedOffset) -> Self {
        Self {
            pipeline,
            settings,
            utc_offset,
            replay: false,
        }
    }

    pub fn with_replay(mut self, replay: bool) -> Self {
        self.replay = replay;
        self
    }

    /// Run until `Shutdown` or until every sender is gone. Hands the pipeline
    /// back so the caller can export the result log.
    pub fn run(
        mut self,
        rx: Receiver<PipelineMsg>,
        actuator_tx: Sender<WakeActions>,
        observer_tx: Option<Sender<PipelineEvent>>,
    ) -> Pipeline {
        log::info!("Inference task started");

        loop {
            let msg = match rx.recv() {
                Ok(m) => m,
                Err(_) => {
                    log::warn!("Pipeline channel closed, exiting inference task");
                    break;
                }
            };

            let report = match msg {
                PipelineMsg::Samples(batch) => {
                    let Some(now) = batch.last().map(|s| s.timestamp) else {
                        continue;
                    };
                    self.pipeline.ingest(batch);
                    self.pipeline
                        .tick(now.with_timezone(&self.utc_offset), self.settings.current())
                }
                PipelineMsg::Timer(now) if self.replay => {
                    log::debug!("Replay: ignoring timer tick at {}", now);
                    continue;
                }
                PipelineMsg::Timer(now) => self
                    .pipeline
                    .check_gate(now.with_timezone(&self.utc_offset), self.settings.current()),
                PipelineMsg::Config(update) => {
                    match self.settings.apply(update) {
                        Ok(settings) => {
                            log::info!("Settings updated: {:?}", settings);
                            if let Err(e) = self.settings.save() {
                                log::warn!("Could not persist settings: {:#}", e);
                            }
                        }
                        Err(e) => log::warn!("{}, keeping previous settings", e),
                    }
                    continue;
                }
                PipelineMsg::Reset => {
                    self.pipeline.reset();
                    continue;
                }
                PipelineMsg::Shutdown => {
                    log::info!("Shutdown requested");
                    break;
                }
            };

            if !forward(report, &actuator_tx, observer_tx.as_ref()) {
                log::warn!("Actuator channel closed, exiting inference task");
                break;
            }
        }

        let health = self.pipeline.health();
        log::info!(
            "Inference task stopped: {} ticks, {} predictions, {} failures",
            health.ticks,
            health.predictions,
            health.total_failures
        );
        self.pipeline
    }
}

/// Returns `false` once the actuator side has hung up.
fn forward(
    report: TickReport,
    actuator_tx: &Sender<WakeActions>,
    observer_tx: Option<&Sender<PipelineEvent>>,
) -> bool {
    if let Some(observer) = observer_tx {
        for event in report.events {
            // Observers are optional; a dropped one is not an error.
            let _ = observer.send(event);
        }
    }
    match report.wake {
        Some(actions) => actuator_tx.send(actions).is_ok(),
        None => true,
    }
}
