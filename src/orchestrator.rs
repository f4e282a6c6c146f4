// SleepWatch Companion: Classifier Orchestrator
//
// Runs a detector against its feature vector and wraps the raw score into a
// timestamped `PredictionResult`. With a timeout configured, every scorer call
// goes to one long-lived "scorer" worker over a job channel and the tick waits
// at most that long. While a timed-out job is still running, later calls fail
// at once instead of queueing behind it; its late answer is discarded.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{PipelineError, ScoringError};
use crate::events::{Classifier, PredictedLabel, PredictionResult, SleepState, SleepStage};
use crate::features::{BinaryFeatures, StageFeatures};
use crate::scorer::{RawScore, Scorer};

enum Job {
    Binary(BinaryFeatures),
    Stage(StageFeatures),
}

enum Answer {
    Binary(Result<RawScore<SleepState>, ScoringError>),
    Stage(Result<RawScore<SleepStage>, ScoringError>),
}

/// Handle to the scorer thread. Dropping it closes the job channel, and the
/// thread exits once its current job returns.
struct Worker {
    jobs: Sender<Job>,
    answers: Receiver<Answer>,
    /// A job timed out and its answer has not been drained yet.
    pending: bool,
}

impl Worker {
    fn spawn(scorer: Arc<dyn Scorer>) -> Result<Self, ScoringError> {
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (answers_tx, answers_rx) = mpsc::channel();
        thread::Builder::new()
            .name("scorer".into())
            .spawn(move || {
                for job in jobs_rx.iter() {
                    let answer = match job {
                        Job::Binary(features) => Answer::Binary(scorer.score_binary(&features)),
                        Job::Stage(features) => Answer::Stage(scorer.score_stage(&features)),
                    };
                    if answers_tx.send(answer).is_err() {
                        break;
                    }
                }
                log::debug!("Scorer worker exiting");
            })
            .map_err(|e| ScoringError::Model(format!("could not spawn scorer worker: {e}")))?;
        log::info!("Scorer worker started");
        Ok(Self {
            jobs: jobs_tx,
            answers: answers_rx,
            pending: false,
        })
    }

    /// `Ok(true)` once the worker is free for a new job.
    fn drain(&mut self) -> Result<bool, ScoringError> {
        if !self.pending {
            return Ok(true);
        }
        match self.answers.try_recv() {
            Ok(_) => {
                log::debug!("Discarding late scorer answer");
                self.pending = false;
                Ok(true)
            }
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(ScoringError::Disconnected),
        }
    }

    fn run(&mut self, job: Job, timeout: Duration) -> Result<Answer, ScoringError> {
        if !self.drain()? {
            return Err(ScoringError::Timeout(timeout));
        }
        self.jobs.send(job).map_err(|_| ScoringError::Disconnected)?;
        match self.answers.recv_timeout(timeout) {
            Ok(answer) => Ok(answer),
            Err(RecvTimeoutError::Timeout) => {
                self.pending = true;
                Err(ScoringError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ScoringError::Disconnected),
        }
    }
}

pub struct Orchestrator {
    scorer: Arc<dyn Scorer>,
    timeout: Option<Duration>,
    worker: Option<Worker>,
}

impl Orchestrator {
    /// Calls the scorer inline on the caller's thread.
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        Self {
            scorer,
            timeout: None,
            worker: None,
        }
    }

    /// Bound every scorer call to `timeout`. The worker thread starts on the
    /// first call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn predict_binary(
        &mut self,
        features: &BinaryFeatures,
        now: DateTime<Utc>,
    ) -> Result<PredictionResult, PipelineError> {
        let raw = match self.call(Job::Binary(*features))? {
            Answer::Binary(raw) => raw?,
            Answer::Stage(_) => return Err(mismatched().into()),
        };
        let result = wrap(raw, now, Classifier::Binary, PredictedLabel::Sleep, SleepState::name);
        log::debug!("binary: {} ({:.1}%)", result.label, result.confidence() * 100.0);
        Ok(result)
    }

    pub fn predict_stage(
        &mut self,
        features: &StageFeatures,
        now: DateTime<Utc>,
    ) -> Result<PredictionResult, PipelineError> {
        let raw = match self.call(Job::Stage(*features))? {
            Answer::Stage(raw) => raw?,
            Answer::Binary(_) => return Err(mismatched().into()),
        };
        let result = wrap(raw, now, Classifier::Stage, PredictedLabel::Stage, SleepStage::name);
        log::debug!("stage: {} ({:.1}%)", result.label, result.confidence() * 100.0);
        Ok(result)
    }

    fn call(&mut self, job: Job) -> Result<Answer, ScoringError> {
        let Some(timeout) = self.timeout else {
            return Ok(match job {
                Job::Binary(features) => Answer::Binary(self.scorer.score_binary(&features)),
                Job::Stage(features) => Answer::Stage(self.scorer.score_stage(&features)),
            });
        };

        if self.worker.is_none() {
            self.worker = Some(Worker::spawn(Arc::clone(&self.scorer))?);
        }
        let answer = match self.worker.as_mut() {
            Some(worker) => worker.run(job, timeout),
            None => Err(ScoringError::Disconnected),
        };
        if matches!(answer, Err(ScoringError::Disconnected)) {
            // Scorer panicked; the next call starts a fresh worker.
            log::error!("Scorer worker died");
            self.worker = None;
        }
        answer
    }
}

fn mismatched() -> ScoringError {
    ScoringError::Model("scorer answered a different detector".into())
}

fn wrap<L: Copy>(
    raw: RawScore<L>,
    now: DateTime<Utc>,
    classifier: Classifier,
    to_label: fn(L) -> PredictedLabel,
    name: fn(&L) -> &'static str,
) -> PredictionResult {
    PredictionResult {
        timestamp: now,
        classifier,
        label: to_label(raw.label),
        probabilities: raw
            .probabilities
            .iter()
            .map(|(label, p)| (name(label).to_string(), *p))
            .collect(),
    }
}
