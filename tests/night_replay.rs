// End-to-end run of the inference task over a short scripted night.

use std::sync::mpsc;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

use sleepwatch::config::{AlarmConfig, Settings, SAMPLE_INTERVAL_MS, WINDOW_LONG};
use sleepwatch::events::{ConfigUpdate, PipelineEvent, PipelineMsg, Sample, SleepStage, SleepState};
use sleepwatch::features::{BinaryFeatures, StageFeatures};
use sleepwatch::scorer::{RawScore, Scorer};
use sleepwatch::settings::SettingsStore;
use sleepwatch::tasks::inference::InferenceTask;
use sleepwatch::{GateState, Orchestrator, Pipeline, ScoringError};

/// Always asleep; REM whenever the latest heart rate is elevated.
struct Night;

impl Scorer for Night {
    fn score_binary(&self, _: &BinaryFeatures) -> Result<RawScore<SleepState>, ScoringError> {
        RawScore::from_probabilities(vec![(SleepState::Asleep, 0.95), (SleepState::Awake, 0.05)])
    }

    fn score_stage(&self, f: &StageFeatures) -> Result<RawScore<SleepStage>, ScoringError> {
        let stage = if f.heart_rate > 65.0 { SleepStage::Rem } else { SleepStage::Core };
        RawScore::from_probabilities(vec![(stage, 0.85)])
    }
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 2, h, m, 0).unwrap()
}

fn settings() -> Settings {
    Settings {
        alarm: AlarmConfig::new(NaiveTime::from_hms_opt(7, 0, 0).unwrap(), 30).unwrap(),
        ..Settings::default()
    }
}

#[test]
fn scripted_night_fires_one_wake_trigger() {
    let pipeline = Pipeline::new(Orchestrator::new(Arc::new(Night)));
    let store = SettingsStore::in_memory(settings()).unwrap();
    let task = InferenceTask::new(pipeline, store, FixedOffset::east_opt(0).unwrap());

    let (tx, rx) = mpsc::channel();
    let (actuator_tx, actuator_rx) = mpsc::channel();
    let (observer_tx, observer_rx) = mpsc::channel();

    let warmup: Vec<Sample> = (0..WINDOW_LONG)
        .map(|i| Sample::new(at(5, 55) + Duration::milliseconds(SAMPLE_INTERVAL_MS as i64 * i as i64), 55.0, [0.0, 0.0, 1.0]))
        .collect();
    tx.send(PipelineMsg::Samples(warmup)).unwrap();
    tx.send(PipelineMsg::Timer(at(6, 31))).unwrap();
    tx.send(PipelineMsg::Samples(vec![Sample::new(at(6, 40), 55.0, [0.0, 0.0, 1.0])])).unwrap();
    tx.send(PipelineMsg::Samples(vec![Sample::new(at(6, 45), 70.0, [0.0, 0.0, 1.0])])).unwrap();
    tx.send(PipelineMsg::Samples(vec![Sample::new(at(6, 46), 72.0, [0.0, 0.0, 1.0])])).unwrap();
    tx.send(PipelineMsg::Config(ConfigUpdate::Alarm(AlarmConfig {
        alarm_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        buffer_minutes: 2000,
    })))
    .unwrap();
    tx.send(PipelineMsg::Shutdown).unwrap();

    let pipeline = task.run(rx, actuator_tx, Some(observer_tx));

    let wakes: Vec<_> = actuator_rx.try_iter().collect();
    assert_eq!(wakes.len(), 1);
    assert_eq!(wakes[0].trigger.at, at(6, 45));
    assert_eq!(wakes[0].trigger.stage, SleepStage::Rem);

    let events: Vec<_> = observer_rx.try_iter().collect();
    let onsets: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StableSleepOnset(o) => Some(o),
            _ => None,
        })
        .collect();
    assert_eq!(onsets[0].onset, at(5, 55) + Duration::milliseconds(SAMPLE_INTERVAL_MS as i64 * (WINDOW_LONG as i64 - 1)));
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::GateChanged { from: GateState::Idle, to: GateState::Armed, .. }
    )));

    // Four binary predictions plus two stage predictions (06:40 core, 06:45 rem).
    assert_eq!(pipeline.results().len(), 6);
    assert_eq!(pipeline.gate_state(), GateState::Triggered);
}

#[test]
fn reset_message_rearms_for_the_next_cycle() {
    let pipeline = Pipeline::new(Orchestrator::new(Arc::new(Night)));
    let store = SettingsStore::in_memory(settings()).unwrap();
    let task = InferenceTask::new(pipeline, store, FixedOffset::east_opt(0).unwrap());

    let (tx, rx) = mpsc::channel();
    let (actuator_tx, actuator_rx) = mpsc::channel();

    let night: Vec<Sample> = (0..WINDOW_LONG)
        .map(|i| Sample::new(at(6, 35) + Duration::milliseconds(SAMPLE_INTERVAL_MS as i64 * i as i64), 70.0, [0.0, 0.0, 1.0]))
        .collect();
    tx.send(PipelineMsg::Samples(night)).unwrap();
    tx.send(PipelineMsg::Reset).unwrap();
    tx.send(PipelineMsg::Samples(vec![Sample::new(at(6, 50), 70.0, [0.0, 0.0, 1.0])])).unwrap();
    drop(tx);

    let pipeline = task.run(rx, actuator_tx, None);
    assert_eq!(actuator_rx.try_iter().count(), 2);
    assert_eq!(pipeline.gate_state(), GateState::Triggered);
}
