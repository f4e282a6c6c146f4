// SleepWatch Companion: Entry Point
//
// Start-up sequence:
//   1. Parse arguments and initialise logging.
//   2. Load persisted settings (alarm window + wake-light preferences).
//   3. Build the pipeline around the heuristic scorer.
//   4. Spawn relay, inference, timer and actuator tasks.
//   5. When the relay input ends, shut the pipeline down and export the
//      prediction log if requested.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::{FixedOffset, Local};
use clap::Parser;

use sleepwatch::config::*;
use sleepwatch::events::PredictionResult;
use sleepwatch::export;
use sleepwatch::settings::SettingsStore;
use sleepwatch::tasks::{actuator, inference::InferenceTask, relay, timer};
use sleepwatch::{HeuristicScorer, Orchestrator, Pipeline};

/// Sleep monitoring and smart-alarm pipeline for relayed watch samples.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (JSON); created on the first accepted update
    #[arg(long, env = "SLEEPWATCH_SETTINGS", default_value = "sleepwatch.json")]
    settings: PathBuf,

    /// Newline-delimited JSON sample batches; reads stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write the prediction log here at shutdown (.csv for CSV, JSON lines otherwise)
    #[arg(long)]
    export: Option<PathBuf>,

    /// Gate re-check cadence in seconds (live input only)
    #[arg(long, default_value_t = GATE_CHECK_INTERVAL_MS / 1000)]
    timer_secs: u64,

    /// Classifier call budget in milliseconds (0 disables the worker thread)
    #[arg(long, default_value_t = INFERENCE_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Consecutive "asleep" outcomes required for sleep onset
    #[arg(long, default_value_t = CONSECUTIVE_DEPTH)]
    tracker_depth: usize,

    /// Wall-clock offset from UTC in minutes; defaults to the system zone
    #[arg(long, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    log::info!("SleepWatch companion starting…");

    // ---- Settings ---------------------------------------------------------
    let settings = SettingsStore::load(&args.settings)?;
    let alarm = settings.current().alarm;
    log::info!(
        "Alarm {} with a {}-minute window",
        alarm.alarm_time.format("%H:%M"),
        alarm.buffer_minutes
    );

    let utc_offset = match args.utc_offset_minutes {
        Some(minutes) => FixedOffset::east_opt(minutes * 60)
            .ok_or_else(|| anyhow!("UTC offset out of range: {minutes} minutes"))?,
        None => *Local::now().offset(),
    };

    // ---- Pipeline ---------------------------------------------------------
    let mut orchestrator = Orchestrator::new(Arc::new(HeuristicScorer::default()));
    if args.timeout_ms > 0 {
        orchestrator = orchestrator.with_timeout(Duration::from_millis(args.timeout_ms));
    }
    let pipeline = Pipeline::new(orchestrator).with_tracker_depth(args.tracker_depth);

    // ---- Channels ---------------------------------------------------------
    let (pipeline_tx, pipeline_rx) = mpsc::channel();
    let (actuator_tx, actuator_rx) = mpsc::channel();

    // ---- Spawn tasks ------------------------------------------------------
    let relay_tx = pipeline_tx.clone();
    let input = args.input.clone();
    let relay_handle = thread::Builder::new()
        .name("relay".into())
        .stack_size(STACK_RELAY)
        .spawn(move || -> anyhow::Result<usize> {
            Ok(match input {
                Some(path) => {
                    let file = File::open(&path)
                        .with_context(|| format!("opening {}", path.display()))?;
                    relay::relay_task(BufReader::new(file), relay_tx, true)
                }
                None => relay::relay_task(io::stdin().lock(), relay_tx, true),
            })
        })?;

    // A replayed file carries its own clock; the timer only runs live.
    let replay = args.input.is_some();
    let task = InferenceTask::new(pipeline, settings, utc_offset).with_replay(replay);
    let core_handle = thread::Builder::new()
        .name("inference".into())
        .stack_size(STACK_CORE)
        .spawn(move || task.run(pipeline_rx, actuator_tx, None))?;

    if replay {
        drop(pipeline_tx);
    } else {
        let timer_interval = Duration::from_secs(args.timer_secs.max(1));
        thread::Builder::new()
            .name("timer".into())
            .stack_size(STACK_TIMER)
            .spawn(move || timer::timer_task(pipeline_tx, timer_interval))?;
    }

    let actuator_handle = thread::Builder::new()
        .name("actuator".into())
        .stack_size(STACK_ACTUATOR)
        .spawn(move || actuator::actuator_task(actuator_rx, actuator::LogSink))?;

    // ---- Wait for the night to end ---------------------------------------
    let relayed = relay_handle
        .join()
        .map_err(|_| anyhow!("relay task panicked"))??;
    let pipeline = core_handle
        .join()
        .map_err(|_| anyhow!("inference task panicked"))?;
    let wakes = actuator_handle
        .join()
        .map_err(|_| anyhow!("actuator task panicked"))?;

    log::info!(
        "Relayed {} samples, {} predictions, {} wake triggers, final gate {}",
        relayed,
        pipeline.results().len(),
        wakes,
        pipeline.gate_state()
    );
    if pipeline.is_degraded() {
        log::error!("Pipeline ended degraded: {:?}", pipeline.health().last_error);
    }

    if let Some(path) = &args.export {
        export(path, pipeline.results())?;
        log::info!("Prediction log written to {}", path.display());
    }
    Ok(())
}

/// CSV when the path ends in `.csv`, JSON lines otherwise.
fn export(path: &Path, results: &[PredictionResult]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let out = BufWriter::new(file);
    if path.extension().is_some_and(|ext| ext == "csv") {
        export::write_csv(out, results)
    } else {
        export::write_json_lines(out, results)
    }
}
