// SleepWatch Companion: Relay Task
//
// Stands in for the wearable transport. Reads newline-delimited JSON, one
// batch per line (an array of samples, or a single sample object), and pushes
// each decoded batch onto the pipeline channel. Malformed lines are skipped.

use std::io::BufRead;
use std::sync::mpsc::Sender;

use serde::Deserialize;

use crate::events::{PipelineMsg, Sample};

#[derive(Deserialize)]
#[serde(untagged)]
enum Batch {
    Many(Vec<Sample>),
    One(Sample),
}

impl From<Batch> for Vec<Sample> {
    fn from(batch: Batch) -> Self {
        match batch {
            Batch::Many(samples) => samples,
            Batch::One(sample) => vec![sample],
        }
    }
}

pub fn decode_line(line: &str) -> Result<Vec<Sample>, serde_json::Error> {
    serde_json::from_str::<Batch>(line).map(Vec::from)
}

/// Returns the number of samples relayed. Sends `Shutdown` at end of input
/// when `shutdown_at_eof` is set.
pub fn relay_task<R: BufRead>(
    input: R,
    pipeline_tx: Sender<PipelineMsg>,
    shutdown_at_eof: bool,
) -> usize {
    log::info!("Relay task started");

    let mut relayed = 0;
    for (lineno, line) in input.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::error!("Relay read error: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let batch = match decode_line(&line) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Skipping malformed batch on line {}: {}", lineno + 1, e);
                continue;
            }
        };
        relayed += batch.len();

        if pipeline_tx.send(PipelineMsg::Samples(batch)).is_err() {
            log::warn!("Pipeline channel closed, exiting relay task");
            return relayed;
        }
    }

    log::info!("Relay input exhausted after {} samples", relayed);
    if shutdown_at_eof {
        let _ = pipeline_tx.send(PipelineMsg::Shutdown);
    }
    relayed
}
