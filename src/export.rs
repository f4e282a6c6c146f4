// SleepWatch Companion: Prediction Log Export
//
// Flattens the result log for the upload collaborator: CSV with one row per
// prediction, or the full records as JSON lines.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events::{Classifier, PredictionResult};

/// One CSV row; the header comes from the field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    pub timestamp: DateTime<Utc>,
    pub classifier: Classifier,
    pub label: &'static str,
    pub confidence: f64,
}

impl From<&PredictionResult> for PredictionRow {
    fn from(result: &PredictionResult) -> Self {
        Self {
            timestamp: result.timestamp,
            classifier: result.classifier,
            label: result.label.name(),
            confidence: result.confidence(),
        }
    }
}

pub fn write_csv<W: Write>(out: W, results: &[PredictionResult]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for result in results {
        writer.serialize(PredictionRow::from(result))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json_lines<W: Write>(mut out: W, results: &[PredictionResult]) -> anyhow::Result<()> {
    for result in results {
        serde_json::to_writer(&mut out, result)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
