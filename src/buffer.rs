// SleepWatch Companion: Sample Buffer
//
// Arrival-ordered store of every sample received during the run. Windows are
// borrowed views over the most recent samples; nothing is copied until a
// statistic asks for one channel as a `Vec<f64>`.

use crate::error::PipelineError;
use crate::events::Sample;

#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one sample. Out-of-order timestamps are kept but reported.
    pub fn append(&mut self, sample: Sample) -> Result<(), PipelineError> {
        let anomaly = match self.samples.last() {
            Some(prev) if sample.timestamp < prev.timestamp => Some(PipelineError::ClockAnomaly {
                previous: prev.timestamp,
                current: sample.timestamp,
            }),
            _ => None,
        };
        self.samples.push(sample);
        match anomaly {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The most recent `size` samples, or `None` while fewer are buffered.
    pub fn window(&self, size: usize) -> Option<Window<'_>> {
        if size == 0 || self.samples.len() < size {
            return None;
        }
        let start = self.samples.len() - size;
        Some(Window {
            samples: &self.samples[start..],
        })
    }

    /// Like [`window`](Self::window) but reports how far off a full window is.
    pub fn require_window(&self, size: usize) -> Result<Window<'_>, PipelineError> {
        self.window(size).ok_or(PipelineError::InsufficientData {
            needed: size,
            available: self.samples.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }
}

/// Contiguous trailing slice of samples.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    samples: &'a [Sample],
}

impl<'a> Window<'a> {
    pub fn from_slice(samples: &'a [Sample]) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &'a [Sample] {
        self.samples
    }

    pub fn last(&self) -> Option<&'a Sample> {
        self.samples.last()
    }

    pub fn heart_rates(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.heart_rate).collect()
    }

    pub fn accel_x(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.accel_x).collect()
    }

    pub fn accel_y(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.accel_y).collect()
    }

    pub fn accel_z(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.accel_z).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample_at(secs: i64, hr: f64) -> Sample {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 23, 0, 0).unwrap();
        Sample::new(t0 + Duration::seconds(secs), hr, [0.0, 0.0, 1.0])
    }

    #[test]
    fn test_window_none_until_full() {
        let mut buffer = SampleBuffer::new();
        for i in 0..29 {
            buffer.append(sample_at(i * 2, 60.0)).unwrap();
        }
        assert!(buffer.window(30).is_none());

        buffer.append(sample_at(58, 61.0)).unwrap();
        let window = buffer.window(30).unwrap();
        assert_eq!(window.len(), 30);
        assert_eq!(window.last().unwrap().heart_rate, 61.0);
    }

    #[test]
    fn test_window_is_most_recent_slice() {
        let mut buffer = SampleBuffer::new();
        for i in 0..10 {
            buffer.append(sample_at(i, i as f64)).unwrap();
        }
        let window = buffer.window(3).unwrap();
        assert_eq!(window.heart_rates(), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_zero_size_window_is_none() {
        let mut buffer = SampleBuffer::new();
        buffer.append(sample_at(0, 60.0)).unwrap();
        assert!(buffer.window(0).is_none());
    }

    #[test]
    fn test_require_window_reports_shortfall() {
        let mut buffer = SampleBuffer::new();
        buffer.append(sample_at(0, 60.0)).unwrap();
        let err = buffer.require_window(90).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InsufficientData {
                needed: 90,
                available: 1
            }
        );
    }

    #[test]
    fn test_out_of_order_sample_is_kept_and_reported() {
        let mut buffer = SampleBuffer::new();
        buffer.append(sample_at(10, 60.0)).unwrap();
        let err = buffer.append(sample_at(4, 62.0)).unwrap_err();
        assert!(matches!(err, PipelineError::ClockAnomaly { .. }));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.latest().unwrap().heart_rate, 62.0);
    }
}
