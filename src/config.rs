// SleepWatch Companion: Pipeline & Actuation Configuration
//
// Compile-time constants for the sampling cadence, window sizes and task
// layout, plus the two user-settable runtime configuration records
// (`AlarmConfig`, `ActuationPrefs`) that are read at tick time.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Sampling cadence
// ---------------------------------------------------------------------------
pub const SAMPLE_INTERVAL_MS: u64 = 2_000;            // one sample every 2 s
pub const WINDOW_LONG: usize = 90;                    // 3-minute window (W90)
pub const WINDOW_SHORT: usize = 30;                   // 1-minute window (W30)

// ---------------------------------------------------------------------------
// Feature extraction / smoothing
// ---------------------------------------------------------------------------
pub const INTERACTION_EPSILON: f64 = 1e-5;            // guards hr_var / accel_var
pub const CONSECUTIVE_DEPTH: usize = 3;               // labels needed for onset

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const GATE_CHECK_INTERVAL_MS: u64 = 60_000;       // re-check gate once a minute
pub const INFERENCE_TIMEOUT_MS: u64 = 500;            // scorer call budget
pub const DEGRADED_AFTER_FAILURES: u32 = 5;           // consecutive failed ticks

// ---------------------------------------------------------------------------
// Time of day
// ---------------------------------------------------------------------------
pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const DEFAULT_ALARM_HOUR: u32 = 7;
pub const DEFAULT_ALARM_MINUTE: u32 = 0;
pub const DEFAULT_BUFFER_MINUTES: u32 = 30;

// ---------------------------------------------------------------------------
// Actuator (wake light) command
// ---------------------------------------------------------------------------
pub const ACTUATOR_COMMAND_DURATION_MS: u32 = 30_000; // fade-in length
pub const ACTUATOR_MODE_WAKE: u8 = 0x02;              // "sunrise" mode on the lamp
pub const DEFAULT_COLOR: [u8; 3] = [255, 147, 41];    // warm white
pub const DEFAULT_BRIGHTNESS: f64 = 1.0;

pub const ALERT_TITLE: &str = "Good morning";
pub const ALERT_BODY: &str = "You're in light REM sleep, a good moment to get up.";

// ---------------------------------------------------------------------------
// Task stack sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_RELAY: usize = 64 * 1024;
pub const STACK_CORE: usize = 256 * 1024;
pub const STACK_TIMER: usize = 32 * 1024;
pub const STACK_ACTUATOR: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Alarm time plus the trailing window, in minutes, during which the stage
/// detector is allowed to run. Compared by time of day only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(with = "hour_minute")]
    pub alarm_time: NaiveTime,
    pub buffer_minutes: u32,
}

impl AlarmConfig {
    pub fn new(alarm_time: NaiveTime, buffer_minutes: u32) -> Result<Self, PipelineError> {
        let config = Self {
            alarm_time,
            buffer_minutes,
        };
        config.validate()?;
        Ok(config)
    }

    /// A window covering a full day or more has no meaningful start.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.buffer_minutes >= MINUTES_PER_DAY {
            return Err(PipelineError::InvalidConfig(format!(
                "buffer_minutes must be below {MINUTES_PER_DAY}, got {}",
                self.buffer_minutes
            )));
        }
        Ok(())
    }

    /// Alarm reduced to minute-of-day (seconds discarded).
    pub fn alarm_minute(&self) -> u32 {
        minute_of_day(self.alarm_time)
    }

    /// Start of the gating window as minute-of-day, wrapped past midnight.
    pub fn window_start_minute(&self) -> u32 {
        (self.alarm_minute() + MINUTES_PER_DAY - self.buffer_minutes % MINUTES_PER_DAY)
            % MINUTES_PER_DAY
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            alarm_time: NaiveTime::from_hms_opt(DEFAULT_ALARM_HOUR, DEFAULT_ALARM_MINUTE, 0)
                .unwrap_or_default(),
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
        }
    }
}

/// Wake-light preferences: base colour and a brightness scalar in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuationPrefs {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub brightness: f64,
}

impl ActuationPrefs {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(0.0..=1.0).contains(&self.brightness) {
            return Err(PipelineError::InvalidConfig(format!(
                "brightness must be within [0, 1], got {}",
                self.brightness
            )));
        }
        Ok(())
    }
}

impl Default for ActuationPrefs {
    fn default() -> Self {
        Self {
            red: DEFAULT_COLOR[0],
            green: DEFAULT_COLOR[1],
            blue: DEFAULT_COLOR[2],
            brightness: DEFAULT_BRIGHTNESS,
        }
    }
}

/// Everything the core reads from the settings store at tick time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub actuation: ActuationPrefs,
}

impl Settings {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.alarm.validate()?;
        self.actuation.validate()
    }
}

pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// `"HH:MM"` (de)serialisation for alarm times.
mod hour_minute {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
