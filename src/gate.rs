// SleepWatch Companion: Temporal Gate & Alarm Latch
//
// Three-state machine deciding when the stage detector may run:
//
//   Idle ──(inside window)──▶ Armed ──(wake stage seen)──▶ Triggered
//    ▲                          │                              │
//    └──(outside window)────────┘                     reset() only
//
// The window is [alarm - buffer, alarm] compared by minute-of-day with
// modular arithmetic, so a window such as [23:45, 00:15] works the same as
// one inside a single day.
//
// A tick is two steps so callers can keep it atomic: `advance` computes the
// window-driven state without mutating anything, the caller runs inference
// if the result is `Armed`, and `commit` applies the outcome. A failed
// inference simply never reaches `commit`.

use std::fmt;

use chrono::NaiveTime;
use serde::Serialize;

use crate::config::{minute_of_day, AlarmConfig, MINUTES_PER_DAY};
use crate::events::SleepStage;

/// Stage that fires the alarm.
pub const WAKE_TRIGGER_STAGE: SleepStage = SleepStage::Rem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum GateState {
    /// Outside the window; no stage inference.
    #[default]
    Idle,
    /// Inside the window; stage inference runs whenever data allows.
    Armed,
    /// Wake stage observed; latched until `reset`.
    Triggered,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Triggered => "triggered",
        };
        f.write_str(name)
    }
}

/// Result of committing one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateStep {
    pub from: GateState,
    pub to: GateState,
    /// True only on the tick that latched into `Triggered`.
    pub triggered: bool,
}

impl GateStep {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Whether `now` falls inside `[alarm - buffer, alarm]`, wrapping past midnight.
pub fn in_window(config: &AlarmConfig, now: NaiveTime) -> bool {
    let start = config.window_start_minute();
    let elapsed = (minute_of_day(now) + MINUTES_PER_DAY - start) % MINUTES_PER_DAY;
    elapsed <= config.buffer_minutes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemporalGate {
    state: GateState,
}

impl TemporalGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// State the window alone would put the gate in at `now`.
    pub fn advance(&self, now: NaiveTime, config: &AlarmConfig) -> GateState {
        match self.state {
            GateState::Triggered => GateState::Triggered,
            GateState::Idle | GateState::Armed => {
                if in_window(config, now) {
                    GateState::Armed
                } else {
                    GateState::Idle
                }
            }
        }
    }

    /// Apply `next` (from [`advance`](Self::advance)) and, when armed, the
    /// stage observed this tick.
    pub fn commit(&mut self, next: GateState, observed: Option<SleepStage>) -> GateStep {
        let from = self.state;
        let latch = next == GateState::Armed && observed == Some(WAKE_TRIGGER_STAGE);
        let to = if latch { GateState::Triggered } else { next };
        self.state = to;
        GateStep {
            from,
            to,
            triggered: latch,
        }
    }

    /// `advance` and `commit` in one go.
    pub fn step(
        &mut self,
        now: NaiveTime,
        config: &AlarmConfig,
        observed: Option<SleepStage>,
    ) -> GateStep {
        let next = self.advance(now, config);
        self.commit(next, observed)
    }

    /// Clear the latch for a new sleep cycle.
    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn alarm(h: u32, m: u32, buffer: u32) -> AlarmConfig {
        AlarmConfig::new(hm(h, m), buffer).unwrap()
    }

    #[test]
    fn test_window_edges_same_day() {
        let cfg = alarm(7, 0, 30);
        let mut gate = TemporalGate::new();

        assert_eq!(gate.step(hm(6, 29), &cfg, None).to, GateState::Idle);
        assert_eq!(gate.step(hm(6, 30), &cfg, None).to, GateState::Armed);
        assert_eq!(gate.step(hm(7, 0), &cfg, Some(SleepStage::Core)).to, GateState::Armed);
        assert_eq!(gate.step(hm(7, 1), &cfg, None).to, GateState::Idle);
    }

    #[test]
    fn test_seconds_are_ignored() {
        let cfg = alarm(7, 0, 30);
        let late = NaiveTime::from_hms_opt(7, 0, 59).unwrap();
        assert!(in_window(&cfg, late));
        let early = NaiveTime::from_hms_opt(6, 29, 59).unwrap();
        assert!(!in_window(&cfg, early));
    }

    #[test]
    fn test_rem_latches_until_reset() {
        let cfg = alarm(7, 0, 30);
        let mut gate = TemporalGate::new();
        gate.step(hm(6, 40), &cfg, None);

        let step = gate.step(hm(6, 45), &cfg, Some(SleepStage::Rem));
        assert!(step.triggered);
        assert_eq!(step.to, GateState::Triggered);

        // Still inside the window, and again outside: the latch holds.
        let again = gate.step(hm(6, 50), &cfg, Some(SleepStage::Rem));
        assert!(!again.triggered);
        assert_eq!(again.to, GateState::Triggered);
        assert_eq!(gate.step(hm(12, 0), &cfg, None).to, GateState::Triggered);

        gate.reset();
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(gate.step(hm(6, 50), &cfg, None).to, GateState::Armed);
    }

    #[test]
    fn test_rem_outside_window_does_not_trigger() {
        let cfg = alarm(7, 0, 30);
        let mut gate = TemporalGate::new();
        let step = gate.step(hm(3, 0), &cfg, Some(SleepStage::Rem));
        assert!(!step.triggered);
        assert_eq!(step.to, GateState::Idle);
    }

    #[test]
    fn test_window_wraps_past_midnight() {
        let cfg = alarm(0, 15, 30);
        assert!(in_window(&cfg, hm(23, 45)));
        assert!(in_window(&cfg, hm(23, 50)));
        assert!(in_window(&cfg, hm(0, 0)));
        assert!(in_window(&cfg, hm(0, 10)));
        assert!(in_window(&cfg, hm(0, 15)));
        assert!(!in_window(&cfg, hm(23, 44)));
        assert!(!in_window(&cfg, hm(0, 16)));
        assert!(!in_window(&cfg, hm(12, 0)));

        let mut gate = TemporalGate::new();
        assert_eq!(gate.step(hm(23, 50), &cfg, None).to, GateState::Armed);
        assert_eq!(gate.step(hm(0, 10), &cfg, None).to, GateState::Armed);
        assert_eq!(gate.step(hm(12, 0), &cfg, None).to, GateState::Idle);
    }

    #[test]
    fn test_zero_buffer_is_the_alarm_minute() {
        let cfg = alarm(6, 0, 0);
        assert!(in_window(&cfg, hm(6, 0)));
        assert!(!in_window(&cfg, hm(5, 59)));
        assert!(!in_window(&cfg, hm(6, 1)));
    }

    #[test]
    fn test_advance_does_not_mutate() {
        let cfg = alarm(7, 0, 30);
        let gate = TemporalGate::new();
        assert_eq!(gate.advance(hm(6, 45), &cfg), GateState::Armed);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn test_transition_reported() {
        let cfg = alarm(7, 0, 30);
        let mut gate = TemporalGate::new();
        let step = gate.step(hm(6, 45), &cfg, None);
        assert!(step.changed());
        assert_eq!((step.from, step.to), (GateState::Idle, GateState::Armed));
        assert!(!gate.step(hm(6, 46), &cfg, None).changed());
    }
}
