// SleepWatch Companion: Consecutive-State Tracker
//
// Debounces the binary detector. A single "asleep" between two "awake"
// outcomes means nothing; `depth` asleep outcomes in a row mean the subject
// fell asleep at the first of them.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::config::CONSECUTIVE_DEPTH;
use crate::events::{SleepState, StableSleepOnset};

#[derive(Debug, Clone, PartialEq)]
pub struct ConsecutiveTracker {
    depth: usize,
    recent: VecDeque<(SleepState, DateTime<Utc>)>,
}

impl ConsecutiveTracker {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            depth,
            recent: VecDeque::with_capacity(depth + 1),
        }
    }

    /// Push one outcome, evicting the oldest once more than `depth` are held.
    ///
    /// Returns the onset event whenever the full window reads asleep.
    pub fn observe(&mut self, state: SleepState, at: DateTime<Utc>) -> Option<StableSleepOnset> {
        self.recent.push_back((state, at));
        while self.recent.len() > self.depth {
            self.recent.pop_front();
        }

        if !self.is_stable_asleep() {
            return None;
        }
        let (_, onset) = *self.recent.front()?;
        Some(StableSleepOnset {
            onset,
            detected_at: at,
        })
    }

    pub fn is_stable_asleep(&self) -> bool {
        self.recent.len() == self.depth && self.recent.iter().all(|(s, _)| *s == SleepState::Asleep)
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }
}

impl Default for ConsecutiveTracker {
    fn default() -> Self {
        Self::new(CONSECUTIVE_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use crate::events::SleepState::{Asleep, Awake};

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap() + Duration::minutes(i)
    }

    #[test]
    fn test_onset_anchored_at_first_of_final_three() {
        let mut tracker = ConsecutiveTracker::new(3);
        let labels = [Asleep, Awake, Asleep, Asleep, Asleep];

        let events: Vec<_> = labels
            .iter()
            .enumerate()
            .filter_map(|(i, s)| tracker.observe(*s, t(i as i64)))
            .collect();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].onset, t(2));
        assert_eq!(events[0].detected_at, t(4));
    }

    #[test]
    fn test_not_full_never_fires() {
        let mut tracker = ConsecutiveTracker::new(3);
        assert!(tracker.observe(Asleep, t(0)).is_none());
        assert!(tracker.observe(Asleep, t(1)).is_none());
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_single_awake_breaks_the_run() {
        let mut tracker = ConsecutiveTracker::new(3);
        tracker.observe(Asleep, t(0));
        tracker.observe(Asleep, t(1));
        assert!(tracker.observe(Awake, t(2)).is_none());
        assert!(tracker.observe(Asleep, t(3)).is_none());
        assert!(tracker.observe(Asleep, t(4)).is_none());
        assert_eq!(tracker.observe(Asleep, t(5)).unwrap().onset, t(3));
    }

    #[test]
    fn test_fifo_is_bounded() {
        let mut tracker = ConsecutiveTracker::new(3);
        for i in 0..10 {
            tracker.observe(Awake, t(i));
        }
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_clear_forgets_history() {
        let mut tracker = ConsecutiveTracker::new(2);
        tracker.observe(Asleep, t(0));
        tracker.clear();
        assert!(tracker.is_empty());
        assert!(tracker.observe(Asleep, t(1)).is_none());
    }
}
