//! Fixed-interval polling clock using an accumulator pattern.
//!
//! `draw_web()` calls at ~60fps with variable delta. PollClock folds those
//! frames into one "poll now" signal per interval, and separately gates
//! on-demand polls behind a debounce window. Both are driven purely by the
//! timestamps fed in, so they are fully testable.

pub struct PollClock {
    interval_ms: f64,
    debounce_ms: f64,
    /// Milliseconds accumulated since the last poll.
    accumulator: f64,
    /// Timestamp of the last update (ms), None if first frame
    last_timestamp: Option<f64>,
    /// Timestamp of the last poll that fired.
    last_fire: Option<f64>,
    pub total_polls: u64,
}

impl PollClock {
    pub fn new(interval_ms: u64, debounce_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1) as f64,
            debounce_ms: debounce_ms as f64,
            accumulator: 0.0,
            last_timestamp: None,
            last_fire: None,
            total_polls: 0,
        }
    }

    /// Feed wall-clock timestamp (from `Date.now()` or similar).
    /// Returns true when a scheduled poll is due.
    pub fn update(&mut self, now_ms: f64) -> bool {
        let delta = match self.last_timestamp {
            // A backgrounded tab owes at most one poll.
            Some(prev) => (now_ms - prev).clamp(0.0, self.interval_ms),
            None => 0.0,
        };
        self.last_timestamp = Some(now_ms);

        self.accumulator += delta;
        if self.accumulator < self.interval_ms {
            return false;
        }
        self.fire(now_ms)
    }

    /// Ask for a poll right now. Refused inside the debounce window.
    pub fn request(&mut self, now_ms: f64) -> bool {
        if let Some(last) = self.last_fire {
            if now_ms - last < self.debounce_ms {
                return false;
            }
        }
        self.fire(now_ms)
    }

    fn fire(&mut self, now_ms: f64) -> bool {
        self.accumulator = 0.0;
        self.last_fire = Some(now_ms);
        self.total_polls += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_never_polls() {
        let mut clock = PollClock::new(30_000, 5_000);
        assert!(!clock.update(0.0));
    }

    #[test]
    fn polls_once_per_interval() {
        let mut clock = PollClock::new(1000, 100);
        clock.update(0.0);
        assert!(!clock.update(999.0));
        assert!(clock.update(1000.0));
        assert!(!clock.update(1500.0));
        assert!(clock.update(2000.0));
        assert_eq!(clock.total_polls, 2);
    }

    #[test]
    fn sub_interval_frames_accumulate() {
        let mut clock = PollClock::new(100, 0);
        clock.update(0.0);
        let fired: Vec<bool> = (1..=7).map(|i| clock.update(i as f64 * 16.0)).collect();
        assert_eq!(fired, vec![false, false, false, false, false, false, true]);
    }

    #[test]
    fn long_gap_owes_one_poll() {
        let mut clock = PollClock::new(1000, 0);
        clock.update(0.0);
        assert!(clock.update(60_000.0));
        assert!(!clock.update(60_001.0));
        assert_eq!(clock.total_polls, 1);
    }

    #[test]
    fn requests_are_debounced() {
        let mut clock = PollClock::new(30_000, 5_000);
        assert!(clock.request(0.0));
        assert!(!clock.request(4_999.0));
        assert!(clock.request(5_000.0));
    }

    #[test]
    fn request_resets_the_interval() {
        let mut clock = PollClock::new(1000, 0);
        clock.update(0.0);
        clock.update(900.0);
        assert!(clock.request(900.0));
        assert!(!clock.update(1000.0));
        assert!(clock.update(1900.0));
    }
}
