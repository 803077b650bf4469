//! Stall detection for the active playback handle

/// Local clock movement below this is treated as no progress (seconds)
const PROGRESS_EPSILON: f64 = 0.01;

/// Watches successive clock updates for a local clock that stopped advancing
///
/// Reports once per stall; re-arms when the local clock moves again or the
/// current item changes. Only reports, never acts on the handle.
#[derive(Debug, Clone)]
pub struct StallWatchdog {
    threshold: u32,
    item_id: Option<String>,
    last_target_time: Option<f64>,
    last_local_elapsed: Option<f64>,
    stalled_updates: u32,
    reported: bool,
}

impl StallWatchdog {
    /// `threshold` consecutive stalled updates trigger a report; 0 disables
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            item_id: None,
            last_target_time: None,
            last_local_elapsed: None,
            stalled_updates: 0,
            reported: false,
        }
    }

    /// Record one clock update
    ///
    /// Returns true exactly when a new stall is detected.
    pub fn observe(&mut self, item_id: Option<&str>, target_time: f64, local_elapsed: f64) -> bool {
        if self.threshold == 0 {
            return false;
        }

        if self.item_id.as_deref() != item_id {
            self.reset();
            self.item_id = item_id.map(str::to_string);
        }

        if let (Some(last_target), Some(last_local)) =
            (self.last_target_time, self.last_local_elapsed)
        {
            if local_elapsed > last_local + PROGRESS_EPSILON {
                self.stalled_updates = 0;
                self.reported = false;
            } else if target_time > last_target {
                self.stalled_updates += 1;
            }
        }

        self.last_target_time = Some(target_time);
        self.last_local_elapsed = Some(local_elapsed);

        if self.stalled_updates >= self.threshold && !self.reported {
            self.reported = true;
            return true;
        }
        false
    }

    /// Whether a stall is currently reported
    pub fn is_stalled(&self) -> bool {
        self.reported
    }

    /// Forget all history (new item, playback restarted)
    pub fn reset(&mut self) {
        self.item_id = None;
        self.last_target_time = None;
        self.last_local_elapsed = None;
        self.stalled_updates = 0;
        self.reported = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_clock_never_stalls() {
        let mut watchdog = StallWatchdog::new(2);
        for step in 0..10 {
            let t = f64::from(step);
            assert!(!watchdog.observe(Some("a"), t, t));
        }
        assert!(!watchdog.is_stalled());
    }

    #[test]
    fn frozen_clock_reports_once() {
        let mut watchdog = StallWatchdog::new(2);
        assert!(!watchdog.observe(Some("a"), 10.0, 5.0));
        assert!(!watchdog.observe(Some("a"), 11.0, 5.0));
        assert!(watchdog.observe(Some("a"), 12.0, 5.0));
        assert!(!watchdog.observe(Some("a"), 13.0, 5.0));
        assert!(watchdog.is_stalled());
    }

    #[test]
    fn progress_rearms() {
        let mut watchdog = StallWatchdog::new(1);
        watchdog.observe(Some("a"), 10.0, 5.0);
        assert!(watchdog.observe(Some("a"), 11.0, 5.0));

        assert!(!watchdog.observe(Some("a"), 12.0, 6.0));
        assert!(!watchdog.is_stalled());
        assert!(watchdog.observe(Some("a"), 13.0, 6.0));
    }

    #[test]
    fn item_change_resets() {
        let mut watchdog = StallWatchdog::new(1);
        watchdog.observe(Some("a"), 10.0, 5.0);
        assert!(!watchdog.observe(Some("b"), 11.0, 5.0));
        assert!(!watchdog.is_stalled());
    }

    #[test]
    fn zero_threshold_disables() {
        let mut watchdog = StallWatchdog::new(0);
        for step in 0..5 {
            assert!(!watchdog.observe(Some("a"), f64::from(step), 0.0));
        }
    }
}
