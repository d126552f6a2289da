//! Frame clock and resize debouncing
//!
//! Both take timestamps in milliseconds from the caller (the
//! `requestAnimationFrame` / `performance.now()` clock on the web) so they
//! stay deterministic under test.

/// Time handed to per-frame hooks
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Seconds spent animating, summed over every animating window
    pub elapsed: f32,
    /// Seconds since the previous frame
    pub delta: f32,
}

/// Start/stop clock measuring frame deltas
///
/// Stopping and restarting does not reset anything: the first delta after a
/// restart is measured from the restart, so hidden time never shows up as a
/// frame delta.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    running: bool,
    old_time_ms: f64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now_ms: f64) {
        self.running = true;
        self.old_time_ms = now_ms;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Seconds since the last call (or since `start`); 0 while stopped
    pub fn delta(&mut self, now_ms: f64) -> f32 {
        if !self.running {
            return 0.0;
        }
        let delta = ((now_ms - self.old_time_ms) / 1000.0).max(0.0) as f32;
        self.old_time_ms = now_ms;
        delta
    }
}

/// Delay before a burst of resize events is acted on
pub const RESIZE_DEBOUNCE_MS: f64 = 100.0;

/// Coalesces bursts of events into one action after a quiet period
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay_ms: f64,
    deadline_ms: Option<f64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(RESIZE_DEBOUNCE_MS)
    }
}

impl Debouncer {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            deadline_ms: None,
        }
    }

    pub fn delay_ms(&self) -> f64 {
        self.delay_ms
    }

    pub fn pending(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Record an event; pushes the deadline back to `now + delay`
    pub fn trigger(&mut self, now_ms: f64) {
        self.deadline_ms = Some(now_ms + self.delay_ms);
    }

    /// True exactly once when the quiet period has elapsed
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_delta() {
        let mut clock = Clock::new();
        assert_eq!(clock.delta(1000.0), 0.0);

        clock.start(1000.0);
        assert_eq!(clock.delta(1000.0), 0.0);
        assert!((clock.delta(1016.0) - 0.016).abs() < 1e-6);
        assert!((clock.delta(1048.0) - 0.032).abs() < 1e-6);
    }

    #[test]
    fn test_clock_restart_skips_stopped_time() {
        let mut clock = Clock::new();
        clock.start(0.0);
        clock.delta(16.0);
        clock.stop();
        assert_eq!(clock.delta(5000.0), 0.0);

        clock.start(10_000.0);
        assert!((clock.delta(10_016.0) - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_burst_produces_single_fire() {
        let mut debounce = Debouncer::new(100.0);
        let mut fires = 0;
        // 10 events 20ms apart, polling at every event
        for i in 0..10 {
            let now = i as f64 * 20.0;
            debounce.trigger(now);
            if debounce.poll(now) {
                fires += 1;
            }
        }
        // Quiet period still running 50ms after the last event
        if debounce.poll(230.0) {
            fires += 1;
        }
        assert_eq!(fires, 0);
        assert!(debounce.poll(280.0));
        assert!(!debounce.poll(400.0));
    }

    #[test]
    fn test_spaced_events_each_fire() {
        let mut debounce = Debouncer::new(100.0);
        let mut fires = 0;
        for i in 0..5 {
            let now = i as f64 * 250.0;
            debounce.trigger(now);
            if debounce.poll(now + 100.0) {
                fires += 1;
            }
        }
        assert_eq!(fires, 5);
    }

    #[test]
    fn test_cancel() {
        let mut debounce = Debouncer::default();
        debounce.trigger(0.0);
        assert!(debounce.pending());
        debounce.cancel();
        assert!(!debounce.poll(1000.0));
    }
}
