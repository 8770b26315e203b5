//! Frame-coalescing render ticker.

use std::time::{Duration, Instant};

/// Coalesces any number of update requests into at most one render per
/// frame interval. A flag, not a queue.
#[derive(Debug, Clone)]
pub struct FrameTicker {
    interval: Duration,
    needs_update: bool,
    last_frame: Option<Instant>,
    frames: u64,
}

impl FrameTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            needs_update: false,
            last_frame: None,
            frames: 0,
        }
    }

    pub fn request_update(&mut self) {
        self.needs_update = true;
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Number of render passes granted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` when a render pass should run at `now`, clearing the
    /// pending flag.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.needs_update {
            return false;
        }
        if let Some(last) = self.last_frame {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.needs_update = false;
        self.last_frame = Some(now);
        self.frames += 1;
        true
    }
}

impl Default for FrameTicker {
    fn default() -> Self {
        Self::new(Duration::from_micros(16_667))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_coalesce_into_one_frame() {
        let mut ticker = FrameTicker::new(Duration::from_millis(16));
        let start = Instant::now();
        ticker.request_update();
        ticker.request_update();
        ticker.request_update();
        assert!(ticker.tick(start));
        assert!(!ticker.tick(start + Duration::from_millis(1)));
        assert_eq!(ticker.frames(), 1);
    }

    #[test]
    fn test_waits_for_interval() {
        let mut ticker = FrameTicker::new(Duration::from_millis(16));
        let start = Instant::now();
        ticker.request_update();
        assert!(ticker.tick(start));
        ticker.request_update();
        assert!(!ticker.tick(start + Duration::from_millis(5)));
        assert!(ticker.needs_update());
        assert!(ticker.tick(start + Duration::from_millis(17)));
        assert!(!ticker.needs_update());
    }

    #[test]
    fn test_idle_ticker_never_fires() {
        let mut ticker = FrameTicker::default();
        assert!(!ticker.tick(Instant::now()));
        assert_eq!(ticker.frames(), 0);
    }
}
