//! Monotonic frame clock
//!
//! Seeded at zero when the script runtime boots; scripts read it through the
//! timer module.

use std::time::{Duration, Instant};

/// Time base for script-visible timing
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    origin: Instant,
}

impl FrameClock {
    /// Start a clock whose time reads zero now.
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Seconds since the clock was seeded.
    pub fn seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_near_zero_and_advances() {
        let clock = FrameClock::start();
        let first = clock.seconds();
        assert!(first < 1.0);
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.seconds() > first);
    }
}
