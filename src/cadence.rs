//! Fixed-rate throttle that decouples brush input from chunk rebuilds.

use crate::config::DEFAULT_REBUILD_HZ;

/// Fires at most once per `1 / hz` seconds of accumulated frame time.
///
/// A long frame fires once and drops the missed periods instead of firing a burst
/// of rebuilds on the following frames.
#[derive(Clone, Debug)]
pub struct RebuildCadence {
    interval: f32,
    accumulated: f32,
}

impl RebuildCadence {
    pub fn new(hz: f32) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 {
            hz
        } else {
            DEFAULT_REBUILD_HZ
        };
        Self {
            interval: 1.0 / hz,
            accumulated: 0.0,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Advance by `delta_time` seconds; returns true when a rebuild is due.
    pub fn tick(&mut self, delta_time: f32) -> bool {
        if delta_time.is_finite() && delta_time > 0.0 {
            self.accumulated += delta_time;
        }
        if self.accumulated < self.interval {
            return false;
        }
        self.accumulated -= self.interval;
        if self.accumulated >= self.interval {
            self.accumulated = 0.0;
        }
        true
    }

    /// Restart the current period (after a forced rebuild).
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}

impl Default for RebuildCadence {
    fn default() -> Self {
        Self::new(DEFAULT_REBUILD_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twenty_hz_at_sixty_fps() {
        let mut cadence = RebuildCadence::new(20.0);
        let fired = (0..60).filter(|_| cadence.tick(1.0 / 60.0)).count();
        assert!(
            (19..=20).contains(&fired),
            "Expected about 20 rebuilds per second, got {fired}"
        );
    }

    #[test]
    fn test_no_burst_after_long_frame() {
        let mut cadence = RebuildCadence::new(20.0);
        assert!(cadence.tick(1.0), "A long frame fires once");
        assert!(!cadence.tick(0.001), "Missed periods must not fire again");
    }

    #[test]
    fn test_ignores_invalid_delta() {
        let mut cadence = RebuildCadence::new(10.0);
        assert!(!cadence.tick(f32::NAN));
        assert!(!cadence.tick(-1.0));
        assert!(!cadence.tick(f32::INFINITY));
        assert!(cadence.tick(0.1));
    }

    #[test]
    fn test_invalid_rate_uses_default() {
        let cadence = RebuildCadence::new(0.0);
        assert!((cadence.interval() - 1.0 / DEFAULT_REBUILD_HZ).abs() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut cadence = RebuildCadence::new(20.0);
        assert!(!cadence.tick(0.04));
        cadence.reset();
        assert!(!cadence.tick(0.04));
        assert!(cadence.tick(0.02));
    }
}
