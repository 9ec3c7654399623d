use std::time::{Duration, Instant};

use spin_sleep::SpinSleeper;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Fixed-rate cadence for the host loop.
pub struct Timing {
    pub tickrate: u64,
    last_tick: Instant,
    sleeper: SpinSleeper,
}

impl Timing {
    pub fn new(tickrate: u64) -> Self {
        Self {
            tickrate: tickrate.max(1),
            last_tick: Instant::now(),
            sleeper: SpinSleeper::default(),
        }
    }

    pub fn should_tick(&self) -> bool {
        self.calc_next_tick() == Duration::ZERO
    }

    pub fn mark_tick(&mut self) {
        self.last_tick = Instant::now();
    }

    pub fn try_sleep(&self) {
        let sleep_for = self.calc_next_tick();
        if sleep_for > Duration::ZERO {
            // accounts for platform dependent sleep resolution
            self.sleeper.sleep(sleep_for);
        }
    }

    fn tick_interval(&self) -> Duration {
        Duration::from_nanos(NANOS_PER_SEC / self.tickrate)
    }

    fn calc_next_tick(&self) -> Duration {
        calc_next_timeout(&self.last_tick, self.tick_interval())
    }
}

#[inline]
fn calc_next_timeout(last: &Instant, timeout: Duration) -> Duration {
    timeout.saturating_sub(last.elapsed())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{calc_next_timeout, Timing};

    #[test]
    fn tick_interval_follows_rate() {
        assert_eq!(Timing::new(60).tick_interval(), Duration::from_secs(1) / 60);
        assert_eq!(Timing::new(0).tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn tick_interval_survives_rates_beyond_u32() {
        assert_eq!(Timing::new(1 << 32).tick_interval(), Duration::ZERO);
        assert_eq!(Timing::new(u64::MAX).tick_interval(), Duration::ZERO);
        assert_eq!(
            Timing::new(1_000).tick_interval(),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn timeout_saturates_at_zero() {
        let long_ago = Instant::now() - Duration::from_millis(50);
        assert_eq!(
            calc_next_timeout(&long_ago, Duration::from_millis(10)),
            Duration::ZERO
        );
        assert!(calc_next_timeout(&Instant::now(), Duration::from_secs(10)) > Duration::ZERO);
    }

    #[test]
    fn fresh_timing_waits_for_next_tick() {
        let timing = Timing::new(1);
        assert!(!timing.should_tick());
    }
}
