use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time source used for LED settle delays and the correction cooldown.
///
/// Injected everywhere a delay or an age is computed so tests can run the
/// 180 ms settle waits and the 10 s cooldown without sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Time elapsed since `earlier`, saturating at zero.
    fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

/// Real clock backed by `std::time::Instant` and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_since_future_instant_is_zero() {
        let clock = MonotonicClock::new();
        let later = clock.now() + Duration::from_secs(60);
        assert_eq!(clock.elapsed_since(later), Duration::ZERO);
    }

    #[test]
    fn sleep_advances_real_time() {
        let clock = MonotonicClock::new();
        let t0 = clock.now();
        clock.sleep(Duration::from_millis(2));
        assert!(clock.elapsed_since(t0) >= Duration::from_millis(2));
    }
}
