use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source for detection timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Advances by a fixed step on every read.
#[derive(Debug)]
pub struct SteppingClock {
    base: Instant,
    step: Duration,
    ticks: AtomicU32,
}

impl SteppingClock {
    pub fn new(step: Duration) -> Self {
        Self {
            base: Instant::now(),
            step,
            ticks: AtomicU32::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Instant {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        self.base + self.step * tick
    }
}

/// Seconds since construction, never decreasing between reads.
pub struct ElapsedTimer {
    clock: Arc<dyn Clock>,
    start: Instant,
    last: f64,
}

impl ElapsedTimer {
    pub fn start(clock: Arc<dyn Clock>) -> Self {
        let start = clock.now();
        Self {
            clock,
            start,
            last: 0.0,
        }
    }

    pub fn elapsed_secs(&mut self) -> f64 {
        let now = self
            .clock
            .now()
            .saturating_duration_since(self.start)
            .as_secs_f64();
        self.last = self.last.max(now);
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns a scripted sequence of offsets, including one going backwards.
    struct ScriptedClock {
        base: Instant,
        offsets_ms: std::sync::Mutex<Vec<u64>>,
    }

    impl Clock for ScriptedClock {
        fn now(&self) -> Instant {
            let ms = self.offsets_ms.lock().unwrap().remove(0);
            self.base + Duration::from_millis(ms)
        }
    }

    #[test]
    fn test_stepping_clock_advances() {
        let clock = SteppingClock::new(Duration::from_millis(40));
        let a = clock.now();
        let b = clock.now();
        assert_eq!(b - a, Duration::from_millis(40));
    }

    #[test]
    fn test_elapsed_is_clamped_non_decreasing() {
        let clock = Arc::new(ScriptedClock {
            base: Instant::now(),
            offsets_ms: std::sync::Mutex::new(vec![100, 300, 200, 400]),
        });
        let mut timer = ElapsedTimer::start(clock);

        assert!((timer.elapsed_secs() - 0.2).abs() < 1e-9);
        // Clock went backwards: previous value is kept
        assert!((timer.elapsed_secs() - 0.2).abs() < 1e-9);
        assert!((timer.elapsed_secs() - 0.3).abs() < 1e-9);
    }
}
