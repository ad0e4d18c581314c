use std::collections::VecDeque;
use std::time::Duration;

use arcadia_types::RateLimitConfig;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Upper bound on a single sleep inside [`SlidingWindowLimiter::wait`].
const MAX_WAIT_SLICE: Duration = Duration::from_secs(1);

/// Sliding-window admission control: at most `max_calls` admissions in any `period`.
///
/// The window holds the instants of recent admissions. An admission leaves the window
/// once it is `period` old, so every held instant satisfies `now - period < t <= now`
/// and the window never holds more than `max_calls` entries.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    name: String,
    max_calls: usize,
    period: Duration,
    window: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// `max_calls` and `period` must be positive; [`RateLimitConfig::validate`] checks
    /// config-sourced values. A zero `max_calls` is raised to one.
    pub fn new(name: impl Into<String>, max_calls: usize, period: Duration) -> Self {
        let max_calls = max_calls.max(1);
        Self {
            name: name.into(),
            max_calls,
            period,
            window: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &RateLimitConfig) -> Self {
        Self::new(name, config.max_calls, config.period())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Admissions currently inside the window.
    pub fn in_window(&self) -> usize {
        let mut window = self.window.lock();
        self.evict(&mut window, Instant::now());
        window.len()
    }

    fn evict(&self, window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = window.front() {
            if now.saturating_duration_since(*oldest) >= self.period {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Admit now or report how long until the oldest admission expires.
    fn admit_or_delay(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut window = self.window.lock();
        self.evict(&mut window, now);

        if window.len() < self.max_calls {
            window.push_back(now);
            return Ok(());
        }

        let delay = window
            .front()
            .map(|oldest| self.period.saturating_sub(now.saturating_duration_since(*oldest)))
            .unwrap_or(self.period);
        Err(delay)
    }

    /// Non-blocking admission. Records the call only when admitted.
    pub fn try_acquire(&self) -> bool {
        self.admit_or_delay().is_ok()
    }

    /// Block until admitted.
    ///
    /// Sleeps in slices of at most one second so concurrent waiters re-check the
    /// window regularly; the lock is never held across a sleep.
    pub async fn wait(&self) {
        loop {
            match self.admit_or_delay() {
                Ok(()) => return,
                Err(delay) => {
                    let slice = delay.clamp(Duration::from_millis(1), MAX_WAIT_SLICE);
                    debug!(limiter = %self.name, delay_ms = slice.as_millis() as u64, "Rate limited, waiting");
                    tokio::time::sleep(slice).await;
                },
            }
        }
    }

    /// Forget every recorded admission.
    pub fn reset(&self) {
        self.window.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_three_per_second() {
        let limiter = SlidingWindowLimiter::new("test", 3, Duration::from_secs(1));

        let results: Vec<bool> = (0..5).map(|_| limiter.try_acquire()).collect();
        assert_eq!(results, vec![true, true, true, false, false]);
        assert_eq!(limiter.in_window(), 3);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new("test", 2, Duration::from_secs(1));
        assert!(limiter.try_acquire());
        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        // Only the first admission has aged out.
        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_until_oldest_expires() {
        let limiter = SlidingWindowLimiter::new("test", 1, Duration::from_millis(300));
        limiter.wait().await;

        let start = Instant::now();
        limiter.wait().await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_caps_each_sleep_at_one_second() {
        let limiter = SlidingWindowLimiter::new("slow", 1, Duration::from_secs(5));
        limiter.wait().await;

        let start = Instant::now();
        limiter.wait().await;

        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_respect_limit() {
        let limiter = Arc::new(SlidingWindowLimiter::new("test", 2, Duration::from_secs(1)));
        let start = Instant::now();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.wait().await;
                    Instant::now()
                })
            })
            .collect();

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap_or(start));
        }
        admitted.sort();

        // Six admissions at two per second need at least two full periods.
        assert!(admitted[5].duration_since(start) >= Duration::from_secs(2));
        for pair in admitted.windows(3) {
            assert!(pair[2].duration_since(pair[0]) >= Duration::from_secs(1));
        }
    }

    #[test]
    fn test_reset_clears_window() {
        let limiter = SlidingWindowLimiter::new("test", 1, Duration::from_secs(60));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        limiter.reset();

        assert!(limiter.try_acquire());
    }

    #[test]
    fn test_zero_max_calls_is_raised() {
        let limiter = SlidingWindowLimiter::new("test", 0, Duration::from_secs(1));
        assert_eq!(limiter.max_calls(), 1);
    }
}
