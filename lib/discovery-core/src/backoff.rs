//! Retry policies for the definitions watch

use rand::Rng;
use std::time::{Duration, Instant};

/// A retry policy. Each failure asks for the next delay; `None` means the
/// policy has given up and the failure is permanent.
pub trait Backoff: Send + Sync {
    fn next_backoff(&mut self) -> Option<Duration>;

    /// Called after a successful attempt
    fn reset(&mut self);
}

/// Exponential backoff with jitter
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    /// Delay after the first failure
    pub initial_interval: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Jitter, as a fraction of the current interval
    pub randomization_factor: f64,
    /// Upper bound of a single delay
    pub max_interval: Duration,
    /// Give up once this much time has passed since the first failure
    /// after a reset. `None` retries forever.
    pub max_elapsed_time: Option<Duration>,
    current_interval: Duration,
    failing_since: Option<Instant>,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(500),
            1.5,
            0.5,
            Duration::from_secs(60),
            None,
        )
    }
}

impl ExponentialBackoff {
    pub fn new(
        initial_interval: Duration,
        multiplier: f64,
        randomization_factor: f64,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
    ) -> Self {
        Self {
            initial_interval,
            multiplier,
            randomization_factor,
            max_interval,
            max_elapsed_time,
            current_interval: initial_interval,
            failing_since: None,
        }
    }

    /// Time spent failing since the last reset
    pub fn elapsed(&self) -> Duration {
        self.failing_since
            .map(|since| since.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    fn jittered(&self, interval: Duration) -> Duration {
        if self.randomization_factor <= 0.0 {
            return interval;
        }
        let delta = self.randomization_factor * interval.as_secs_f64();
        let low = (interval.as_secs_f64() - delta).max(0.0);
        let high = interval.as_secs_f64() + delta;
        Duration::from_secs_f64(rand::thread_rng().gen_range(low..=high))
    }
}

impl Backoff for ExponentialBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        // the clock runs from the first failure, not from the last success
        if self.failing_since.is_none() {
            self.failing_since = Some(Instant::now());
        }

        if let Some(max) = self.max_elapsed_time {
            if self.elapsed() > max {
                return None;
            }
        }

        let interval = self.current_interval;
        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = if next >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(next)
        };

        Some(self.jittered(interval))
    }

    fn reset(&mut self) {
        self.current_interval = self.initial_interval;
        self.failing_since = None;
    }
}
