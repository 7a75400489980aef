use rand::Rng;
use std::time::Duration;
use tracing::debug;

const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_MULTIPLIER: f64 = 1.5;
const RANDOMIZATION_FACTOR: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
            jitter: false,
        }
    }
}

/// Exponential backoff that only applies once switched on.
///
/// `wait` is called before every send attempt and does nothing until
/// `start_backoff` has been called. There is no overall expiry; the delays
/// keep coming, capped per step, until `reset`.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    active: bool,
    current_interval: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        let current_interval = config.initial_interval;
        Self {
            config,
            active: false,
            current_interval,
        }
    }

    pub fn start_backoff(&mut self) {
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Delay the next `wait` would use, before jitter.
    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// Ends the backoff and rewinds the sequence to the initial interval.
    pub fn reset(&mut self) {
        self.active = false;
        self.current_interval = self.config.initial_interval;
    }

    /// Returns the next delay in the sequence and advances it.
    pub fn next_delay(&mut self) -> Duration {
        let delay = if self.config.jitter {
            self.apply_jitter(self.current_interval)
        } else {
            self.current_interval
        };

        let grown = scale(self.current_interval, self.config.multiplier);
        self.current_interval = grown.min(self.config.max_interval);

        delay
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        let mut rng = rand::rng();
        let factor = rng.random_range((1.0 - RANDOMIZATION_FACTOR)..(1.0 + RANDOMIZATION_FACTOR));
        scale(interval, factor).min(self.config.max_interval)
    }

    pub async fn wait(&mut self) {
        if !self.active {
            return;
        }
        let delay = self.next_delay();
        debug!(delay_ms = delay.as_millis() as u64, "In exponential backoff, waiting");
        tokio::time::sleep(delay).await;
    }
}

fn scale(interval: Duration, factor: f64) -> Duration {
    Duration::from_nanos((interval.as_nanos() as f64 * factor) as u64)
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
