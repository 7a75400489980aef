use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::error;

/// Default stall threshold before the process gives up.
pub const DEFAULT_STALL_THRESHOLD: Duration = Duration::from_secs(600);

/// Invoked with the threshold once it has been exceeded.
pub type StallHandler = Arc<dyn Fn(Duration) + Send + Sync>;

/// Tracks how long delivery has gone without progress.
///
/// `start` arms a deadline only if none is set, `check` fires the stall
/// handler once the deadline has passed, and `reset` disarms it after a
/// fully successful batch.
#[derive(Clone)]
pub struct Watchdog {
    threshold: Duration,
    deadline: Option<Instant>,
    on_stall: StallHandler,
}

impl Watchdog {
    pub fn new(threshold: Duration, on_stall: StallHandler) -> Self {
        Self {
            threshold,
            deadline: None,
            on_stall,
        }
    }

    /// Watchdog whose stall handler logs and terminates the process.
    pub fn exiting(threshold: Duration, plugin_id: usize) -> Self {
        Self::new(
            threshold,
            Arc::new(move |elapsed: Duration| {
                error!(
                    plugin_id,
                    "Timeout threshold reached: failed to send logs for {:?}", elapsed
                );
                error!(plugin_id, "Quitting");
                std::process::exit(1);
            }),
        )
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn start(&mut self) {
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.threshold);
        }
    }

    /// Fires the stall handler if the deadline has passed. Returns whether it fired.
    pub fn check(&self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() > deadline => {
                (self.on_stall)(self.threshold);
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.deadline = None;
    }
}

impl fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchdog")
            .field("threshold", &self.threshold)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
