pub mod backoff;
pub mod watchdog;

pub use backoff::{Backoff, BackoffConfig};
pub use watchdog::{DEFAULT_STALL_THRESHOLD, StallHandler, Watchdog};
