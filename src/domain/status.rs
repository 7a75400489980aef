use serde::{Deserialize, Serialize};
use std::fmt;

/// Status handed back to the host collector after `add_record` or `flush`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushStatus {
    /// Data was accepted; keep going.
    Ok,
    /// Delivery failed but may succeed later; the host should retry.
    Retry,
    /// Unrecoverable for this input; the host should not retry it.
    Error,
}

impl FlushStatus {
    /// Numeric return code understood by Fluent Bit style hosts.
    pub const fn code(self) -> i32 {
        match self {
            FlushStatus::Error => 0,
            FlushStatus::Ok => 1,
            FlushStatus::Retry => 2,
        }
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, FlushStatus::Ok)
    }
}

impl fmt::Display for FlushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushStatus::Ok => f.write_str("ok"),
            FlushStatus::Retry => f.write_str("retry"),
            FlushStatus::Error => f.write_str("error"),
        }
    }
}
