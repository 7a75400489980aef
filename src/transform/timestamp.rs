use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use std::fmt::Write;
use thiserror::Error;

pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimestampFormatError {
    #[error("Invalid strftime pattern '{pattern}'")]
    InvalidPattern { pattern: String },
    #[error("Failed to render timestamp with pattern '{pattern}'")]
    RenderFailed { pattern: String },
}

/// strftime-style timestamp renderer.
///
/// On top of chrono's specifiers, `%L` renders milliseconds (3 digits) and
/// `%f` renders microseconds (6 digits).
#[derive(Debug, Clone)]
pub struct TimestampFormatter {
    pattern: String,
    chrono_pattern: String,
}

impl TimestampFormatter {
    pub fn new(pattern: &str) -> Result<Self, TimestampFormatError> {
        let pattern = if pattern.is_empty() {
            DEFAULT_TIME_FORMAT
        } else {
            pattern
        };
        let chrono_pattern = translate_subsecond_specifiers(pattern);

        if StrftimeItems::new(&chrono_pattern).any(|item| matches!(item, Item::Error)) {
            return Err(TimestampFormatError::InvalidPattern {
                pattern: pattern.to_string(),
            });
        }

        Ok(Self {
            pattern: pattern.to_string(),
            chrono_pattern,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn format(&self, timestamp: &DateTime<Utc>) -> Result<String, TimestampFormatError> {
        let mut rendered = String::with_capacity(self.chrono_pattern.len() + 16);
        write!(rendered, "{}", timestamp.format(&self.chrono_pattern)).map_err(|_| {
            TimestampFormatError::RenderFailed {
                pattern: self.pattern.clone(),
            }
        })?;
        Ok(rendered)
    }
}

impl Default for TimestampFormatter {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_TIME_FORMAT.to_string(),
            chrono_pattern: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

fn translate_subsecond_specifiers(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('L') => out.push_str("%3f"),
            Some('f') => out.push_str("%6f"),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }

    out
}
