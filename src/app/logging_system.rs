use super::config::LogLevel;
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Logging initialization failed: {details}")]
    LoggingInitFailed {
        details: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A `target=level` filter entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

pub struct LoggingSystem {
    directives: Vec<LogDirective>,
    json: bool,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: Vec::new(),
            json: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Quietens the HTTP stack.
    pub fn add_default_directives(&mut self) {
        for target in ["hyper", "reqwest", "h2"] {
            self.directives.push(LogDirective::new(target, LogLevel::Warn));
        }
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        std::iter::once(default_level.as_str().to_string())
            .chain(self.directives.iter().map(LogDirective::to_filter_string))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn initialize_tracing(&self, default_level: LogLevel) -> Result<(), InitializationError> {
        let filter_string = self.build_filter_string(default_level);

        let env_filter = EnvFilter::try_new(&filter_string).map_err(|e| {
            InitializationError::LoggingInitFailed {
                details: format!("Failed to create EnvFilter with '{}'", filter_string),
                source: Box::new(e),
            }
        })?;

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = if self.json {
            registry
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .try_init()
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr)
                        .compact(),
                )
                .try_init()
        };

        result.map_err(|e| InitializationError::LoggingInitFailed {
            details: "Failed to set global tracing subscriber".to_string(),
            source: Box::new(e),
        })
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the global subscriber once; later calls report the first outcome.
pub fn setup_logging_safe(level: LogLevel, json: bool) -> Result<(), InitializationError> {
    static INIT: OnceLock<bool> = OnceLock::new();

    let initialized = *INIT.get_or_init(|| {
        let mut logging_system = LoggingSystem::new().with_json(json);
        logging_system.add_default_directives();
        match logging_system.initialize_tracing(level) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("{e}");
                false
            }
        }
    });

    if initialized {
        Ok(())
    } else {
        Err(InitializationError::LoggingInitFailed {
            details: "Logging system initialization failed".to_string(),
            source: Box::new(std::io::Error::other("Logging initialization error")),
        })
    }
}
