use super::serde_helpers::{
    load_env_path_opt, load_env_string, load_env_string_opt, load_env_switch, load_env_var,
    load_env_var_opt,
};
use super::{ConfigError, LogLevel};
use crate::buffer::BatchLimits;
use crate::reliability::BackoffConfig;
use crate::sender::{ClientConfig, default_user_agent};
use crate::transform::{DEFAULT_TIME_FORMAT, MAX_RECORD_SIZE, OversizePolicy, TransformConfig};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Delivery stream that receives the records
    #[arg(long, env = "DELIVERY_STREAM", default_value = "")]
    pub delivery_stream: String,

    /// Region hosting the delivery stream
    #[arg(long, env = "AWS_REGION", default_value = "")]
    pub region: String,

    /// Comma-separated list of top-level keys to keep
    #[arg(long, env = "DATA_KEYS")]
    pub data_keys: Option<String>,

    /// Role to assume when sending
    #[arg(long, env = "ROLE_ARN")]
    pub role_arn: Option<String>,

    /// Ingestion endpoint override
    #[arg(long, env = "FIREHOSE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Credential service endpoint override
    #[arg(long, env = "STS_ENDPOINT")]
    pub sts_endpoint: Option<String>,

    /// Field that receives the formatted record timestamp
    #[arg(long, env = "TIME_KEY")]
    pub time_key: Option<String>,

    /// strftime pattern for the timestamp field (%L = millis, %f = micros)
    #[arg(long, env = "TIME_KEY_FORMAT", default_value = DEFAULT_TIME_FORMAT)]
    pub time_key_format: String,

    /// Replacement for '.' in field names
    #[arg(long, env = "REPLACE_DOTS")]
    pub replace_dots: Option<String>,

    /// Pack several records into one payload
    #[arg(long, env = "SIMPLE_AGGREGATION")]
    pub simple_aggregation: bool,

    /// What to do with records over the per-record ceiling
    #[arg(long, env = "OVERSIZE_POLICY", value_enum, default_value = "drop")]
    pub oversize_policy: OversizePolicy,

    /// Seconds without progress before giving up
    #[arg(long, env = "STALL_TIMEOUT_SECS", default_value = "600")]
    pub stall_timeout_secs: u64,

    /// First backoff step in milliseconds
    #[arg(long, env = "BACKOFF_INITIAL_MS", default_value = "100")]
    pub backoff_initial_ms: u64,

    /// Backoff ceiling in milliseconds
    #[arg(long, env = "BACKOFF_MAX_MS", default_value = "10000")]
    pub backoff_max_ms: u64,

    /// Randomise backoff steps
    #[arg(long, env = "BACKOFF_JITTER")]
    pub backoff_jitter: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Flush interval in milliseconds
    #[arg(long, env = "FLUSH_INTERVAL_MS", default_value = "1000")]
    pub flush_interval_ms: u64,

    /// Log level (falls back to FLB_LOG_LEVEL)
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    pub log_level: Option<LogLevel>,

    /// Emit logs as JSON
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,

    /// Read records from this file instead of stdin
    #[arg(long, env = "INPUT")]
    pub input: Option<PathBuf>,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delivery_stream: String::new(),
            region: String::new(),
            data_keys: None,
            role_arn: None,
            endpoint: None,
            sts_endpoint: None,
            time_key: None,
            time_key_format: DEFAULT_TIME_FORMAT.to_string(),
            replace_dots: None,
            simple_aggregation: false,
            oversize_policy: OversizePolicy::Drop,
            stall_timeout_secs: 600,
            backoff_initial_ms: 100,
            backoff_max_ms: 10_000,
            backoff_jitter: false,
            request_timeout_secs: 30,
            flush_interval_ms: 1000,
            log_level: None,
            json_logs: false,
            input: None,
            config_file: None,
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Config::parse_from(args);
        config.validate()?;
        Ok(config)
    }

    /// Parses CLI arguments; when `--config-file` is given the file replaces
    /// every other setting except the input and log options.
    pub fn from_args_and_file<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Config::parse_from(args);

        let Some(path) = cli.config_file.clone() else {
            cli.validate()?;
            return Ok(cli);
        };

        let mut config = Self::from_file(&path)?;
        if config.input.is_none() {
            config.input = cli.input;
        }
        if config.log_level.is_none() {
            config.log_level = cli.log_level;
        }
        config.json_logs |= cli.json_logs;
        config.config_file = Some(path);
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_string("DELIVERY_STREAM", &mut config.delivery_stream);
        load_env_string("AWS_REGION", &mut config.region);
        load_env_string_opt("DATA_KEYS", &mut config.data_keys);
        load_env_string_opt("ROLE_ARN", &mut config.role_arn);
        load_env_string_opt("FIREHOSE_ENDPOINT", &mut config.endpoint);
        load_env_string_opt("STS_ENDPOINT", &mut config.sts_endpoint);
        load_env_string_opt("TIME_KEY", &mut config.time_key);
        load_env_string("TIME_KEY_FORMAT", &mut config.time_key_format);
        load_env_string_opt("REPLACE_DOTS", &mut config.replace_dots);
        load_env_switch("SIMPLE_AGGREGATION", &mut config.simple_aggregation)?;

        // ValueEnum parsing, case-insensitive
        if let Ok(policy) = std::env::var("OVERSIZE_POLICY") {
            config.oversize_policy = OversizePolicy::from_str(&policy, true).map_err(|_| {
                ConfigError::EnvError(format!(
                    "Invalid OVERSIZE_POLICY: {policy}. Valid values: drop, truncate"
                ))
            })?;
        }

        load_env_var("STALL_TIMEOUT_SECS", &mut config.stall_timeout_secs)?;
        load_env_var("BACKOFF_INITIAL_MS", &mut config.backoff_initial_ms)?;
        load_env_var("BACKOFF_MAX_MS", &mut config.backoff_max_ms)?;
        load_env_switch("BACKOFF_JITTER", &mut config.backoff_jitter)?;
        load_env_var("REQUEST_TIMEOUT_SECS", &mut config.request_timeout_secs)?;
        load_env_var("FLUSH_INTERVAL_MS", &mut config.flush_interval_ms)?;
        load_env_var_opt("LOG_LEVEL", &mut config.log_level)?;
        load_env_switch("JSON_LOGS", &mut config.json_logs)?;
        load_env_path_opt("INPUT", &mut config.input);
        load_env_path_opt("CONFIG_FILE", &mut config.config_file);

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit level, else the host's `FLB_LOG_LEVEL`, else info.
    pub fn effective_log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_else(|| {
            std::env::var("FLB_LOG_LEVEL")
                .map(|value| LogLevel::from_host_value(&value))
                .unwrap_or(LogLevel::Info)
        })
    }

    pub fn transform_config(&self) -> TransformConfig {
        TransformConfig {
            data_keys: self.data_keys.clone(),
            replace_dots: self.replace_dots.clone(),
            time_key: self.time_key.clone(),
            time_key_format: Some(self.time_key_format.clone()),
            oversize_policy: self.oversize_policy,
            max_record_size: MAX_RECORD_SIZE,
        }
    }

    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits::default()
    }

    pub fn backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            initial_interval: Duration::from_millis(self.backoff_initial_ms),
            max_interval: Duration::from_millis(self.backoff_max_ms),
            jitter: self.backoff_jitter,
            ..BackoffConfig::default()
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            connection_timeout: Duration::from_secs(10),
            user_agent: default_user_agent(),
        }
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_args() {
        let config = Config::from_args([
            "rask-firehose-forwarder",
            "--delivery-stream",
            "logs",
            "--region",
            "us-east-1",
        ])
        .unwrap();

        assert_eq!(config.delivery_stream, "logs");
        assert_eq!(config.time_key_format, DEFAULT_TIME_FORMAT);
        assert_eq!(config.oversize_policy, OversizePolicy::Drop);
        assert_eq!(config.stall_threshold(), Duration::from_secs(600));
        assert_eq!(config.backoff_config().initial_interval, Duration::from_millis(100));
        assert_eq!(config.backoff_config().max_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_truncate_policy_flag() {
        let config = Config::from_args([
            "rask-firehose-forwarder",
            "--delivery-stream",
            "logs",
            "--region",
            "us-east-1",
            "--oversize-policy",
            "truncate",
            "--simple-aggregation",
        ])
        .unwrap();

        assert_eq!(config.oversize_policy, OversizePolicy::Truncate);
        assert!(config.simple_aggregation);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            delivery_stream = "logs"
            region = "eu-west-1"
            time_key = "ts"
            replace_dots = "_"
            "#,
        )
        .unwrap();

        assert_eq!(config.time_key.as_deref(), Some("ts"));
        assert_eq!(config.flush_interval(), Duration::from_secs(1));
        let transform = config.transform_config();
        assert_eq!(transform.replace_dots.as_deref(), Some("_"));
        assert_eq!(transform.max_record_size, MAX_RECORD_SIZE);
    }

    #[test]
    fn test_host_log_level_values() {
        assert_eq!(LogLevel::from_host_value("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from_host_value("ERROR"), LogLevel::Error);
        assert_eq!(LogLevel::from_host_value("verbose"), LogLevel::Info);
    }
}
