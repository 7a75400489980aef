use super::{Config, ConfigError};
use crate::transform::TimestampFormatter;
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delivery_stream.trim().is_empty() {
            return Err(ConfigError::MissingSetting("delivery_stream"));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::MissingSetting("region"));
        }

        for (name, endpoint) in [
            ("endpoint", &self.endpoint),
            ("sts_endpoint", &self.sts_endpoint),
        ] {
            if let Some(endpoint) = endpoint
                && !endpoint.is_empty()
            {
                Url::parse(endpoint).map_err(|e| {
                    ConfigError::InvalidUrl(format!("Invalid {name} URL '{endpoint}': {e}"))
                })?;
            }
        }

        TimestampFormatter::new(&self.time_key_format)?;

        if self.backoff_initial_ms == 0 || self.backoff_max_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Backoff intervals must be greater than 0".to_string(),
            ));
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            return Err(ConfigError::InvalidConfig(format!(
                "Initial backoff ({}ms) must not exceed maximum backoff ({}ms)",
                self.backoff_initial_ms, self.backoff_max_ms
            )));
        }

        if self.stall_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Stall timeout must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        if self.flush_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            delivery_stream: "logs".to_string(),
            region: "us-east-1".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_missing_stream_rejected() {
        let config = Config {
            delivery_stream: String::new(),
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSetting("delivery_stream"))
        ));
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let config = Config {
            endpoint: Some("::nope".to_string()),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_backoff_bounds() {
        let config = Config {
            backoff_initial_ms: 20_000,
            ..valid()
        };
        assert!(config.validate().is_err());
        assert!(valid().validate().is_ok());
    }
}
