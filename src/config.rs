//! Configuration types for url-fetcher

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for a fetch run
///
/// Every field has a default, so `Config::default()` (or `{}` in JSON) is a
/// working configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of simultaneous HTTP exchanges (default: 5)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-attempt timeout covering the whole exchange, body included (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_ms_serde")]
    pub timeout: Duration,

    /// Retry behavior for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Capacity of the event broadcast channel (default: 1000)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            timeout: default_timeout(),
            retry: RetryConfig::default(),
            user_agent: default_user_agent(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Config {
    /// Check that the configuration can drive a run
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::config("max_concurrent", "must be at least 1"));
        }
        if self.max_concurrent > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(Error::config(
                "max_concurrent",
                format!("must not exceed {}", tokio::sync::Semaphore::MAX_PERMITS),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::config("timeout", "must be greater than zero"));
        }
        if self.event_capacity == 0 {
            return Err(Error::config("event_capacity", "must be at least 1"));
        }
        if self.retry.base_delay.is_zero() {
            return Err(Error::config("retry.base_delay", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Retry behavior configuration
///
/// Backoff is linear: the wait before retry `n` (0-based) is `base_delay * (n + 1)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt (default: 2)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit, must be non-zero (default: 1 second)
    #[serde(default = "default_base_delay", with = "duration_ms_serde")]
    pub base_delay: Duration,

    /// Add up to half a `base_delay` of random jitter to each wait (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            jitter: false,
        }
    }
}

fn default_max_concurrent() -> usize {
    5
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("url-fetcher/{}", env!("CARGO_PKG_VERSION"))
}

fn default_event_capacity() -> usize {
    1000
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

// Durations are written as integer milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(crate::types::millis(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.base_delay, Duration::from_secs(1));
        assert!(!config.retry.jitter);
        assert!(config.user_agent.starts_with("url-fetcher/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.retry.max_retries, 2);
    }

    #[test]
    fn durations_are_milliseconds() {
        let config: Config = serde_json::from_str(
            r#"{"timeout": 1500, "retry": {"max_retries": 4, "base_delay": 250}}"#,
        )
        .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["timeout"], 1500);
        assert_eq!(json["retry"]["base_delay"], 250);
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = Config {
            max_concurrent: 0,
            ..Default::default()
        };
        match config.validate().unwrap_err() {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("max_concurrent")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = Config {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(k), .. }) if k == "timeout"
        ));
    }

    #[test]
    fn validate_rejects_zero_event_capacity() {
        let config = Config {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_concurrency() {
        let config = Config {
            max_concurrent: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(k), .. }) if k == "max_concurrent"
        ));

        let at_limit = Config {
            max_concurrent: tokio::sync::Semaphore::MAX_PERMITS,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_base_delay() {
        let config = Config {
            retry: RetryConfig {
                base_delay: Duration::ZERO,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(k), .. }) if k == "retry.base_delay"
        ));
    }
}
