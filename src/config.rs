use std::time::Duration;

// ============================================================================
// Pipeline Configuration
// ============================================================================
//
// Built once at start-up from the environment (after loading an optional
// `.env` file), validated, then shared read-only with every component.
//
// ============================================================================

const DEFAULT_BROKERS: &str = "127.0.0.1:9092";
const DEFAULT_ORDERS_TOPIC: &str = "orders";
const DEFAULT_RETRY_TOPIC: &str = "orders-retry";
const DEFAULT_DLQ_TOPIC: &str = "orders-dlq";
const DEFAULT_CONSUMER_GROUP: &str = "order-processing-group";
const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
const DEFAULT_CONSUMER_WORKERS: usize = 3;
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },
}

/// Names of the three logical channels.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicConfig {
    pub orders: String,
    pub retry: String,
    pub dead_letter: String,
}

/// Bounded-retry settings shared by the retry consumer and the escalation
/// controller.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Escalations allowed before an order is dead-lettered. Zero sends every
    /// first failure straight to the DLQ.
    pub max_attempts: u32,
    /// Backoff the retry consumer waits before re-processing.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub brokers: String,
    pub topics: TopicConfig,
    pub consumer_group: String,
    pub retry: RetryPolicy,
    pub workers_per_stream: usize,
    pub http_port: u16,
    pub publish_timeout: Duration,
}

impl PipelineConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &'static str, default: &str| -> Result<String, ConfigError> {
            let value = lookup(key).unwrap_or_else(|| default.to_string());
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(ConfigError::Empty { key });
            }
            Ok(value)
        };

        let config = Self {
            brokers: text("KAFKA_BROKERS", DEFAULT_BROKERS)?,
            topics: TopicConfig {
                orders: text("ORDERS_TOPIC", DEFAULT_ORDERS_TOPIC)?,
                retry: text("ORDERS_RETRY_TOPIC", DEFAULT_RETRY_TOPIC)?,
                dead_letter: text("ORDERS_DLQ_TOPIC", DEFAULT_DLQ_TOPIC)?,
            },
            consumer_group: text("CONSUMER_GROUP_ID", DEFAULT_CONSUMER_GROUP)?,
            retry: RetryPolicy {
                max_attempts: parse(&lookup, "MAX_RETRY_ATTEMPTS", DEFAULT_MAX_RETRY_ATTEMPTS)?,
                delay: Duration::from_millis(parse(&lookup, "RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?),
            },
            workers_per_stream: parse(&lookup, "CONSUMER_WORKERS", DEFAULT_CONSUMER_WORKERS)?,
            http_port: parse(&lookup, "HTTP_PORT", DEFAULT_HTTP_PORT)?,
            publish_timeout: Duration::from_millis(parse(
                &lookup,
                "PUBLISH_TIMEOUT_MS",
                DEFAULT_PUBLISH_TIMEOUT_MS,
            )?),
        };

        if config.workers_per_stream == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CONSUMER_WORKERS",
                value: "0".to_string(),
                reason: "at least one worker per stream is required".to_string(),
            });
        }

        Ok(config)
    }

    /// Consumer group for the dead-letter stream, kept apart from the main
    /// group so DLQ inspection never competes with order processing.
    pub fn dead_letter_group(&self) -> String {
        format!("{}-dlq", self.consumer_group)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.brokers, "127.0.0.1:9092");
        assert_eq!(config.topics.orders, "orders");
        assert_eq!(config.topics.retry, "orders-retry");
        assert_eq!(config.topics.dead_letter, "orders-dlq");
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.workers_per_stream, 3);
        assert_eq!(config.dead_letter_group(), "order-processing-group-dlq");
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("MAX_RETRY_ATTEMPTS", "0"),
            ("RETRY_DELAY_MS", "250"),
            ("ORDERS_DLQ_TOPIC", "dead-orders"),
            ("CONSUMER_GROUP_ID", "analytics"),
        ]))
        .unwrap();

        assert_eq!(config.retry.max_attempts, 0);
        assert_eq!(config.retry.delay, Duration::from_millis(250));
        assert_eq!(config.topics.dead_letter, "dead-orders");
        assert_eq!(config.dead_letter_group(), "analytics-dlq");
    }

    #[test]
    fn test_unparsable_number_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("MAX_RETRY_ATTEMPTS", "three")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "MAX_RETRY_ATTEMPTS", .. }));
    }

    #[test]
    fn test_negative_retry_attempts_are_rejected() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("MAX_RETRY_ATTEMPTS", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("CONSUMER_WORKERS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "CONSUMER_WORKERS", .. }));
    }

    #[test]
    fn test_blank_topic_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("ORDERS_RETRY_TOPIC", "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Empty { key: "ORDERS_RETRY_TOPIC" }));
    }
}
