//! Client, lifecycle and connection configuration

use aws_config::{BehaviorVersion, Region, SdkConfig, defaults};
use aws_sdk_dynamodb::config::Credentials;
use aws_types::sdk_config::{RetryConfig as SdkRetryConfig, TimeoutConfig};
use std::fmt;
use std::time::Duration;

/// Retry policy for unprocessed batch items
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry rounds after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// Exponential backoff delay for the given 0-based retry attempt
    pub fn delay(&self, attempt: usize) -> Duration {
        let factor = 2u32.checked_pow(attempt as u32).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Batching and retry settings of a [`DocumentClient`](crate::DocumentClient)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Items per batch write call (DynamoDB allows 25)
    pub batch_write_size: usize,
    /// Keys per batch get call (DynamoDB allows 100)
    pub batch_read_size: usize,
    /// Chunks of one batch in flight at once
    pub concurrency: usize,
    /// Backoff policy for unprocessed items
    pub retry: RetryConfig,
    /// Overall budget for one batch call, retries included
    pub deadline: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            batch_write_size: 25,
            batch_read_size: 100,
            concurrency: 10,
            retry: RetryConfig::default(),
            deadline: None,
        }
    }
}

impl ClientConfig {
    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Bound total time spent in one batch call
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Override both batch size limits
    pub fn with_batch_sizes(mut self, write: usize, read: usize) -> Self {
        self.batch_write_size = write;
        self.batch_read_size = read;
        self
    }
}

/// Wait bounds used by the [`TableManager`](crate::setup::TableManager)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Longest time to wait for a table to reach a terminal state
    pub timeout: Duration,
    /// Pause between status checks
    pub poll_interval: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Fixed access key pair, as used against DynamoDB Local
#[derive(Clone)]
pub struct StaticCredentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Where and how to reach the storage service
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Service region
    pub region: String,
    /// Custom endpoint, for DynamoDB Local or LocalStack
    pub endpoint_url: Option<String>,
    /// Fixed credentials; the default provider chain is used when `None`
    pub credentials: Option<StaticCredentials>,
}

impl ConnectionConfig {
    /// Read the connection from the environment
    ///
    /// - `DOCSTORE_ENDPOINT_URL`, then `AWS_ENDPOINT_URL`, for a custom endpoint
    /// - `AWS_PROFILE=localstack` selects `http://127.0.0.1:4566`
    /// - `AWS_REGION` (default `us-east-1`)
    pub fn from_env() -> Self {
        let endpoint_url = std::env::var("DOCSTORE_ENDPOINT_URL")
            .or_else(|_| std::env::var("AWS_ENDPOINT_URL"))
            .ok()
            .or_else(|| {
                (std::env::var("AWS_PROFILE").unwrap_or_default() == "localstack")
                    .then(|| "http://127.0.0.1:4566".to_string())
            });

        Self {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint_url,
            credentials: None,
        }
    }

    /// DynamoDB Local on `localhost:8000` with dummy credentials
    pub fn local() -> Self {
        Self {
            region: "ap-northeast-1".to_string(),
            endpoint_url: Some("http://localhost:8000".to_string()),
            credentials: Some(StaticCredentials {
                access_key_id: "dummy".to_string(),
                secret_access_key: "dummykey".to_string(),
            }),
        }
    }

    /// Load an SDK config with sensible retry and timeout defaults
    ///
    /// - Adaptive retry mode with 3 max attempts, backoff starting at 1 second
    /// - Connect timeout: 3 seconds
    /// - Read timeout: 20 seconds
    /// - Operation timeout: 60 seconds
    pub async fn sdk_config(&self) -> SdkConfig {
        let timeout_config = TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(3))
            .read_timeout(Duration::from_secs(20))
            .operation_timeout(Duration::from_secs(60))
            .build();

        let mut loader = defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .retry_config(
                SdkRetryConfig::adaptive()
                    .with_max_attempts(3)
                    .with_initial_backoff(Duration::from_secs(1)),
            )
            .timeout_config(timeout_config);

        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        if let Some(credentials) = &self.credentials {
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
                None,
                None,
                "docstore-static",
            ));
        }

        loader.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_backoff() {
        let retry = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };

        assert_eq!(retry.delay(0), Duration::from_millis(100));
        assert_eq!(retry.delay(1), Duration::from_millis(200));
        assert_eq!(retry.delay(3), Duration::from_millis(800));
        assert_eq!(retry.delay(4), Duration::from_millis(1000));
        assert_eq!(retry.delay(64), Duration::from_millis(1000));
    }

    #[test]
    fn test_client_defaults_match_dynamodb_limits() {
        let config = ClientConfig::default();
        assert_eq!(config.batch_write_size, 25);
        assert_eq!(config.batch_read_size, 100);
        assert!(config.deadline.is_none());
    }

    #[test]
    fn test_local_connection() {
        let config = ConnectionConfig::local();
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:8000"));
        assert!(!format!("{:?}", config).contains("dummykey"));
    }
}
