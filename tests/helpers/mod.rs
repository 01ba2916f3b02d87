/// Test helpers and fixtures for document store integration tests
///
/// Most tests run against the in-process `MemoryBackend`; tests that need a
/// live DynamoDB Local are marked `#[ignore]`.
pub mod fixtures;

#[allow(unused_imports)]
pub use docstore::{
    ClientConfig, CompositeKey, DocumentClient, JsonCodec, LifecycleConfig, MemoryBackend,
    RetryConfig, TableManager,
};
pub use serde::{Deserialize, Serialize};

pub use fixtures::{UserModel, morita, yamada};

use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once; honors `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Client settings with millisecond backoff so retry tests stay fast
pub fn fast_client_config() -> ClientConfig {
    ClientConfig::default().with_retry(RetryConfig {
        max_retries: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
    })
}

/// Lifecycle settings polling every millisecond
#[allow(dead_code)]
pub fn fast_lifecycle_config() -> LifecycleConfig {
    LifecycleConfig {
        timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(1),
    }
}

/// Memory backend with the `UserModel` table ready, plus a client for it
#[allow(dead_code)]
pub async fn memory_users() -> (MemoryBackend, DocumentClient<UserModel, MemoryBackend>) {
    init_tracing();

    let backend = MemoryBackend::new();
    TableManager::new(backend.clone())
        .ensure_table_for::<UserModel>()
        .await
        .unwrap();

    let client = DocumentClient::new(backend.clone())
        .unwrap()
        .with_config(fast_client_config());

    (backend, client)
}

/// Composite key shorthand
#[allow(dead_code)]
pub fn key(id: &str, gender: &str) -> CompositeKey {
    CompositeKey::new(id, gender).unwrap()
}

/// Generate `count` users sharing one gender
#[allow(dead_code)]
pub fn sample_users(prefix: &str, count: usize) -> Vec<UserModel> {
    (0..count)
        .map(|i| UserModel {
            id: format!("{prefix}{i:04}"),
            gender: "man".to_string(),
            name: Some(format!("user {i}")),
            age: Some(i as u32),
        })
        .collect()
}
