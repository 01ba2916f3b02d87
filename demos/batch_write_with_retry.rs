//! Handling batch partial failures
//!
//! The client already retries unprocessed items with exponential backoff.
//! When the retry budget runs out it returns the leftover records, which can
//! be resubmitted safely since puts are idempotent by key.
//!
//! Runs against the in-process backend with injected rejections:
//! `cargo run --example batch_write_with_retry`

use docstore::{
    ClientConfig, Document, DocumentClient, Error, MemoryBackend, RetryConfig, TableManager,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Reading {
    sensor: String,
    taken_at: String,
    celsius: f64,
}

impl Document for Reading {
    const TABLE: &'static str = "readings";
    const PARTITION_KEY: &'static str = "sensor";
    const SORT_KEY: &'static str = "taken_at";

    fn partition_key(&self) -> String {
        self.sensor.clone()
    }

    fn sort_key(&self) -> String {
        self.taken_at.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("docstore=debug")
        .init();

    let backend = MemoryBackend::new();
    TableManager::new(backend.clone())
        .ensure_table_for::<Reading>()
        .await?;

    // A short budget so the injected rejections outlast it
    let config = ClientConfig::default().with_retry(RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(200),
    });
    let readings: DocumentClient<Reading, _> =
        DocumentClient::new(backend.clone())?.with_config(config);

    let batch: Vec<Reading> = (0..60)
        .map(|minute| Reading {
            sensor: format!("sensor-{}", minute % 3),
            taken_at: format!("2024-05-01T10:{minute:02}:00Z"),
            celsius: 20.0 + f64::from(minute) / 10.0,
        })
        .collect();

    backend.reject_batch_items(200).await;

    match readings.batch_put(&batch).await {
        Ok(summary) => println!("stored {} readings after {} retries", summary.items, summary.retries),
        Err(Error::BatchPartialFailure(failure)) => {
            println!(
                "{} readings left after {} retries, resubmitting",
                failure.keys.len(),
                failure.retries
            );
            let summary = readings.batch_put_records(failure.records).await?;
            println!("resubmitted {} readings", summary.items);
        }
        Err(other) => return Err(other),
    }

    println!(
        "table holds {} readings",
        backend.item_count("readings").await.unwrap_or_default()
    );
    Ok(())
}
