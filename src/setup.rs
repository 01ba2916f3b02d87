//! Table setup and teardown
//!
//! [`TableManager`] creates and drops the table behind a record type and
//! waits for the backend to settle. Both directions are idempotent and safe
//! when several callers race on the same table.

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::backend::{StoreBackend, TableStatus};
use crate::config::LifecycleConfig;
use crate::error::{BackendError, Error, TableLifecycleError};
use crate::model::{Document, TableDescriptor};

/// Terminal state a lifecycle call waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Active,
    Absent,
}

impl Target {
    fn as_str(self) -> &'static str {
        match self {
            Target::Active => "active",
            Target::Absent => "absent",
        }
    }
}

/// Idempotent create and drop of backing tables
#[derive(Debug, Clone)]
pub struct TableManager<B> {
    backend: B,
    config: LifecycleConfig,
}

impl<B: StoreBackend> TableManager<B> {
    /// Manager with the default wait bounds
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, LifecycleConfig::default())
    }

    /// Manager with explicit wait bounds
    pub fn with_config(backend: B, config: LifecycleConfig) -> Self {
        Self { backend, config }
    }

    /// Backend session
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Create the table for `T` if needed and wait until it is active
    pub async fn ensure_table_for<T: Document>(&self) -> Result<(), Error> {
        self.ensure_table(&T::schema().descriptor()).await
    }

    /// Drop the table for `T` if present and wait until it is gone
    pub async fn drop_table_for<T: Document>(&self) -> Result<(), Error> {
        self.drop_table(&T::schema().descriptor()).await
    }

    /// Create the table if absent and wait until it is active
    ///
    /// A table found `Deleting` is waited out and then recreated. A concurrent
    /// creator winning the race is not an error.
    pub async fn ensure_table(&self, descriptor: &TableDescriptor) -> Result<(), Error> {
        let table = descriptor.name.as_str();
        let started = Instant::now();

        loop {
            match self.status(table).await? {
                Some(TableStatus::Active) => {
                    debug!(table, elapsed = ?started.elapsed(), "table active");
                    return Ok(());
                }
                Some(status) => {
                    debug!(table, ?status, "waiting for table to settle");
                }
                None => match self.backend.create_table(descriptor).await {
                    Ok(handle) => {
                        debug!(table, status = ?handle.status, "table created");
                        if handle.status == TableStatus::Active {
                            return Ok(());
                        }
                    }
                    Err(BackendError::TableInUse { .. }) => {
                        debug!(table, "table created concurrently");
                    }
                    Err(source) => return Err(rejected(table, "create", source)),
                },
            }

            self.pause(table, Target::Active, started).await?;
        }
    }

    /// Delete the table if present and wait until it is gone
    ///
    /// Dropping an absent table succeeds. A table found `Creating` is waited
    /// out and then deleted.
    pub async fn drop_table(&self, descriptor: &TableDescriptor) -> Result<(), Error> {
        let table = descriptor.name.as_str();
        let started = Instant::now();

        loop {
            match self.status(table).await? {
                None => {
                    debug!(table, elapsed = ?started.elapsed(), "table absent");
                    return Ok(());
                }
                Some(TableStatus::Active) => match self.backend.delete_table(table).await {
                    Ok(()) => debug!(table, "table deletion requested"),
                    Err(BackendError::TableNotFound { .. }) => {
                        debug!(table, "table deleted concurrently");
                    }
                    Err(BackendError::TableInUse { .. }) => {
                        debug!(table, "table busy, retrying deletion");
                    }
                    Err(source) => return Err(rejected(table, "delete", source)),
                },
                Some(status) => {
                    debug!(table, ?status, "waiting for table to settle");
                }
            }

            self.pause(table, Target::Absent, started).await?;
        }
    }

    async fn status(&self, table: &str) -> Result<Option<TableStatus>, Error> {
        self.backend
            .table_status(table)
            .await
            .map_err(|source| rejected(table, "describe", source))
    }

    /// Sleep until the next poll, or fail once the timeout is spent
    async fn pause(&self, table: &str, target: Target, started: Instant) -> Result<(), Error> {
        let waited = started.elapsed();
        let Some(remaining) = self.config.timeout.checked_sub(waited).filter(|r| !r.is_zero())
        else {
            warn!(table, target = target.as_str(), ?waited, "table wait timed out");
            return Err(TableLifecycleError::Timeout {
                table: table.to_string(),
                target: target.as_str(),
                waited,
            }
            .into());
        };

        sleep(self.config.poll_interval.min(remaining).max(Duration::from_millis(1))).await;
        Ok(())
    }
}

fn rejected(table: &str, action: &'static str, source: BackendError) -> Error {
    TableLifecycleError::Rejected {
        table: table.to_string(),
        action,
        source,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::model::TableSchema;

    fn descriptor() -> TableDescriptor {
        TableSchema::new("UserModel", "id", "gender").descriptor()
    }

    fn fast() -> LifecycleConfig {
        LifecycleConfig {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_ensure_then_drop() {
        let backend = MemoryBackend::with_transition_checks(3);
        let manager = TableManager::with_config(backend.clone(), fast());

        manager.ensure_table(&descriptor()).await.unwrap();
        assert_eq!(
            backend.table_status("UserModel").await.unwrap(),
            Some(TableStatus::Active)
        );

        manager.drop_table(&descriptor()).await.unwrap();
        assert_eq!(backend.table_status("UserModel").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drop_absent_table_is_ok() {
        let manager = TableManager::with_config(MemoryBackend::new(), fast());
        manager.drop_table(&descriptor()).await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let backend = MemoryBackend::with_transition_checks(usize::MAX);
        let config = LifecycleConfig {
            timeout: Duration::from_millis(20),
            poll_interval: Duration::from_millis(5),
        };
        let manager = TableManager::with_config(backend, config);

        let err = manager.ensure_table(&descriptor()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::TableLifecycle(TableLifecycleError::Timeout { target: "active", .. })
        ));
    }
}
