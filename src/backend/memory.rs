use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::backend::{BatchGetResponse, StoreBackend, TableHandle, TableStatus, WriteOp};
use crate::error::BackendError;
use crate::model::{CompositeKey, Item, TableDescriptor};

/// In-process [`StoreBackend`] for tests and local tooling
///
/// State lives behind an `Arc<RwLock<_>>`, so clones share one store.
/// Besides plain storage it can:
/// - report tables as `Creating`/`Deleting` for a number of status checks
/// - leave batch items unprocessed or throttle whole batch calls
/// - refuse batch calls that carry a marked key
/// - answer batch gets in reverse request order
/// - count batch calls
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, MemoryTable>,
    transition_checks: usize,
    faults: Faults,
    calls: CallCounts,
}

#[derive(Debug)]
struct MemoryTable {
    descriptor: TableDescriptor,
    status: TableStatus,
    checks_left: usize,
    items: HashMap<CompositeKey, Item>,
}

#[derive(Debug, Default)]
struct Faults {
    rejected_items: usize,
    throttled_calls: usize,
    failing_keys: HashSet<CompositeKey>,
    reverse_batch_get: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct CallCounts {
    batch_write: usize,
    batch_get: usize,
}

impl MemoryBackend {
    /// Empty store where tables become active or absent immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store where created or deleted tables stay in transition for
    /// `checks` status queries before settling
    pub fn with_transition_checks(checks: usize) -> Self {
        let state = State {
            transition_checks: checks,
            ..State::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Leave the next `count` batch items unprocessed, taken from the tail of
    /// each batch call until the count is used up
    pub async fn reject_batch_items(&self, count: usize) {
        self.state.write().await.faults.rejected_items = count;
    }

    /// Fail the next `count` batch calls with a throttling error
    pub async fn throttle_batch_calls(&self, count: usize) {
        self.state.write().await.faults.throttled_calls = count;
    }

    /// Fail every batch call that carries `key` with an invalid-request
    /// error, before any of its items are applied
    pub async fn fail_batches_containing(&self, key: CompositeKey) {
        let _ = self.state.write().await.faults.failing_keys.insert(key);
    }

    /// Return batch get results in reverse request order
    pub async fn reverse_batch_get_responses(&self, reverse: bool) {
        self.state.write().await.faults.reverse_batch_get = reverse;
    }

    /// Number of batch write calls received so far
    pub async fn batch_write_calls(&self) -> usize {
        self.state.read().await.calls.batch_write
    }

    /// Number of batch get calls received so far
    pub async fn batch_get_calls(&self) -> usize {
        self.state.read().await.calls.batch_get
    }

    /// Number of items stored in an active table
    ///
    /// `None` while the table is absent or still creating or deleting.
    pub async fn item_count(&self, table: &str) -> Option<usize> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .filter(|t| t.status == TableStatus::Active)
            .map(|t| t.items.len())
    }
}

impl State {
    fn active_table(&mut self, name: &str) -> Result<&mut MemoryTable, BackendError> {
        match self.tables.get_mut(name) {
            Some(table) if table.status == TableStatus::Active => Ok(table),
            _ => Err(BackendError::TableNotFound {
                table: name.to_string(),
            }),
        }
    }

    fn take_throttle(&mut self, operation: &'static str) -> Result<(), BackendError> {
        if self.faults.throttled_calls > 0 {
            self.faults.throttled_calls -= 1;
            return Err(BackendError::Throttled {
                operation,
                message: "injected throttling".to_string(),
            });
        }
        Ok(())
    }

    /// Refuse the call when one of `items` carries a failing key
    fn check_failing_keys<'a>(
        &self,
        name: &str,
        items: impl IntoIterator<Item = &'a Item>,
    ) -> Result<(), BackendError> {
        let Some(table) = self.tables.get(name) else {
            return Ok(());
        };
        if self.faults.failing_keys.is_empty() {
            return Ok(());
        }

        for item in items {
            if self.faults.failing_keys.contains(&table.key_of(item)?) {
                return Err(BackendError::InvalidRequest(
                    "injected item rejection".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// How many of `len` items this call should leave unprocessed
    fn take_rejections(&mut self, len: usize) -> usize {
        let rejected = self.faults.rejected_items.min(len);
        self.faults.rejected_items -= rejected;
        rejected
    }
}

impl MemoryTable {
    fn key_of(&self, item: &Item) -> Result<CompositeKey, BackendError> {
        CompositeKey::from_attributes(
            item,
            &self.descriptor.partition_key_attr,
            &self.descriptor.sort_key_attr,
        )
        .map_err(|e| BackendError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn create_table(
        &self,
        descriptor: &TableDescriptor,
    ) -> Result<TableHandle, BackendError> {
        let mut state = self.state.write().await;

        if state.tables.contains_key(&descriptor.name) {
            return Err(BackendError::TableInUse {
                table: descriptor.name.clone(),
            });
        }

        let checks_left = state.transition_checks;
        let status = if checks_left == 0 {
            TableStatus::Active
        } else {
            TableStatus::Creating
        };

        let _ = state.tables.insert(
            descriptor.name.clone(),
            MemoryTable {
                descriptor: descriptor.clone(),
                status,
                checks_left,
                items: HashMap::new(),
            },
        );

        Ok(TableHandle {
            name: descriptor.name.clone(),
            status,
        })
    }

    async fn delete_table(&self, name: &str) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let checks = state.transition_checks;

        let table = state
            .tables
            .get_mut(name)
            .ok_or_else(|| BackendError::TableNotFound {
                table: name.to_string(),
            })?;

        if table.status != TableStatus::Active {
            return Err(BackendError::TableInUse {
                table: name.to_string(),
            });
        }

        if checks == 0 {
            let _ = state.tables.remove(name);
        } else {
            table.status = TableStatus::Deleting;
            table.checks_left = checks;
            table.items.clear();
        }

        Ok(())
    }

    async fn table_status(&self, name: &str) -> Result<Option<TableStatus>, BackendError> {
        let mut state = self.state.write().await;

        let Some(table) = state.tables.get_mut(name) else {
            return Ok(None);
        };

        if table.status == TableStatus::Active {
            return Ok(Some(TableStatus::Active));
        }

        let observed = table.status;
        table.checks_left = table.checks_left.saturating_sub(1);
        if table.checks_left == 0 {
            if observed == TableStatus::Deleting {
                let _ = state.tables.remove(name);
            } else {
                table.status = TableStatus::Active;
            }
        }

        Ok(Some(observed))
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let table = state.active_table(table)?;
        let key = table.key_of(&item)?;
        let _ = table.items.insert(key, item);
        Ok(())
    }

    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, BackendError> {
        let mut state = self.state.write().await;
        let table = state.active_table(table)?;
        let key = table.key_of(&key)?;
        Ok(table.items.get(&key).cloned())
    }

    async fn delete_item(&self, table: &str, key: Item) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        let table = state.active_table(table)?;
        let key = table.key_of(&key)?;
        let _ = table.items.remove(&key);
        Ok(())
    }

    async fn batch_write_items(
        &self,
        table: &str,
        mut ops: Vec<WriteOp>,
    ) -> Result<Vec<WriteOp>, BackendError> {
        let mut state = self.state.write().await;
        state.calls.batch_write += 1;
        let _ = state.active_table(table)?;
        state.take_throttle("BatchWriteItem")?;
        state.check_failing_keys(
            table,
            ops.iter().map(|op| match op {
                WriteOp::Put(item) | WriteOp::Delete(item) => item,
            }),
        )?;

        let rejected = state.take_rejections(ops.len());
        let unprocessed = ops.split_off(ops.len() - rejected);

        let table = state.active_table(table)?;
        for op in ops {
            match op {
                WriteOp::Put(item) => {
                    let key = table.key_of(&item)?;
                    let _ = table.items.insert(key, item);
                }
                WriteOp::Delete(key) => {
                    let key = table.key_of(&key)?;
                    let _ = table.items.remove(&key);
                }
            }
        }

        Ok(unprocessed)
    }

    async fn batch_get_items(
        &self,
        table: &str,
        mut keys: Vec<Item>,
    ) -> Result<BatchGetResponse, BackendError> {
        let mut state = self.state.write().await;
        state.calls.batch_get += 1;
        let _ = state.active_table(table)?;
        state.take_throttle("BatchGetItem")?;
        state.check_failing_keys(table, &keys)?;

        let rejected = state.take_rejections(keys.len());
        let unprocessed = keys.split_off(keys.len() - rejected);
        let reverse = state.faults.reverse_batch_get;

        let table = state.active_table(table)?;
        let mut items = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(item) = table.items.get(&table.key_of(key)?) {
                items.push(item.clone());
            }
        }

        if reverse {
            items.reverse();
        }

        Ok(BatchGetResponse { items, unprocessed })
    }
}
