use futures_util::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tokio_stream::{self as stream};
use tracing::{debug, warn};

use crate::backend::{StoreBackend, WriteOp};
use crate::client::helpers::{RetryBudget, distinct};
use crate::config::ClientConfig;
use crate::error::{BackendError, BatchOperation, BatchPartialFailure, Error};
use crate::model::{CompositeKey, Item, Record, TableSchema};

/// Metrics of a batch call that completed without leftovers
#[must_use = "batch summaries carry retry and call metrics that should be checked"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Distinct items sent to the backend
    pub items: usize,
    /// Backend batch calls issued, retries included
    pub backend_calls: usize,
    /// Retry rounds needed (0 when the first round processed everything)
    pub retries: usize,
    /// Total time including backoff
    pub total_duration: Duration,
}

/// Outcome of one round of chunked calls
///
/// Every chunk runs to completion; a chunk the backend refused outright lands
/// in `failed` and the first such error is kept as the reason.
#[derive(Debug)]
struct Round<P, F> {
    processed: Vec<P>,
    unprocessed: Vec<F>,
    failed: Vec<F>,
    error: Option<BackendError>,
    calls: usize,
}

impl<P, F> Round<P, F> {
    fn new(calls: usize) -> Self {
        Self {
            processed: Vec::new(),
            unprocessed: Vec::new(),
            failed: Vec::new(),
            error: None,
            calls,
        }
    }

    fn fail(&mut self, table: &str, chunk: Vec<F>, error: BackendError) {
        warn!(table, items = chunk.len(), %error, "batch chunk failed");
        self.failed.extend(chunk);
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Failed items followed by leftovers, when a chunk failed outright
    fn into_failure(self) -> Option<(Vec<F>, BackendError)> {
        let error = self.error?;
        let mut items = self.failed;
        items.extend(self.unprocessed);
        Some((items, error))
    }
}

/// Write every op, retrying unprocessed ones until done or out of budget
pub(super) async fn write_all<B: StoreBackend>(
    backend: &B,
    config: &ClientConfig,
    schema: &TableSchema,
    operation: BatchOperation,
    ops: Vec<WriteOp>,
) -> Result<BatchSummary, Error> {
    let items = ops.len();
    let mut budget = RetryBudget::new(config);
    let mut backend_calls = 0;
    let mut pending = ops;

    while !pending.is_empty() {
        let mut round = dispatch_writes(backend, config, schema.table(), pending).await;
        backend_calls += round.calls;
        pending = std::mem::take(&mut round.unprocessed);

        if let Some((mut failed, reason)) = round.into_failure() {
            // leftovers were moved out above; report them with the failed chunks
            failed.append(&mut pending);
            let failure = write_failure(schema, operation, failed, budget.retries(), Some(reason));
            return Err(failure.into());
        }

        if pending.is_empty() {
            break;
        }

        let Some(delay) = budget.next_delay() else {
            warn!(
                table = schema.table(),
                %operation,
                unprocessed = pending.len(),
                retries = budget.retries(),
                "batch write gave up on unprocessed items"
            );
            return Err(write_failure(schema, operation, pending, budget.retries(), None).into());
        };

        debug!(
            table = schema.table(),
            %operation,
            unprocessed = pending.len(),
            ?delay,
            "retrying unprocessed batch items"
        );
        sleep(delay).await;
    }

    Ok(BatchSummary {
        items,
        backend_calls,
        retries: budget.retries(),
        total_duration: budget.elapsed(),
    })
}

/// Issue one round of chunked batch writes; every chunk runs to completion
async fn dispatch_writes<B: StoreBackend>(
    backend: &B,
    config: &ClientConfig,
    table: &str,
    ops: Vec<WriteOp>,
) -> Round<(), WriteOp> {
    let batches: Vec<Vec<WriteOp>> = ops
        .chunks(config.batch_write_size.max(1))
        .map(|data| data.to_vec())
        .collect();

    let calls = batches.len();
    let concurrency = calls.min(config.concurrency).max(1);
    debug!(table, items = ops.len(), chunks = calls, "dispatching batch write");

    let outcomes: Vec<_> = stream::iter(batches.into_iter().map(|batch| async move {
        let result = backend.batch_write_items(table, batch.clone()).await;
        (batch, result)
    }))
    .buffer_unordered(concurrency)
    .collect()
    .await;

    let mut round = Round::new(calls);
    for (batch, result) in outcomes {
        match result {
            Ok(unprocessed) => round.unprocessed.extend(unprocessed),
            // A throttled call processed nothing
            Err(e) if e.is_throttled() => round.unprocessed.extend(batch),
            Err(e) => round.fail(table, batch, e),
        }
    }

    round
}

fn write_failure(
    schema: &TableSchema,
    operation: BatchOperation,
    pending: Vec<WriteOp>,
    retries: usize,
    reason: Option<BackendError>,
) -> BatchPartialFailure {
    let mut keys = Vec::with_capacity(pending.len());
    let mut records = Vec::new();

    for op in pending {
        match op {
            WriteOp::Put(item) => {
                if let Ok(record) = Record::from_item(item, schema) {
                    keys.push(record.key().clone());
                    records.push(record);
                }
            }
            WriteOp::Delete(key) => {
                if let Ok(key) =
                    CompositeKey::from_attributes(&key, schema.partition_key(), schema.sort_key())
                {
                    keys.push(key);
                }
            }
        }
    }

    keys.sort();
    records.sort_by(|a, b| a.key().cmp(b.key()));

    BatchPartialFailure {
        operation,
        keys,
        records,
        retries,
        reason,
    }
}

fn get_failure(
    schema: &TableSchema,
    pending: &[Item],
    retries: usize,
    reason: Option<BackendError>,
) -> BatchPartialFailure {
    let mut keys: Vec<CompositeKey> = pending
        .iter()
        .filter_map(|key| {
            CompositeKey::from_attributes(key, schema.partition_key(), schema.sort_key()).ok()
        })
        .collect();
    keys.sort();

    BatchPartialFailure {
        operation: BatchOperation::Get,
        keys,
        records: Vec::new(),
        retries,
        reason,
    }
}

/// Fetch every distinct key, retrying unprocessed ones
///
/// Returns the items found, keyed for re-alignment with the caller's order.
pub(super) async fn get_all<B: StoreBackend>(
    backend: &B,
    config: &ClientConfig,
    schema: &TableSchema,
    keys: &[CompositeKey],
) -> Result<HashMap<CompositeKey, Item>, Error> {
    let (partition_attr, sort_attr) = (schema.partition_key(), schema.sort_key());

    let mut pending: Vec<Item> = distinct(keys)
        .iter()
        .map(|key| key.to_attributes(partition_attr, sort_attr))
        .collect();

    let mut found = HashMap::with_capacity(pending.len());
    let mut budget = RetryBudget::new(config);

    while !pending.is_empty() {
        let mut round = dispatch_gets(backend, config, schema.table(), pending).await;

        for item in std::mem::take(&mut round.processed) {
            let key = CompositeKey::from_attributes(&item, partition_attr, sort_attr)?;
            let _ = found.insert(key, item);
        }
        pending = std::mem::take(&mut round.unprocessed);

        if let Some((mut failed, reason)) = round.into_failure() {
            failed.append(&mut pending);
            return Err(get_failure(schema, &failed, budget.retries(), Some(reason)).into());
        }

        if pending.is_empty() {
            break;
        }

        let Some(delay) = budget.next_delay() else {
            warn!(
                table = schema.table(),
                unprocessed = pending.len(),
                retries = budget.retries(),
                "batch get gave up on unprocessed keys"
            );
            return Err(get_failure(schema, &pending, budget.retries(), None).into());
        };

        debug!(
            table = schema.table(),
            unprocessed = pending.len(),
            ?delay,
            "retrying unprocessed batch keys"
        );
        sleep(delay).await;
    }

    Ok(found)
}

/// Issue one round of chunked batch gets, merging every chunk's response
async fn dispatch_gets<B: StoreBackend>(
    backend: &B,
    config: &ClientConfig,
    table: &str,
    keys: Vec<Item>,
) -> Round<Item, Item> {
    let batches: Vec<Vec<Item>> = keys
        .chunks(config.batch_read_size.max(1))
        .map(|data| data.to_vec())
        .collect();

    let calls = batches.len();
    let concurrency = calls.min(config.concurrency).max(1);
    debug!(table, keys = keys.len(), chunks = calls, "dispatching batch get");

    let outcomes: Vec<_> = stream::iter(batches.into_iter().map(|batch| async move {
        let result = backend.batch_get_items(table, batch.clone()).await;
        (batch, result)
    }))
    .buffer_unordered(concurrency)
    .collect()
    .await;

    let mut round = Round::new(calls);
    for (batch, result) in outcomes {
        match result {
            Ok(response) => {
                round.processed.extend(response.items);
                round.unprocessed.extend(response.unprocessed);
            }
            Err(e) if e.is_throttled() => round.unprocessed.extend(batch),
            Err(e) => round.fail(table, batch, e),
        }
    }

    round
}
