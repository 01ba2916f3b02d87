//! Storage backend capability
//!
//! [`StoreBackend`] is the boundary between the document client and a
//! concrete store. [`DynamoBackend`] talks to DynamoDB through the AWS SDK;
//! [`MemoryBackend`] keeps everything in process and can inject faults.

mod dynamo;
mod memory;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::model::{Item, TableDescriptor};

pub use dynamo::DynamoBackend;
pub use memory::MemoryBackend;

/// Observable state of an existing table; absence is reported as `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableStatus {
    /// Creation in progress
    Creating,
    /// Ready for item operations
    Active,
    /// Deletion in progress
    Deleting,
}

/// Table as reported right after a create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    /// Table name
    pub name: String,
    /// Status at creation time
    pub status: TableStatus,
}

/// One element of a batch write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Upsert a full item
    Put(Item),
    /// Delete the item with this key
    Delete(Item),
}

/// Outcome of one batch get call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetResponse {
    /// Items found, in no particular order
    pub items: Vec<Item>,
    /// Keys the backend did not get to
    pub unprocessed: Vec<Item>,
}

/// Table and item primitives a document client needs
///
/// Keys are attribute maps holding exactly the partition and sort key
/// attributes. Batch calls may leave part of the request unprocessed; the
/// caller decides whether to retry.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Create a table; fails with `TableInUse` if it already exists
    async fn create_table(&self, descriptor: &TableDescriptor)
    -> Result<TableHandle, BackendError>;

    /// Delete a table; fails with `TableNotFound` if it does not exist
    async fn delete_table(&self, name: &str) -> Result<(), BackendError>;

    /// Current table status, `None` when the table is absent
    async fn table_status(&self, name: &str) -> Result<Option<TableStatus>, BackendError>;

    /// Unconditionally replace the item at its key
    async fn put_item(&self, table: &str, item: Item) -> Result<(), BackendError>;

    /// Fetch an item by key
    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, BackendError>;

    /// Delete an item by key; deleting a missing key succeeds
    async fn delete_item(&self, table: &str, key: Item) -> Result<(), BackendError>;

    /// Apply puts and deletes, returning the operations left unprocessed
    async fn batch_write_items(
        &self,
        table: &str,
        ops: Vec<WriteOp>,
    ) -> Result<Vec<WriteOp>, BackendError>;

    /// Fetch several items by key; partial results are allowed
    async fn batch_get_items(
        &self,
        table: &str,
        keys: Vec<Item>,
    ) -> Result<BatchGetResponse, BackendError>;
}
