//! Typed document client
//!
//! [`DocumentClient`] binds one record type to one table and maps single and
//! batched CRUD onto a [`StoreBackend`]. Batches are split client-side to
//! the configured limits, chunks are sent concurrently, and items the
//! backend leaves unprocessed are retried with exponential backoff.

mod batch;
mod helpers;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::marker::PhantomData;
use std::path::Path;
use tracing::debug;

use crate::backend::{StoreBackend, WriteOp};
use crate::codec::Codec;
use crate::config::ClientConfig;
use crate::error::{BatchOperation, Error, SeedDecodeError};
use crate::model::{CompositeKey, Document, Item, Record, TableSchema};

pub use batch::BatchSummary;

use helpers::{dedupe_last_wins, distinct};

/// Client for the records of type `T` stored in one table
///
/// The backend session is owned by the client; pass a clone of a shared
/// backend to serve several record types over one connection.
///
/// ```rust
/// use docstore::{DocumentClient, MemoryBackend, TableManager};
/// use docstore::model::Document;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct User {
///     id: String,
///     gender: String,
///     age: u32,
/// }
///
/// impl Document for User {
///     const TABLE: &'static str = "users";
///     const PARTITION_KEY: &'static str = "id";
///     const SORT_KEY: &'static str = "gender";
///
///     fn partition_key(&self) -> String {
///         self.id.clone()
///     }
///
///     fn sort_key(&self) -> String {
///         self.gender.clone()
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), docstore::Error> {
/// let backend = MemoryBackend::new();
/// TableManager::new(backend.clone()).ensure_table_for::<User>().await?;
///
/// let users: DocumentClient<User, _> = DocumentClient::new(backend)?;
/// let user = User { id: "yama1010".into(), gender: "man".into(), age: 10 };
/// users.put(&user).await?;
///
/// assert_eq!(users.get("yama1010", "man").await?, Some(user));
/// # Ok(())
/// # }
/// ```
pub struct DocumentClient<T, B> {
    backend: B,
    schema: TableSchema,
    config: ClientConfig,
    _document: PhantomData<fn() -> T>,
}

impl<T, B> fmt::Debug for DocumentClient<T, B>
where
    B: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentClient")
            .field("backend", &self.backend)
            .field("schema", &self.schema)
            .field("config", &self.config)
            .finish()
    }
}

impl<T, B> DocumentClient<T, B>
where
    T: Document,
    B: StoreBackend,
{
    /// Client using the schema declared by `T` and default batching settings
    pub fn new(backend: B) -> Result<Self, Error> {
        Self::with_schema(backend, T::schema())
    }

    /// Delete the stored item matching this document's key
    pub async fn delete_document(&self, document: &T) -> Result<(), Error> {
        let key = document.composite_key()?;
        self.delete(&key).await
    }
}

impl<T, B> DocumentClient<T, B>
where
    T: Serialize + DeserializeOwned,
    B: StoreBackend,
{
    /// Client bound to an explicit schema
    ///
    /// Fails if the schema is malformed (empty names, identical key attributes).
    pub fn with_schema(backend: B, schema: TableSchema) -> Result<Self, Error> {
        schema.validate()?;
        Ok(Self {
            backend,
            schema,
            config: ClientConfig::default(),
            _document: PhantomData,
        })
    }

    /// Replace the batching and retry settings
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Schema of the bound table
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Batching and retry settings
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Backend session
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Upsert one document; an existing item at the same key is replaced
    pub async fn put(&self, document: &T) -> Result<(), Error> {
        let record = Record::from_document(document, &self.schema)?;
        self.put_record(record).await
    }

    /// Upsert one record
    pub async fn put_record(&self, record: Record) -> Result<(), Error> {
        debug!(table = self.schema.table(), key = %record.key(), "put");
        self.backend
            .put_item(self.schema.table(), record.into_item(&self.schema))
            .await?;
        Ok(())
    }

    /// Fetch one document; `Ok(None)` when no item has this key
    pub async fn get(
        &self,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Result<Option<T>, Error> {
        let key = CompositeKey::new(partition_key, sort_key)?;
        self.get_by_key(&key).await
    }

    /// Fetch one document by composite key
    pub async fn get_by_key(&self, key: &CompositeKey) -> Result<Option<T>, Error> {
        self.get_record(key)
            .await?
            .map(|record| record.into_document(&self.schema))
            .transpose()
    }

    /// Fetch one record by composite key
    pub async fn get_record(&self, key: &CompositeKey) -> Result<Option<Record>, Error> {
        let item = self
            .backend
            .get_item(self.schema.table(), self.key_item(key))
            .await?;

        Ok(item
            .map(|item| Record::from_item(item, &self.schema))
            .transpose()?)
    }

    /// Delete one item; deleting a missing key succeeds
    pub async fn delete(&self, key: &CompositeKey) -> Result<(), Error> {
        debug!(table = self.schema.table(), %key, "delete");
        self.backend
            .delete_item(self.schema.table(), self.key_item(key))
            .await?;
        Ok(())
    }

    /// Upsert many documents
    ///
    /// Every document is converted and validated before anything is sent.
    /// When two documents share a key the later one wins.
    pub async fn batch_put(&self, documents: &[T]) -> Result<BatchSummary, Error> {
        let records = documents
            .iter()
            .map(|document| Record::from_document(document, &self.schema))
            .collect::<Result<Vec<_>, _>>()?;

        self.batch_put_records(records).await
    }

    /// Upsert many records; the later of two records sharing a key wins
    pub async fn batch_put_records(&self, records: Vec<Record>) -> Result<BatchSummary, Error> {
        let entries = records
            .into_iter()
            .map(|record| (record.key().clone(), record))
            .collect();

        let ops = dedupe_last_wins(entries)
            .into_iter()
            .map(|(_, record)| WriteOp::Put(record.into_item(&self.schema)))
            .collect();

        batch::write_all(
            &self.backend,
            &self.config,
            &self.schema,
            BatchOperation::Put,
            ops,
        )
        .await
    }

    /// Fetch many documents, one slot per requested key in request order
    pub async fn batch_get(&self, keys: &[CompositeKey]) -> Result<Vec<Option<T>>, Error> {
        self.batch_get_records(keys)
            .await?
            .into_iter()
            .map(|record| {
                record
                    .map(|record| record.into_document(&self.schema))
                    .transpose()
            })
            .collect()
    }

    /// Fetch many records, one slot per requested key in request order
    pub async fn batch_get_records(
        &self,
        keys: &[CompositeKey],
    ) -> Result<Vec<Option<Record>>, Error> {
        let found = batch::get_all(&self.backend, &self.config, &self.schema, keys).await?;

        keys.iter()
            .map(|key| {
                found
                    .get(key)
                    .cloned()
                    .map(|item| Record::from_item(item, &self.schema))
                    .transpose()
                    .map_err(Error::from)
            })
            .collect()
    }

    /// Fetch many documents grouped under the table name
    ///
    /// Keys without a stored item are left out. The map always holds the
    /// table entry, possibly empty.
    pub async fn batch_load(&self, keys: &[CompositeKey]) -> Result<HashMap<String, Vec<T>>, Error> {
        let documents = self
            .batch_get(keys)
            .await?
            .into_iter()
            .flatten()
            .collect();

        let mut loaded = HashMap::with_capacity(1);
        let _ = loaded.insert(self.schema.table().to_string(), documents);
        Ok(loaded)
    }

    /// Delete many items; missing keys are not an error
    pub async fn batch_delete(&self, keys: &[CompositeKey]) -> Result<BatchSummary, Error> {
        let ops = distinct(keys)
            .iter()
            .map(|key| WriteOp::Delete(self.key_item(key)))
            .collect();

        batch::write_all(
            &self.backend,
            &self.config,
            &self.schema,
            BatchOperation::Delete,
            ops,
        )
        .await
    }

    /// Decode seed data and write it with [`batch_put`](Self::batch_put)
    ///
    /// Decoding is all-or-nothing: a malformed source or a record with an
    /// invalid key fails before the first write. Returns the number of
    /// distinct records written; seed entries sharing a key count once.
    pub async fn load_seed_data<R, C>(&self, source: R, codec: &C) -> Result<usize, Error>
    where
        R: Read,
        C: Codec<T>,
    {
        let documents = codec.decode(source)?;
        let summary = self.batch_put(&documents).await?;

        debug!(
            table = self.schema.table(),
            decoded = documents.len(),
            written = summary.items,
            retries = summary.retries,
            "seed data loaded"
        );

        Ok(summary.items)
    }

    /// Read a seed file and load it with [`load_seed_data`](Self::load_seed_data)
    ///
    /// The whole file is read before decoding starts.
    pub async fn load_seed_file<P, C>(&self, path: P, codec: &C) -> Result<usize, Error>
    where
        P: AsRef<Path>,
        C: Codec<T>,
    {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(SeedDecodeError::from)?;
        self.load_seed_data(bytes.as_slice(), codec).await
    }

    fn key_item(&self, key: &CompositeKey) -> Item {
        key.to_attributes(self.schema.partition_key(), self.schema.sort_key())
    }
}
