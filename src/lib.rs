//! # docstore
//!
//! A typed, batch-oriented document client for composite-key tables:
//! - Single-item put, get and delete keyed by partition and sort key
//! - Batch put, get and delete with client-side chunking
//! - Retry of unprocessed batch items with exponential backoff
//! - Seed data bulk loading through a pluggable [`Codec`]
//! - Idempotent table setup and teardown that waits for the table to settle
//!
//! ## Backends
//!
//! - [`DynamoBackend`]: DynamoDB through `aws-sdk-dynamodb`
//! - [`MemoryBackend`]: in-process store with fault injection, for tests
//!
//! ## Quick Start
//!
//! ```rust
//! use docstore::model::Document;
//! use docstore::{CompositeKey, DocumentClient, JsonCodec, MemoryBackend, TableManager};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct UserModel {
//!     id: String,
//!     gender: String,
//!     #[serde(default, skip_serializing_if = "Option::is_none")]
//!     name: Option<String>,
//! }
//!
//! impl Document for UserModel {
//!     const TABLE: &'static str = "UserModel";
//!     const PARTITION_KEY: &'static str = "id";
//!     const SORT_KEY: &'static str = "gender";
//!
//!     fn partition_key(&self) -> String {
//!         self.id.clone()
//!     }
//!
//!     fn sort_key(&self) -> String {
//!         self.gender.clone()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), docstore::Error> {
//!     let backend = MemoryBackend::new();
//!     let tables = TableManager::new(backend.clone());
//!     tables.ensure_table_for::<UserModel>().await?;
//!
//!     let users: DocumentClient<UserModel, _> = DocumentClient::new(backend)?;
//!     let seed = r#"[
//!         {"id": "yama1010", "gender": "man", "name": "yamada"},
//!         {"id": "mori9910", "gender": "man"}
//!     ]"#;
//!     assert_eq!(users.load_seed_data(seed.as_bytes(), &JsonCodec).await?, 2);
//!
//!     let keys = [
//!         CompositeKey::new("mori9910", "man")?,
//!         CompositeKey::new("nobody", "man")?,
//!     ];
//!     let found = users.batch_get(&keys).await?;
//!     assert_eq!(found[0].as_ref().map(|u| u.id.as_str()), Some("mori9910"));
//!     assert!(found[1].is_none());
//!
//!     tables.drop_table_for::<UserModel>().await?;
//!     Ok(())
//! }
//! ```
#![deny(
    warnings,
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]

mod error;
pub use error::{
    BackendError, BatchOperation, BatchPartialFailure, Error, SeedDecodeError,
    TableLifecycleError, ValidationError,
};

pub mod backend;

pub mod client;

pub mod codec;

pub mod config;

/// Records, keys and table schemas
pub mod model;

pub mod setup;

pub use backend::{DynamoBackend, MemoryBackend, StoreBackend, TableStatus};
pub use client::{BatchSummary, DocumentClient};
pub use codec::{Codec, JsonCodec};
pub use config::{ClientConfig, ConnectionConfig, LifecycleConfig, RetryConfig, StaticCredentials};
pub use model::{CompositeKey, Document, Record, TableDescriptor, TableSchema};
pub use setup::TableManager;

// Attribute values appear in `Record` attributes
pub use aws_sdk_dynamodb::types::AttributeValue;
