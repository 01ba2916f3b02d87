use std::time::Duration;

use thiserror::Error as ThisError;

use crate::model::{CompositeKey, KeyRole, Record};

/// Errors surfaced by the document client, the table manager and the codecs
#[derive(Debug, ThisError)]
pub enum Error {
    /// A record or key failed validation before reaching the backend
    #[error("invalid record: {0}")]
    Validation(#[from] ValidationError),
    /// The backend rejected a call
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    /// Some batch items stayed unprocessed after the retry budget was spent
    #[error(transparent)]
    BatchPartialFailure(#[from] BatchPartialFailure),
    /// Seed data could not be decoded into the target record type
    #[error("seed data could not be decoded: {0}")]
    SeedDecode(#[from] SeedDecodeError),
    /// A table did not reach the requested state
    #[error("table lifecycle error: {0}")]
    TableLifecycle(#[from] TableLifecycleError),
    /// A record could not be mapped to or from store attributes
    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_dynamo::Error),
}

impl Error {
    /// Check if the error is a record validation failure
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Check if the error reports a missing table
    ///
    /// Operations against a dropped table fail this way instead of returning `None`.
    /// A batch stopped by a missing table counts as well.
    pub fn is_table_not_found(&self) -> bool {
        match self {
            Error::Backend(e) => e.is_table_not_found(),
            Error::BatchPartialFailure(failure) => failure
                .reason
                .as_ref()
                .is_some_and(BackendError::is_table_not_found),
            _ => false,
        }
    }

    /// Check if the error is a batch partial failure
    pub fn is_batch_partial_failure(&self) -> bool {
        matches!(self, Error::BatchPartialFailure(_))
    }

    /// Keys left unprocessed by a failed batch, empty for other errors
    pub fn unprocessed_keys(&self) -> &[CompositeKey] {
        match self {
            Error::BatchPartialFailure(failure) => &failure.keys,
            _ => &[],
        }
    }
}

/// Malformed record or key
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationError {
    /// A key attribute is not present on the item
    #[error("{role} key attribute `{attribute}` is missing")]
    MissingKey {
        /// Which key component is missing
        role: KeyRole,
        /// Attribute name declared for that component
        attribute: String,
    },
    /// A key component is the empty string
    #[error("{role} key must not be empty")]
    EmptyKey {
        /// Which key component is empty
        role: KeyRole,
    },
    /// A key attribute holds something other than a string
    #[error("key attribute `{attribute}` must be a string")]
    NonStringKey {
        /// Offending attribute name
        attribute: String,
    },
    /// The table schema itself is unusable
    #[error("invalid schema for table `{table}`: {reason}")]
    InvalidSchema {
        /// Table named by the schema
        table: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Backend rejection of a call
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum BackendError {
    /// The table does not exist (or is not active)
    #[error("table `{table}` not found")]
    TableNotFound {
        /// Table name
        table: String,
    },
    /// The table exists already or is mid-transition
    #[error("table `{table}` is in use")]
    TableInUse {
        /// Table name
        table: String,
    },
    /// Capacity or request-rate limits were exceeded
    #[error("{operation} throttled: {message}")]
    Throttled {
        /// Backend operation name
        operation: &'static str,
        /// Backend supplied detail
        message: String,
    },
    /// The request could not be built or was refused as malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Any other service or transport failure
    #[error("{operation} failed: {message}")]
    Service {
        /// Backend operation name
        operation: &'static str,
        /// Backend supplied detail
        message: String,
    },
}

impl BackendError {
    /// Check if the error belongs to the table-absent class
    pub fn is_table_not_found(&self) -> bool {
        matches!(self, BackendError::TableNotFound { .. })
    }

    /// Check if the error is a throttling rejection
    pub fn is_throttled(&self) -> bool {
        matches!(self, BackendError::Throttled { .. })
    }
}

impl From<aws_sdk_dynamodb::error::BuildError> for BackendError {
    fn from(e: aws_sdk_dynamodb::error::BuildError) -> Self {
        BackendError::InvalidRequest(e.to_string())
    }
}

/// Batch operation kind, used in failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchOperation {
    /// Batched upserts
    Put,
    /// Batched reads
    Get,
    /// Batched deletes
    Delete,
}

impl std::fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BatchOperation::Put => "put",
            BatchOperation::Get => "get",
            BatchOperation::Delete => "delete",
        })
    }
}

/// Items a batch left unwritten or unread
///
/// Raised when the retry budget runs out, or when a chunk fails outright; in
/// the latter case `reason` holds the backend failure and `keys` covers the
/// failed chunk plus whatever was still pending. Items of other chunks were
/// processed.
///
/// Puts and deletes are idempotent by key, so resubmitting `keys` (or
/// `records` for puts) is always safe.
#[derive(Debug, Clone, ThisError)]
#[error(
    "batch {operation} left {} item(s) unprocessed after {retries} retries",
    .keys.len()
)]
pub struct BatchPartialFailure {
    /// Which batch operation failed
    pub operation: BatchOperation,
    /// Keys still unprocessed, sorted
    pub keys: Vec<CompositeKey>,
    /// Records still unwritten; only populated for puts
    pub records: Vec<Record>,
    /// Retry rounds performed before giving up
    pub retries: usize,
    /// Backend failure that stopped the batch, `None` when retries ran out
    #[source]
    pub reason: Option<BackendError>,
}

/// Seed source does not decode into the target record type
#[derive(Debug, ThisError)]
pub enum SeedDecodeError {
    /// The source is not well-formed JSON for the target type
    #[error("malformed seed data: {0}")]
    Json(#[from] serde_json::Error),
    /// The source could not be read
    #[error("unable to read seed data: {0}")]
    Io(#[from] std::io::Error),
}

/// Table create or drop did not reach a terminal state
#[derive(Debug, ThisError)]
pub enum TableLifecycleError {
    /// Waiting for the terminal state exceeded the configured timeout
    #[error("timed out after {waited:?} waiting for table `{table}` to become {target}")]
    Timeout {
        /// Table name
        table: String,
        /// Terminal state that was awaited
        target: &'static str,
        /// Time spent waiting
        waited: Duration,
    },
    /// The backend refused a lifecycle call
    #[error("backend rejected {action} of table `{table}`")]
    Rejected {
        /// Table name
        table: String,
        /// Lifecycle step that failed
        action: &'static str,
        /// Backend failure
        #[source]
        source: BackendError,
    },
}
