use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, DeleteRequest, KeySchemaElement, KeyType, KeysAndAttributes,
    ProvisionedThroughput, PutRequest, ScalarAttributeType, TableStatus as SdkTableStatus,
    WriteRequest,
};
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use std::error::Error as StdError;

use crate::backend::{BatchGetResponse, StoreBackend, TableHandle, TableStatus, WriteOp};
use crate::config::ConnectionConfig;
use crate::error::BackendError;
use crate::model::{Item, TableDescriptor};

/// [`StoreBackend`] over the DynamoDB SDK client
///
/// The SDK client is cheap to clone and safe to share, so clones of this
/// backend can serve any number of document clients and table managers.
#[derive(Debug, Clone)]
pub struct DynamoBackend {
    client: Client,
}

impl DynamoBackend {
    /// Wrap an already configured SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the connection settings
    ///
    /// ```rust,no_run
    /// use docstore::{ConnectionConfig, DynamoBackend};
    ///
    /// # async fn example() {
    /// let backend = DynamoBackend::connect(&ConnectionConfig::local()).await;
    /// # let _ = backend;
    /// # }
    /// ```
    pub async fn connect(config: &ConnectionConfig) -> Self {
        let sdk_config = config.sdk_config().await;
        Self::new(Client::new(&sdk_config))
    }

    /// Underlying SDK client, for operations outside this crate
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Map an SDK failure onto the backend error taxonomy by service error code
fn map_sdk_error<E>(err: SdkError<E, Response>, operation: &'static str, table: &str) -> BackendError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
{
    let code = err.as_service_error().and_then(|e| e.code()).map(str::to_owned);
    let message = DisplayErrorContext(&err).to_string();

    match code.as_deref() {
        Some("ResourceNotFoundException") => BackendError::TableNotFound {
            table: table.to_string(),
        },
        Some("ResourceInUseException") => BackendError::TableInUse {
            table: table.to_string(),
        },
        Some(
            "ProvisionedThroughputExceededException"
            | "RequestLimitExceeded"
            | "ThrottlingException",
        ) => BackendError::Throttled { operation, message },
        Some("ValidationException") => BackendError::InvalidRequest(message),
        _ => BackendError::Service { operation, message },
    }
}

fn status_from_sdk(status: &SdkTableStatus) -> TableStatus {
    match status {
        SdkTableStatus::Creating => TableStatus::Creating,
        SdkTableStatus::Deleting => TableStatus::Deleting,
        _ => TableStatus::Active,
    }
}

fn write_request(op: WriteOp) -> Result<WriteRequest, BackendError> {
    let request = match op {
        WriteOp::Put(item) => WriteRequest::builder()
            .put_request(PutRequest::builder().set_item(Some(item)).build()?)
            .build(),
        WriteOp::Delete(key) => WriteRequest::builder()
            .delete_request(DeleteRequest::builder().set_key(Some(key)).build()?)
            .build(),
    };
    Ok(request)
}

#[async_trait]
impl StoreBackend for DynamoBackend {
    async fn create_table(
        &self,
        descriptor: &TableDescriptor,
    ) -> Result<TableHandle, BackendError> {
        let capacity = descriptor.provisioned_capacity;

        let output = self
            .client
            .create_table()
            .table_name(&descriptor.name)
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(&descriptor.partition_key_attr)
                    .key_type(KeyType::Hash)
                    .build()?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(&descriptor.sort_key_attr)
                    .key_type(KeyType::Range)
                    .build()?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(&descriptor.partition_key_attr)
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(&descriptor.sort_key_attr)
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            )
            .provisioned_throughput(
                ProvisionedThroughput::builder()
                    .read_capacity_units(capacity.read_units)
                    .write_capacity_units(capacity.write_units)
                    .build()?,
            )
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "CreateTable", &descriptor.name))?;

        let status = output
            .table_description()
            .and_then(|table| table.table_status());

        Ok(TableHandle {
            name: descriptor.name.clone(),
            status: status.map_or(TableStatus::Creating, status_from_sdk),
        })
    }

    async fn delete_table(&self, name: &str) -> Result<(), BackendError> {
        let _ = self
            .client
            .delete_table()
            .table_name(name)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DeleteTable", name))?;
        Ok(())
    }

    async fn table_status(&self, name: &str) -> Result<Option<TableStatus>, BackendError> {
        match self.client.describe_table().table_name(name).send().await {
            Ok(output) => Ok(output
                .table()
                .map(|table| table.table_status().map_or(TableStatus::Active, status_from_sdk))),
            Err(e) => match map_sdk_error(e, "DescribeTable", name) {
                BackendError::TableNotFound { .. } => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), BackendError> {
        let _ = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "PutItem", table))?;
        Ok(())
    }

    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>, BackendError> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "GetItem", table))?;
        Ok(output.item)
    }

    async fn delete_item(&self, table: &str, key: Item) -> Result<(), BackendError> {
        let _ = self
            .client
            .delete_item()
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DeleteItem", table))?;
        Ok(())
    }

    async fn batch_write_items(
        &self,
        table: &str,
        ops: Vec<WriteOp>,
    ) -> Result<Vec<WriteOp>, BackendError> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }

        let requests = ops
            .into_iter()
            .map(write_request)
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "BatchWriteItem", table))?;

        let mut unprocessed = Vec::new();
        if let Some(requests) = output.unprocessed_items.and_then(|mut u| u.remove(table)) {
            for request in requests {
                if let Some(put_request) = request.put_request {
                    unprocessed.push(WriteOp::Put(put_request.item));
                }
                if let Some(delete_request) = request.delete_request {
                    unprocessed.push(WriteOp::Delete(delete_request.key));
                }
            }
        }

        Ok(unprocessed)
    }

    async fn batch_get_items(
        &self,
        table: &str,
        keys: Vec<Item>,
    ) -> Result<BatchGetResponse, BackendError> {
        if keys.is_empty() {
            return Ok(BatchGetResponse::default());
        }

        let request = KeysAndAttributes::builder().set_keys(Some(keys)).build()?;

        let output = self
            .client
            .batch_get_item()
            .request_items(table, request)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "BatchGetItem", table))?;

        Ok(BatchGetResponse {
            items: output
                .responses
                .and_then(|mut r| r.remove(table))
                .unwrap_or_default(),
            unprocessed: output
                .unprocessed_keys
                .and_then(|mut u| u.remove(table))
                .map(|pending| pending.keys)
                .unwrap_or_default(),
        })
    }
}
