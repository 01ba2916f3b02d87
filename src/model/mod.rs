mod key;
mod record;
mod schema;

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

pub use key::{CompositeKey, KeyRole};
pub use record::Record;
pub use schema::{Document, ProvisionedCapacity, TableDescriptor, TableSchema};

/// Attribute map as exchanged with a store backend
pub type Item = HashMap<String, AttributeValue>;
