use aws_sdk_dynamodb::types::AttributeValue;
use serde::Serialize;
use std::fmt;

use crate::error::ValidationError;
use crate::model::Item;

/// Component of a composite key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// Partition (hash) key
    Partition,
    /// Sort (range) key
    Sort,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyRole::Partition => "partition",
            KeyRole::Sort => "sort",
        })
    }
}

/// Validated `(partition key, sort key)` pair identifying one stored item
///
/// Both components are non-empty strings. Two records denote the same item
/// exactly when their composite keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CompositeKey {
    partition: String,
    sort: String,
}

impl CompositeKey {
    /// Build a key, rejecting empty components
    pub fn new(
        partition: impl Into<String>,
        sort: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let partition = partition.into();
        let sort = sort.into();

        if partition.is_empty() {
            return Err(ValidationError::EmptyKey {
                role: KeyRole::Partition,
            });
        }
        if sort.is_empty() {
            return Err(ValidationError::EmptyKey {
                role: KeyRole::Sort,
            });
        }

        Ok(Self { partition, sort })
    }

    /// Partition key value
    pub fn partition_key(&self) -> &str {
        &self.partition
    }

    /// Sort key value
    pub fn sort_key(&self) -> &str {
        &self.sort
    }

    /// Read the key out of an attribute map using the given attribute names
    pub fn from_attributes(
        item: &Item,
        partition_attr: &str,
        sort_attr: &str,
    ) -> Result<Self, ValidationError> {
        let partition = string_attribute(item, partition_attr, KeyRole::Partition)?;
        let sort = string_attribute(item, sort_attr, KeyRole::Sort)?;
        Self::new(partition, sort)
    }

    /// Attribute map holding only this key
    pub fn to_attributes(&self, partition_attr: &str, sort_attr: &str) -> Item {
        let mut item = Item::with_capacity(2);
        let _ = item.insert(
            partition_attr.to_string(),
            AttributeValue::S(self.partition.clone()),
        );
        let _ = item.insert(sort_attr.to_string(), AttributeValue::S(self.sort.clone()));
        item
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.partition, self.sort)
    }
}

fn string_attribute(item: &Item, name: &str, role: KeyRole) -> Result<String, ValidationError> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Ok(value.clone()),
        Some(_) => Err(ValidationError::NonStringKey {
            attribute: name.to_string(),
        }),
        None => Err(ValidationError::MissingKey {
            role,
            attribute: name.to_string(),
        }),
    }
}
