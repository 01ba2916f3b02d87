use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::model::CompositeKey;

/// Read/write capacity requested when a table is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProvisionedCapacity {
    /// Read capacity units
    pub read_units: i64,
    /// Write capacity units
    pub write_units: i64,
}

impl Default for ProvisionedCapacity {
    fn default() -> Self {
        Self {
            read_units: 1,
            write_units: 1,
        }
    }
}

/// Everything a backend needs to create the table for one record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Table name
    pub name: String,
    /// Partition key attribute name
    pub partition_key_attr: String,
    /// Sort key attribute name
    pub sort_key_attr: String,
    /// Capacity requested at creation
    pub provisioned_capacity: ProvisionedCapacity,
}

/// Declared shape of a record type: table, key roles and attribute names
///
/// Built once per record type and shared by the document client and the
/// table manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    table: String,
    partition_key: String,
    sort_key: String,
    attributes: Vec<String>,
    capacity: ProvisionedCapacity,
}

impl TableSchema {
    /// Schema with the given table and key attribute names
    pub fn new(
        table: impl Into<String>,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
            attributes: Vec::new(),
            capacity: ProvisionedCapacity::default(),
        }
    }

    /// Declare the attribute names of the record type
    ///
    /// When declared, attributes outside this list are dropped while reading
    /// items back. Key attribute names are always kept.
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Override the capacity requested at table creation
    pub fn with_capacity(mut self, read_units: i64, write_units: i64) -> Self {
        self.capacity = ProvisionedCapacity {
            read_units,
            write_units,
        };
        self
    }

    /// Table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Partition key attribute name
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// Sort key attribute name
    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    /// Declared attribute names, empty when undeclared
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Whether an attribute survives reads under this schema
    pub fn declares(&self, attribute: &str) -> bool {
        self.attributes.is_empty()
            || attribute == self.partition_key
            || attribute == self.sort_key
            || self.attributes.iter().any(|a| a == attribute)
    }

    /// Table descriptor derived from this schema
    pub fn descriptor(&self) -> TableDescriptor {
        TableDescriptor {
            name: self.table.clone(),
            partition_key_attr: self.partition_key.clone(),
            sort_key_attr: self.sort_key.clone(),
            provisioned_capacity: self.capacity,
        }
    }

    /// Check names are present, key roles are distinct and attributes unique
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidSchema {
            table: self.table.clone(),
            reason: reason.to_string(),
        };

        if self.table.is_empty() {
            return Err(invalid("table name is empty"));
        }
        if self.partition_key.is_empty() || self.sort_key.is_empty() {
            return Err(invalid("key attribute names must not be empty"));
        }
        if self.partition_key == self.sort_key {
            return Err(invalid("partition and sort key must be different attributes"));
        }
        if self.capacity.read_units < 1 || self.capacity.write_units < 1 {
            return Err(invalid("provisioned capacity must be at least one unit"));
        }

        let mut seen = HashSet::with_capacity(self.attributes.len());
        for attribute in &self.attributes {
            if !seen.insert(attribute.as_str()) {
                return Err(invalid(&format!("attribute `{attribute}` declared twice")));
            }
        }

        Ok(())
    }
}

/// Typed record stored under a composite key
///
/// Replaces annotation-driven mapping with explicit constants; the schema
/// derived from them drives both table creation and item conversion.
///
/// ```
/// use docstore::model::Document;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct User {
///     id: String,
///     gender: String,
///     #[serde(default, skip_serializing_if = "Option::is_none")]
///     name: Option<String>,
/// }
///
/// impl Document for User {
///     const TABLE: &'static str = "UserModel";
///     const PARTITION_KEY: &'static str = "id";
///     const SORT_KEY: &'static str = "gender";
///     const ATTRIBUTES: &'static [&'static str] = &["id", "gender", "name"];
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
/// assert_eq!(User::schema().descriptor().sort_key_attr, "gender");
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// Name of the backing table
    const TABLE: &'static str;

    /// Partition key attribute name
    const PARTITION_KEY: &'static str;

    /// Sort key attribute name
    const SORT_KEY: &'static str;

    /// Attribute names, keys included; empty keeps every attribute
    const ATTRIBUTES: &'static [&'static str] = &[];

    /// Partition key value
    fn partition_key(&self) -> String;

    /// Sort key value
    fn sort_key(&self) -> String;

    /// Validated composite key
    fn composite_key(&self) -> Result<CompositeKey, ValidationError> {
        CompositeKey::new(self.partition_key(), self.sort_key())
    }

    /// Schema derived from the declared constants
    fn schema() -> TableSchema {
        TableSchema::new(Self::TABLE, Self::PARTITION_KEY, Self::SORT_KEY)
            .with_attributes(Self::ATTRIBUTES.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_is_derived_from_schema() {
        let schema = TableSchema::new("UserModel", "id", "gender").with_capacity(5, 2);
        let descriptor = schema.descriptor();

        assert_eq!(descriptor.name, "UserModel");
        assert_eq!(descriptor.partition_key_attr, "id");
        assert_eq!(descriptor.sort_key_attr, "gender");
        assert_eq!(
            descriptor.provisioned_capacity,
            ProvisionedCapacity {
                read_units: 5,
                write_units: 2
            }
        );
        assert_eq!(schema.descriptor(), descriptor);
    }

    #[test]
    fn test_default_capacity_is_one_unit() {
        let descriptor = TableSchema::new("t", "pk", "sk").descriptor();
        assert_eq!(descriptor.provisioned_capacity, ProvisionedCapacity::default());
    }

    #[test]
    fn test_validate() {
        assert!(TableSchema::new("t", "pk", "sk").validate().is_ok());
        assert!(TableSchema::new("", "pk", "sk").validate().is_err());
        assert!(TableSchema::new("t", "pk", "pk").validate().is_err());
        assert!(TableSchema::new("t", "pk", "").validate().is_err());
        assert!(
            TableSchema::new("t", "pk", "sk")
                .with_attributes(["a", "a"])
                .validate()
                .is_err()
        );
        assert!(
            TableSchema::new("t", "pk", "sk")
                .with_capacity(0, 1)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_declares() {
        let open = TableSchema::new("t", "pk", "sk");
        assert!(open.declares("anything"));

        let closed = TableSchema::new("t", "pk", "sk").with_attributes(["name"]);
        assert!(closed.declares("pk"));
        assert!(closed.declares("sk"));
        assert!(closed.declares("name"));
        assert!(!closed.declares("age"));
    }
}
