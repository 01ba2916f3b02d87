use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::{from_item, to_item};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::error::{Error, ValidationError};
use crate::model::{CompositeKey, Item, TableSchema};

/// Untyped stored item: a composite key plus named attributes
///
/// Equality and hashing consider the key only, so two records with the same
/// key but different attributes are the same store item. Attributes never
/// include the key attributes themselves; an attribute missing from the map
/// is absent, which is distinct from an attribute holding `Null`.
#[derive(Debug, Clone)]
pub struct Record {
    key: CompositeKey,
    attributes: HashMap<String, AttributeValue>,
}

impl Record {
    /// Record with no attributes
    pub fn new(key: CompositeKey) -> Self {
        Self {
            key,
            attributes: HashMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        let _ = self.attributes.insert(name.into(), value);
        self
    }

    /// Composite key
    pub fn key(&self) -> &CompositeKey {
        &self.key
    }

    /// Partition key value
    pub fn partition_key(&self) -> &str {
        self.key.partition_key()
    }

    /// Sort key value
    pub fn sort_key(&self) -> &str {
        self.key.sort_key()
    }

    /// All non-key attributes
    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.attributes
    }

    /// A single attribute, `None` when absent
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Replace the whole attribute set, returning the previous one
    pub fn replace_attributes(
        &mut self,
        attributes: HashMap<String, AttributeValue>,
    ) -> HashMap<String, AttributeValue> {
        std::mem::replace(&mut self.attributes, attributes)
    }

    /// Split a stored item into key and attributes
    ///
    /// Attributes the schema does not declare are dropped.
    pub fn from_item(mut item: Item, schema: &TableSchema) -> Result<Self, ValidationError> {
        let key = CompositeKey::from_attributes(&item, schema.partition_key(), schema.sort_key())?;
        let _ = item.remove(schema.partition_key());
        let _ = item.remove(schema.sort_key());
        item.retain(|name, _| schema.declares(name));

        Ok(Self {
            key,
            attributes: item,
        })
    }

    /// Full stored item, key attributes included
    pub fn into_item(self, schema: &TableSchema) -> Item {
        let mut item = self
            .key
            .to_attributes(schema.partition_key(), schema.sort_key());
        item.extend(self.attributes);
        item
    }

    /// Serialize a typed document into a validated record
    pub fn from_document<T: Serialize>(document: &T, schema: &TableSchema) -> Result<Self, Error> {
        let item: Item = to_item(document)?;
        Ok(Self::from_item(item, schema)?)
    }

    /// Deserialize the record back into a typed document
    pub fn into_document<T: DeserializeOwned>(self, schema: &TableSchema) -> Result<T, Error> {
        Ok(from_item(self.into_item(schema))?)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashSet;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: String,
        gender: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        age: Option<u32>,
    }

    fn schema() -> TableSchema {
        TableSchema::new("UserModel", "id", "gender").with_attributes(["name", "age"])
    }

    fn key(pk: &str, sk: &str) -> CompositeKey {
        CompositeKey::new(pk, sk).unwrap()
    }

    #[test]
    fn test_identity_ignores_attributes() {
        let a = Record::new(key("yama1010", "man")).with_attribute("age", AttributeValue::N("10".into()));
        let b = Record::new(key("yama1010", "man")).with_attribute("age", AttributeValue::N("99".into()));
        let c = Record::new(key("yama1010", "woman"));

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Record> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_document_round_trip_keeps_absent_attributes_absent() {
        let user = User {
            id: "yama1010".into(),
            gender: "man".into(),
            name: Some("yamada".into()),
            age: None,
        };

        let record = Record::from_document(&user, &schema()).unwrap();
        assert_eq!(record.partition_key(), "yama1010");
        assert_eq!(record.sort_key(), "man");
        assert_eq!(record.attribute("name"), Some(&AttributeValue::S("yamada".into())));
        assert!(record.attribute("age").is_none());
        assert!(record.attribute("id").is_none());

        let back: User = record.into_document(&schema()).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_undeclared_attributes_dropped() {
        let mut item = key("mori9910", "man").to_attributes("id", "gender");
        let _ = item.insert("nickname".into(), AttributeValue::S("mori".into()));
        let _ = item.insert("age".into(), AttributeValue::N("20".into()));

        let record = Record::from_item(item, &schema()).unwrap();
        assert!(record.attribute("nickname").is_none());
        assert_eq!(record.attribute("age"), Some(&AttributeValue::N("20".into())));
    }

    #[test]
    fn test_empty_key_rejected() {
        let user = User {
            id: String::new(),
            gender: "man".into(),
            name: None,
            age: None,
        };

        let err = Record::from_document(&user, &schema()).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_replace_attributes() {
        let mut record =
            Record::new(key("yama1010", "man")).with_attribute("age", AttributeValue::N("10".into()));
        let previous = record.replace_attributes(HashMap::new());

        assert_eq!(previous.len(), 1);
        assert!(record.attributes().is_empty());
    }
}
