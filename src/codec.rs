//! Seed data decoding
//!
//! A [`Codec`] turns a byte stream into the records of one type. The client
//! receives the codec per call, so seed loading needs no runtime type
//! introspection.

use serde::de::DeserializeOwned;
use std::io::{BufReader, Read};

use crate::error::SeedDecodeError;

/// Decodes a byte stream into a sequence of `T`
pub trait Codec<T> {
    /// Decode the whole source; any malformed element fails the entire decode
    fn decode<R: Read>(&self, source: R) -> Result<Vec<T>, SeedDecodeError>;
}

/// UTF-8 JSON array codec
///
/// Each array element is an object whose field names match the record's
/// attribute names. Unknown fields are ignored and missing optional fields
/// decode as absent, following the record type's serde attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T: DeserializeOwned> Codec<T> for JsonCodec {
    fn decode<R: Read>(&self, source: R) -> Result<Vec<T>, SeedDecodeError> {
        Ok(serde_json::from_reader(BufReader::new(source))?)
    }
}
