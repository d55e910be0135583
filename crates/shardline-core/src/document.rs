//! Generic structured document
//!
//! Every payload the client receives is a JSON document. Entities are built from
//! documents through serde; handlers that only need one or two fields use the
//! [`DocumentExt`] accessors instead of defining a struct.

use serde::de::DeserializeOwned;

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// A parsed JSON document
pub type Document = serde_json::Value;

/// Parse a document from its textual form
pub fn parse_document(text: &str) -> Result<Document, DomainError> {
    serde_json::from_str(text).map_err(DomainError::from)
}

/// Construct a typed value from a document
pub trait FromDocument: Sized {
    fn from_document(document: &Document) -> Result<Self, DomainError>;
}

impl<T: DeserializeOwned> FromDocument for T {
    fn from_document(document: &Document) -> Result<Self, DomainError> {
        T::deserialize(document).map_err(DomainError::from)
    }
}

/// Field lookup and typed extraction on a document
pub trait DocumentExt {
    /// Extract and deserialize a single field
    fn field<T: DeserializeOwned>(&self, key: &'static str) -> Result<T, DomainError>;

    /// Extract a field, treating a missing key or `null` as `None`
    fn opt_field<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, DomainError>;

    /// Extract a snowflake field
    fn snowflake(&self, key: &'static str) -> Result<Snowflake, DomainError> {
        self.field(key)
    }

    /// Whether the key is present and not `null`
    fn has_field(&self, key: &str) -> bool;
}

impl DocumentExt for Document {
    fn field<T: DeserializeOwned>(&self, key: &'static str) -> Result<T, DomainError> {
        let value = self.get(key).ok_or(DomainError::MissingField(key))?;
        T::deserialize(value).map_err(DomainError::from)
    }

    fn opt_field<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>, DomainError> {
        match self.get(key) {
            None | Some(Document::Null) => Ok(None),
            Some(value) => T::deserialize(value).map(Some).map_err(DomainError::from),
        }
    }

    fn has_field(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }
}
