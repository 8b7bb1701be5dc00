//! Error types for the schema registry.

use crate::types::ElementType;
use thiserror::Error;

/// Result type alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for schema registry operations.
///
/// Every failure mode the registration and query paths can raise is a
/// distinct variant here; there is no `anyhow::Error` at this crate's public
/// boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// The incoming Avro schema JSON is malformed or fails C1's
    /// well-formedness checks.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A record or field element was flattened without a non-empty `doc`.
    #[error("missing documentation on element(s): {0:?}")]
    MissingDoc(Vec<ElementType>),

    /// The Redshift-to-Avro converter was given a column/table type tag it
    /// does not recognize.
    #[error("unsupported source type: {0}")]
    UnsupportedType(String),

    /// The relational input to the converter was malformed (e.g. a primary
    /// key referencing a column that doesn't exist).
    #[error("schema conversion failed: {0}")]
    SchemaConversion(String),

    /// No converter is registered for the requested `(source_kind,
    /// target_kind)` pair.
    #[error("no converter registered for {source_kind} -> {target_kind}")]
    NoConverter {
        source_kind: String,
        target_kind: String,
    },

    /// A query by id/name found nothing.
    #[error("{0} not found: {1}")]
    EntityNotFound(&'static str, String),

    /// The store detected a duplicate-topic-name collision on insert. This
    /// indicates a hex-suffix collision on topic naming and is fatal: it is
    /// surfaced verbatim rather than retried.
    #[error("integrity violation: {0}")]
    IntegrityError(String),

    /// Any other persistence-layer failure; aborts the ambient transaction.
    #[error("storage error: {0}")]
    StorageError(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Avro schema parsing failure from `apache_avro`.
    #[error("avro error: {0}")]
    AvroError(#[from] apache_avro::Error),

    /// IO failure, e.g. reading a schema file.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Whether this error represents a lookup that found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::EntityNotFound(_, _))
    }

    /// Whether this is the fatal duplicate-topic-name integrity failure.
    /// Caught and converted to a re-fetch only for domains, never for
    /// topics.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, Error::IntegrityError(_))
    }
}
