//! Core type definitions shared across the registry crates.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an [`crate::entities::AvroSchema`].
///
/// This is a plain value object, not a state machine: any status can be set
/// directly through [`crate::traits::SchemaStore::set_schema_status`]. There
/// is no enforced transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvroSchemaStatus {
    /// The schema accepts new writes and is available for reads.
    ReadAndWrite,
    /// The schema is frozen for writes but still readable.
    ReadOnly,
    /// The schema is retired; excluded from topic-compatibility checks.
    Disabled,
}

impl std::fmt::Display for AvroSchemaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AvroSchemaStatus::ReadAndWrite => write!(f, "READ_AND_WRITE"),
            AvroSchemaStatus::ReadOnly => write!(f, "READ_ONLY"),
            AvroSchemaStatus::Disabled => write!(f, "DISABLED"),
        }
    }
}

impl AvroSchemaStatus {
    /// Whether a schema in this status still participates in topic-level
    /// compatibility checks.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AvroSchemaStatus::Disabled)
    }
}

/// The kind of node a [`crate::entities::SchemaElement`] was flattened from.
///
/// Only `Record` and `Field` carry the mandatory-doc invariant; the rest are
/// recorded for completeness but don't require documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Record,
    Field,
    Enum,
    Array,
    Map,
    Union,
    Fixed,
}

impl ElementType {
    /// Whether elements of this type must carry a non-empty `doc`.
    pub fn requires_doc(&self) -> bool {
        matches!(self, ElementType::Record | ElementType::Field)
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ElementType::Record => "record",
            ElementType::Field => "field",
            ElementType::Enum => "enum",
            ElementType::Array => "array",
            ElementType::Map => "map",
            ElementType::Union => "union",
            ElementType::Fixed => "fixed",
        };
        write!(f, "{s}")
    }
}

/// Names of the sidecar JSON properties the Redshift-to-Avro converter
/// attaches to record/field schemas to preserve SQL semantics Avro has no
/// native representation for.
pub mod sidecar {
    pub const PRIMARY_KEY: &str = "primary_key";
    pub const FIXED_PT: &str = "fixed_pt";
    pub const PRECISION: &str = "precision";
    pub const SCALE: &str = "scale";
    pub const FIX_LEN: &str = "fix_len";
    pub const MAX_LEN: &str = "max_len";
    pub const DATE: &str = "date";
    pub const TIME: &str = "time";
    pub const TIMESTAMP: &str = "timestamp";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_schemas_are_not_enabled() {
        assert!(AvroSchemaStatus::ReadAndWrite.is_enabled());
        assert!(AvroSchemaStatus::ReadOnly.is_enabled());
        assert!(!AvroSchemaStatus::Disabled.is_enabled());
    }

    #[test]
    fn only_record_and_field_require_doc() {
        assert!(ElementType::Record.requires_doc());
        assert!(ElementType::Field.requires_doc());
        assert!(!ElementType::Enum.requires_doc());
        assert!(!ElementType::Array.requires_doc());
        assert!(!ElementType::Map.requires_doc());
        assert!(!ElementType::Union.requires_doc());
        assert!(!ElementType::Fixed.requires_doc());
    }

    #[test]
    fn display_matches_spec_lowercase_names() {
        assert_eq!(ElementType::Record.to_string(), "record");
        assert_eq!(ElementType::Field.to_string(), "field");
    }
}
