//! The persisted entity model: Domain, Topic, AvroSchema, SchemaElement.
//!
//! Ownership is strict: a Domain owns its Topics, a Topic owns its
//! AvroSchemas, an AvroSchema owns its SchemaElements. `base_schema_id` is a
//! weak, non-owning cross-reference to the schema a registration was derived
//! from.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AvroSchemaStatus, ElementType};

/// A tenant boundary: `(namespace, source)` is globally unique. Created on
/// first registration; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: Uuid,
    pub namespace: String,
    pub source: String,
    pub owner_email: String,
}

impl Domain {
    /// The `(namespace, source)` pair that uniquely identifies this domain.
    pub fn key(&self) -> (&str, &str) {
        (&self.namespace, &self.source)
    }
}

/// A stream of mutually-compatible schemas. Created lazily on first
/// registration under a domain and rolled over (a new Topic created) when an
/// incoming schema is incompatible with the current one. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    /// `"{namespace}.{source}.{hex32}"` — globally unique.
    pub name: String,
    pub domain_id: Uuid,
}

/// A single registered Avro schema version within a Topic.
///
/// `id` is monotonically increasing per topic (not globally): the store is
/// responsible for handing out the next id when inserting under a locked
/// topic. Never physically deleted — only `status` transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvroSchema {
    pub id: i64,
    pub topic_id: Uuid,
    pub avro_schema_json: serde_json::Value,
    pub status: AvroSchemaStatus,
    /// Weak reference to the schema this one was registered against, if any.
    pub base_schema_id: Option<i64>,
}

impl AvroSchema {
    /// Whether this schema currently participates in topic-level
    /// compatibility checks.
    pub fn is_enabled(&self) -> bool {
        self.status.is_enabled()
    }
}

/// A single node flattened out of an AvroSchema's JSON tree, keyed by a
/// dotted path from the schema root (e.g. `"address.street"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaElement {
    pub id: Uuid,
    pub avro_schema_id: i64,
    pub element_type: ElementType,
    pub key: String,
    pub doc: Option<String>,
}

impl SchemaElement {
    /// Whether this element satisfies the mandatory-doc invariant: every
    /// `record`/`field` element must carry a non-empty `doc`; other element
    /// kinds are exempt.
    pub fn satisfies_doc_invariant(&self) -> bool {
        if !self.element_type.requires_doc() {
            return true;
        }
        matches!(&self.doc, Some(doc) if !doc.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(element_type: ElementType, doc: Option<&str>) -> SchemaElement {
        SchemaElement {
            id: Uuid::new_v4(),
            avro_schema_id: 1,
            element_type,
            key: "root".to_string(),
            doc: doc.map(str::to_string),
        }
    }

    #[test]
    fn record_without_doc_violates_invariant() {
        assert!(!element(ElementType::Record, None).satisfies_doc_invariant());
        assert!(!element(ElementType::Record, Some("  ")).satisfies_doc_invariant());
        assert!(element(ElementType::Record, Some("a record")).satisfies_doc_invariant());
    }

    #[test]
    fn non_record_field_elements_are_exempt() {
        assert!(element(ElementType::Enum, None).satisfies_doc_invariant());
        assert!(element(ElementType::Union, None).satisfies_doc_invariant());
    }

    #[test]
    fn domain_key_is_namespace_and_source() {
        let domain = Domain {
            id: Uuid::new_v4(),
            namespace: "acme".to_string(),
            source: "orders".to_string(),
            owner_email: "team@acme.example".to_string(),
        };
        assert_eq!(domain.key(), ("acme", "orders"));
    }
}
