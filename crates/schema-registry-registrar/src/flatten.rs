//! Avro schema parsing and flattening: registration's validate-and-flatten
//! entry point.
//!
//! `parse` turns candidate JSON into a validated `apache_avro::Schema`
//! (`InvalidSchema` on anything malformed — name rules, union structure, type
//! references). `flatten` walks that schema into the dotted-path element list
//! the mandatory-doc invariant and `SchemaStore::insert_schema` both need.

use apache_avro::Schema;
use schema_registry_core::entities::SchemaElement;
use schema_registry_core::error::{Error, Result};
use schema_registry_core::types::ElementType;
use uuid::Uuid;

/// A single node flattened out of a schema tree, before it's attached to a
/// concrete `avro_schema_id`.
#[derive(Debug, Clone)]
pub struct FlatElement {
    pub element_type: ElementType,
    pub key: String,
    pub doc: Option<String>,
}

/// Parse and validate candidate Avro JSON.
pub fn parse(avro_json: &serde_json::Value) -> Result<Schema> {
    Schema::parse_str(&avro_json.to_string()).map_err(|e| Error::InvalidSchema(e.to_string()))
}

/// Flatten a schema into its elements, keyed by a dotted path from the root.
/// Every node kind is recorded, not just the ones the doc invariant cares
/// about — `SchemaElement` is the full flattened tree.
pub fn flatten(schema: &Schema) -> Vec<FlatElement> {
    let mut elements = Vec::new();
    walk(schema, "$", &mut elements);
    elements
}

fn walk(schema: &Schema, path: &str, out: &mut Vec<FlatElement>) {
    match schema {
        Schema::Record { doc, fields, .. } => {
            out.push(FlatElement {
                element_type: ElementType::Record,
                key: path.to_string(),
                doc: doc.clone(),
            });
            for field in fields {
                let field_path = format!("{path}.{}", field.name);
                out.push(FlatElement {
                    element_type: ElementType::Field,
                    key: field_path.clone(),
                    doc: field.doc.clone(),
                });
                walk(&field.schema, &field_path, out);
            }
        }
        Schema::Enum { doc, .. } => out.push(FlatElement {
            element_type: ElementType::Enum,
            key: path.to_string(),
            doc: doc.clone(),
        }),
        Schema::Fixed { doc, .. } => out.push(FlatElement {
            element_type: ElementType::Fixed,
            key: path.to_string(),
            doc: doc.clone(),
        }),
        Schema::Array(inner) => {
            out.push(FlatElement {
                element_type: ElementType::Array,
                key: path.to_string(),
                doc: None,
            });
            walk(inner, &format!("{path}[]"), out);
        }
        Schema::Map(inner) => {
            out.push(FlatElement {
                element_type: ElementType::Map,
                key: path.to_string(),
                doc: None,
            });
            walk(inner, &format!("{path}{{}}"), out);
        }
        Schema::Union(union) => {
            out.push(FlatElement {
                element_type: ElementType::Union,
                key: path.to_string(),
                doc: None,
            });
            for (index, variant) in union.variants().iter().enumerate() {
                walk(variant, &format!("{path}|{index}"), out);
            }
        }
        _ => {}
    }
}

/// Enforce the mandatory-doc invariant: every `record`/`field` element must
/// carry a non-empty `doc`.
pub fn enforce_doc(elements: &[FlatElement]) -> Result<()> {
    let missing: Vec<ElementType> = elements
        .iter()
        .filter(|element| {
            element.element_type.requires_doc()
                && !matches!(&element.doc, Some(doc) if !doc.trim().is_empty())
        })
        .map(|element| element.element_type)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingDoc(missing))
    }
}

/// Attach a concrete (placeholder) `avro_schema_id` to flattened elements
/// before handing them to `SchemaStore::insert_schema`, which overwrites the
/// id with the one it assigns the parent row.
pub fn to_schema_elements(elements: &[FlatElement]) -> Vec<SchemaElement> {
    elements
        .iter()
        .map(|element| SchemaElement {
            id: Uuid::new_v4(),
            avro_schema_id: 0,
            element_type: element.element_type,
            key: element.key.clone(),
            doc: element.doc.clone(),
        })
        .collect()
}
