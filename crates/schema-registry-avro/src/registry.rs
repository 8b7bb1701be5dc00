//! Converter dispatch table for the `convert_schema(source_kind, target_kind,
//! source)` operation.
//!
//! [`SchemaKind`] is a closed tagged enum and the `(source_kind,
//! target_kind) -> converter` table is built once at construction, in
//! [`ConverterRegistry::new`], rather than discovered by scanning for
//! implementations at runtime. An unregistered pair fails fast with
//! [`schema_registry_core::error::Error::NoConverter`].

use std::collections::HashMap;

use schema_registry_core::error::{Error, Result};
use serde_json::Value;

use crate::converter::{self, RelationalTable};

/// The schema representations a converter can sit between. Only
/// `Relational -> Avro` is populated today; the table shape is what makes
/// adding, say, `Avro -> Protobuf` later a registration, not a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Relational,
    Avro,
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaKind::Relational => write!(f, "relational"),
            SchemaKind::Avro => write!(f, "avro"),
        }
    }
}

/// A tagged schema value flowing into or out of [`ConverterRegistry::convert_schema`].
#[derive(Debug, Clone)]
pub enum SchemaValue {
    Relational(RelationalTable),
    Avro(Value),
}

impl SchemaValue {
    pub fn kind(&self) -> SchemaKind {
        match self {
            SchemaValue::Relational(_) => SchemaKind::Relational,
            SchemaValue::Avro(_) => SchemaKind::Avro,
        }
    }
}

type ConvertFn = fn(&SchemaValue) -> Result<SchemaValue>;

/// An explicit `(source_kind, target_kind) -> converter` table.
pub struct ConverterRegistry {
    converters: HashMap<(SchemaKind, SchemaKind), ConvertFn>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        let mut converters: HashMap<(SchemaKind, SchemaKind), ConvertFn> = HashMap::new();
        converters.insert((SchemaKind::Relational, SchemaKind::Avro), relational_to_avro);
        Self { converters }
    }

    /// Convert `source` from `source_kind` to `target_kind`.
    ///
    /// `NoConverter` if the pair isn't registered; `SchemaConversion` if
    /// `source`'s actual tag doesn't match the declared `source_kind`.
    pub fn convert_schema(
        &self,
        source_kind: SchemaKind,
        target_kind: SchemaKind,
        source: &SchemaValue,
    ) -> Result<SchemaValue> {
        if source.kind() != source_kind {
            return Err(Error::SchemaConversion(format!(
                "source value is {}, not the declared source_kind {source_kind}",
                source.kind()
            )));
        }
        let convert_fn = self.converters.get(&(source_kind, target_kind)).ok_or_else(|| {
            Error::NoConverter {
                source_kind: source_kind.to_string(),
                target_kind: target_kind.to_string(),
            }
        })?;
        convert_fn(source)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn relational_to_avro(source: &SchemaValue) -> Result<SchemaValue> {
    let table = match source {
        SchemaValue::Relational(table) => table,
        SchemaValue::Avro(_) => {
            return Err(Error::SchemaConversion("expected a relational table value".to_string()))
        }
    };
    let avro = converter::convert(Some(table))?.unwrap_or(Value::Null);
    Ok(SchemaValue::Avro(avro))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::RelationalColumn;

    fn table() -> RelationalTable {
        RelationalTable {
            name: "orders".to_string(),
            doc: "orders table".to_string(),
            namespace: "acme".to_string(),
            aliases: vec![],
            columns: vec![RelationalColumn {
                name: "id".to_string(),
                doc: "the id".to_string(),
                is_nullable: false,
                default_value: None,
                primary_key_order: 1,
                type_tag: "BigInt".to_string(),
                precision: None,
                scale: None,
                length: None,
                aliases: vec![],
            }],
        }
    }

    #[test]
    fn relational_to_avro_is_registered() {
        let registry = ConverterRegistry::new();
        let result = registry
            .convert_schema(
                SchemaKind::Relational,
                SchemaKind::Avro,
                &SchemaValue::Relational(table()),
            )
            .unwrap();
        match result {
            SchemaValue::Avro(json) => assert_eq!(json["name"], "orders"),
            SchemaValue::Relational(_) => panic!("expected an Avro value"),
        }
    }

    #[test]
    fn unregistered_pair_is_no_converter() {
        let registry = ConverterRegistry::new();
        let err = registry
            .convert_schema(
                SchemaKind::Avro,
                SchemaKind::Relational,
                &SchemaValue::Avro(Value::Null),
            )
            .unwrap_err();
        assert!(matches!(err, Error::NoConverter { .. }));
    }

    #[test]
    fn mismatched_source_kind_is_a_conversion_error() {
        let registry = ConverterRegistry::new();
        let err = registry
            .convert_schema(
                SchemaKind::Relational,
                SchemaKind::Avro,
                &SchemaValue::Avro(Value::Null),
            )
            .unwrap_err();
        assert!(matches!(err, Error::SchemaConversion(_)));
    }
}
