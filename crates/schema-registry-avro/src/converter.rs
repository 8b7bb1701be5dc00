//! C2 — the Relational-to-Avro Converter.
//!
//! Converts a Redshift table model into the canonical Avro record JSON that
//! C1's builder would have produced by hand, attaching the sidecar metadata
//! keys the Avro type system itself cannot express.

use schema_registry_core::types::sidecar;
use schema_registry_core::{Error, Result};
use serde_json::{json, Map, Value};

use crate::builder::{
    begin_nullable_type, create_boolean, create_double, create_float, create_int, create_long,
    create_string, AvroSchemaBuilder,
};

/// A single column of a [`RelationalTable`].
#[derive(Debug, Clone)]
pub struct RelationalColumn {
    pub name: String,
    pub doc: String,
    pub is_nullable: bool,
    pub default_value: Option<Value>,
    /// 1-based position within the table's primary key, or 0 if this column
    /// is not part of the primary key.
    pub primary_key_order: u32,
    /// The column's Redshift type tag, e.g. `"VarChar"`, `"Numeric"`.
    pub type_tag: String,
    /// `precision`/`scale` apply to `Numeric`/`Decimal`; `length` applies to
    /// the `Char`/`VarChar` families. Irrelevant for other tags.
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub length: Option<u32>,
    pub aliases: Vec<String>,
}

/// A relational table, the input to [`convert`].
#[derive(Debug, Clone)]
pub struct RelationalTable {
    pub name: String,
    pub doc: String,
    /// From `table.metadata[NAMESPACE]`; empty if absent.
    pub namespace: String,
    /// From `table.metadata[ALIASES]`.
    pub aliases: Vec<String>,
    pub columns: Vec<RelationalColumn>,
}

/// Map a column's Redshift type tag to its Avro primitive plus sidecar
/// metadata extras. The tag table below is authoritative.
fn primitive_and_extras(column: &RelationalColumn) -> Result<(Value, Map<String, Value>)> {
    let mut extras = Map::new();
    let tag = column.type_tag.to_uppercase();
    let primitive = match tag.as_str() {
        "FLOAT4" | "REAL" => create_float(),
        "FLOAT" | "DOUBLE" | "FLOAT8" => create_double(),
        "INT2" | "INT4" | "SMALLINT" | "INTEGER" => create_int(),
        "INT8" | "BIGINT" => create_long(),
        "NUMERIC" | "DECIMAL" => {
            extras.insert(sidecar::FIXED_PT.to_string(), json!(true));
            extras.insert(
                sidecar::PRECISION.to_string(),
                json!(column.precision.unwrap_or_default()),
            );
            extras.insert(
                sidecar::SCALE.to_string(),
                json!(column.scale.unwrap_or_default()),
            );
            create_double()
        }
        "BOOL" | "BOOLEAN" => create_boolean(),
        "CHAR" | "NCHAR" | "BPCHAR" | "CHARACTER" => {
            extras.insert(
                sidecar::FIX_LEN.to_string(),
                json!(column.length.unwrap_or_default()),
            );
            create_string()
        }
        "VARCHAR" | "NVARCHAR" | "CHARACTERVARYING" | "TEXT" => {
            extras.insert(
                sidecar::MAX_LEN.to_string(),
                json!(column.length.unwrap_or_default()),
            );
            create_string()
        }
        "DATE" => {
            extras.insert(sidecar::DATE.to_string(), json!(true));
            create_int()
        }
        "TIME" => {
            extras.insert(sidecar::TIME.to_string(), json!(true));
            create_int()
        }
        "TIMESTAMP" => {
            extras.insert(sidecar::TIMESTAMP.to_string(), json!(true));
            create_long()
        }
        other => return Err(Error::UnsupportedType(other.to_string())),
    };
    Ok((primitive, extras))
}

/// Convert a relational table into a canonical Avro record schema.
/// `convert(None)` returns `Ok(None)`, not an error.
pub fn convert(table: Option<&RelationalTable>) -> Result<Option<Value>> {
    let table = match table {
        Some(table) => table,
        None => return Ok(None),
    };

    let mut builder = AvroSchemaBuilder::new();
    let mut record_extras = Map::new();

    let mut primary_keys: Vec<(u32, &str)> = table
        .columns
        .iter()
        .filter(|c| c.primary_key_order > 0)
        .map(|c| (c.primary_key_order, c.name.as_str()))
        .collect();
    primary_keys.sort_by_key(|(order, _)| *order);
    if !primary_keys.is_empty() {
        let names: Vec<&str> = primary_keys.into_iter().map(|(_, name)| name).collect();
        record_extras.insert(sidecar::PRIMARY_KEY.to_string(), json!(names));
    }

    builder.begin_record(
        table.name.clone(),
        table.namespace.clone(),
        table.aliases.clone(),
        table.doc.clone(),
        record_extras,
    )?;

    for column in &table.columns {
        let (primitive, mut extras) = primitive_and_extras(column)?;

        let has_default = column.default_value.is_some() || column.is_nullable;
        let field_type = if column.is_nullable {
            let default = column.default_value.clone().unwrap_or(Value::Null);
            begin_nullable_type(primitive, &default)
        } else {
            primitive
        };

        if column.primary_key_order > 0 {
            extras.insert(
                sidecar::PRIMARY_KEY.to_string(),
                json!(column.primary_key_order),
            );
        }

        let default_value = column.default_value.clone().unwrap_or(Value::Null);
        builder.add_field(
            column.name.clone(),
            field_type,
            has_default,
            default_value,
            column.aliases.clone(),
            column.doc.clone(),
            extras,
        )?;
    }

    builder.end().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, tag: &str, nullable: bool, pk_order: u32) -> RelationalColumn {
        RelationalColumn {
            name: name.to_string(),
            doc: format!("{name} column"),
            is_nullable: nullable,
            default_value: None,
            primary_key_order: pk_order,
            type_tag: tag.to_string(),
            precision: None,
            scale: None,
            length: None,
            aliases: vec![],
        }
    }

    #[test]
    fn convert_none_returns_none() {
        assert_eq!(convert(None).unwrap(), None);
    }

    #[test]
    fn unsupported_tag_is_an_error() {
        let table = RelationalTable {
            name: "orders".to_string(),
            doc: "orders table".to_string(),
            namespace: String::new(),
            aliases: vec![],
            columns: vec![column("weird", "HyperVarBlob", false, 0)],
        };
        let err = convert(Some(&table)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
    }

    #[test]
    fn primary_key_columns_produce_record_and_field_metadata() {
        let table = RelationalTable {
            name: "orders".to_string(),
            doc: "orders table".to_string(),
            namespace: "acme".to_string(),
            aliases: vec![],
            columns: vec![
                column("order_id", "BigInt", false, 1),
                column("note", "Text", true, 0),
            ],
        };
        let schema = convert(Some(&table)).unwrap().unwrap();
        assert_eq!(schema["primary_key"], json!(["order_id"]));

        let fields = schema["fields"].as_array().unwrap();
        assert_eq!(fields[0]["name"], "order_id");
        assert_eq!(fields[0]["primary_key"], 1);
        assert_eq!(fields[0]["type"], "long");

        assert_eq!(fields[1]["name"], "note");
        assert_eq!(fields[1]["type"], json!(["null", "string"]));
        assert_eq!(fields[1]["max_len"], 0);
        assert_eq!(fields[1]["default"], Value::Null);
    }

    #[test]
    fn numeric_columns_carry_precision_and_scale() {
        let mut price = column("price", "Numeric", false, 0);
        price.precision = Some(10);
        price.scale = Some(2);
        let table = RelationalTable {
            name: "orders".to_string(),
            doc: "orders table".to_string(),
            namespace: String::new(),
            aliases: vec![],
            columns: vec![price],
        };
        let schema = convert(Some(&table)).unwrap().unwrap();
        let field = &schema["fields"][0];
        assert_eq!(field["type"], "double");
        assert_eq!(field["fixed_pt"], true);
        assert_eq!(field["precision"], 10);
        assert_eq!(field["scale"], 2);
    }
}
