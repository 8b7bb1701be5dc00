//! C1 — the Avro Schema Builder.
//!
//! A stateful builder that emits one Avro record JSON per
//! `begin_record -> (add_field)* -> end` session. It validates only
//! well-formedness and union-branch ordering; full semantic validation
//! (backward/forward/full compatibility) is the compatibility checker's job.

use schema_registry_core::{Error, Result};
use serde_json::{json, Map, Value};

/// Builder state while a record is open.
struct OpenRecord {
    name: String,
    namespace: String,
    aliases: Vec<String>,
    doc: String,
    extras: Map<String, Value>,
    fields: Vec<Value>,
}

/// Stateful Avro record builder. One record may be open at a time.
#[derive(Default)]
pub struct AvroSchemaBuilder {
    open: Option<OpenRecord>,
}

impl AvroSchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new record session. `extras` become additional top-level JSON
    /// properties on the record object. Fails if a record is already open.
    pub fn begin_record(
        &mut self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        aliases: Vec<String>,
        doc: impl Into<String>,
        extras: Map<String, Value>,
    ) -> Result<()> {
        if self.open.is_some() {
            return Err(Error::InvalidSchema(
                "a record is already open in this builder session".to_string(),
            ));
        }
        self.open = Some(OpenRecord {
            name: name.into(),
            namespace: namespace.into(),
            aliases,
            doc: doc.into(),
            extras,
            fields: Vec::new(),
        });
        Ok(())
    }

    /// Append a field to the currently open record. `extras` are copied as
    /// additional JSON properties on the field object.
    #[allow(clippy::too_many_arguments)]
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        field_type: Value,
        has_default: bool,
        default_value: Value,
        aliases: Vec<String>,
        doc: impl Into<String>,
        extras: Map<String, Value>,
    ) -> Result<()> {
        let open = self.open.as_mut().ok_or_else(|| {
            Error::InvalidSchema("add_field called with no record open".to_string())
        })?;

        let mut field = Map::new();
        field.insert("name".to_string(), json!(name.into()));
        field.insert("type".to_string(), field_type);
        field.insert("doc".to_string(), json!(doc.into()));
        if !aliases.is_empty() {
            field.insert("aliases".to_string(), json!(aliases));
        }
        if has_default {
            field.insert("default".to_string(), default_value);
        }
        for (k, v) in extras {
            field.insert(k, v);
        }
        open.fields.push(Value::Object(field));
        Ok(())
    }

    /// Close the current session and return the finished record JSON.
    pub fn end(&mut self) -> Result<Value> {
        let open = self
            .open
            .take()
            .ok_or_else(|| Error::InvalidSchema("end called with no record open".to_string()))?;

        let mut record = Map::new();
        record.insert("type".to_string(), json!("record"));
        record.insert("name".to_string(), json!(open.name));
        record.insert("namespace".to_string(), json!(open.namespace));
        record.insert("doc".to_string(), json!(open.doc));
        if !open.aliases.is_empty() {
            record.insert("aliases".to_string(), json!(open.aliases));
        }
        record.insert("fields".to_string(), Value::Array(open.fields));
        for (k, v) in open.extras {
            record.insert(k, v);
        }
        Ok(Value::Object(record))
    }

    /// Whether a record is currently open.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

/// Build a two-branch nullable union for `inner`.
///
/// Avro requires a union's default to match its first branch. The null
/// branch goes first whenever `default` is `Value::Null` (including the
/// "no default supplied" case callers represent as `Value::Null`);
/// otherwise the non-null branch goes first.
pub fn begin_nullable_type(inner: Value, default: &Value) -> Value {
    if default.is_null() {
        json!(["null", inner])
    } else {
        json!([inner, "null"])
    }
}

pub fn create_int() -> Value {
    json!("int")
}

pub fn create_long() -> Value {
    json!("long")
}

pub fn create_float() -> Value {
    json!("float")
}

pub fn create_double() -> Value {
    json!("double")
}

pub fn create_boolean() -> Value {
    json!("boolean")
}

pub fn create_string() -> Value {
    json!("string")
}

pub fn create_bytes() -> Value {
    json!("bytes")
}

pub fn create_null() -> Value {
    json!("null")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nested_begin_record() {
        let mut builder = AvroSchemaBuilder::new();
        builder
            .begin_record("Outer", "ns", vec![], "doc", Map::new())
            .unwrap();
        let err = builder
            .begin_record("Inner", "ns", vec![], "doc", Map::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn add_field_without_open_record_fails() {
        let mut builder = AvroSchemaBuilder::new();
        let err = builder
            .add_field("x", create_int(), false, Value::Null, vec![], "doc", Map::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn end_produces_well_formed_record() {
        let mut builder = AvroSchemaBuilder::new();
        builder
            .begin_record("User", "com.example", vec![], "A user", Map::new())
            .unwrap();
        builder
            .add_field("id", create_long(), false, Value::Null, vec![], "the id", Map::new())
            .unwrap();
        let schema = builder.end().unwrap();
        assert_eq!(schema["type"], "record");
        assert_eq!(schema["name"], "User");
        assert_eq!(schema["fields"][0]["name"], "id");
        assert!(!builder.is_open());
    }

    #[test]
    fn nullable_type_puts_null_first_when_default_is_null() {
        let union = begin_nullable_type(create_string(), &Value::Null);
        assert_eq!(union, json!(["null", "string"]));
    }

    #[test]
    fn nullable_type_puts_value_first_when_default_is_present() {
        let union = begin_nullable_type(create_string(), &json!("hello"));
        assert_eq!(union, json!(["string", "null"]));
    }

    #[test]
    fn end_with_no_open_record_fails() {
        let mut builder = AvroSchemaBuilder::new();
        assert!(builder.end().is_err());
    }
}
