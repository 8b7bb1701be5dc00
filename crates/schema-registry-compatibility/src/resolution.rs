//! Avro schema resolution rules: the pure, recursive heart of C3.
//!
//! `resolves(writer, reader)` answers "can a reader using `reader` decode
//! data written with `writer`?" — the same question Avro's own schema
//! resolution process answers when deserializing. `is_backward`/`is_forward`
//! in `lib.rs` are just this relation applied in the two directions.

use apache_avro::schema::{Name, RecordField};
use apache_avro::Schema;

/// The fully-qualified name of a named Avro type (record/enum/fixed),
/// `namespace.name` if a namespace is present, else bare `name`.
fn fullname(name: &Name) -> String {
    match &name.namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}.{}", name.name),
        _ => name.name.clone(),
    }
}

/// Whether a writer's named type can be matched against a reader's named
/// type, either directly by name or through one of the reader's aliases
/// (field/type rename support). Aliases are plain fully-qualified strings,
/// as Avro's spec requires them to be written.
fn named_type_matches(
    writer_name: &Name,
    reader_name: &Name,
    reader_aliases: &Option<Vec<String>>,
) -> bool {
    let writer_full = fullname(writer_name);
    if fullname(reader_name) == writer_full {
        return true;
    }
    reader_aliases
        .as_ref()
        .is_some_and(|aliases| aliases.iter().any(|alias| *alias == writer_full))
}

/// Whether a reader field matches a writer field: same name, or the reader
/// field lists the writer's name as an alias (rename support).
fn field_names_match(writer_field: &RecordField, reader_field: &RecordField) -> bool {
    if writer_field.name == reader_field.name {
        return true;
    }
    reader_field
        .aliases
        .as_ref()
        .is_some_and(|aliases| aliases.iter().any(|alias| *alias == writer_field.name))
}

/// Can a reader using `reader` resolve data written with `writer`?
///
/// Honors primitive promotion, string/bytes interchange, named-type alias
/// matching, record field reconciliation (added reader field needs a
/// default; removed reader field is fine; rename via aliases), enum symbol
/// subset, union branch subset, and fixed size equality.
pub fn resolves(writer: &Schema, reader: &Schema) -> bool {
    match (writer, reader) {
        // A writer union resolves against a reader iff every branch does.
        (Schema::Union(w), _) => w.variants().iter().all(|wv| resolves(wv, reader)),
        // A non-union writer resolves against a reader union iff some branch accepts it.
        (_, Schema::Union(r)) => r.variants().iter().any(|rv| resolves(writer, rv)),

        (Schema::Null, Schema::Null) => true,
        (Schema::Boolean, Schema::Boolean) => true,

        (Schema::Int, Schema::Int) => true,
        (Schema::Int, Schema::Long) | (Schema::Int, Schema::Float) | (Schema::Int, Schema::Double) => {
            true
        }

        (Schema::Long, Schema::Long) => true,
        (Schema::Long, Schema::Float) | (Schema::Long, Schema::Double) => true,

        (Schema::Float, Schema::Float) => true,
        (Schema::Float, Schema::Double) => true,

        (Schema::Double, Schema::Double) => true,

        (Schema::Bytes, Schema::Bytes) => true,
        (Schema::String, Schema::String) => true,
        (Schema::String, Schema::Bytes) | (Schema::Bytes, Schema::String) => true,

        (Schema::Array(w), Schema::Array(r)) => resolves(w, r),
        (Schema::Map(w), Schema::Map(r)) => resolves(w, r),

        (
            Schema::Fixed {
                name: w_name,
                size: w_size,
                ..
            },
            Schema::Fixed {
                name: r_name,
                size: r_size,
                aliases: r_aliases,
                ..
            },
        ) => w_size == r_size && named_type_matches(w_name, r_name, r_aliases),

        (
            Schema::Enum {
                name: w_name,
                symbols: w_symbols,
                ..
            },
            Schema::Enum {
                name: r_name,
                symbols: r_symbols,
                aliases: r_aliases,
                ..
            },
        ) => {
            named_type_matches(w_name, r_name, r_aliases)
                && w_symbols.iter().all(|symbol| r_symbols.contains(symbol))
        }

        (
            Schema::Record {
                name: w_name,
                fields: w_fields,
                ..
            },
            Schema::Record {
                name: r_name,
                fields: r_fields,
                aliases: r_aliases,
                ..
            },
        ) => {
            named_type_matches(w_name, r_name, r_aliases)
                && r_fields.iter().all(|r_field| {
                    match w_fields.iter().find(|w_field| field_names_match(w_field, r_field)) {
                        Some(w_field) => resolves(&w_field.schema, &r_field.schema),
                        None => r_field.default.is_some(),
                    }
                })
        }

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Schema {
        Schema::parse_str(json).unwrap()
    }

    #[test]
    fn identical_primitives_resolve() {
        assert!(resolves(&parse(r#""string""#), &parse(r#""string""#)));
    }

    #[test]
    fn int_promotes_to_long_float_double() {
        assert!(resolves(&parse(r#""int""#), &parse(r#""long""#)));
        assert!(resolves(&parse(r#""int""#), &parse(r#""float""#)));
        assert!(resolves(&parse(r#""int""#), &parse(r#""double""#)));
        assert!(!resolves(&parse(r#""long""#), &parse(r#""int""#)));
    }

    #[test]
    fn string_and_bytes_interchange() {
        assert!(resolves(&parse(r#""string""#), &parse(r#""bytes""#)));
        assert!(resolves(&parse(r#""bytes""#), &parse(r#""string""#)));
    }

    #[test]
    fn added_reader_field_needs_default() {
        let writer = parse(
            r#"{"type":"record","name":"T","fields":[{"name":"a","type":"string"}]}"#,
        );
        let reader_with_default = parse(
            r#"{"type":"record","name":"T","fields":[
                {"name":"a","type":"string"},
                {"name":"b","type":"string","default":""}
            ]}"#,
        );
        let reader_without_default = parse(
            r#"{"type":"record","name":"T","fields":[
                {"name":"a","type":"string"},
                {"name":"b","type":"string"}
            ]}"#,
        );
        assert!(resolves(&writer, &reader_with_default));
        assert!(!resolves(&writer, &reader_without_default));
    }

    #[test]
    fn removed_field_is_fine() {
        let writer = parse(
            r#"{"type":"record","name":"T","fields":[
                {"name":"a","type":"string"},
                {"name":"b","type":"string"}
            ]}"#,
        );
        let reader = parse(r#"{"type":"record","name":"T","fields":[{"name":"a","type":"string"}]}"#);
        assert!(resolves(&writer, &reader));
    }

    #[test]
    fn field_rename_resolves_via_alias() {
        let writer = parse(
            r#"{"type":"record","name":"T","fields":[{"name":"old_name","type":"string"}]}"#,
        );
        let reader = parse(
            r#"{"type":"record","name":"T","fields":[
                {"name":"new_name","type":"string","aliases":["old_name"]}
            ]}"#,
        );
        assert!(resolves(&writer, &reader));
    }

    #[test]
    fn enum_symbols_must_be_a_subset() {
        let writer = parse(r#"{"type":"enum","name":"Suit","symbols":["SPADES","HEARTS"]}"#);
        let reader_ok = parse(
            r#"{"type":"enum","name":"Suit","symbols":["SPADES","HEARTS","CLUBS"]}"#,
        );
        let reader_missing = parse(r#"{"type":"enum","name":"Suit","symbols":["SPADES"]}"#);
        assert!(resolves(&writer, &reader_ok));
        assert!(!resolves(&writer, &reader_missing));
    }

    #[test]
    fn fixed_requires_equal_size() {
        let writer = parse(r#"{"type":"fixed","name":"Hash","size":16}"#);
        let reader_ok = parse(r#"{"type":"fixed","name":"Hash","size":16}"#);
        let reader_bad = parse(r#"{"type":"fixed","name":"Hash","size":20}"#);
        assert!(resolves(&writer, &reader_ok));
        assert!(!resolves(&writer, &reader_bad));
    }

    #[test]
    fn union_branch_subset() {
        let writer = parse(r#"["null","string"]"#);
        let reader = parse(r#"["null","string","int"]"#);
        assert!(resolves(&writer, &reader));
        assert!(!resolves(&reader, &writer));
    }
}
