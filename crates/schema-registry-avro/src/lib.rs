//! Avro schema construction: the Builder (C1) and the Redshift-to-Avro
//! Converter (C2), plus the `(source_kind, target_kind)` dispatch table
//! behind the `convert_schema` operation.

pub mod builder;
pub mod converter;
pub mod registry;

pub use builder::AvroSchemaBuilder;
pub use converter::{convert, RelationalColumn, RelationalTable};
pub use registry::{ConverterRegistry, SchemaKind, SchemaValue};
