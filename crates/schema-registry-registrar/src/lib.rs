//! # Schema Registry Registrar
//!
//! The write-side Registration Coordinator (C5) and the read-side Query API
//! (C6), both built directly on the `SchemaStore` port (C4) from
//! `schema-registry-core` and the compatibility checker (C3) from
//! `schema-registry-compatibility`.

pub mod coordinator;
pub mod flatten;
pub mod query;

pub use coordinator::RegistrationCoordinator;
pub use query::QueryApi;
