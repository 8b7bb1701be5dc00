//! # Schema Registry Storage
//!
//! Implementations of the `SchemaStore` port (C4):
//!
//! - [`postgres::PostgresStore`] — the production backend, one ambient
//!   transaction per Coordinator call.
//! - [`in_memory::InMemoryStore`] — a `parking_lot::Mutex`-guarded test
//!   double substituting for Postgres in Coordinator unit tests.

pub mod in_memory;
pub mod postgres;

/// Tunables for the Postgres-backed store, constructed by the caller
/// instead of parsed from a config file.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub connection_string: String,
    pub max_connections: u32,
    /// Per-statement timeout; bounds how long a caller waits on a row lock.
    /// Applied to every pooled connection via `SET statement_timeout` in
    /// [`postgres::PostgresStore::connect`].
    pub statement_timeout: std::time::Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connection_string: "postgresql://localhost/schema_registry".to_string(),
            max_connections: 10,
            statement_timeout: std::time::Duration::from_secs(30),
        }
    }
}

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
