//! The Schema Store port (C4): the persistence boundary the Registration
//! Coordinator (C5) and Query API (C6) are built on top of.
//!
//! All mutating operations happen inside one ambient transaction owned by
//! the caller — the trait has no notion of a thread-local session, only an
//! explicit `Self::Transaction` handle threaded through every call.

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{AvroSchema, Domain, SchemaElement, Topic};
use crate::error::Result;
use crate::types::AvroSchemaStatus;

/// Persistence port for the Domain/Topic/AvroSchema/SchemaElement entity
/// model.
///
/// Implementations: a Postgres-backed store (`schema-registry-storage`) for
/// production, and an in-memory store that tests can substitute freely since
/// both implement the same port.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// An open transaction handle. Postgres implementations wrap a
    /// `sqlx::Transaction`; the in-memory test double uses a unit struct
    /// since its single mutex guard already serializes access.
    type Transaction: Send;

    /// Begin a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Commit a transaction, making its writes visible to subsequent
    /// readers atomically.
    async fn commit(&self, tx: Self::Transaction) -> Result<()>;

    /// Abort a transaction, discarding its writes.
    async fn rollback(&self, tx: Self::Transaction) -> Result<()>;

    /// Look up a domain by id.
    async fn get_domain(&self, tx: &mut Self::Transaction, id: Uuid) -> Result<Option<Domain>>;

    /// Look up a domain by its unique `(namespace, source)` key.
    async fn get_domain_by_key(
        &self,
        tx: &mut Self::Transaction,
        namespace: &str,
        source: &str,
    ) -> Result<Option<Domain>>;

    /// Create a new domain. On a duplicate-key collision (a concurrent
    /// registration created the same `(namespace, source)` first) the
    /// implementation recovers via savepoint rollback and returns the
    /// winning row rather than propagating the integrity error.
    async fn create_domain(
        &self,
        tx: &mut Self::Transaction,
        namespace: &str,
        source: &str,
        owner_email: &str,
    ) -> Result<Domain>;

    /// Take a row lock on a domain for the duration of the transaction,
    /// serializing concurrent registrations under the same `(namespace,
    /// source)`.
    async fn lock_domain(&self, tx: &mut Self::Transaction, id: Uuid) -> Result<Domain>;

    /// The most recently created topic under a domain, if any.
    async fn latest_topic_of_domain(
        &self,
        tx: &mut Self::Transaction,
        domain_id: Uuid,
    ) -> Result<Option<Topic>>;

    /// All topics under a domain, oldest first.
    async fn topics_of_domain(
        &self,
        tx: &mut Self::Transaction,
        domain_id: Uuid,
    ) -> Result<Vec<Topic>>;

    /// Lock a topic and its schemas, stabilizing the enabled-schema set for
    /// the duration of a compatibility decision.
    async fn lock_topic_and_schemas(
        &self,
        tx: &mut Self::Transaction,
        topic_id: Uuid,
    ) -> Result<(Topic, Vec<AvroSchema>)>;

    /// Look up a topic by id.
    async fn get_topic(&self, tx: &mut Self::Transaction, id: Uuid) -> Result<Option<Topic>>;

    /// Look up a topic by its globally unique name.
    async fn get_topic_by_name(
        &self,
        tx: &mut Self::Transaction,
        name: &str,
    ) -> Result<Option<Topic>>;

    /// Create a new topic under a domain. A name collision is fatal — it
    /// indicates a hex-suffix collision in topic naming — and is surfaced
    /// verbatim as [`crate::error::Error::IntegrityError`] rather than
    /// recovered from.
    async fn create_topic(
        &self,
        tx: &mut Self::Transaction,
        domain_id: Uuid,
        name: &str,
    ) -> Result<Topic>;

    /// Schemas of a topic, ordered by id ascending.
    async fn schemas_of_topic(
        &self,
        tx: &mut Self::Transaction,
        topic_id: Uuid,
        include_disabled: bool,
    ) -> Result<Vec<AvroSchema>>;

    /// The highest-id schema of a topic, if any.
    async fn latest_schema_of_topic(
        &self,
        tx: &mut Self::Transaction,
        topic_id: Uuid,
    ) -> Result<Option<AvroSchema>>;

    /// Look up a single schema by id.
    async fn get_schema(&self, tx: &mut Self::Transaction, id: i64) -> Result<Option<AvroSchema>>;

    /// Insert a new schema under a topic together with its flattened
    /// elements, assigning it the next per-topic monotonic id. Both the
    /// schema row and its elements are written in the same transaction so
    /// readers never observe a partially-inserted schema.
    async fn insert_schema(
        &self,
        tx: &mut Self::Transaction,
        topic_id: Uuid,
        avro_schema_json: serde_json::Value,
        status: AvroSchemaStatus,
        base_schema_id: Option<i64>,
        elements: Vec<SchemaElement>,
    ) -> Result<AvroSchema>;

    /// Transition a schema's status in place.
    async fn set_schema_status(
        &self,
        tx: &mut Self::Transaction,
        schema_id: i64,
        status: AvroSchemaStatus,
    ) -> Result<()>;

    /// Every namespace that has at least one domain.
    async fn list_namespaces(&self, tx: &mut Self::Transaction) -> Result<Vec<String>>;

    /// Every domain, across all namespaces.
    async fn list_domains(&self, tx: &mut Self::Transaction) -> Result<Vec<Domain>>;

    /// Domains registered under a given namespace.
    async fn domains_of_namespace(
        &self,
        tx: &mut Self::Transaction,
        namespace: &str,
    ) -> Result<Vec<Domain>>;
}

#[cfg(test)]
mod tests {
    // The trait itself is exercised through its concrete implementations
    // (`schema-registry-storage`'s in-memory and Postgres stores).
}
