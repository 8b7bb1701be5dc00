//! C5 — the Registration Coordinator: `register`, the critical path.
//!
//! Every decision point in the registration algorithm gets its own line
//! below, numbered in execution order. The one place this diverges from a
//! literal step-for-step translation is the dedup step: rather than
//! re-querying `latest_schema_of_topic`, it reuses the schema list already
//! fetched (and locked) while deciding append-vs-rollover — it's the same
//! snapshot, just without a redundant round trip.

use rand::RngCore;
use schema_registry_core::entities::{AvroSchema, Domain, Topic};
use schema_registry_core::error::Result;
use schema_registry_core::traits::SchemaStore;
use schema_registry_core::types::AvroSchemaStatus;
use schema_registry_compatibility::AvroCompatibilityChecker;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::flatten;

/// Implements C5 over a concrete [`SchemaStore`] and the C3 compatibility
/// checker.
pub struct RegistrationCoordinator<S: SchemaStore> {
    store: S,
    checker: AvroCompatibilityChecker,
}

impl<S: SchemaStore> RegistrationCoordinator<S> {
    pub fn new(store: S, checker: AvroCompatibilityChecker) -> Self {
        Self { store, checker }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers `avro_json` under the `(namespace, source)` domain,
    /// returning the resulting [`AvroSchema`] — the same one, unchanged, on
    /// a duplicate registration.
    #[instrument(skip(self, avro_json), fields(namespace = %namespace, source = %source))]
    pub async fn register(
        &self,
        avro_json: Value,
        namespace: &str,
        source: &str,
        owner_email: &str,
        status: AvroSchemaStatus,
        base_schema_id: Option<i64>,
    ) -> Result<AvroSchema> {
        // Step 1 — validate.
        let schema_ast = flatten::parse(&avro_json)?;
        // Step 2 — enforce documentation.
        let elements = flatten::flatten(&schema_ast);
        flatten::enforce_doc(&elements)?;

        // Step 3 — begin transaction.
        let mut tx = self.store.begin().await?;
        match self
            .register_under_lock(
                &mut tx,
                avro_json,
                namespace,
                source,
                owner_email,
                status,
                base_schema_id,
                &elements,
            )
            .await
        {
            Ok(schema) => {
                self.store.commit(tx).await?;
                info!(schema_id = schema.id, "schema registered");
                Ok(schema)
            }
            Err(err) => {
                let _ = self.store.rollback(tx).await;
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn register_under_lock(
        &self,
        tx: &mut S::Transaction,
        avro_json: Value,
        namespace: &str,
        source: &str,
        owner_email: &str,
        status: AvroSchemaStatus,
        base_schema_id: Option<i64>,
        elements: &[flatten::FlatElement],
    ) -> Result<AvroSchema> {
        // Step 4 — domain resolution.
        let domain = match self.store.get_domain_by_key(tx, namespace, source).await? {
            Some(domain) => domain,
            None => self.store.create_domain(tx, namespace, source, owner_email).await?,
        };

        // Step 5 — lock domain.
        let domain = self.store.lock_domain(tx, domain.id).await?;

        // Step 6 — fetch latest topic.
        let latest_topic = self.store.latest_topic_of_domain(tx, domain.id).await?;

        // Step 7 + 8 — lock topic and decide append-vs-rollover.
        let (topic, enabled_schemas) = match latest_topic {
            Some(topic) => {
                let (locked_topic, schemas) =
                    self.store.lock_topic_and_schemas(tx, topic.id).await?;
                let enabled: Vec<Value> = schemas
                    .iter()
                    .filter(|schema| schema.is_enabled())
                    .map(|schema| schema.avro_schema_json.clone())
                    .collect();

                if self
                    .checker
                    .is_schema_compatible_in_topic(&avro_json, &enabled)
                    .await?
                {
                    (locked_topic, schemas)
                } else {
                    debug!(topic = %locked_topic.name, "incompatible with current topic, rolling over");
                    let new_topic = self.create_new_topic(tx, &domain).await?;
                    (new_topic, Vec::new())
                }
            }
            None => {
                let new_topic = self.create_new_topic(tx, &domain).await?;
                (new_topic, Vec::new())
            }
        };

        // Step 9 — deduplication against the target topic's latest enabled schema.
        if let Some(latest) = enabled_schemas
            .iter()
            .filter(|schema| schema.is_enabled())
            .max_by_key(|schema| schema.id)
        {
            if latest.avro_schema_json == avro_json && latest.base_schema_id == base_schema_id {
                return Ok(latest.clone());
            }
        }

        // Step 10 — insert schema and elements.
        let schema_elements = flatten::to_schema_elements(elements);
        let inserted = self
            .store
            .insert_schema(tx, topic.id, avro_json, status, base_schema_id, schema_elements)
            .await?;

        // Step 11 — commit happens in the caller once this returns Ok.
        Ok(inserted)
    }

    async fn create_new_topic(&self, tx: &mut S::Transaction, domain: &Domain) -> Result<Topic> {
        let name = generate_topic_name(&domain.namespace, &domain.source);
        self.store.create_topic(tx, domain.id, &name).await
    }
}

/// `"{namespace}.{source}.{hex32}"` where `hex32` is 128 random bits. The
/// random component is why a name collision on `create_topic` is treated as
/// fatal rather than retried.
fn generate_topic_name(namespace: &str, source: &str) -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{namespace}.{source}.{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_registry_core::types::AvroSchemaStatus;
    use schema_registry_storage::InMemoryStore;
    use serde_json::json;

    fn documented_record(field_type: Value) -> Value {
        json!({
            "type": "record",
            "name": "Order",
            "namespace": "acme.orders",
            "doc": "an order",
            "fields": [{"name": "id", "doc": "the id", "type": field_type}]
        })
    }

    fn coordinator() -> RegistrationCoordinator<InMemoryStore> {
        RegistrationCoordinator::new(InMemoryStore::new(), AvroCompatibilityChecker::default())
    }

    #[tokio::test]
    async fn fresh_domain_creates_topic_and_schema() {
        let coordinator = coordinator();
        let schema = coordinator
            .register(
                documented_record(json!("int")),
                "acme",
                "orders",
                "team@acme.example",
                AvroSchemaStatus::ReadAndWrite,
                None,
            )
            .await
            .unwrap();

        assert_eq!(schema.id, 1);

        let domain = coordinator
            .store()
            .get_domain_by_key(&mut coordinator.store().begin().await.unwrap(), "acme", "orders")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(domain.namespace, "acme");
    }

    #[tokio::test]
    async fn repeat_registration_dedups_to_the_same_schema() {
        let coordinator = coordinator();
        let json = documented_record(json!("int"));

        let first = coordinator
            .register(json.clone(), "acme", "orders", "team@acme.example", AvroSchemaStatus::ReadAndWrite, None)
            .await
            .unwrap();
        let second = coordinator
            .register(json, "acme", "orders", "team@acme.example", AvroSchemaStatus::ReadAndWrite, None)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn compatible_evolution_appends_to_the_same_topic() {
        let coordinator = coordinator();
        let first = coordinator
            .register(
                documented_record(json!("int")),
                "acme",
                "orders",
                "team@acme.example",
                AvroSchemaStatus::ReadAndWrite,
                None,
            )
            .await
            .unwrap();

        let evolved = json!({
            "type": "record",
            "name": "Order",
            "namespace": "acme.orders",
            "doc": "an order",
            "fields": [
                {"name": "id", "doc": "the id", "type": "int"},
                {"name": "note", "doc": "a note", "type": ["null", "string"], "default": null}
            ]
        });
        let second = coordinator
            .register(evolved, "acme", "orders", "team@acme.example", AvroSchemaStatus::ReadAndWrite, None)
            .await
            .unwrap();

        assert_eq!(second.id, first.id + 1);
        assert_eq!(second.topic_id, first.topic_id);
    }

    #[tokio::test]
    async fn incompatible_evolution_rolls_over_to_a_new_topic() {
        let coordinator = coordinator();
        let first = coordinator
            .register(
                documented_record(json!("int")),
                "acme",
                "orders",
                "team@acme.example",
                AvroSchemaStatus::ReadAndWrite,
                None,
            )
            .await
            .unwrap();

        let incompatible = documented_record(json!("string"));
        let second = coordinator
            .register(incompatible, "acme", "orders", "team@acme.example", AvroSchemaStatus::ReadAndWrite, None)
            .await
            .unwrap();

        assert_ne!(second.topic_id, first.topic_id);
    }

    #[tokio::test]
    async fn missing_doc_fails_before_any_store_writes() {
        let coordinator = coordinator();
        let undocumented = json!({
            "type": "record",
            "name": "Order",
            "doc": "an order",
            "fields": [{"name": "id", "type": "int"}]
        });

        let err = coordinator
            .register(undocumented, "acme", "orders", "team@acme.example", AvroSchemaStatus::ReadAndWrite, None)
            .await
            .unwrap_err();

        assert!(matches!(err, schema_registry_core::error::Error::MissingDoc(_)));
        let mut tx = coordinator.store().begin().await.unwrap();
        assert!(coordinator
            .store()
            .get_domain_by_key(&mut tx, "acme", "orders")
            .await
            .unwrap()
            .is_none());
    }
}
