//! An in-memory `SchemaStore` (C4) test double.
//!
//! A single `parking_lot::Mutex`-guarded map stands in for Postgres in
//! Coordinator unit tests. Since every operation already
//! executes under that one mutex, row-level locking collapses to whole-store
//! locking for the duration of a call: `lock_domain`/`lock_topic_and_schemas`
//! simply read the current state rather than taking a separate lock, and
//! `begin`/`commit`/`rollback` are no-ops — there is nothing partially
//! applied to roll back when every write already happens atomically under
//! the mutex.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use schema_registry_core::entities::{AvroSchema, Domain, SchemaElement, Topic};
use schema_registry_core::error::{Error, Result};
use schema_registry_core::traits::SchemaStore;
use schema_registry_core::types::AvroSchemaStatus;
use uuid::Uuid;

struct StoreData {
    domains: HashMap<Uuid, Domain>,
    domain_by_key: HashMap<(String, String), Uuid>,
    topics: HashMap<Uuid, Topic>,
    topic_by_name: HashMap<String, Uuid>,
    topics_of_domain: HashMap<Uuid, Vec<Uuid>>,
    schemas: HashMap<i64, AvroSchema>,
    schemas_of_topic: HashMap<Uuid, Vec<i64>>,
    elements_of_schema: HashMap<i64, Vec<SchemaElement>>,
    next_schema_id: i64,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            domains: HashMap::new(),
            domain_by_key: HashMap::new(),
            topics: HashMap::new(),
            topic_by_name: HashMap::new(),
            topics_of_domain: HashMap::new(),
            schemas: HashMap::new(),
            schemas_of_topic: HashMap::new(),
            elements_of_schema: HashMap::new(),
            // Mirrors Postgres `BIGSERIAL`, which starts at 1.
            next_schema_id: 1,
        }
    }
}

/// A no-op transaction marker — see module docs for why.
#[derive(Default)]
pub struct InMemoryTransaction;

/// In-memory implementation of [`SchemaStore`], safe to share across tasks.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    data: Arc<Mutex<StoreData>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchemaStore for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        Ok(InMemoryTransaction)
    }

    async fn commit(&self, _tx: Self::Transaction) -> Result<()> {
        Ok(())
    }

    async fn rollback(&self, _tx: Self::Transaction) -> Result<()> {
        Ok(())
    }

    async fn get_domain(&self, _tx: &mut Self::Transaction, id: Uuid) -> Result<Option<Domain>> {
        Ok(self.data.lock().domains.get(&id).cloned())
    }

    async fn get_domain_by_key(
        &self,
        _tx: &mut Self::Transaction,
        namespace: &str,
        source: &str,
    ) -> Result<Option<Domain>> {
        let data = self.data.lock();
        let key = (namespace.to_string(), source.to_string());
        Ok(data.domain_by_key.get(&key).and_then(|id| data.domains.get(id)).cloned())
    }

    async fn create_domain(
        &self,
        _tx: &mut Self::Transaction,
        namespace: &str,
        source: &str,
        owner_email: &str,
    ) -> Result<Domain> {
        let mut data = self.data.lock();
        let key = (namespace.to_string(), source.to_string());
        if let Some(existing_id) = data.domain_by_key.get(&key) {
            return Ok(data.domains[existing_id].clone());
        }
        let domain = Domain {
            id: Uuid::new_v4(),
            namespace: namespace.to_string(),
            source: source.to_string(),
            owner_email: owner_email.to_string(),
        };
        data.domain_by_key.insert(key, domain.id);
        data.domains.insert(domain.id, domain.clone());
        Ok(domain)
    }

    async fn lock_domain(&self, _tx: &mut Self::Transaction, id: Uuid) -> Result<Domain> {
        self.data
            .lock()
            .domains
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound("Domain", id.to_string()))
    }

    async fn latest_topic_of_domain(
        &self,
        _tx: &mut Self::Transaction,
        domain_id: Uuid,
    ) -> Result<Option<Topic>> {
        let data = self.data.lock();
        Ok(data
            .topics_of_domain
            .get(&domain_id)
            .and_then(|ids| ids.last())
            .and_then(|id| data.topics.get(id))
            .cloned())
    }

    async fn topics_of_domain(
        &self,
        _tx: &mut Self::Transaction,
        domain_id: Uuid,
    ) -> Result<Vec<Topic>> {
        let data = self.data.lock();
        Ok(data
            .topics_of_domain
            .get(&domain_id)
            .into_iter()
            .flatten()
            .filter_map(|id| data.topics.get(id))
            .cloned()
            .collect())
    }

    async fn lock_topic_and_schemas(
        &self,
        _tx: &mut Self::Transaction,
        topic_id: Uuid,
    ) -> Result<(Topic, Vec<AvroSchema>)> {
        let data = self.data.lock();
        let topic = data
            .topics
            .get(&topic_id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound("Topic", topic_id.to_string()))?;
        let schemas = data
            .schemas_of_topic
            .get(&topic_id)
            .into_iter()
            .flatten()
            .filter_map(|id| data.schemas.get(id))
            .cloned()
            .collect();
        Ok((topic, schemas))
    }

    async fn get_topic(&self, _tx: &mut Self::Transaction, id: Uuid) -> Result<Option<Topic>> {
        Ok(self.data.lock().topics.get(&id).cloned())
    }

    async fn get_topic_by_name(
        &self,
        _tx: &mut Self::Transaction,
        name: &str,
    ) -> Result<Option<Topic>> {
        let data = self.data.lock();
        Ok(data.topic_by_name.get(name).and_then(|id| data.topics.get(id)).cloned())
    }

    async fn create_topic(
        &self,
        _tx: &mut Self::Transaction,
        domain_id: Uuid,
        name: &str,
    ) -> Result<Topic> {
        let mut data = self.data.lock();
        if data.topic_by_name.contains_key(name) {
            return Err(Error::IntegrityError(format!(
                "duplicate topic name {name:?} — hex-suffix collision"
            )));
        }
        let topic = Topic {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain_id,
        };
        data.topic_by_name.insert(name.to_string(), topic.id);
        data.topics.insert(topic.id, topic.clone());
        data.topics_of_domain.entry(domain_id).or_default().push(topic.id);
        Ok(topic)
    }

    async fn schemas_of_topic(
        &self,
        _tx: &mut Self::Transaction,
        topic_id: Uuid,
        include_disabled: bool,
    ) -> Result<Vec<AvroSchema>> {
        let data = self.data.lock();
        Ok(data
            .schemas_of_topic
            .get(&topic_id)
            .into_iter()
            .flatten()
            .filter_map(|id| data.schemas.get(id))
            .filter(|schema| include_disabled || schema.is_enabled())
            .cloned()
            .collect())
    }

    async fn latest_schema_of_topic(
        &self,
        _tx: &mut Self::Transaction,
        topic_id: Uuid,
    ) -> Result<Option<AvroSchema>> {
        let data = self.data.lock();
        Ok(data
            .schemas_of_topic
            .get(&topic_id)
            .into_iter()
            .flatten()
            .filter_map(|id| data.schemas.get(id))
            .filter(|schema| schema.is_enabled())
            .max_by_key(|schema| schema.id)
            .cloned())
    }

    async fn get_schema(&self, _tx: &mut Self::Transaction, id: i64) -> Result<Option<AvroSchema>> {
        Ok(self.data.lock().schemas.get(&id).cloned())
    }

    async fn insert_schema(
        &self,
        _tx: &mut Self::Transaction,
        topic_id: Uuid,
        avro_schema_json: serde_json::Value,
        status: AvroSchemaStatus,
        base_schema_id: Option<i64>,
        elements: Vec<SchemaElement>,
    ) -> Result<AvroSchema> {
        let mut data = self.data.lock();
        let id = data.next_schema_id;
        data.next_schema_id += 1;

        let schema = AvroSchema {
            id,
            topic_id,
            avro_schema_json,
            status,
            base_schema_id,
        };
        data.schemas.insert(id, schema.clone());
        data.schemas_of_topic.entry(topic_id).or_default().push(id);
        data.elements_of_schema.insert(id, elements);
        Ok(schema)
    }

    async fn set_schema_status(
        &self,
        _tx: &mut Self::Transaction,
        schema_id: i64,
        status: AvroSchemaStatus,
    ) -> Result<()> {
        let mut data = self.data.lock();
        let schema = data
            .schemas
            .get_mut(&schema_id)
            .ok_or_else(|| Error::EntityNotFound("AvroSchema", schema_id.to_string()))?;
        schema.status = status;
        Ok(())
    }

    async fn list_namespaces(&self, _tx: &mut Self::Transaction) -> Result<Vec<String>> {
        let data = self.data.lock();
        let mut namespaces: Vec<String> =
            data.domains.values().map(|d| d.namespace.clone()).collect();
        namespaces.sort();
        namespaces.dedup();
        Ok(namespaces)
    }

    async fn list_domains(&self, _tx: &mut Self::Transaction) -> Result<Vec<Domain>> {
        let data = self.data.lock();
        let mut domains: Vec<Domain> = data.domains.values().cloned().collect();
        domains.sort_by_key(|d| d.id);
        Ok(domains)
    }

    async fn domains_of_namespace(
        &self,
        _tx: &mut Self::Transaction,
        namespace: &str,
    ) -> Result<Vec<Domain>> {
        let data = self.data.lock();
        let mut domains: Vec<Domain> = data
            .domains
            .values()
            .filter(|d| d.namespace == namespace)
            .cloned()
            .collect();
        domains.sort_by_key(|d| d.id);
        Ok(domains)
    }
}
