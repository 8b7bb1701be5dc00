//! C6 — the Query API: pure read-side lookups over the Schema Store port.
//!
//! Every operation returns `None`/empty for an absent target, except the
//! by-name and by-`(namespace, source)` lookups, which raise
//! [`Error::EntityNotFound`] — the caller supplied a name expecting it to
//! resolve, so silence would hide a real mistake rather than a merely
//! absent optional value.

use schema_registry_compatibility::AvroCompatibilityChecker;
use schema_registry_core::entities::{AvroSchema, Domain, Topic};
use schema_registry_core::error::{Error, Result};
use schema_registry_core::traits::SchemaStore;
use schema_registry_core::types::AvroSchemaStatus;
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

/// Implements C6 over a concrete [`SchemaStore`] and the C3 compatibility
/// checker (needed only by `is_schema_compatible`/
/// `is_schema_compatible_in_topic`).
pub struct QueryApi<S: SchemaStore> {
    store: S,
    checker: AvroCompatibilityChecker,
}

impl<S: SchemaStore> QueryApi<S> {
    pub fn new(store: S, checker: AvroCompatibilityChecker) -> Self {
        Self { store, checker }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn get_schema(&self, id: i64) -> Result<Option<AvroSchema>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.get_schema(&mut tx, id).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    pub async fn get_topic(&self, name: &str) -> Result<Option<Topic>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.get_topic_by_name(&mut tx, name).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    pub async fn get_topic_by_id(&self, id: Uuid) -> Result<Option<Topic>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.get_topic(&mut tx, id).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    pub async fn get_domain_by_id(&self, id: Uuid) -> Result<Option<Domain>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.get_domain(&mut tx, id).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    pub async fn get_domain(&self, namespace: &str, source: &str) -> Result<Option<Domain>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.get_domain_by_key(&mut tx, namespace, source).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    /// Excludes `Disabled`. Looks up by topic id — returns `None` (not an
    /// error) when the topic itself doesn't exist, since only the by-name
    /// form treats the name as a precondition.
    pub async fn latest_schema_of_topic(&self, topic_id: Uuid) -> Result<Option<AvroSchema>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.latest_schema_of_topic(&mut tx, topic_id).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    /// Excludes `Disabled`. Raises [`Error::EntityNotFound`] if `topic_name`
    /// doesn't resolve to a topic.
    #[instrument(skip(self))]
    pub async fn latest_schema_of_topic_by_name(&self, topic_name: &str) -> Result<Option<AvroSchema>> {
        let topic = self
            .get_topic(topic_name)
            .await?
            .ok_or_else(|| Error::EntityNotFound("Topic", topic_name.to_string()))?;
        self.latest_schema_of_topic(topic.id).await
    }

    /// Ordered by id ascending. See [`Self::latest_schema_of_topic`] for why
    /// an unknown id (as opposed to an unknown name) is not an error.
    pub async fn schemas_of_topic(
        &self,
        topic_id: Uuid,
        include_disabled: bool,
    ) -> Result<Vec<AvroSchema>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.schemas_of_topic(&mut tx, topic_id, include_disabled).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    /// Ordered by id ascending. Raises [`Error::EntityNotFound`] for an
    /// unknown topic name.
    #[instrument(skip(self))]
    pub async fn schemas_of_topic_by_name(
        &self,
        topic_name: &str,
        include_disabled: bool,
    ) -> Result<Vec<AvroSchema>> {
        let topic = self
            .get_topic(topic_name)
            .await?
            .ok_or_else(|| Error::EntityNotFound("Topic", topic_name.to_string()))?;
        self.schemas_of_topic(topic.id, include_disabled).await
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.list_namespaces(&mut tx).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    pub async fn list_domains(&self) -> Result<Vec<Domain>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.list_domains(&mut tx).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    pub async fn domains_of_namespace(&self, namespace: &str) -> Result<Vec<Domain>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.domains_of_namespace(&mut tx, namespace).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    pub async fn topics_of_domain(&self, domain_id: Uuid) -> Result<Vec<Topic>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.topics_of_domain(&mut tx, domain_id).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    pub async fn latest_topic_of_domain(&self, domain_id: Uuid) -> Result<Option<Topic>> {
        let mut tx = self.store.begin().await?;
        let result = self.store.latest_topic_of_domain(&mut tx, domain_id).await;
        let _ = self.store.rollback(tx).await;
        result
    }

    /// Raises [`Error::EntityNotFound`] when `(namespace, source)` doesn't
    /// resolve to a domain.
    #[instrument(skip(self))]
    pub async fn latest_topic_of_domain_by_key(
        &self,
        namespace: &str,
        source: &str,
    ) -> Result<Option<Topic>> {
        let domain = self.get_domain(namespace, source).await?.ok_or_else(|| {
            Error::EntityNotFound("Domain", format!("{namespace}.{source}"))
        })?;
        self.latest_topic_of_domain(domain.id).await
    }

    #[instrument(skip(self))]
    pub async fn mark_read_only(&self, schema_id: i64) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let result = self
            .store
            .set_schema_status(&mut tx, schema_id, AvroSchemaStatus::ReadOnly)
            .await;
        self.finish(tx, result).await
    }

    #[instrument(skip(self))]
    pub async fn mark_disabled(&self, schema_id: i64) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let result = self
            .store
            .set_schema_status(&mut tx, schema_id, AvroSchemaStatus::Disabled)
            .await;
        self.finish(tx, result).await
    }

    async fn finish(&self, tx: S::Transaction, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => self.store.commit(tx).await,
            Err(err) => {
                let _ = self.store.rollback(tx).await;
                Err(err)
            }
        }
    }

    /// Trivially `true` when `(namespace, source)` has no domain, or the
    /// domain has no topic yet.
    pub async fn is_schema_compatible(
        &self,
        target: &Value,
        namespace: &str,
        source: &str,
    ) -> Result<bool> {
        let domain = match self.get_domain(namespace, source).await? {
            Some(domain) => domain,
            None => return Ok(true),
        };
        let topic = match self.latest_topic_of_domain(domain.id).await? {
            Some(topic) => topic,
            None => return Ok(true),
        };
        let enabled = self.schemas_of_topic(topic.id, false).await?;
        let enabled_json: Vec<Value> = enabled.into_iter().map(|s| s.avro_schema_json).collect();
        self.checker.is_schema_compatible_in_topic(target, &enabled_json).await
    }

    /// Same check as [`Self::is_schema_compatible`] but against a topic named
    /// explicitly; raises [`Error::EntityNotFound`] when it doesn't exist.
    #[instrument(skip(self, avro_json))]
    pub async fn is_schema_compatible_in_topic(&self, avro_json: &Value, topic_name: &str) -> Result<bool> {
        let topic = self
            .get_topic(topic_name)
            .await?
            .ok_or_else(|| Error::EntityNotFound("Topic", topic_name.to_string()))?;
        let enabled = self.schemas_of_topic(topic.id, false).await?;
        let enabled_json: Vec<Value> = enabled.into_iter().map(|s| s.avro_schema_json).collect();
        self.checker.is_schema_compatible_in_topic(avro_json, &enabled_json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_registry_core::types::AvroSchemaStatus as Status;
    use schema_registry_storage::InMemoryStore;
    use serde_json::json;

    fn api() -> QueryApi<InMemoryStore> {
        QueryApi::new(InMemoryStore::new(), AvroCompatibilityChecker::default())
    }

    async fn seed(api: &QueryApi<InMemoryStore>) -> (Domain, Topic, AvroSchema) {
        let mut tx = api.store().begin().await.unwrap();
        let domain = api.store().create_domain(&mut tx, "acme", "orders", "a@acme.example").await.unwrap();
        let topic = api.store().create_topic(&mut tx, domain.id, "acme.orders.aaaa").await.unwrap();
        let schema = api
            .store()
            .insert_schema(&mut tx, topic.id, json!({"v": 1}), Status::ReadAndWrite, None, vec![])
            .await
            .unwrap();
        api.store().commit(tx).await.unwrap();
        (domain, topic, schema)
    }

    #[tokio::test]
    async fn get_topic_by_name_returns_none_for_unknown_name() {
        let api = api();
        assert_eq!(api.get_topic("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn latest_schema_of_topic_by_name_raises_not_found() {
        let api = api();
        let err = api.latest_schema_of_topic_by_name("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn latest_schema_of_topic_by_name_resolves_like_by_id() {
        let api = api();
        let (_, topic, schema) = seed(&api).await;
        let by_name = api.latest_schema_of_topic_by_name(&topic.name).await.unwrap().unwrap();
        assert_eq!(by_name.id, schema.id);
    }

    #[tokio::test]
    async fn schemas_of_topic_by_name_raises_not_found() {
        let api = api();
        let err = api.schemas_of_topic_by_name("nope", false).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn latest_topic_of_domain_by_key_raises_not_found() {
        let api = api();
        let err = api.latest_topic_of_domain_by_key("nope", "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn mark_disabled_excludes_schema_from_latest() {
        let api = api();
        let (_, topic, schema) = seed(&api).await;
        api.mark_disabled(schema.id).await.unwrap();
        assert_eq!(api.latest_schema_of_topic(topic.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn is_schema_compatible_is_trivially_true_without_a_domain() {
        let api = api();
        let target = json!({"type": "record", "name": "T", "doc": "d", "fields": []});
        assert!(api.is_schema_compatible(&target, "nobody", "nothing").await.unwrap());
    }

    #[tokio::test]
    async fn is_schema_compatible_in_topic_raises_not_found_for_unknown_topic() {
        let api = api();
        let target = json!({"type": "record", "name": "T", "doc": "d", "fields": []});
        let err = api.is_schema_compatible_in_topic(&target, "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_namespaces_lists_domains_of_namespace_and_topics_of_domain() {
        let api = api();
        let (domain, topic, _) = seed(&api).await;
        assert_eq!(api.list_namespaces().await.unwrap(), vec!["acme".to_string()]);
        assert_eq!(api.domains_of_namespace("acme").await.unwrap().len(), 1);
        let topics = api.topics_of_domain(domain.id).await.unwrap();
        assert_eq!(topics, vec![topic]);
    }
}
