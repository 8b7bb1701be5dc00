//! The production `SchemaStore` (C4) backend: PostgreSQL via `sqlx`.
//!
//! Every write lives inside a transaction the Coordinator owns end to end;
//! this module never commits or rolls back on its own except for the
//! nested savepoint `create_domain` uses to recover from a concurrent
//! duplicate-domain insert. The locking reads (`lock_domain`,
//! `lock_topic_and_schemas`) actually execute their `FOR UPDATE` query and
//! await its rows, so a concurrent registration on the same domain or topic
//! genuinely blocks rather than racing past a lock that was built but never
//! awaited.

use async_trait::async_trait;
use schema_registry_core::entities::{AvroSchema, Domain, SchemaElement, Topic};
use schema_registry_core::error::{Error, Result};
use schema_registry_core::traits::SchemaStore;
use schema_registry_core::types::AvroSchemaStatus;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::StoreConfig;

fn status_to_sql(status: AvroSchemaStatus) -> &'static str {
    match status {
        AvroSchemaStatus::ReadAndWrite => "READ_AND_WRITE",
        AvroSchemaStatus::ReadOnly => "READ_ONLY",
        AvroSchemaStatus::Disabled => "DISABLED",
    }
}

fn status_from_sql(value: &str) -> Result<AvroSchemaStatus> {
    match value {
        "READ_AND_WRITE" => Ok(AvroSchemaStatus::ReadAndWrite),
        "READ_ONLY" => Ok(AvroSchemaStatus::ReadOnly),
        "DISABLED" => Ok(AvroSchemaStatus::Disabled),
        other => Err(Error::StorageError(format!("unknown schema status {other:?}"))),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[derive(FromRow)]
struct DomainRow {
    id: Uuid,
    namespace: String,
    source: String,
    owner_email: String,
}

impl From<DomainRow> for Domain {
    fn from(row: DomainRow) -> Self {
        Domain {
            id: row.id,
            namespace: row.namespace,
            source: row.source,
            owner_email: row.owner_email,
        }
    }
}

#[derive(FromRow)]
struct TopicRow {
    id: Uuid,
    name: String,
    domain_id: Uuid,
}

impl From<TopicRow> for Topic {
    fn from(row: TopicRow) -> Self {
        Topic {
            id: row.id,
            name: row.name,
            domain_id: row.domain_id,
        }
    }
}

#[derive(FromRow)]
struct AvroSchemaRow {
    id: i64,
    topic_id: Uuid,
    avro_schema_json: serde_json::Value,
    status: String,
    base_schema_id: Option<i64>,
}

impl AvroSchemaRow {
    fn into_entity(self) -> Result<AvroSchema> {
        Ok(AvroSchema {
            id: self.id,
            topic_id: self.topic_id,
            avro_schema_json: self.avro_schema_json,
            status: status_from_sql(&self.status)?,
            base_schema_id: self.base_schema_id,
        })
    }
}

/// `sqlx`-backed implementation of the [`SchemaStore`] port.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let statement_timeout_ms = config.statement_timeout.as_millis() as i64;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    sqlx::query(&format!("SET statement_timeout = {statement_timeout_ms}"))
                        .execute(conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(&config.connection_string)
            .await
            .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaStore for PostgresStore {
    type Transaction = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Transaction> {
        self.pool.begin().await.map_err(|e| Error::StorageError(e.to_string()))
    }

    async fn commit(&self, tx: Self::Transaction) -> Result<()> {
        tx.commit().await.map_err(|e| Error::StorageError(e.to_string()))
    }

    async fn rollback(&self, tx: Self::Transaction) -> Result<()> {
        tx.rollback().await.map_err(|e| Error::StorageError(e.to_string()))
    }

    #[instrument(skip(self, tx))]
    async fn get_domain(&self, tx: &mut Self::Transaction, id: Uuid) -> Result<Option<Domain>> {
        let row = sqlx::query_as::<_, DomainRow>(
            "SELECT id, namespace, source, owner_email FROM domains WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(row.map(Domain::from))
    }

    async fn get_domain_by_key(
        &self,
        tx: &mut Self::Transaction,
        namespace: &str,
        source: &str,
    ) -> Result<Option<Domain>> {
        let row = sqlx::query_as::<_, DomainRow>(
            "SELECT id, namespace, source, owner_email FROM domains WHERE namespace = $1 AND source = $2",
        )
        .bind(namespace)
        .bind(source)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(row.map(Domain::from))
    }

    #[instrument(skip(self, tx))]
    async fn create_domain(
        &self,
        tx: &mut Self::Transaction,
        namespace: &str,
        source: &str,
        owner_email: &str,
    ) -> Result<Domain> {
        let mut savepoint = tx.begin().await.map_err(|e| Error::StorageError(e.to_string()))?;

        let inserted = sqlx::query_as::<_, DomainRow>(
            "INSERT INTO domains (id, namespace, source, owner_email) \
             VALUES (gen_random_uuid(), $1, $2, $3) \
             RETURNING id, namespace, source, owner_email",
        )
        .bind(namespace)
        .bind(source)
        .bind(owner_email)
        .fetch_one(&mut *savepoint)
        .await;

        match inserted {
            Ok(row) => {
                savepoint.commit().await.map_err(|e| Error::StorageError(e.to_string()))?;
                Ok(row.into())
            }
            Err(e) if is_unique_violation(&e) => {
                savepoint.rollback().await.map_err(|e| Error::StorageError(e.to_string()))?;
                info!(namespace, source, "domain already existed, re-fetching after savepoint recovery");
                self.get_domain_by_key(tx, namespace, source)
                    .await?
                    .ok_or_else(|| {
                        Error::StorageError(
                            "domain disappeared after duplicate-key recovery".to_string(),
                        )
                    })
            }
            Err(e) => Err(Error::StorageError(e.to_string())),
        }
    }

    async fn lock_domain(&self, tx: &mut Self::Transaction, id: Uuid) -> Result<Domain> {
        let row = sqlx::query_as::<_, DomainRow>(
            "SELECT id, namespace, source, owner_email FROM domains WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(row.into())
    }

    async fn latest_topic_of_domain(
        &self,
        tx: &mut Self::Transaction,
        domain_id: Uuid,
    ) -> Result<Option<Topic>> {
        let row = sqlx::query_as::<_, TopicRow>(
            "SELECT id, name, domain_id FROM topics WHERE domain_id = $1 ORDER BY seq DESC LIMIT 1",
        )
        .bind(domain_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(row.map(Topic::from))
    }

    async fn topics_of_domain(
        &self,
        tx: &mut Self::Transaction,
        domain_id: Uuid,
    ) -> Result<Vec<Topic>> {
        let rows = sqlx::query_as::<_, TopicRow>(
            "SELECT id, name, domain_id FROM topics WHERE domain_id = $1 ORDER BY seq ASC",
        )
        .bind(domain_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(rows.into_iter().map(Topic::from).collect())
    }

    #[instrument(skip(self, tx))]
    async fn lock_topic_and_schemas(
        &self,
        tx: &mut Self::Transaction,
        topic_id: Uuid,
    ) -> Result<(Topic, Vec<AvroSchema>)> {
        let topic = sqlx::query_as::<_, TopicRow>(
            "SELECT id, name, domain_id FROM topics WHERE id = $1 FOR UPDATE",
        )
        .bind(topic_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;

        let schema_rows = sqlx::query_as::<_, AvroSchemaRow>(
            "SELECT id, topic_id, avro_schema_json, status, base_schema_id \
             FROM avro_schemas WHERE topic_id = $1 ORDER BY id ASC FOR UPDATE",
        )
        .bind(topic_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;

        let schemas = schema_rows
            .into_iter()
            .map(AvroSchemaRow::into_entity)
            .collect::<Result<Vec<_>>>()?;

        Ok((topic.into(), schemas))
    }

    async fn get_topic(&self, tx: &mut Self::Transaction, id: Uuid) -> Result<Option<Topic>> {
        let row = sqlx::query_as::<_, TopicRow>(
            "SELECT id, name, domain_id FROM topics WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(row.map(Topic::from))
    }

    async fn get_topic_by_name(
        &self,
        tx: &mut Self::Transaction,
        name: &str,
    ) -> Result<Option<Topic>> {
        let row = sqlx::query_as::<_, TopicRow>(
            "SELECT id, name, domain_id FROM topics WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(row.map(Topic::from))
    }

    #[instrument(skip(self, tx))]
    async fn create_topic(
        &self,
        tx: &mut Self::Transaction,
        domain_id: Uuid,
        name: &str,
    ) -> Result<Topic> {
        let inserted = sqlx::query_as::<_, TopicRow>(
            "INSERT INTO topics (id, name, domain_id) VALUES (gen_random_uuid(), $1, $2) \
             RETURNING id, name, domain_id",
        )
        .bind(name)
        .bind(domain_id)
        .fetch_one(&mut **tx)
        .await;

        match inserted {
            Ok(row) => Ok(row.into()),
            Err(e) if is_unique_violation(&e) => {
                warn!(name, "topic name collision on insert, treating as a fatal integrity error");
                Err(Error::IntegrityError(format!(
                    "duplicate topic name {name:?} — hex-suffix collision"
                )))
            }
            Err(e) => Err(Error::StorageError(e.to_string())),
        }
    }

    async fn schemas_of_topic(
        &self,
        tx: &mut Self::Transaction,
        topic_id: Uuid,
        include_disabled: bool,
    ) -> Result<Vec<AvroSchema>> {
        let rows = if include_disabled {
            sqlx::query_as::<_, AvroSchemaRow>(
                "SELECT id, topic_id, avro_schema_json, status, base_schema_id \
                 FROM avro_schemas WHERE topic_id = $1 ORDER BY id ASC",
            )
            .bind(topic_id)
            .fetch_all(&mut **tx)
            .await
        } else {
            sqlx::query_as::<_, AvroSchemaRow>(
                "SELECT id, topic_id, avro_schema_json, status, base_schema_id \
                 FROM avro_schemas WHERE topic_id = $1 AND status <> 'DISABLED' ORDER BY id ASC",
            )
            .bind(topic_id)
            .fetch_all(&mut **tx)
            .await
        }
        .map_err(|e| Error::StorageError(e.to_string()))?;

        rows.into_iter().map(AvroSchemaRow::into_entity).collect()
    }

    async fn latest_schema_of_topic(
        &self,
        tx: &mut Self::Transaction,
        topic_id: Uuid,
    ) -> Result<Option<AvroSchema>> {
        let row = sqlx::query_as::<_, AvroSchemaRow>(
            "SELECT id, topic_id, avro_schema_json, status, base_schema_id \
             FROM avro_schemas WHERE topic_id = $1 AND status <> 'DISABLED' \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(topic_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;

        row.map(AvroSchemaRow::into_entity).transpose()
    }

    async fn get_schema(&self, tx: &mut Self::Transaction, id: i64) -> Result<Option<AvroSchema>> {
        let row = sqlx::query_as::<_, AvroSchemaRow>(
            "SELECT id, topic_id, avro_schema_json, status, base_schema_id \
             FROM avro_schemas WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;

        row.map(AvroSchemaRow::into_entity).transpose()
    }

    #[instrument(skip(self, tx, avro_schema_json, elements))]
    async fn insert_schema(
        &self,
        tx: &mut Self::Transaction,
        topic_id: Uuid,
        avro_schema_json: serde_json::Value,
        status: AvroSchemaStatus,
        base_schema_id: Option<i64>,
        elements: Vec<SchemaElement>,
    ) -> Result<AvroSchema> {
        let row = sqlx::query_as::<_, AvroSchemaRow>(
            "INSERT INTO avro_schemas (topic_id, avro_schema_json, status, base_schema_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, topic_id, avro_schema_json, status, base_schema_id",
        )
        .bind(topic_id)
        .bind(&avro_schema_json)
        .bind(status_to_sql(status))
        .bind(base_schema_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;

        let schema = row.into_entity()?;

        for element in elements {
            sqlx::query(
                "INSERT INTO avro_schema_elements (id, avro_schema_id, element_type, key, doc) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(element.id)
            .bind(schema.id)
            .bind(element.element_type.to_string())
            .bind(&element.key)
            .bind(&element.doc)
            .execute(&mut **tx)
            .await
            .map_err(|e| Error::StorageError(e.to_string()))?;
        }

        info!(schema_id = schema.id, topic_id = %topic_id, "schema inserted");
        Ok(schema)
    }

    async fn set_schema_status(
        &self,
        tx: &mut Self::Transaction,
        schema_id: i64,
        status: AvroSchemaStatus,
    ) -> Result<()> {
        sqlx::query("UPDATE avro_schemas SET status = $1 WHERE id = $2")
            .bind(status_to_sql(status))
            .bind(schema_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn list_namespaces(&self, tx: &mut Self::Transaction) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT namespace FROM domains ORDER BY namespace ASC")
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(rows.into_iter().map(|(ns,)| ns).collect())
    }

    async fn list_domains(&self, tx: &mut Self::Transaction) -> Result<Vec<Domain>> {
        let rows = sqlx::query_as::<_, DomainRow>(
            "SELECT id, namespace, source, owner_email FROM domains ORDER BY seq ASC",
        )
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(rows.into_iter().map(Domain::from).collect())
    }

    async fn domains_of_namespace(
        &self,
        tx: &mut Self::Transaction,
        namespace: &str,
    ) -> Result<Vec<Domain>> {
        let rows = sqlx::query_as::<_, DomainRow>(
            "SELECT id, namespace, source, owner_email FROM domains WHERE namespace = $1 ORDER BY seq ASC",
        )
        .bind(namespace)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| Error::StorageError(e.to_string()))?;
        Ok(rows.into_iter().map(Domain::from).collect())
    }
}
