//! C3 — the Compatibility Checker.
//!
//! Defines `is_backward`/`is_forward`/`is_full` over pairs of Avro JSON
//! schemas, plus the topic-level compatibility relation the Registration
//! Coordinator uses to decide whether to append to or roll over a topic.
//! The contract is a bare `bool`: the reason for an incompatibility is not
//! part of it (callers just start a new topic).

pub mod cache;
pub mod resolution;

use apache_avro::Schema;
use schema_registry_core::error::{Error, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use cache::{CompatibilityCache, Direction};

/// Tunables for the checker, constructed by the caller rather than loaded
/// from a file (this crate's ambient "configuration" per SPEC_FULL §2).
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityCheckerConfig {
    pub cache_max_capacity: u64,
    pub cache_ttl_seconds: u64,
}

impl Default for CompatibilityCheckerConfig {
    fn default() -> Self {
        Self {
            cache_max_capacity: 10_000,
            cache_ttl_seconds: 3600,
        }
    }
}

/// The Avro compatibility checker (C3).
pub struct AvroCompatibilityChecker {
    cache: CompatibilityCache,
}

impl AvroCompatibilityChecker {
    pub fn new(config: CompatibilityCheckerConfig) -> Self {
        Self {
            cache: CompatibilityCache::new(config.cache_max_capacity, config.cache_ttl_seconds),
        }
    }

    fn parse(schema: &Value) -> Result<Schema> {
        Schema::parse_str(&schema.to_string()).map_err(Error::from)
    }

    fn content_hash(schema: &Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(schema.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Data written with `old` is readable by a reader using `new`.
    #[instrument(skip(self, old, new))]
    pub async fn is_backward(&self, old: &Value, new: &Value) -> Result<bool> {
        let old_schema = Self::parse(old)?;
        let new_schema = Self::parse(new)?;
        let old_hash = Self::content_hash(old);
        let new_hash = Self::content_hash(new);

        let result = self
            .cache
            .get_or_compute(&old_hash, &new_hash, Direction::Backward, || {
                resolution::resolves(&old_schema, &new_schema)
            })
            .await;
        debug!(old_hash, new_hash, result, "backward compatibility checked");
        Ok(result)
    }

    /// Data written with `new` is readable by a reader using `old`.
    /// Equivalent to `is_backward(new, old)`.
    pub async fn is_forward(&self, old: &Value, new: &Value) -> Result<bool> {
        self.is_backward(new, old).await
    }

    /// Both backward and forward compatible.
    pub async fn is_full(&self, old: &Value, new: &Value) -> Result<bool> {
        Ok(self.is_backward(old, new).await? && self.is_forward(old, new).await?)
    }

    /// Whether candidate schema `s` is topic-compatible with a topic whose
    /// currently-enabled schemas are `enabled`: `is_full` against every one
    /// of them. An empty set is trivially compatible.
    #[instrument(skip(self, enabled, candidate))]
    pub async fn is_schema_compatible_in_topic(
        &self,
        candidate: &Value,
        enabled: &[Value],
    ) -> Result<bool> {
        for schema in enabled {
            if !self.is_full(schema, candidate).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Default for AvroCompatibilityChecker {
    fn default() -> Self {
        Self::new(CompatibilityCheckerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> Value {
        json!({"type": "record", "name": "T", "fields": fields})
    }

    #[tokio::test]
    async fn identical_schemas_are_fully_compatible() {
        let checker = AvroCompatibilityChecker::default();
        let schema = record(json!([{"name": "a", "type": "string"}]));
        assert!(checker.is_full(&schema, &schema).await.unwrap());
    }

    #[tokio::test]
    async fn adding_a_field_with_default_is_fully_compatible() {
        let checker = AvroCompatibilityChecker::default();
        let old = record(json!([{"name": "a", "type": "string"}]));
        let new = record(json!([
            {"name": "a", "type": "string"},
            {"name": "b", "type": "string", "default": ""}
        ]));

        // A reader using `old` simply ignores the extra `b` field written by
        // `new`, so this is backward, forward, and full compatible.
        assert!(checker.is_backward(&old, &new).await.unwrap());
        assert!(checker.is_forward(&old, &new).await.unwrap());
        assert!(checker.is_full(&old, &new).await.unwrap());
    }

    #[tokio::test]
    async fn adding_a_required_field_breaks_backward_compatibility() {
        let checker = AvroCompatibilityChecker::default();
        let old = record(json!([{"name": "a", "type": "string"}]));
        let new = record(json!([
            {"name": "a", "type": "string"},
            {"name": "b", "type": "string"}
        ]));

        assert!(!checker.is_backward(&old, &new).await.unwrap());
    }

    #[tokio::test]
    async fn empty_topic_is_trivially_compatible() {
        let checker = AvroCompatibilityChecker::default();
        let candidate = record(json!([{"name": "a", "type": "string"}]));
        assert!(checker
            .is_schema_compatible_in_topic(&candidate, &[])
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn candidate_must_be_fully_compatible_with_every_enabled_schema() {
        let checker = AvroCompatibilityChecker::default();
        let e1 = record(json!([{"name": "a", "type": "string"}]));
        let e2 = record(json!([
            {"name": "a", "type": "string"},
            {"name": "b", "type": "string", "default": ""}
        ]));
        let incompatible_candidate = record(json!([{"name": "a", "type": "int"}]));

        assert!(!checker
            .is_schema_compatible_in_topic(&incompatible_candidate, &[e1, e2])
            .await
            .unwrap());
    }
}
