use super::error::SchemaResult;
use super::types::{Schema, SchemaType};
use async_trait::async_trait;
use std::sync::Arc;

/// Schema lookup and registration as seen by the wire codec.
///
/// `is_key` tells whether the subject belongs to a message key. Subjects are
/// already resolved by the caller, so implementations only use it for
/// diagnostics.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    async fn get_schema(&self, id: u32) -> SchemaResult<Arc<Schema>>;

    /// Always asks the registry, never the cache
    async fn get_latest_schema(&self, subject: &str, is_key: bool) -> SchemaResult<Arc<Schema>>;

    async fn get_schema_versions(&self, subject: &str, is_key: bool) -> SchemaResult<Vec<i32>>;

    async fn get_schema_by_version(
        &self,
        subject: &str,
        version: i32,
        is_key: bool,
    ) -> SchemaResult<Arc<Schema>>;

    /// Register `schema` under `subject`, or return the existing registration
    async fn create_schema(
        &self,
        subject: &str,
        schema: &str,
        schema_type: SchemaType,
        is_key: bool,
    ) -> SchemaResult<Arc<Schema>>;
}
