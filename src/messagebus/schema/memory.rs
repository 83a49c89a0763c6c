use super::error::{SchemaRegistryError, SchemaResult};
use super::registry::SchemaRegistry;
use super::types::{Schema, SchemaType};
use crate::messagebus::serialization::AvroCodec;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct RegistryState {
    /// Index + 1 is the schema id
    schemas: Vec<Arc<Schema>>,
    /// Index + 1 is the subject version
    subjects: HashMap<String, Vec<u32>>,
}

/// Registry kept in process memory, with the same id and version numbering
/// and deduplication rules as a Confluent registry.
#[derive(Default)]
pub struct InMemorySchemaRegistry {
    state: Mutex<RegistryState>,
}

fn not_found(error_code: i32, message: String) -> SchemaRegistryError {
    SchemaRegistryError::Http {
        status: 404,
        status_line: "404 Not Found".to_string(),
        error_code: Some(error_code),
        message: Some(message),
    }
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subjects registered so far
    pub async fn subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self.state.lock().await.subjects.keys().cloned().collect();
        subjects.sort();
        subjects
    }

    async fn version_of(&self, subject: &str, version: Option<i32>) -> SchemaResult<Arc<Schema>> {
        let state = self.state.lock().await;
        let ids = state
            .subjects
            .get(subject)
            .ok_or_else(|| not_found(40401, format!("Subject '{}' not found.", subject)))?;

        let index = match version {
            Some(v) if v >= 1 => v as usize - 1,
            Some(v) => return Err(not_found(40402, format!("Version {} not found.", v))),
            None => ids.len().saturating_sub(1),
        };
        let id = ids
            .get(index)
            .ok_or_else(|| not_found(40402, format!("Version {} not found.", index + 1)))?;
        let stored = &state.schemas[*id as usize - 1];

        Ok(Arc::new(Schema::new(
            *id,
            stored.schema(),
            index as i32 + 1,
            stored.codec().cloned(),
        )))
    }
}

#[async_trait]
impl SchemaRegistry for InMemorySchemaRegistry {
    async fn get_schema(&self, id: u32) -> SchemaResult<Arc<Schema>> {
        let state = self.state.lock().await;
        (id as usize)
            .checked_sub(1)
            .and_then(|index| state.schemas.get(index))
            .cloned()
            .ok_or_else(|| not_found(40403, "Schema not found".to_string()))
    }

    async fn get_latest_schema(&self, subject: &str, _is_key: bool) -> SchemaResult<Arc<Schema>> {
        self.version_of(subject, None).await
    }

    async fn get_schema_versions(&self, subject: &str, _is_key: bool) -> SchemaResult<Vec<i32>> {
        let state = self.state.lock().await;
        let ids = state
            .subjects
            .get(subject)
            .ok_or_else(|| not_found(40401, format!("Subject '{}' not found.", subject)))?;
        Ok((1..=ids.len() as i32).collect())
    }

    async fn get_schema_by_version(
        &self,
        subject: &str,
        version: i32,
        _is_key: bool,
    ) -> SchemaResult<Arc<Schema>> {
        self.version_of(subject, Some(version)).await
    }

    async fn create_schema(
        &self,
        subject: &str,
        schema: &str,
        schema_type: SchemaType,
        _is_key: bool,
    ) -> SchemaResult<Arc<Schema>> {
        let mut state = self.state.lock().await;

        let id = match state.schemas.iter().find(|s| s.schema() == schema) {
            Some(existing) => existing.id(),
            None => {
                let codec = match schema_type {
                    SchemaType::Avro => Some(Arc::new(
                        AvroCodec::new(schema)
                            .map_err(|e| SchemaRegistryError::Codec(e.to_string()))?,
                    )),
                    _ => None,
                };
                let id = state.schemas.len() as u32 + 1;
                state.schemas.push(Arc::new(Schema::new(id, schema, 0, codec)));
                id
            }
        };

        let versions = state.subjects.entry(subject.to_string()).or_default();
        let version = match versions.iter().position(|v| *v == id) {
            Some(index) => index + 1,
            None => {
                versions.push(id);
                versions.len()
            }
        };

        let stored = &state.schemas[id as usize - 1];
        Ok(Arc::new(Schema::new(
            id,
            stored.schema(),
            version as i32,
            stored.codec().cloned(),
        )))
    }
}
