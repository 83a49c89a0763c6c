use super::error::SchemaRegistryError;
use crate::messagebus::serialization::AvroCodec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Schema languages the registry accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaType {
    #[default]
    Avro,
    Json,
    Protobuf,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Avro => "AVRO",
            SchemaType::Json => "JSON",
            SchemaType::Protobuf => "PROTOBUF",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = SchemaRegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AVRO" => Ok(SchemaType::Avro),
            "JSON" => Ok(SchemaType::Json),
            "PROTOBUF" => Ok(SchemaType::Protobuf),
            _ => Err(SchemaRegistryError::UnknownSchemaType(s.to_string())),
        }
    }
}

/// A registered schema. Never mutated once built; caches hand out `Arc`s.
#[derive(Debug, Clone)]
pub struct Schema {
    id: u32,
    schema: String,
    version: i32,
    codec: Option<Arc<AvroCodec>>,
}

impl Schema {
    pub fn new(
        id: u32,
        schema: impl Into<String>,
        version: i32,
        codec: Option<Arc<AvroCodec>>,
    ) -> Self {
        Self {
            id,
            schema: schema.into(),
            version,
            codec,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Raw schema JSON as stored in the registry
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Subject version, or 0 when looked up by id only
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Compiled codec, absent for non-Avro schemas or when codec creation is off
    pub fn codec(&self) -> Option<&Arc<AvroCodec>> {
        self.codec.as_ref()
    }

    /// `namespace.name` of the top-level record, or just `name` when the
    /// namespace is empty
    pub fn full_name(&self) -> Option<String> {
        full_name(&self.schema)
    }
}

pub(crate) fn full_name(schema_json: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Named {
        name: Option<String>,
        namespace: Option<String>,
    }

    let named: Named = serde_json::from_str(schema_json).ok()?;
    let name = named.name.filter(|n| !n.is_empty())?;
    match named.namespace.filter(|ns| !ns.is_empty()) {
        Some(namespace) => Some(format!("{}.{}", namespace, name)),
        None => Some(name),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterSchemaRequest<'a> {
    pub schema: &'a str,
    #[serde(rename = "schemaType", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaResponse {
    #[serde(default)]
    pub version: Option<i32>,
    pub schema: String,
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(rename = "schemaType", default)]
    pub schema_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterSchemaResponse {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub version: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error_code: Option<i32>,
    pub message: Option<String>,
}
