//! Schema Registry Client Implementation
//!
//! HTTP client for the Confluent Schema Registry API with an id cache and a
//! (subject, version) cache.

use super::error::{SchemaRegistryError, SchemaResult};
use super::registry::SchemaRegistry;
use super::types::{
    ErrorResponse, RegisterSchemaRequest, RegisterSchemaResponse, Schema, SchemaResponse,
    SchemaType,
};
use crate::messagebus::serialization::AvroCodec;
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::RwLock;

pub const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n").expect("Failed to compile line break pattern"));

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

/// Which version of a subject to look up
#[derive(Debug, Clone, Copy)]
enum VersionRef {
    Latest,
    Number(i32),
}

impl VersionRef {
    fn path_segment(&self) -> String {
        match self {
            VersionRef::Latest => "latest".to_string(),
            VersionRef::Number(n) => n.to_string(),
        }
    }
}

/// The two cache views. Each map has its own lock; nothing is held across both.
#[derive(Default)]
struct SchemaCache {
    by_id: RwLock<HashMap<u32, Arc<Schema>>>,
    by_subject_version: RwLock<HashMap<(String, i32), Arc<Schema>>>,
}

/// Schema Registry client.
///
/// ```rust,no_run
/// use messagebus::{SchemaRegistryClient, SchemaType};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SchemaRegistryClient::new("http://localhost:8081")?
///     .with_credentials("user", "secret");
/// let schema = client
///     .create_schema("orders-value", r#"{"type":"string"}"#, SchemaType::Avro, false)
///     .await?;
/// println!("registered id {}", schema.id());
/// # Ok(())
/// # }
/// ```
pub struct SchemaRegistryClient {
    base_url: String,
    http: Client,
    credentials: Option<Credentials>,
    timeout: Duration,
    caching_enabled: AtomicBool,
    codec_creation_enabled: AtomicBool,
    cache: SchemaCache,
}

impl SchemaRegistryClient {
    pub fn new(base_url: impl Into<String>) -> SchemaResult<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            caching_enabled: AtomicBool::new(true),
            codec_creation_enabled: AtomicBool::new(true),
            cache: SchemaCache::default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Use HTTP Basic auth. Empty usernames or passwords are ignored.
    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        let (username, password) = (username.into(), password.into());
        if !username.is_empty() && !password.is_empty() {
            self.credentials = Some(Credentials { username, password });
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.set_credentials(username, password);
        self
    }

    /// Per-request timeout, five seconds unless changed
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.set_timeout(timeout);
        self
    }

    pub fn set_caching_enabled(&self, enabled: bool) {
        self.caching_enabled.store(enabled, Ordering::Release);
    }

    pub fn is_caching_enabled(&self) -> bool {
        self.caching_enabled.load(Ordering::Acquire)
    }

    pub fn set_codec_creation_enabled(&self, enabled: bool) {
        self.codec_creation_enabled.store(enabled, Ordering::Release);
    }

    pub fn is_codec_creation_enabled(&self) -> bool {
        self.codec_creation_enabled.load(Ordering::Acquire)
    }

    /// Get schema by ID
    pub async fn get_schema(&self, id: u32) -> SchemaResult<Arc<Schema>> {
        let caching = self.is_caching_enabled();
        if caching {
            if let Some(cached) = self.cache.by_id.read().await.get(&id).cloned() {
                debug!("Schema {} served from cache", id);
                return Ok(cached);
            }
        }

        let body = self
            .execute_request(Method::GET, &format!("/schemas/ids/{}", id), None)
            .await?;
        let response: SchemaResponse = serde_json::from_str(&body)?;
        let schema = Arc::new(self.build_schema(
            id,
            response.schema,
            response.version.unwrap_or(0),
            response.schema_type.as_deref(),
        )?);

        if caching {
            self.cache.by_id.write().await.insert(id, schema.clone());
        }
        Ok(schema)
    }

    /// Get the newest version of a subject. The cache is bypassed for this
    /// call only; the result is cached under its concrete version.
    pub async fn get_latest_schema(
        &self,
        subject: &str,
        is_key: bool,
    ) -> SchemaResult<Arc<Schema>> {
        self.get_version(subject, VersionRef::Latest, is_key).await
    }

    /// List the version numbers registered under a subject
    pub async fn get_schema_versions(&self, subject: &str, is_key: bool) -> SchemaResult<Vec<i32>> {
        debug!("Listing versions of {} subject '{}'", role(is_key), subject);
        let body = self
            .execute_request(Method::GET, &format!("/subjects/{}/versions", subject), None)
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get_schema_by_version(
        &self,
        subject: &str,
        version: i32,
        is_key: bool,
    ) -> SchemaResult<Arc<Schema>> {
        self.get_version(subject, VersionRef::Number(version), is_key)
            .await
    }

    /// Register a schema under a subject.
    ///
    /// The registry deduplicates identical schemas, so registering an existing
    /// schema returns its current id. The returned schema is re-read by that
    /// id rather than built from `schema`.
    pub async fn create_schema(
        &self,
        subject: &str,
        schema: &str,
        schema_type: SchemaType,
        is_key: bool,
    ) -> SchemaResult<Arc<Schema>> {
        let schema = match schema_type {
            SchemaType::Avro | SchemaType::Json => {
                LINE_BREAKS.replace_all(schema, " ").into_owned()
            }
            SchemaType::Protobuf => schema.to_string(),
        };
        let request = RegisterSchemaRequest {
            schema: &schema,
            schema_type: match schema_type {
                SchemaType::Avro => None,
                other => Some(other.as_str()),
            },
        };

        debug!("Registering {} schema under '{}'", role(is_key), subject);
        let body = self
            .execute_request(
                Method::POST,
                &format!("/subjects/{}/versions", subject),
                Some(serde_json::to_string(&request)?),
            )
            .await?;
        let registered: RegisterSchemaResponse = serde_json::from_str(&body)?;
        let id = registered.id.ok_or(SchemaRegistryError::MissingId)?;

        let fetched = self.get_schema(id).await?;
        let created = match registered.version {
            Some(version) if version != fetched.version() => Arc::new(Schema::new(
                id,
                fetched.schema(),
                version,
                fetched.codec().cloned(),
            )),
            _ => fetched,
        };

        if self.is_caching_enabled() {
            if created.version() > 0 {
                self.cache
                    .by_subject_version
                    .write()
                    .await
                    .insert((subject.to_string(), created.version()), created.clone());
            }
            self.cache.by_id.write().await.insert(id, created.clone());
        }
        Ok(created)
    }

    async fn get_version(
        &self,
        subject: &str,
        version: VersionRef,
        is_key: bool,
    ) -> SchemaResult<Arc<Schema>> {
        let caching = self.is_caching_enabled();
        if let (true, VersionRef::Number(n)) = (caching, version) {
            let key = (subject.to_string(), n);
            if let Some(cached) = self.cache.by_subject_version.read().await.get(&key).cloned() {
                debug!("Schema {}/{} served from cache", subject, n);
                return Ok(cached);
            }
        }

        debug!(
            "Fetching {} schema '{}' version {}",
            role(is_key),
            subject,
            version.path_segment()
        );
        let body = self
            .execute_request(
                Method::GET,
                &format!("/subjects/{}/versions/{}", subject, version.path_segment()),
                None,
            )
            .await?;
        let response: SchemaResponse = serde_json::from_str(&body)?;
        let id = response.id.ok_or(SchemaRegistryError::MissingId)?;
        let resolved_version = match (response.version, version) {
            (Some(v), _) => v,
            (None, VersionRef::Number(n)) => n,
            (None, VersionRef::Latest) => 0,
        };
        let schema = Arc::new(self.build_schema(
            id,
            response.schema,
            resolved_version,
            response.schema_type.as_deref(),
        )?);

        if caching {
            if resolved_version > 0 {
                self.cache
                    .by_subject_version
                    .write()
                    .await
                    .insert((subject.to_string(), resolved_version), schema.clone());
            }
            self.cache.by_id.write().await.insert(id, schema.clone());
        }
        Ok(schema)
    }

    fn build_schema(
        &self,
        id: u32,
        schema: String,
        version: i32,
        schema_type: Option<&str>,
    ) -> SchemaResult<Schema> {
        let schema_type = match schema_type {
            Some(t) => t.parse::<SchemaType>()?,
            None => SchemaType::Avro,
        };
        let codec = if schema_type == SchemaType::Avro && self.is_codec_creation_enabled() {
            let codec =
                AvroCodec::new(&schema).map_err(|e| SchemaRegistryError::Codec(e.to_string()))?;
            Some(Arc::new(codec))
        } else {
            None
        };
        Ok(Schema::new(id, schema, version, codec))
    }

    async fn execute_request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> SchemaResult<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, &url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .timeout(self.timeout);

        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<ErrorResponse>(&text).ok();
            debug!("Schema registry returned {} for {}", status, url);
            return Err(SchemaRegistryError::Http {
                status: status.as_u16(),
                status_line: status.to_string(),
                error_code: parsed.as_ref().and_then(|p| p.error_code),
                message: parsed.and_then(|p| p.message),
            });
        }

        Ok(response.text().await?)
    }
}

fn role(is_key: bool) -> &'static str {
    if is_key { "key" } else { "value" }
}

#[async_trait]
impl SchemaRegistry for SchemaRegistryClient {
    async fn get_schema(&self, id: u32) -> SchemaResult<Arc<Schema>> {
        SchemaRegistryClient::get_schema(self, id).await
    }

    async fn get_latest_schema(&self, subject: &str, is_key: bool) -> SchemaResult<Arc<Schema>> {
        SchemaRegistryClient::get_latest_schema(self, subject, is_key).await
    }

    async fn get_schema_versions(&self, subject: &str, is_key: bool) -> SchemaResult<Vec<i32>> {
        SchemaRegistryClient::get_schema_versions(self, subject, is_key).await
    }

    async fn get_schema_by_version(
        &self,
        subject: &str,
        version: i32,
        is_key: bool,
    ) -> SchemaResult<Arc<Schema>> {
        SchemaRegistryClient::get_schema_by_version(self, subject, version, is_key).await
    }

    async fn create_schema(
        &self,
        subject: &str,
        schema: &str,
        schema_type: SchemaType,
        is_key: bool,
    ) -> SchemaResult<Arc<Schema>> {
        SchemaRegistryClient::create_schema(self, subject, schema, schema_type, is_key).await
    }
}
