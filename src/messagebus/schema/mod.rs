//! Schema registry access: the HTTP client, an in-memory registry, and the
//! types both hand out.

pub mod error;
pub mod memory;
pub mod registry;
pub mod registry_client;
pub mod types;

pub use error::{SchemaRegistryError, SchemaResult};
pub use memory::InMemorySchemaRegistry;
pub use registry::SchemaRegistry;
pub use registry_client::{CONTENT_TYPE, DEFAULT_TIMEOUT, SchemaRegistryClient};
pub use types::{Schema, SchemaType};
