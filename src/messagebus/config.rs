use crate::messagebus::kafka::{ConsumerConfig, ProducerConfig};
use crate::messagebus::schema::DEFAULT_TIMEOUT;
use crate::messagebus::serialization::SubjectNameStrategy;
use std::time::Duration;

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_millis(5000);

/// Basic-auth credentials for the schema registry
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything `MessageBus::connect` needs.
///
/// A bus without a producer cannot send; a bus without a consumer cannot
/// subscribe or make requests.
///
/// ```rust
/// use messagebus::{ConsumerConfig, MessageBusConfig, SubjectNameStrategy};
/// use std::time::Duration;
///
/// let config = MessageBusConfig::new(["localhost:9092"], "http://localhost:8081")
///     .subject_strategy(SubjectNameStrategy::RecordName)
///     .consumer(ConsumerConfig::new("billing"))
///     .rpc_timeout(Duration::from_millis(1500));
/// assert!(config.producer.is_some());
/// assert_eq!(config.rpc_timeout, Duration::from_millis(1500));
/// ```
#[derive(Debug, Clone)]
pub struct MessageBusConfig {
    pub brokers: Vec<String>,
    pub schema_registry_url: String,
    pub registry_credentials: Option<RegistryCredentials>,
    pub registry_timeout: Duration,
    pub subject_strategy: SubjectNameStrategy,
    pub producer: Option<ProducerConfig>,
    pub consumer: Option<ConsumerConfig>,
    pub rpc_timeout: Duration,
}

impl MessageBusConfig {
    /// Producer-only configuration with default tuning
    pub fn new<I, S>(brokers: I, schema_registry_url: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            brokers: brokers.into_iter().map(Into::into).collect(),
            schema_registry_url: schema_registry_url.into(),
            registry_credentials: None,
            registry_timeout: DEFAULT_TIMEOUT,
            subject_strategy: SubjectNameStrategy::default(),
            producer: Some(ProducerConfig::default()),
            consumer: None,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    pub fn registry_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.registry_credentials = Some(RegistryCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn registry_timeout(mut self, timeout: Duration) -> Self {
        self.registry_timeout = timeout;
        self
    }

    pub fn subject_strategy(mut self, strategy: SubjectNameStrategy) -> Self {
        self.subject_strategy = strategy;
        self
    }

    pub fn producer(mut self, producer: ProducerConfig) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Build a consume-only bus
    pub fn without_producer(mut self) -> Self {
        self.producer = None;
        self
    }

    pub fn consumer(mut self, consumer: ConsumerConfig) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// How long `request` waits for a reply
    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }
}
