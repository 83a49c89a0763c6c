use super::client_config_builder::ClientConfigBuilder;
use super::common_config::{CommonKafkaConfig, HasCommonConfig, SaslMechanism, SecurityProtocol};
use rdkafka::config::ClientConfig;
use std::time::Duration;

/// Producer tuning parameters.
///
/// Defaults:
/// - flush timeout: 3000 ms
/// - `acks`: 1
/// - `retries`: 5
/// - `max.in.flight`: 1
/// - `message.max.bytes`: 1000000
/// - `compression.type`: snappy
/// - `retry.backoff.ms`: 100
/// - `linger.ms`: 100
/// - `batch.num.messages`: 10000
///
/// ```rust
/// use messagebus::{CompressionType, ProducerConfig};
/// use std::time::Duration;
///
/// let config = ProducerConfig::new()
///     .flush_timeout(Duration::from_millis(150))
///     .compression(CompressionType::Gzip)
///     .retries(5);
/// assert_eq!(config.flush_timeout, Duration::from_millis(150));
/// ```
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub common: CommonKafkaConfig,
    /// Upper bound for the flush performed on disconnect
    pub flush_timeout: Duration,
    pub acks: AckMode,
    pub retries: u32,
    pub max_in_flight: u32,
    pub message_max_bytes: u64,
    pub compression_type: CompressionType,
    pub retry_backoff: Duration,
    pub linger: Duration,
    pub batch_num_messages: u32,
    /// Ack timeout of a produce request; librdkafka's default when unset
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl CompressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Gzip => "gzip",
            CompressionType::Snappy => "snappy",
            CompressionType::Lz4 => "lz4",
            CompressionType::Zstd => "zstd",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// Don't wait for acknowledgment
    None,
    /// Wait for leader acknowledgment only
    Leader,
    /// Wait for all in-sync replicas
    All,
}

impl AckMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AckMode::None => "0",
            AckMode::Leader => "1",
            AckMode::All => "all",
        }
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            common: CommonKafkaConfig::default(),
            flush_timeout: Duration::from_millis(3000),
            acks: AckMode::Leader,
            retries: 5,
            max_in_flight: 1,
            message_max_bytes: 1_000_000,
            compression_type: CompressionType::Snappy,
            retry_backoff: Duration::from_millis(100),
            linger: Duration::from_millis(100),
            batch_num_messages: 10_000,
            request_timeout: None,
        }
    }
}

impl ProducerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.common = self.common.client_id(client_id);
        self
    }

    /// Configure timeout when flushing the producer before disconnecting
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// Configure required number of acknowledgements
    pub fn acks(mut self, acks: AckMode) -> Self {
        self.acks = acks;
        self
    }

    /// Configure number of retries when sending
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Configure maximum number of in-flight requests per broker connection
    pub fn max_in_flight(mut self, max_in_flight: u32) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Configure maximum request message size
    pub fn message_max_bytes(mut self, max_bytes: u64) -> Self {
        self.message_max_bytes = max_bytes;
        self
    }

    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression_type = compression;
        self
    }

    /// Configure backoff before retrying a protocol request
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Configure how long messages accumulate before a batch is built
    pub fn linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    /// Configure maximum number of messages batched in one MessageSet
    pub fn batch_num_messages(mut self, batch_num_messages: u32) -> Self {
        self.batch_num_messages = batch_num_messages;
        self
    }

    /// Configure the ack timeout of produce requests
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn sasl_auth(
        mut self,
        protocol: SecurityProtocol,
        mechanism: SaslMechanism,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.common = self
            .common
            .sasl_auth(protocol, mechanism, username, password);
        self
    }

    pub fn custom_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.common = self.common.custom_property(key, value);
        self
    }

    /// Render the librdkafka configuration for the given broker list
    pub fn to_client_config<S: AsRef<str>>(&self, brokers: &[S]) -> ClientConfig {
        let mut builder = ClientConfigBuilder::new()
            .bootstrap_servers(brokers)
            .broker_address_family()
            .common(&self.common)
            .property("acks", self.acks.as_str())
            .property("retries", self.retries.to_string())
            .property("max.in.flight", self.max_in_flight.to_string())
            .property("message.max.bytes", self.message_max_bytes.to_string())
            .property("compression.type", self.compression_type.as_str())
            .duration_ms("retry.backoff.ms", self.retry_backoff)
            .duration_ms("linger.ms", self.linger)
            .property("batch.num.messages", self.batch_num_messages.to_string());

        if let Some(timeout) = self.request_timeout {
            builder = builder.duration_ms("request.timeout.ms", timeout);
        }

        builder.custom_properties(&self.common.custom_config).build()
    }
}

impl HasCommonConfig for ProducerConfig {
    fn common_config(&self) -> &CommonKafkaConfig {
        &self.common
    }

    fn common_config_mut(&mut self) -> &mut CommonKafkaConfig {
        &mut self.common
    }
}
