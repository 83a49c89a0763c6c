use super::client_config_builder::ClientConfigBuilder;
use super::common_config::{CommonKafkaConfig, HasCommonConfig, SaslMechanism, SecurityProtocol};
use rdkafka::config::ClientConfig;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Consumer tuning parameters.
///
/// Defaults:
/// - poll interval: 100 ms
/// - `fetch.min.bytes`: 10
/// - `fetch.wait.max.ms`: 500
/// - `max.partition.fetch.bytes`: 1048576
/// - `session.timeout.ms`: 10000
/// - `heartbeat.interval.ms`: 3000
/// - `enable.auto.commit`: false
/// - `auto.offset.reset`: earliest
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub common: CommonKafkaConfig,
    pub group_id: String,
    /// How long each dispatch-loop poll waits for a message
    pub poll_interval: Duration,
    pub fetch_min_bytes: u32,
    pub fetch_wait_max: Duration,
    pub max_partition_fetch_bytes: u32,
    pub session_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub enable_auto_commit: bool,
    pub auto_offset_reset: OffsetReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetReset {
    Earliest,
    Latest,
    /// Raise an error if no committed offset exists
    None,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
            OffsetReset::None => "none",
        }
    }
}

impl ConsumerConfig {
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            common: CommonKafkaConfig::default(),
            group_id: group_id.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_min_bytes: 10,
            fetch_wait_max: Duration::from_millis(500),
            max_partition_fetch_bytes: 1_048_576,
            session_timeout: Duration::from_millis(10_000),
            heartbeat_interval: Duration::from_millis(3000),
            enable_auto_commit: false,
            auto_offset_reset: OffsetReset::Earliest,
        }
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.common = self.common.client_id(client_id);
        self
    }

    /// Configure subscription poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Configure minimum number of bytes the broker responds with
    pub fn fetch_min_bytes(mut self, bytes: u32) -> Self {
        self.fetch_min_bytes = bytes;
        self
    }

    /// Configure how long the broker may wait to fill a fetch response
    pub fn fetch_wait_max(mut self, wait: Duration) -> Self {
        self.fetch_wait_max = wait;
        self
    }

    pub fn max_partition_fetch_bytes(mut self, bytes: u32) -> Self {
        self.max_partition_fetch_bytes = bytes;
        self
    }

    /// Configure group session and failure detection timeout
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Configure action when no committed offset exists or it is out of range
    pub fn auto_offset_reset(mut self, reset: OffsetReset) -> Self {
        self.auto_offset_reset = reset;
        self
    }

    /// Let librdkafka commit offsets periodically in the background.
    ///
    /// The dispatch loop commits each message after its handler succeeds, so
    /// enabling this weakens the at-least-once guarantee.
    pub fn enable_auto_commit(mut self, enable: bool) -> Self {
        self.enable_auto_commit = enable;
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
        ClientConfigBuilder::new()
            .bootstrap_servers(brokers)
            .broker_address_family()
            .common(&self.common)
            .property("group.id", self.group_id.as_str())
            .property("fetch.min.bytes", self.fetch_min_bytes.to_string())
            .duration_ms("fetch.wait.max.ms", self.fetch_wait_max)
            .property(
                "max.partition.fetch.bytes",
                self.max_partition_fetch_bytes.to_string(),
            )
            .duration_ms("session.timeout.ms", self.session_timeout)
            .duration_ms("heartbeat.interval.ms", self.heartbeat_interval)
            .property("enable.auto.commit", self.enable_auto_commit.to_string())
            .property("auto.offset.reset", self.auto_offset_reset.as_str())
            .custom_properties(&self.common.custom_config)
            .build()
    }
}

impl HasCommonConfig for ConsumerConfig {
    fn common_config(&self) -> &CommonKafkaConfig {
        &self.common
    }

    fn common_config_mut(&mut self) -> &mut CommonKafkaConfig {
        &mut self.common
    }
}
