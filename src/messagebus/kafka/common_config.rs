use std::collections::HashMap;

/// Environment variable name for broker address family configuration
pub const BROKER_ADDRESS_FAMILY_ENV: &str = "MESSAGEBUS_BROKER_ADDRESS_FAMILY";

/// Valid values for broker address family configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrokerAddressFamily {
    /// Force IPv4 only
    #[default]
    V4,
    /// Force IPv6 only
    V6,
    /// Allow both IPv4 and IPv6 (librdkafka default)
    Any,
}

impl BrokerAddressFamily {
    /// Get the librdkafka configuration value
    pub fn as_librdkafka_value(&self) -> &'static str {
        match self {
            BrokerAddressFamily::V4 => "v4",
            BrokerAddressFamily::V6 => "v6",
            BrokerAddressFamily::Any => "any",
        }
    }

    /// Parse from string (case-insensitive), falling back to `V4`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "v4" | "ipv4" => BrokerAddressFamily::V4,
            "v6" | "ipv6" => BrokerAddressFamily::V6,
            "any" | "both" => BrokerAddressFamily::Any,
            _ => {
                log::warn!(
                    "Invalid broker address family '{}', using default 'v4'. \
                     Valid values: v4, v6, any",
                    s
                );
                BrokerAddressFamily::V4
            }
        }
    }

    /// Returns true unless this is the librdkafka default ("any")
    pub fn should_configure(&self) -> bool {
        *self != BrokerAddressFamily::Any
    }
}

/// Get the configured broker address family from `MESSAGEBUS_BROKER_ADDRESS_FAMILY`.
pub fn get_broker_address_family() -> BrokerAddressFamily {
    std::env::var(BROKER_ADDRESS_FAMILY_ENV)
        .map(|v| BrokerAddressFamily::parse(&v))
        .unwrap_or_default()
}

/// Protocol used to communicate with brokers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityProtocol {
    Plaintext,
    Ssl,
    SaslPlaintext,
    SaslSsl,
}

impl SecurityProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityProtocol::Plaintext => "PLAINTEXT",
            SecurityProtocol::Ssl => "SSL",
            SecurityProtocol::SaslPlaintext => "SASL_PLAINTEXT",
            SecurityProtocol::SaslSsl => "SASL_SSL",
        }
    }
}

/// SASL mechanism used for client authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslMechanism {
    Plain,
    ScramSha256,
    ScramSha512,
}

impl SaslMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::ScramSha256 => "SCRAM-SHA-256",
            SaslMechanism::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

/// SASL credentials applied to a producer or consumer
#[derive(Clone, PartialEq, Eq)]
pub struct SaslAuth {
    pub protocol: SecurityProtocol,
    pub mechanism: SaslMechanism,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SaslAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaslAuth")
            .field("protocol", &self.protocol)
            .field("mechanism", &self.mechanism)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration fields shared between producer and consumer
#[derive(Debug, Clone, Default)]
pub struct CommonKafkaConfig {
    /// Client ID for this producer/consumer instance
    pub client_id: Option<String>,
    /// SASL authentication, if the cluster requires it
    pub sasl: Option<SaslAuth>,
    /// Additional librdkafka properties, applied last
    pub custom_config: HashMap<String, String>,
}

impl CommonKafkaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set client ID
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Configure SASL authentication
    pub fn sasl_auth(
        mut self,
        protocol: SecurityProtocol,
        mechanism: SaslMechanism,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.sasl = Some(SaslAuth {
            protocol,
            mechanism,
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Add custom configuration property
    pub fn custom_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_config.insert(key.into(), value.into());
        self
    }

    /// Add multiple custom properties
    pub fn custom_properties(mut self, properties: HashMap<String, String>) -> Self {
        self.custom_config.extend(properties);
        self
    }
}

/// Trait for configuration types that contain common Kafka configuration
pub trait HasCommonConfig {
    fn common_config(&self) -> &CommonKafkaConfig;

    fn common_config_mut(&mut self) -> &mut CommonKafkaConfig;
}
