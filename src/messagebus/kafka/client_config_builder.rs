use super::common_config::{CommonKafkaConfig, SaslAuth, get_broker_address_family};
use rdkafka::config::ClientConfig;
use std::collections::HashMap;
use std::time::Duration;

/// Shared builder for producer and consumer `ClientConfig`s.
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::new(),
        }
    }

    /// Set bootstrap servers from a broker list
    pub fn bootstrap_servers<S: AsRef<str>>(mut self, brokers: &[S]) -> Self {
        let joined = brokers
            .iter()
            .map(|b| b.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        self.config.set("bootstrap.servers", joined);
        self
    }

    /// Apply `broker.address.family` from `MESSAGEBUS_BROKER_ADDRESS_FAMILY`
    pub fn broker_address_family(mut self) -> Self {
        let family = get_broker_address_family();
        if family.should_configure() {
            self.config
                .set("broker.address.family", family.as_librdkafka_value());
        }
        self
    }

    pub fn client_id(mut self, client_id: Option<&str>) -> Self {
        if let Some(id) = client_id {
            self.config.set("client.id", id);
        }
        self
    }

    pub fn sasl(mut self, sasl: Option<&SaslAuth>) -> Self {
        if let Some(auth) = sasl {
            self.config
                .set("security.protocol", auth.protocol.as_str())
                .set("sasl.mechanism", auth.mechanism.as_str())
                .set("sasl.username", &auth.username)
                .set("sasl.password", &auth.password);
        }
        self
    }

    /// Apply everything carried by a `CommonKafkaConfig` except custom properties
    pub fn common(self, common: &CommonKafkaConfig) -> Self {
        self.client_id(common.client_id.as_deref())
            .sasl(common.sasl.as_ref())
    }

    pub fn property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.config.set(key, value);
        self
    }

    pub fn duration_ms(mut self, key: &str, duration: Duration) -> Self {
        self.config.set(key, duration.as_millis().to_string());
        self
    }

    pub fn custom_properties(mut self, custom_config: &HashMap<String, String>) -> Self {
        for (key, value) in custom_config {
            self.config.set(key, value);
        }
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
