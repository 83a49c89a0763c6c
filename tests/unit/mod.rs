pub mod common;
// Bus behaviour against the in-memory broker
pub mod bus;
// Kafka configuration and connect-time validation
pub mod kafka;
pub mod serialization;
