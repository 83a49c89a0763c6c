pub mod bus;
pub mod config;
pub mod error;
pub mod kafka;
pub mod record;
pub mod schema;
pub mod serialization;
