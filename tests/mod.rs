// Unit tests - fast, in-memory broker and registry, no external services
pub mod unit;
