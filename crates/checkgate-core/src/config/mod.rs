//! Check configuration parsing and validation.
//!
//! Check configurations are YAML documents validated against an embedded JSON
//! Schema before being deserialized into typed values.

mod parser;
mod schema;

pub use parser::{CheckConfig, ConfigurationError, Requirements, Waivers};
pub use schema::validate_config_schema;
