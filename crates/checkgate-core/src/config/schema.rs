//! JSON Schema validation for check configurations.
//!
//! The schema ships inside the crate (`schema/check_config.schema.json`) and
//! is compiled once on first use.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded check configuration schema (loaded at compile time).
const CHECK_CONFIG_SCHEMA_JSON: &str = include_str!("../../schema/check_config.schema.json");

/// Check config validator, compiled on first use.
static CHECK_CONFIG_VALIDATOR: OnceLock<Result<jsonschema::Validator, SchemaError>> =
    OnceLock::new();

/// The embedded check config schema could not be used.
#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    #[error("Embedded check config schema is not valid JSON: {0}")]
    NotJson(String),

    #[error("Embedded check config schema does not compile: {0}")]
    NotCompilable(String),
}

fn compile_check_config_schema() -> Result<jsonschema::Validator, SchemaError> {
    let schema: serde_json::Value = serde_json::from_str(CHECK_CONFIG_SCHEMA_JSON)
        .map_err(|e| SchemaError::NotJson(e.to_string()))?;
    jsonschema::options()
        .build(&schema)
        .map_err(|e| SchemaError::NotCompilable(e.to_string()))
}

fn check_config_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    CHECK_CONFIG_VALIDATOR
        .get_or_init(compile_check_config_schema)
        .as_ref()
        .map_err(Clone::clone)
}

/// Validate a check configuration against the schema.
///
/// Returns every violation, each suffixed with the offending instance path
/// so it can be reported as a field reference.
pub fn validate_config_schema(config_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = check_config_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(config_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_schema_compiles() {
        assert!(check_config_validator().is_ok());
    }

    #[test]
    fn test_minimal_config_passes() {
        let value = serde_json::json!({
            "requirements": { "value": "N/A" }
        });
        assert!(validate_config_schema(&value).is_ok());
    }

    #[test]
    fn test_full_config_passes() {
        let value = serde_json::json!({
            "item_id": "IMP-10-0-0-00",
            "description": "No max transition violations",
            "input_files": ["reports/timing.rpt"],
            "requirements": {
                "value": 2,
                "pattern_items": ["max_transition", "max_capacitance"]
            },
            "waivers": {
                "value": 1,
                "waive_items": [
                    { "name": "max_transition:UDFF/Q", "reason": "approved" },
                    "reviewed with signoff team"
                ]
            }
        });
        assert!(validate_config_schema(&value).is_ok());
    }

    #[test]
    fn test_missing_requirements_fails() {
        let value = serde_json::json!({
            "waivers": { "value": "N/A" }
        });
        assert!(validate_config_schema(&value).is_err());
    }

    #[test]
    fn test_negative_value_fails() {
        let value = serde_json::json!({
            "requirements": { "value": -1 }
        });
        assert!(validate_config_schema(&value).is_err());
    }

    #[test]
    fn test_unknown_sentinel_fails() {
        let value = serde_json::json!({
            "requirements": { "value": "NA" }
        });
        let errors = validate_config_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("/requirements/value")));
    }

    #[test]
    fn test_non_string_pattern_fails() {
        let value = serde_json::json!({
            "requirements": { "value": 1, "pattern_items": [42] }
        });
        assert!(validate_config_schema(&value).is_err());
    }

    #[test]
    fn test_malformed_waive_items_pass_schema() {
        // Malformed entries are reported during evaluation, not rejected here.
        let value = serde_json::json!({
            "requirements": { "value": "N/A" },
            "waivers": { "value": 1, "waive_items": [{ "reason": "no name" }, 7] }
        });
        assert!(validate_config_schema(&value).is_ok());
    }
}
