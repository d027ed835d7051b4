//! # checkgate-core
//!
//! Deterministic check evaluation engine.
//!
//! Every checker parses its reports into a list of [`Finding`]s and asks
//! this crate one question: given these findings, this configuration and
//! these waivers, did the rule pass, and what should be reported?
//!
//! ## Pipeline
//!
//! 1. [`CheckMode::detect`] picks one of four modes from the config shape
//! 2. [`pattern::match_findings`] matches findings against pattern items
//! 3. [`waiver::resolve`] partitions findings into waived and unwaived
//! 4. [`OutcomeBuilder`] produces the [`ClassificationResult`]
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output, down to
//!    group ids and ordering
//! 2. **Pure**: No I/O and no shared state during evaluation
//! 3. **Forgiving where it is safe**: Bad regexes fall back to exact match,
//!    malformed waive items are skipped with a warning
//! 4. **Strict where it is not**: A config shape that fits no mode is an
//!    error, never a guess
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkgate_core::{evaluate, CheckConfig, Finding};
//!
//! let config = CheckConfig::from_yaml_file("IMP-10-0-0-00.yaml")?;
//! let findings = vec![Finding::new("UDFF/Q").with_category("max_transition")];
//! let result = evaluate(&config, &findings)?;
//!
//! std::process::exit(result.exit_code());
//! ```

pub mod config;
pub mod finding;
pub mod mode;
pub mod outcome;
pub mod pattern;
pub mod types;
pub mod waiver;

// Re-export main types at crate root
pub use config::{CheckConfig, ConfigurationError, Requirements, Waivers};
pub use finding::{Finding, FindingsError, Location};
pub use mode::{detect_mode, CheckMode};
pub use outcome::OutcomeBuilder;
pub use pattern::{match_pattern, PatternMatches};
pub use types::{CheckValue, ClassificationResult, Detail, Group, Severity, Tag};
pub use waiver::{Coverage, WaiverEntry, WaiverFormatError, WaiverResolution, WaiverSet};

use thiserror::Error;

/// Errors that stop an evaluation before it produces a result.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Findings error: {0}")]
    Findings(#[from] FindingsError),
}

impl EvaluationError {
    /// The files or fields this error is about.
    pub fn offending(&self) -> Vec<String> {
        match self {
            EvaluationError::Configuration(e) => e.offending(),
            EvaluationError::Findings(FindingsError::Io { path, .. }) => {
                vec![path.display().to_string()]
            }
            EvaluationError::Findings(_) => vec!["findings".to_string()],
        }
    }

    /// The FAIL result a driver reports in place of an evaluation.
    pub fn to_result(&self) -> ClassificationResult {
        OutcomeBuilder::new().failure(&self.to_string(), &self.offending())
    }
}

/// Evaluate findings against a check configuration.
///
/// This is the main entry point for checkgate evaluation.
///
/// # Arguments
///
/// * `config` - The check configuration
/// * `findings` - Findings extracted from the check's reports
///
/// # Returns
///
/// A `ClassificationResult` with the pass/fail decision, the ordered details
/// and their groups. Fails only when the config shape fits no mode.
pub fn evaluate(
    config: &CheckConfig,
    findings: &[Finding],
) -> Result<ClassificationResult, EvaluationError> {
    let mode = CheckMode::detect(config)?;

    let matches = mode
        .patterns()
        .map(|patterns| pattern::match_findings(findings, patterns));

    let resolution = match (&mode, &matches) {
        (CheckMode::PatternWaived { waivers, .. }, Some(m)) => {
            Some(waiver::resolve(m.matched_findings(), &waivers.entries))
        }
        (CheckMode::BooleanWaived { waivers }, _) => {
            Some(waiver::resolve(findings, &waivers.entries))
        }
        _ => None,
    };

    Ok(OutcomeBuilder::new().build(&mode, findings, matches.as_ref(), resolution.as_ref()))
}

/// Evaluate, turning any error into a FAIL result.
///
/// This is what a driver reports: a config that cannot be used is a failed
/// check, not a crash.
pub fn evaluate_or_fail(
    config: Result<CheckConfig, ConfigurationError>,
    findings: &[Finding],
) -> ClassificationResult {
    match config
        .map_err(EvaluationError::from)
        .and_then(|config| evaluate(&config, findings))
    {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "Evaluation short-circuited");
            e.to_result()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_evaluation() {
        let config = CheckConfig::from_yaml(
            r#"
item_id: "IMP-10-0-0-00"
description: "No max transition violations"
requirements:
  value: N/A
waivers:
  value: N/A
"#,
        )
        .unwrap();

        let result = evaluate(&config, &[]).unwrap();
        assert!(result.is_pass);
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn test_violation_fails() {
        let config = CheckConfig::from_yaml("requirements:\n  value: N/A\n").unwrap();
        let findings = vec![Finding::new("UDFF/Q").with_category("max_transition")];

        let result = evaluate(&config, &findings).unwrap();
        assert!(!result.is_pass);
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn test_evaluate_or_fail_reports_config_error() {
        let config = CheckConfig::from_yaml("requirements:\n  value: 3\n");
        let result = evaluate_or_fail(config, &[]);

        assert!(!result.is_pass);
        assert_eq!(result.mode, None);
        assert!(result
            .details
            .iter()
            .all(|d| d.tag == Tag::ConfigurationError));
        assert_eq!(result.details[0].name, "requirements.value");
    }

    #[test]
    fn test_findings_error_offending_path() {
        let err = EvaluationError::from(finding::load_findings("/nonexistent/f.json").unwrap_err());
        assert_eq!(err.offending(), vec!["/nonexistent/f.json"]);
        assert!(!err.to_result().is_pass);
    }
}
