//! Check mode detection.
//!
//! A check's mode follows from the shape of its configuration:
//!
//! | Mode | `requirements.value` | `pattern_items` | `waivers.value` |
//! |------|----------------------|-----------------|-----------------|
//! | 1    | N/A                  | empty           | N/A or 0        |
//! | 2    | integer              | non-empty       | N/A or 0        |
//! | 3    | integer              | non-empty       | > 0             |
//! | 4    | N/A                  | empty           | > 0             |
//!
//! `waivers.value: 0` in modes 1 and 2 neutralizes the check: failures are
//! downgraded to INFO and the waive items are reported as annotations.
//!
//! The mode is computed once. Everything downstream matches on
//! [`CheckMode`] and never looks at the raw config again.

use std::fmt;

use crate::config::{CheckConfig, ConfigurationError};
use crate::types::CheckValue;
use crate::waiver::WaiverSet;

/// The evaluation strategy for one check, with everything it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckMode {
    /// Mode 1: pass iff there are no findings.
    Boolean { neutralize: Option<WaiverSet> },

    /// Mode 2: pass iff the number of pattern-matched findings equals `expected`.
    PatternCount {
        expected: u64,
        patterns: Vec<String>,
        neutralize: Option<WaiverSet>,
    },

    /// Mode 3: pass iff every pattern-matched finding is waived.
    PatternWaived {
        patterns: Vec<String>,
        waivers: WaiverSet,
    },

    /// Mode 4: pass iff every finding is waived.
    BooleanWaived { waivers: WaiverSet },
}

impl CheckMode {
    /// Select the mode for a config, or fail on a shape no mode accepts.
    pub fn detect(config: &CheckConfig) -> Result<Self, ConfigurationError> {
        let requirements = &config.requirements;
        let waivers = &config.waivers;
        let patterns = &requirements.pattern_items;

        let mode = match (requirements.value, waivers.value) {
            (CheckValue::NotApplicable, _) if !patterns.is_empty() => {
                return Err(ConfigurationError::UnrecognizedShape(format!(
                    "requirements.value is N/A but {} pattern item(s) are declared",
                    patterns.len()
                )));
            }
            (CheckValue::Count(n), _) if patterns.is_empty() => {
                return Err(ConfigurationError::UnrecognizedShape(format!(
                    "requirements.value is {} but no pattern items are declared",
                    n
                )));
            }
            (CheckValue::NotApplicable, CheckValue::NotApplicable) => {
                CheckMode::Boolean { neutralize: None }
            }
            (CheckValue::NotApplicable, CheckValue::Count(0)) => CheckMode::Boolean {
                neutralize: Some(WaiverSet::parse(&waivers.waive_items)),
            },
            (CheckValue::NotApplicable, CheckValue::Count(_)) => CheckMode::BooleanWaived {
                waivers: WaiverSet::parse(&waivers.waive_items),
            },
            (CheckValue::Count(expected), CheckValue::NotApplicable) => CheckMode::PatternCount {
                expected,
                patterns: patterns.clone(),
                neutralize: None,
            },
            (CheckValue::Count(expected), CheckValue::Count(0)) => CheckMode::PatternCount {
                expected,
                patterns: patterns.clone(),
                neutralize: Some(WaiverSet::parse(&waivers.waive_items)),
            },
            (CheckValue::Count(_), CheckValue::Count(_)) => CheckMode::PatternWaived {
                patterns: patterns.clone(),
                waivers: WaiverSet::parse(&waivers.waive_items),
            },
        };

        if waivers.value.is_not_applicable() && !waivers.waive_items.is_empty() {
            tracing::debug!(
                count = waivers.waive_items.len(),
                "Ignoring waive items: waivers.value is N/A"
            );
        }

        tracing::debug!(mode = %mode, "Detected check mode");
        Ok(mode)
    }

    /// Check type number, 1 to 4.
    pub fn type_number(&self) -> u8 {
        match self {
            CheckMode::Boolean { .. } => 1,
            CheckMode::PatternCount { .. } => 2,
            CheckMode::PatternWaived { .. } => 3,
            CheckMode::BooleanWaived { .. } => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CheckMode::Boolean { .. } => "boolean check",
            CheckMode::PatternCount { .. } => "pattern count check",
            CheckMode::PatternWaived { .. } => "pattern check with waivers",
            CheckMode::BooleanWaived { .. } => "boolean check with waivers",
        }
    }

    /// Pattern items, for the modes that use them.
    pub fn patterns(&self) -> Option<&[String]> {
        match self {
            CheckMode::PatternCount { patterns, .. } | CheckMode::PatternWaived { patterns, .. } => {
                Some(patterns)
            }
            CheckMode::Boolean { .. } | CheckMode::BooleanWaived { .. } => None,
        }
    }

    /// Waivers used for matching (modes 3 and 4).
    pub fn waivers(&self) -> Option<&WaiverSet> {
        match self {
            CheckMode::PatternWaived { waivers, .. } | CheckMode::BooleanWaived { waivers } => {
                Some(waivers)
            }
            CheckMode::Boolean { .. } | CheckMode::PatternCount { .. } => None,
        }
    }

    /// Annotations to emit when the check is neutralized (`waivers.value: 0`).
    pub fn neutralize(&self) -> Option<&WaiverSet> {
        match self {
            CheckMode::Boolean { neutralize } | CheckMode::PatternCount { neutralize, .. } => {
                neutralize.as_ref()
            }
            CheckMode::PatternWaived { .. } | CheckMode::BooleanWaived { .. } => None,
        }
    }

    pub fn is_neutralized(&self) -> bool {
        self.neutralize().is_some()
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type {} ({})", self.type_number(), self.label())?;
        if self.is_neutralized() {
            f.write_str(", neutralized")?;
        }
        Ok(())
    }
}

/// Select the mode for a config.
pub fn detect_mode(config: &CheckConfig) -> Result<CheckMode, ConfigurationError> {
    CheckMode::detect(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_of(yaml: &str) -> CheckMode {
        detect_mode(&CheckConfig::from_yaml(yaml).unwrap()).unwrap()
    }

    #[test]
    fn test_mode1() {
        let mode = mode_of(
            r#"
requirements:
  value: N/A
waivers:
  value: N/A
"#,
        );
        assert_eq!(mode.type_number(), 1);
        assert!(!mode.is_neutralized());
        assert!(mode.patterns().is_none());
    }

    #[test]
    fn test_mode1_neutralized() {
        let mode = mode_of(
            r#"
requirements:
  value: N/A
waivers:
  value: 0
  waive_items:
    - "Known issue tracked in signoff review"
"#,
        );
        assert_eq!(mode.type_number(), 1);
        let neutralize = mode.neutralize().unwrap();
        assert_eq!(neutralize.annotations.len(), 1);
        assert_eq!(mode.to_string(), "Type 1 (boolean check), neutralized");
    }

    #[test]
    fn test_mode2() {
        let mode = mode_of(
            r#"
requirements:
  value: 2
  pattern_items: ["max_transition", "max_capacitance"]
waivers:
  value: N/A
"#,
        );
        match mode {
            CheckMode::PatternCount {
                expected,
                ref patterns,
                neutralize: None,
            } => {
                assert_eq!(expected, 2);
                assert_eq!(patterns, &["max_transition", "max_capacitance"]);
            }
            other => panic!("expected mode 2, got {}", other),
        }
    }

    #[test]
    fn test_mode2_neutralized() {
        let mode = mode_of(
            r#"
requirements:
  value: 0
  pattern_items: ["max_fanout"]
waivers:
  value: 0
"#,
        );
        assert_eq!(mode.type_number(), 2);
        assert!(mode.is_neutralized());
    }

    #[test]
    fn test_mode3() {
        let mode = mode_of(
            r#"
requirements:
  value: 1
  pattern_items: ["max_transition"]
waivers:
  value: 1
  waive_items:
    - name: "max_transition:UDFF/Q"
      reason: "approved"
"#,
        );
        assert_eq!(mode.type_number(), 3);
        assert_eq!(mode.waivers().unwrap().entries.len(), 1);
        assert!(!mode.is_neutralized());
    }

    #[test]
    fn test_mode4() {
        let mode = mode_of(
            r#"
requirements:
  value: N/A
waivers:
  value: 2
  waive_items:
    - name: "U1/A"
      reason: "false path"
    - name: "U2/B"
      reason: "false path"
"#,
        );
        assert_eq!(mode.type_number(), 4);
        assert_eq!(mode.waivers().unwrap().entries.len(), 2);
        assert!(mode.patterns().is_none());
    }

    #[test]
    fn test_waive_items_ignored_when_waivers_not_applicable() {
        let mode = mode_of(
            r#"
requirements:
  value: N/A
waivers:
  value: N/A
  waive_items: ["ignored"]
"#,
        );
        assert_eq!(mode, CheckMode::Boolean { neutralize: None });
    }
}
