//! Core types shared across the evaluation pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel text for a value that does not apply.
pub const NOT_APPLICABLE: &str = "N/A";

/// A declared or measured count that may be "N/A".
///
/// Serialized as a bare integer or the string `"N/A"`, matching the YAML
/// that check authors write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCheckValue", into = "RawCheckValue")]
pub enum CheckValue {
    NotApplicable,
    Count(u64),
}

impl CheckValue {
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, CheckValue::NotApplicable)
    }

    /// The count, or `None` for "N/A".
    pub fn count(&self) -> Option<u64> {
        match self {
            CheckValue::Count(n) => Some(*n),
            CheckValue::NotApplicable => None,
        }
    }
}

impl fmt::Display for CheckValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckValue::NotApplicable => f.write_str(NOT_APPLICABLE),
            CheckValue::Count(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawCheckValue {
    Int(i64),
    Text(String),
}

impl TryFrom<RawCheckValue> for CheckValue {
    type Error = String;

    fn try_from(raw: RawCheckValue) -> Result<Self, Self::Error> {
        match raw {
            RawCheckValue::Int(n) if n >= 0 => Ok(CheckValue::Count(n as u64)),
            RawCheckValue::Int(n) => Err(format!(
                "expected a non-negative integer or \"N/A\", found {}",
                n
            )),
            RawCheckValue::Text(s) if s == NOT_APPLICABLE => Ok(CheckValue::NotApplicable),
            RawCheckValue::Text(s) => Err(format!(
                "expected a non-negative integer or \"N/A\", found \"{}\"",
                s
            )),
        }
    }
}

impl From<CheckValue> for RawCheckValue {
    fn from(value: CheckValue) -> Self {
        match value {
            CheckValue::NotApplicable => RawCheckValue::Text(NOT_APPLICABLE.to_string()),
            CheckValue::Count(n) => RawCheckValue::Int(n as i64),
        }
    }
}

/// Severity of a reported detail.
///
/// Ordering is FAIL < WARN < INFO, which is also the order groups are
/// numbered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Fail,
    Warn,
    Info,
}

impl Severity {
    /// Prefix used for generated group ids (`ERROR01`, `WARN01`, `INFO01`).
    pub fn group_prefix(&self) -> &'static str {
        match self {
            Severity::Fail => "ERROR",
            Severity::Warn => "WARN",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Fail => "FAIL",
            Severity::Warn => "WARN",
            Severity::Info => "INFO",
        };
        f.write_str(s)
    }
}

/// Why a detail was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    /// A finding that fails the check.
    Violation,
    /// A finding matched by a pattern item.
    Found,
    /// A pattern item no finding matched.
    Missing,
    /// A finding covered by a waiver.
    Waived,
    /// A would-be failure downgraded by `waivers.value: 0`.
    Neutralized,
    /// A declared waiver that matched nothing.
    UnusedWaiver,
    /// A waive item carried as commentary only.
    Annotation,
    /// A waive item that could not be parsed.
    MalformedWaiver,
    /// Configuration or input problem that stopped evaluation.
    ConfigurationError,
}

impl Tag {
    /// Text suffix the legacy report format appends to the reason.
    ///
    /// The engine never embeds these; renderers call this when they want the
    /// old look.
    pub fn legacy_suffix(&self) -> Option<&'static str> {
        match self {
            Tag::Waived => Some("[WAIVER]"),
            Tag::Annotation => Some("[WAIVED_INFO]"),
            Tag::Neutralized => Some("[WAIVED_AS_INFO]"),
            _ => None,
        }
    }
}

/// One reported line of a classification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub severity: Severity,
    pub tag: Tag,
    pub name: String,
    pub reason: String,
    /// Grouping key.
    pub category: String,
    pub file: String,
    pub line: Option<u32>,
}

/// A severity-uniform bucket of detail names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub severity: Severity,
    pub description: String,
    pub items: Vec<String>,
}

/// Final output of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Check type (1 to 4); absent when evaluation never started.
    pub mode: Option<u8>,
    pub value: CheckValue,
    pub is_pass: bool,
    pub details: Vec<Detail>,
    pub groups: BTreeMap<String, Group>,
    /// Pattern items no finding matched.
    #[serde(default)]
    pub missing_items: Vec<String>,
}

impl ClassificationResult {
    /// Process exit status for a hosting driver: 0 iff the check passed.
    pub fn exit_code(&self) -> i32 {
        if self.is_pass {
            0
        } else {
            1
        }
    }

    /// Number of details at the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.details
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Details carrying the given tag.
    pub fn details_tagged(&self, tag: Tag) -> impl Iterator<Item = &Detail> {
        self.details.iter().filter(move |d| d.tag == tag)
    }
}
