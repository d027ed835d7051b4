//! Waiver parsing and resolution.
//!
//! A waiver exempts findings whose matching key (`category:name`, or the
//! bare name when there is no category) equals the waiver's name exactly.
//! Waive items are parsed once, when the check mode is detected:
//!
//! - `{name, reason}` records become [`WaiverEntry`] values and take part in
//!   matching.
//! - Plain strings become [`WaiverAnnotation`] values. They are commentary
//!   and never match anything.
//! - Anything else is rejected with a [`WaiverFormatError`] and reported
//!   as a warning; evaluation carries on without it.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::finding::Finding;

/// A waive item that could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaiverFormatError {
    #[error("waive_items[{index}] has no usable `name`")]
    MissingName { index: usize },

    #[error("waive_items[{index}] is a {found}, expected a string or a {{name, reason}} record")]
    UnsupportedEntry { index: usize, found: &'static str },

    #[error("waive_items[{index}] repeats waiver key `{key}`")]
    DuplicateKey { index: usize, key: String },
}

impl WaiverFormatError {
    pub fn index(&self) -> usize {
        match self {
            WaiverFormatError::MissingName { index }
            | WaiverFormatError::UnsupportedEntry { index, .. }
            | WaiverFormatError::DuplicateKey { index, .. } => *index,
        }
    }

    /// Field reference used as the detail name.
    pub fn label(&self) -> String {
        format!("waive_items[{}]", self.index())
    }
}

/// A waiver that matches findings by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaiverEntry {
    pub key: String,
    pub reason: String,
}

/// A waive item carried as commentary only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaiverAnnotation {
    pub text: String,
    pub reason: String,
}

/// Parsed waive items, split by how they are used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaiverSet {
    /// Records, in declared order, keys unique
    pub entries: Vec<WaiverEntry>,

    /// Plain-string items, in declared order
    pub annotations: Vec<WaiverAnnotation>,

    /// Items that were skipped
    pub rejected: Vec<WaiverFormatError>,
}

impl WaiverSet {
    /// Parse raw waive items.
    ///
    /// When two records share a key the first one wins and the later one is
    /// rejected.
    pub fn parse(items: &[Value]) -> Self {
        let mut set = WaiverSet::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (index, item) in items.iter().enumerate() {
            match item {
                Value::String(text) => set.annotations.push(WaiverAnnotation {
                    text: text.clone(),
                    reason: String::new(),
                }),
                Value::Object(map) => {
                    let key = match map.get("name") {
                        Some(Value::String(name)) if !name.is_empty() => name.clone(),
                        _ => {
                            set.reject(WaiverFormatError::MissingName { index });
                            continue;
                        }
                    };

                    if !seen.insert(key.clone()) {
                        set.reject(WaiverFormatError::DuplicateKey { index, key });
                        continue;
                    }

                    let reason = match map.get("reason") {
                        None | Some(Value::Null) => String::new(),
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                    };
                    set.entries.push(WaiverEntry { key, reason });
                }
                other => set.reject(WaiverFormatError::UnsupportedEntry {
                    index,
                    found: json_type_name(other),
                }),
            }
        }

        set
    }

    fn reject(&mut self, error: WaiverFormatError) {
        tracing::debug!(error = %error, "Rejected waive item");
        self.rejected.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.annotations.is_empty() && self.rejected.is_empty()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "record",
    }
}

/// A finding together with the waiver that covers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaivedFinding<'a> {
    pub finding: &'a Finding,
    pub waiver: &'a WaiverEntry,
}

/// How one finding fared against the waivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage<'a> {
    Waived(WaivedFinding<'a>),
    Unwaived(&'a Finding),
}

/// Outcome of matching findings against waivers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaiverResolution<'a> {
    /// Every finding, in input order
    pub coverage: Vec<Coverage<'a>>,

    /// Covered findings, in input order
    pub waived: Vec<WaivedFinding<'a>>,

    /// Uncovered findings, in input order
    pub unwaived: Vec<&'a Finding>,

    /// Waivers that matched at least one finding, in declared order
    pub used_waivers: Vec<&'a WaiverEntry>,

    /// Waivers that matched nothing, in declared order
    pub unused_waivers: Vec<&'a WaiverEntry>,
}

/// Partition findings into waived and unwaived, and find unused waivers.
///
/// Matching is exact equality between [`Finding::key`] and
/// [`WaiverEntry::key`].
pub fn resolve<'a, I>(items: I, entries: &'a [WaiverEntry]) -> WaiverResolution<'a>
where
    I: IntoIterator<Item = &'a Finding>,
{
    let by_key: HashMap<&str, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.key.as_str(), i))
        .collect();
    let mut used = vec![false; entries.len()];
    let mut resolution = WaiverResolution::default();

    for finding in items {
        match by_key.get(&*finding.key()) {
            Some(&i) => {
                used[i] = true;
                let waived = WaivedFinding {
                    finding,
                    waiver: &entries[i],
                };
                resolution.waived.push(waived);
                resolution.coverage.push(Coverage::Waived(waived));
            }
            None => {
                resolution.unwaived.push(finding);
                resolution.coverage.push(Coverage::Unwaived(finding));
            }
        }
    }

    for (entry, was_used) in entries.iter().zip(used) {
        if was_used {
            resolution.used_waivers.push(entry);
        } else {
            tracing::debug!(waiver = %entry.key, "Waiver matched no finding");
            resolution.unused_waivers.push(entry);
        }
    }

    resolution
}
