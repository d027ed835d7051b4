//! OutcomeBuilder: turns stage outputs into the final result.
//!
//! Decision rules are fixed per mode:
//! 1. Boolean: pass iff there are no findings
//! 2. Pattern count: pass iff the matched count equals the expected value
//! 3. Pattern with waivers: pass iff every matched finding is waived
//! 4. Boolean with waivers: pass iff every finding is waived
//!
//! Modes 1 and 2 with `waivers.value: 0` always pass, with every would-be
//! FAIL downgraded to INFO.
//!
//! Details are grouped by `(severity, category)`. Group ids are numbered per
//! severity prefix (`ERROR01`, `WARN01`, `INFO01`, ...) with categories in
//! lexicographic order, so the same input always yields the same ids.

use std::collections::BTreeMap;

use crate::finding::Finding;
use crate::mode::CheckMode;
use crate::pattern::{match_findings, PatternMatches};
use crate::types::{CheckValue, ClassificationResult, Detail, Group, Severity, Tag};
use crate::waiver::{resolve, Coverage, WaiverResolution, WaiverSet};

/// Category for pattern items no finding matched.
pub const MISSING_PATTERN_CATEGORY: &str = "missing_pattern";
/// Category for declared waivers that matched nothing.
pub const UNUSED_WAIVER_CATEGORY: &str = "unused_waiver";
/// Category for waive items reported as commentary.
pub const ANNOTATION_CATEGORY: &str = "waiver_annotation";
/// Category for waive items that were skipped.
pub const MALFORMED_WAIVER_CATEGORY: &str = "malformed_waiver";
/// Category for configuration and input failures.
pub const CONFIGURATION_CATEGORY: &str = "configuration";

/// Builds a [`ClassificationResult`] from a mode and its stage outputs.
pub struct OutcomeBuilder;

impl OutcomeBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the result for one evaluation.
    ///
    /// `patterns` and `waivers` are the outputs of the pattern and waiver
    /// stages. When a mode needs a stage output that was not supplied it is
    /// computed here from `findings`, so callers may pass `None` for both.
    pub fn build(
        &self,
        mode: &CheckMode,
        findings: &[Finding],
        patterns: Option<&PatternMatches<'_>>,
        waivers: Option<&WaiverResolution<'_>>,
    ) -> ClassificationResult {
        let mut draft = match mode {
            CheckMode::Boolean { neutralize } => self.boolean(findings, neutralize.as_ref()),
            CheckMode::PatternCount {
                expected,
                patterns: items,
                neutralize,
            } => {
                let computed;
                let matches = match patterns {
                    Some(m) => m,
                    None => {
                        computed = match_findings(findings, items);
                        &computed
                    }
                };
                self.pattern_count(*expected, matches, neutralize.as_ref())
            }
            CheckMode::PatternWaived {
                patterns: items,
                waivers: set,
            } => {
                let computed_matches;
                let matches = match patterns {
                    Some(m) => m,
                    None => {
                        computed_matches = match_findings(findings, items);
                        &computed_matches
                    }
                };
                let computed_resolution;
                let resolution = match waivers {
                    Some(r) => r,
                    None => {
                        computed_resolution = resolve(matches.matched_findings(), &set.entries);
                        &computed_resolution
                    }
                };
                self.pattern_waived(matches, resolution, set)
            }
            CheckMode::BooleanWaived { waivers: set } => {
                let computed;
                let resolution = match waivers {
                    Some(r) => r,
                    None => {
                        computed = resolve(findings, &set.entries);
                        &computed
                    }
                };
                self.boolean_waived(resolution, set)
            }
        };

        if mode.is_neutralized() {
            draft.neutralize();
        }

        let result = draft.finish(Some(mode.type_number()), findings.is_empty());
        tracing::debug!(
            mode = %mode,
            is_pass = result.is_pass,
            details = result.details.len(),
            "Built classification result"
        );
        result
    }

    /// Result for a check that never reached evaluation.
    ///
    /// One FAIL detail per offending file or field, all in `ERROR01`.
    pub fn failure(&self, reason: &str, offending: &[String]) -> ClassificationResult {
        let mut draft = Draft::new(CheckValue::NotApplicable, false);
        let offending: Vec<String> = if offending.is_empty() {
            vec![CONFIGURATION_CATEGORY.to_string()]
        } else {
            offending.to_vec()
        };

        for name in offending {
            draft.push(Detail {
                severity: Severity::Fail,
                tag: Tag::ConfigurationError,
                name,
                reason: reason.to_string(),
                category: CONFIGURATION_CATEGORY.to_string(),
                file: String::new(),
                line: None,
            });
        }

        draft.finish(None, false)
    }

    fn boolean(&self, findings: &[Finding], neutralize: Option<&WaiverSet>) -> Draft {
        let mut draft = Draft::new(CheckValue::NotApplicable, findings.is_empty());

        for finding in findings {
            draft.push(finding_detail(
                finding,
                Severity::Fail,
                Tag::Violation,
                finding.reason_or("Violation reported"),
            ));
        }

        if let Some(set) = neutralize {
            draft.push_neutralize_annotations(set);
        }
        draft
    }

    fn pattern_count(
        &self,
        expected: u64,
        matches: &PatternMatches<'_>,
        neutralize: Option<&WaiverSet>,
    ) -> Draft {
        let matched = matches.matched.len() as u64;
        let is_pass = matched == expected;
        let severity = if is_pass { Severity::Info } else { Severity::Fail };
        let mut draft = Draft::new(CheckValue::Count(matched), is_pass);

        for hit in &matches.matched {
            draft.push(finding_detail(
                hit.finding,
                severity,
                Tag::Found,
                format!("Matched pattern '{}'", hit.pattern),
            ));
        }
        draft.push_missing(&matches.missing, severity);

        if !is_pass {
            tracing::debug!(matched, expected, "Matched count differs from expected");
        }

        if let Some(set) = neutralize {
            draft.push_neutralize_annotations(set);
        }
        draft
    }

    fn pattern_waived(
        &self,
        matches: &PatternMatches<'_>,
        resolution: &WaiverResolution<'_>,
        set: &WaiverSet,
    ) -> Draft {
        let matched = matches.matched.len() as u64;
        let mut draft = Draft::new(CheckValue::Count(matched), resolution.unwaived.is_empty());

        draft.push_resolution(resolution);
        draft.push_missing(&matches.missing, Severity::Info);
        draft.push_unused(resolution);
        draft.push_waiver_notes(set, Severity::Warn);
        draft
    }

    fn boolean_waived(&self, resolution: &WaiverResolution<'_>, set: &WaiverSet) -> Draft {
        let mut draft = Draft::new(CheckValue::NotApplicable, resolution.unwaived.is_empty());

        draft.push_resolution(resolution);
        draft.push_unused(resolution);
        draft.push_waiver_notes(set, Severity::Warn);
        draft
    }
}

impl Default for OutcomeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn finding_detail(finding: &Finding, severity: Severity, tag: Tag, reason: String) -> Detail {
    Detail {
        severity,
        tag,
        name: finding.name.clone(),
        reason,
        category: finding.group_category().to_string(),
        file: finding.location.file.clone(),
        line: finding.location.line,
    }
}

fn note_detail(severity: Severity, tag: Tag, name: String, reason: String, category: &str) -> Detail {
    Detail {
        severity,
        tag,
        name,
        reason,
        category: category.to_string(),
        file: String::new(),
        line: None,
    }
}

/// Result under construction.
struct Draft {
    value: CheckValue,
    is_pass: bool,
    details: Vec<Detail>,
    missing_items: Vec<String>,
}

impl Draft {
    fn new(value: CheckValue, is_pass: bool) -> Self {
        Self {
            value,
            is_pass,
            details: Vec::new(),
            missing_items: Vec::new(),
        }
    }

    fn push(&mut self, detail: Detail) {
        self.details.push(detail);
    }

    fn push_missing(&mut self, missing: &[&str], severity: Severity) {
        for pattern in missing {
            self.missing_items.push(pattern.to_string());
            self.push(note_detail(
                severity,
                Tag::Missing,
                pattern.to_string(),
                "No finding matched this pattern".to_string(),
                MISSING_PATTERN_CATEGORY,
            ));
        }
    }

    fn push_resolution(&mut self, resolution: &WaiverResolution<'_>) {
        for coverage in &resolution.coverage {
            let detail = match coverage {
                Coverage::Waived(waived) => {
                    let reason = if waived.waiver.reason.is_empty() {
                        "Waived".to_string()
                    } else {
                        waived.waiver.reason.clone()
                    };
                    finding_detail(waived.finding, Severity::Info, Tag::Waived, reason)
                }
                Coverage::Unwaived(finding) => finding_detail(
                    finding,
                    Severity::Fail,
                    Tag::Violation,
                    finding.reason_or("Not covered by any waiver"),
                ),
            };
            self.push(detail);
        }
    }

    fn push_unused(&mut self, resolution: &WaiverResolution<'_>) {
        for waiver in &resolution.unused_waivers {
            tracing::warn!(waiver = %waiver.key, "Waiver matched no finding");
            let reason = if waiver.reason.is_empty() {
                "Waiver not matched by any finding".to_string()
            } else {
                format!("Waiver not matched by any finding ({})", waiver.reason)
            };
            self.push(note_detail(
                Severity::Warn,
                Tag::UnusedWaiver,
                waiver.key.clone(),
                reason,
                UNUSED_WAIVER_CATEGORY,
            ));
        }
    }

    /// Plain-string annotations as INFO, rejected items at `rejected_severity`.
    fn push_waiver_notes(&mut self, set: &WaiverSet, rejected_severity: Severity) {
        for annotation in &set.annotations {
            self.push(note_detail(
                Severity::Info,
                Tag::Annotation,
                annotation.text.clone(),
                annotation.reason.clone(),
                ANNOTATION_CATEGORY,
            ));
        }
        for error in &set.rejected {
            tracing::warn!(error = %error, "Skipping malformed waive item");
            self.push(note_detail(
                rejected_severity,
                Tag::MalformedWaiver,
                error.label(),
                error.to_string(),
                MALFORMED_WAIVER_CATEGORY,
            ));
        }
    }

    /// Every waive item as commentary, records included.
    fn push_neutralize_annotations(&mut self, set: &WaiverSet) {
        for entry in &set.entries {
            self.push(note_detail(
                Severity::Info,
                Tag::Annotation,
                entry.key.clone(),
                entry.reason.clone(),
                ANNOTATION_CATEGORY,
            ));
        }
        self.push_waiver_notes(set, Severity::Info);
    }

    /// Force a pass and downgrade everything to INFO.
    fn neutralize(&mut self) {
        self.is_pass = true;
        for detail in &mut self.details {
            if detail.severity == Severity::Fail {
                detail.tag = Tag::Neutralized;
            }
            detail.severity = Severity::Info;
        }
    }

    fn finish(self, mode: Option<u8>, no_findings: bool) -> ClassificationResult {
        let groups = build_groups(&self.details, no_findings);
        ClassificationResult {
            mode,
            value: self.value,
            is_pass: self.is_pass,
            details: self.details,
            groups,
            missing_items: self.missing_items,
        }
    }
}

/// Group details by `(severity, category)` and assign sequential ids.
///
/// The "all clean" group is added only when there were no findings and
/// nothing was reported above INFO.
fn build_groups(details: &[Detail], no_findings: bool) -> BTreeMap<String, Group> {
    let clean = no_findings && details.iter().all(|d| d.severity == Severity::Info);

    let mut buckets: BTreeMap<(Severity, &str), Vec<String>> = BTreeMap::new();
    for detail in details {
        buckets
            .entry((detail.severity, detail.category.as_str()))
            .or_default()
            .push(detail.name.clone());
    }

    let mut counters: BTreeMap<Severity, usize> = BTreeMap::new();
    let mut next_id = |severity: Severity| {
        let n = counters.entry(severity).or_insert(0);
        *n += 1;
        format!("{}{:02}", severity.group_prefix(), n)
    };

    let mut groups = BTreeMap::new();
    for ((severity, category), items) in buckets {
        groups.insert(
            next_id(severity),
            Group {
                severity,
                description: describe_group(severity, category),
                items,
            },
        );
    }

    if clean {
        groups.insert(
            next_id(Severity::Info),
            Group {
                severity: Severity::Info,
                description: "All clean: no findings reported".to_string(),
                items: Vec::new(),
            },
        );
    }

    groups
}

fn describe_group(severity: Severity, category: &str) -> String {
    match category {
        MISSING_PATTERN_CATEGORY => "Pattern items not matched by any finding".to_string(),
        UNUSED_WAIVER_CATEGORY => "Waivers not matched by any finding".to_string(),
        ANNOTATION_CATEGORY => "Waiver annotations".to_string(),
        MALFORMED_WAIVER_CATEGORY => "Malformed waive items (skipped)".to_string(),
        CONFIGURATION_CATEGORY => "Configuration or input errors".to_string(),
        _ => match severity {
            Severity::Fail => format!("{} violations", category),
            Severity::Warn => format!("{} warnings", category),
            Severity::Info => format!("{} (informational)", category),
        },
    }
}
