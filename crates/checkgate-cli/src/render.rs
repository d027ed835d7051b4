//! Report envelope and text rendering.

use checkgate_core::{CheckConfig, ClassificationResult, Detail};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What `checkgate evaluate` prints: the result plus the check it belongs to.
#[derive(Debug, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub result: ClassificationResult,
}

impl Report {
    pub fn new(config: Option<&CheckConfig>, result: ClassificationResult) -> Self {
        Self {
            item_id: config.and_then(|c| c.item_id.clone()),
            description: config.and_then(|c| c.description.clone()),
            generated_at: Utc::now(),
            result,
        }
    }
}

/// Human-readable rendering in the legacy checker layout.
pub fn text(report: &Report) -> String {
    let result = &report.result;
    let verdict = if result.is_pass { "PASS" } else { "FAIL" };

    let mut lines = vec![match &report.item_id {
        Some(id) => format!("{}: {}", id, verdict),
        None => verdict.to_string(),
    }];
    if let Some(description) = &report.description {
        lines.push(format!("  {}", description));
    }
    if let Some(mode) = result.mode {
        lines.push(format!("  type {}, value {}", mode, result.value));
    }

    if !result.details.is_empty() {
        lines.push(String::new());
        lines.extend(result.details.iter().map(detail_line));
    }

    if !result.groups.is_empty() {
        lines.push(String::new());
        for (id, group) in &result.groups {
            lines.push(format!("{} {}", id, group.description));
            lines.extend(group.items.iter().map(|item| format!("  - {}", item)));
        }
    }

    lines.join("\n")
}

fn detail_line(detail: &Detail) -> String {
    let location = match (detail.file.as_str(), detail.line) {
        ("", _) => String::new(),
        (file, Some(n)) => format!(" ({}:{})", file, n),
        (file, None) => format!(" ({})", file),
    };
    let reason = if detail.reason.is_empty() {
        String::new()
    } else {
        format!(": {}", detail.reason)
    };
    let suffix = detail
        .tag
        .legacy_suffix()
        .map(|s| format!(" {}", s))
        .unwrap_or_default();

    format!(
        "[{}] {}{}{}{}",
        detail.severity, detail.name, location, reason, suffix
    )
}
