//! Findings extracted from tool reports.
//!
//! The report parsers live outside this crate. They hand over a list of
//! findings, each naming the violated object and pointing back at the line
//! of the report it came from.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Category used for grouping when a finding declares none.
pub const DEFAULT_CATEGORY: &str = "general";

/// Errors that can occur when loading findings.
#[derive(Error, Debug)]
pub enum FindingsError {
    #[error("Failed to read findings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse findings YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse findings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where in a report a finding was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub file: String,

    #[serde(default)]
    pub line: Option<u32>,
}

/// A single named result extracted from a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// The violated object (e.g. a pin, net or cell path)
    pub name: String,

    /// Optional grouping key (e.g. "max_transition")
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub location: Location,

    /// Free-text explanation from the parser
    #[serde(default)]
    pub message: Option<String>,
}

impl Finding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            location: Location::default(),
            message: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.location = Location {
            file: file.into(),
            line: Some(line),
        };
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The declared category, ignoring empty strings.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }

    /// Matching key: `category:name` when a category is present, else `name`.
    ///
    /// Both pattern items and waiver entries are matched against this key.
    pub fn key(&self) -> Cow<'_, str> {
        match self.category() {
            Some(category) => Cow::Owned(format!("{}:{}", category, self.name)),
            None => Cow::Borrowed(&self.name),
        }
    }

    /// Key used to group this finding's detail.
    pub fn group_category(&self) -> &str {
        self.category().unwrap_or(DEFAULT_CATEGORY)
    }

    /// The parser's message, or `fallback` when there is none.
    pub fn reason_or(&self, fallback: &str) -> String {
        match self.message.as_deref() {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FindingsDocument {
    List(Vec<Finding>),
    Wrapped { findings: Vec<Finding> },
}

impl From<FindingsDocument> for Vec<Finding> {
    fn from(doc: FindingsDocument) -> Self {
        match doc {
            FindingsDocument::List(findings) => findings,
            FindingsDocument::Wrapped { findings } => findings,
        }
    }
}

/// Parse findings from YAML: either a list or `{findings: [...]}`.
pub fn findings_from_yaml(yaml: &str) -> Result<Vec<Finding>, FindingsError> {
    let doc: FindingsDocument = serde_yaml::from_str(yaml)?;
    Ok(doc.into())
}

/// Parse findings from JSON: either a list or `{"findings": [...]}`.
pub fn findings_from_json(json: &str) -> Result<Vec<Finding>, FindingsError> {
    let doc: FindingsDocument = serde_json::from_str(json)?;
    Ok(doc.into())
}

/// Load findings from a file, choosing JSON for `.json` and YAML otherwise.
pub fn load_findings(path: impl AsRef<Path>) -> Result<Vec<Finding>, FindingsError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| FindingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        findings_from_json(&contents)
    } else {
        findings_from_yaml(&contents)
    }
}
