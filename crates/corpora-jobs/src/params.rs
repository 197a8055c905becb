//! Task parameter types and per-type value parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use corpora_core::{ContentUri, Error, Result};

/// Form control kind for one task parameter, keyed by the task's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Text,
    Password,
    Boolean,
    Choice,
    /// Path of a file in the corpus file store.
    CorpusFile,
    /// Name of a repository attached to the corpus.
    CorpusRepo,
    /// Name of a content type in the corpus.
    ContentTypeRef,
    /// URI of a content record.
    CrossReference,
    /// Text reflowed to PEP 8 line conventions.
    Pep8Text,
}

impl ParameterType {
    pub const ALL: [ParameterType; 9] = [
        ParameterType::Text,
        ParameterType::Password,
        ParameterType::Boolean,
        ParameterType::Choice,
        ParameterType::CorpusFile,
        ParameterType::CorpusRepo,
        ParameterType::ContentTypeRef,
        ParameterType::CrossReference,
        ParameterType::Pep8Text,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ParameterType::Text => "text",
            ParameterType::Password => "password",
            ParameterType::Boolean => "boolean",
            ParameterType::Choice => "choice",
            ParameterType::CorpusFile => "corpus_file",
            ParameterType::CorpusRepo => "corpus_repo",
            ParameterType::ContentTypeRef => "content_type",
            ParameterType::CrossReference => "cross_reference",
            ParameterType::Pep8Text => "pep8_text",
        }
    }

    /// Resolve a task's type tag. Unknown tags are an error, never a
    /// silently skipped control.
    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.tag() == tag)
            .ok_or_else(|| Error::UnsupportedType(format!("task parameter type: {}", tag)))
    }

    /// Whether the value should be masked when displayed.
    pub fn is_secret(self) -> bool {
        matches!(self, ParameterType::Password)
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ParameterType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s)
    }
}

/// Parse a checkbox-style boolean.
pub fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "y" => Ok(true),
        "false" | "no" | "off" | "0" | "n" | "" => Ok(false),
        other => Err(Error::Validation(format!("not a boolean: {}", other))),
    }
}

/// Strip trailing whitespace from every line and trailing blank lines.
pub fn pep8_normalize(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().map(str::trim_end).collect();
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);
    lines[..end].join("\n")
}

/// A relative path inside the corpus file store.
pub fn validate_corpus_path(raw: &str) -> Result<String> {
    let path = raw.trim();
    if path.is_empty() {
        return Err(Error::Validation("file path is empty".to_string()));
    }
    if path.starts_with('/') || path.split('/').any(|seg| seg == "..") {
        return Err(Error::Validation(format!(
            "file path must stay inside the corpus: {}",
            path
        )));
    }
    Ok(path.to_string())
}

/// JSON value submitted for a cross-reference parameter.
pub fn cross_reference_value(uri: &ContentUri) -> JsonValue {
    json!({
        "uri": uri.to_string(),
        "content_type": uri.content_type,
        "id": uri.content_id,
    })
}
