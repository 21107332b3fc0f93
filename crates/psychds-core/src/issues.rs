//! Issue types, the dataset-wide issue collector, and error reporting.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Compatibility stub carried on every serialised issue. Consumers must not
/// interpret it.
pub const COMPAT_ERROR_CODE: i64 = -9_007_199_254_740_991;

/// Key recorded in the check list by older schema versions for JSON-LD
/// syntax problems. Treated as an alias of [`INVALID_JSONLD_SYNTAX`] when
/// querying the collector.
pub const INVALID_JSONLD_SYNTAX: &str = "INVALID_JSONLD_SYNTAX";
pub const INVALID_JSONLD_FORMATTING: &str = "INVALID_JSONLD_FORMATTING";

/// Severity level of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Hard failures that abort a validation run.
///
/// Everything recoverable is reported through [`DatasetIssues`] instead and
/// never surfaces as an `Err`.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory: {path}")]
    DirRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is not valid UTF-8 (UTF-16 content detected): {path}")]
    UnicodeDecode { path: PathBuf },

    #[error("Dataset root is not a readable directory: {path}")]
    UnreadableRoot { path: PathBuf },

    #[error("Invalid schema version: {version} (expected X.Y.Z or \"latest\")")]
    InvalidSchemaVersion { version: String },

    #[error("Failed to load schema: {message}")]
    SchemaLoad { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single file (or location within one) attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFile {
    /// Dataset-relative path, `/`-separated, leading `/`.
    pub path: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<usize>,
}

impl IssueFile {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            evidence: None,
            line: None,
            character: None,
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn with_location(mut self, line: usize, character: usize) -> Self {
        self.line = Some(line);
        self.character = Some(character);
        self
    }
}

/// A collected issue: stable key, severity, reason, and the files that
/// triggered it in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub severity: Severity,
    pub reason: String,
    /// Rule paths that must be satisfied for this issue to be retained.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    files: Vec<IssueFile>,
}

impl Issue {
    pub fn files(&self) -> &[IssueFile] {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&IssueFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Insert a file record, keyed by path. A later insert for the same
    /// path is dropped so evidence from the first sighting wins.
    fn push_file(&mut self, file: IssueFile) {
        if !self.files.iter().any(|f| f.path == file.path) {
            self.files.push(file);
        }
    }
}

/// Resolve the canonical form of an issue key (alias folding).
fn canonical_key(key: &str) -> &str {
    if key == INVALID_JSONLD_FORMATTING {
        INVALID_JSONLD_SYNTAX
    } else {
        key
    }
}

/// Default severity and reason for issues raised by the engine itself.
/// Issues emitted from schema rule nodes carry their own code/level/reason.
const ISSUE_DEFINITIONS: &[(&str, Severity, &str)] = &[
    (
        "INVALID_JSON_FORMATTING",
        Severity::Error,
        "This file is not formatted as valid JSON.",
    ),
    (
        "INVALID_JSONLD_SYNTAX",
        Severity::Error,
        "This metadata file could not be expanded as JSON-LD.",
    ),
    (
        "UNICODE_DECODE_ERROR",
        Severity::Error,
        "This file appears to be UTF-16 encoded; Psych-DS files must be UTF-8.",
    ),
    (
        "NO_HEADER",
        Severity::Error,
        "CSV data files must contain a header row.",
    ),
    (
        "HEADER_ROW_MISMATCH",
        Severity::Error,
        "One or more rows have a different number of columns than the header.",
    ),
    (
        "ROWID_VALUES_NOT_UNIQUE",
        Severity::Error,
        "Values within the row_id column must be unique.",
    ),
    (
        "CSV_FORMATTING_ERROR",
        Severity::Error,
        "This CSV file could not be parsed.",
    ),
    (
        "FILE_EMPTY",
        Severity::Warning,
        "This file is empty.",
    ),
    (
        "FILE_NOT_CHECKED",
        Severity::Warning,
        "This file did not match any rule in the schema and was not checked.",
    ),
    (
        "WRONG_METADATA_LOCATION",
        Severity::Warning,
        "dataset_description.json must live in the dataset root, not a subdirectory.",
    ),
    (
        "ALL_FILENAME_RULES_HAVE_ISSUES",
        Severity::Error,
        "This file matched several filename rules but satisfied none of them.",
    ),
    (
        "EXTENSION_MISMATCH",
        Severity::Error,
        "The file extension is not allowed for the matched rule.",
    ),
    (
        "FILENAME_KEYWORD_FORMATTING_ERROR",
        Severity::Error,
        "Filenames must be composed of key-value keyword pairs (key-value_key-value_..._suffix.ext).",
    ),
    (
        "FILENAME_UNOFFICIAL_KEYWORD_WARNING",
        Severity::Warning,
        "The filename uses keywords that are not part of the official Psych-DS keyword set.",
    ),
    (
        "CSV_COLUMN_MISSING",
        Severity::Warning,
        "This CSV file has column headers that are not listed in variableMeasured.",
    ),
    (
        "JSON_KEY_REQUIRED",
        Severity::Error,
        "The metadata object is missing one or more required fields.",
    ),
    (
        "MISSING_DATASET_TYPE",
        Severity::Error,
        "The metadata object is missing the @type field; the root object must be of type Dataset.",
    ),
    (
        "INCORRECT_DATASET_TYPE",
        Severity::Error,
        "The @type of the root metadata object must be Dataset.",
    ),
    (
        "INVALID_SCHEMAORG_PROPERTY",
        Severity::Warning,
        "The metadata uses a property that schema.org does not define for its enclosing type.",
    ),
    (
        "INVALID_OBJECT_TYPE",
        Severity::Warning,
        "A nested metadata object declares a @type outside the valid range of its property.",
    ),
    (
        "OBJECT_TYPE_MISSING",
        Severity::Warning,
        "A nested metadata object is missing a @type declaration.",
    ),
    (
        "UNKNOWN_NAMESPACE",
        Severity::Warning,
        "The metadata uses a key outside the schema.org namespace.",
    ),
    (
        "VARIABLE_MISSING_FROM_CSV_COLUMNS",
        Severity::Warning,
        "variableMeasured declares variables that no CSV data file realises as a column.",
    ),
];

fn lookup_definition(key: &str) -> Option<(Severity, &'static str)> {
    ISSUE_DEFINITIONS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, sev, reason)| (*sev, *reason))
}

/// Insertion-ordered collector of validation issues, keyed by issue key.
///
/// Repeated adds for the same key merge file lists; a file never appears
/// twice in one issue.
#[derive(Debug, Default, Clone)]
pub struct DatasetIssues {
    issues: Vec<Issue>,
}

impl DatasetIssues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add files under an engine-defined issue key, taking severity and
    /// reason from the built-in definitions table.
    pub fn add(&mut self, key: &str, files: impl IntoIterator<Item = IssueFile>) -> &mut Issue {
        let key = canonical_key(key);
        let (severity, reason) =
            lookup_definition(key).unwrap_or((Severity::Warning, "Unrecognized issue."));
        self.add_custom(key, severity, reason, &[], files)
    }

    /// Add files under a fully specified issue (schema-code issues carry
    /// their own level, reason and `requires` list).
    pub fn add_custom(
        &mut self,
        key: &str,
        severity: Severity,
        reason: &str,
        requires: &[String],
        files: impl IntoIterator<Item = IssueFile>,
    ) -> &mut Issue {
        let key = canonical_key(key);
        let idx = match self.issues.iter().position(|i| i.key == key) {
            Some(idx) => idx,
            None => {
                self.issues.push(Issue {
                    key: key.to_string(),
                    severity,
                    reason: reason.to_string(),
                    requires: requires.to_vec(),
                    files: Vec::new(),
                });
                self.issues.len() - 1
            }
        };
        let issue = &mut self.issues[idx];
        for file in files {
            issue.push_file(file);
        }
        issue
    }

    pub fn has_issue(&self, key: &str) -> bool {
        let key = canonical_key(key);
        self.issues.iter().any(|i| i.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&Issue> {
        let key = canonical_key(key);
        self.issues.iter().find(|i| i.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Merge every issue from `other`, preserving `other`'s insertion order
    /// after the existing entries. Used to fold scratch collectors back in.
    pub fn merge(&mut self, other: DatasetIssues) {
        for issue in other.issues {
            self.add_custom(
                &issue.key,
                issue.severity,
                &issue.reason,
                &issue.requires,
                issue.files,
            );
        }
    }

    /// Drop issues whose `requires` list is not fully satisfied by the
    /// rules-satisfaction record.
    pub fn filter_issues(&mut self, rules_record: &HashMap<String, bool>) {
        self.issues.retain(|issue| {
            issue
                .requires
                .iter()
                .all(|path| rules_record.get(path).copied().unwrap_or(false))
        });
    }

    /// Severity-partitioned serialisable view of the collector.
    pub fn partitioned(&self, schema_version: &str) -> IssuesOutput {
        let format = |issue: &Issue| IssueOutput {
            severity: issue.severity,
            key: issue.key.clone(),
            code: COMPAT_ERROR_CODE,
            reason: issue.reason.clone(),
            files: issue
                .files
                .iter()
                .map(|f| IssueFileOutput {
                    key: issue.key.clone(),
                    file: FileDetail {
                        path: f.path.clone(),
                        name: f.name.clone(),
                        relative_path: f.path.clone(),
                    },
                    evidence: f.evidence.clone(),
                    line: f.line,
                    character: f.character,
                    severity: issue.severity,
                    reason: issue.reason.clone(),
                })
                .collect(),
            help_url: Some(format!(
                "https://psychds-docs.readthedocs.io/en/latest/reference/issues/{}/?version={}",
                issue.key, schema_version
            )),
        };
        IssuesOutput {
            errors: self
                .issues
                .iter()
                .filter(|i| i.severity == Severity::Error)
                .map(format)
                .collect(),
            warnings: self
                .issues
                .iter()
                .filter(|i| i.severity == Severity::Warning)
                .map(format)
                .collect(),
        }
    }
}

/// Issues partitioned by severity for the final result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuesOutput {
    pub errors: Vec<IssueOutput>,
    pub warnings: Vec<IssueOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOutput {
    pub severity: Severity,
    pub key: String,
    /// Compatibility stub, always [`COMPAT_ERROR_CODE`].
    pub code: i64,
    pub reason: String,
    pub files: Vec<IssueFileOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueFileOutput {
    pub key: String,
    pub file: FileDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<usize>,
    pub severity: Severity,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    pub path: String,
    pub name: String,
    pub relative_path: String,
}
