//! # psychds-core
//!
//! Schema-driven validation engine for [Psych-DS](https://psych-ds.github.io)
//! datasets.
//!
//! A Psych-DS dataset is a directory tree with a JSON-LD
//! `dataset_description.json` at its root, optional sidecar metadata, and
//! CSV data files under `/data`. The validator crawls the tree, builds a
//! per-file evaluation context (inherited sidecars, JSON-LD expansion,
//! parsed CSV columns), matches schema filename rules, evaluates
//! selector-gated schema rules, and reports a structured verdict:
//!
//! ```ignore
//! let options = ValidatorOptions::for_path("path/to/dataset");
//! let result = validate_path(&options)?;
//! if !result.valid {
//!     for issue in &result.issues.errors {
//!         eprintln!("{}: {}", issue.key, issue.reason);
//!     }
//! }
//! ```
//!
//! Validation issues are accumulated and returned, never thrown; only
//! programmatic failures (unreadable root, bad schema version, schema
//! load failure) surface as [`CoreError`].

/// Dataset-wide and per-file evaluation contexts.
pub mod context;
/// Progress event fan-out for external UIs.
pub mod events;
/// Filesystem abstraction backing the tree reader.
pub mod fs;
/// Gitignore-style ignore rules with the Psych-DS defaults.
pub mod ignore_rules;
/// Issue types, the issue collector, and error reporting.
pub mod issues;
/// CSV, filename-element, and JSON-LD parsers.
pub mod parsers;
/// Schema access and loading.
pub mod schema;
mod rules;
/// The dataset summary.
pub mod summary;
/// The dataset file tree and its reader.
pub mod tree;
mod validator;

pub use context::{DatasetContext, FileContext};
pub use events::{EventEmitter, ValidationEvent};
pub use fs::{FileSystem, RealFileSystem};
pub use ignore_rules::FileIgnoreRules;
pub use issues::{
    CoreError, CoreResult, DatasetIssues, Issue, IssueFile, IssueOutput, IssuesOutput, Severity,
};
pub use parsers::csv::{parse_csv, CsvIssue, ParsedCsv};
pub use parsers::filename::{parse_filename, FilenameParts};
pub use schema::loader::{load_bundled, load_schema, validate_version};
pub use schema::Schema;
pub use summary::Summary;
pub use tree::{read_file_tree, FileEntry, FileTree, ReadDataset};
pub use validator::{
    validate, validate_path, validate_with_events, ValidationResult, ValidatorOptions,
};
