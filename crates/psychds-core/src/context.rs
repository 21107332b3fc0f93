//! Dataset-wide and per-file evaluation contexts.
//!
//! The dataset context is built once per validation run and shared
//! read-only; a fresh file context is built for every non-ignored file
//! and carries everything the rule engine needs: filename elements, the
//! merged sidecar cascade, its JSON-LD expansion, parsed CSV columns and
//! the declared variable names.

use crate::issues::IssueFile;
use crate::parsers::csv::{parse_csv, ParsedCsv};
use crate::parsers::filename::{parse_filename, FilenameParts};
use crate::parsers::jsonld;
use crate::tree::{FileEntry, FileTree};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Identifies the file a sidecar key came from, for issue attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub path: String,
    pub name: String,
}

impl FileRef {
    pub fn of(file: &FileEntry) -> Self {
        Self {
            path: file.path.clone(),
            name: file.name.clone(),
        }
    }
}

/// Built once per validation: root metadata and top-level layout.
#[derive(Debug, Clone, Default)]
pub struct DatasetContext {
    /// Parsed root descriptor; empty when absent or unparseable.
    pub dataset_description: Map<String, Value>,
    /// The root descriptor file itself, when present.
    pub description_file: Option<FileRef>,
    /// Names of the dataset's top-level subdirectories.
    pub base_dirs: Vec<String>,
}

impl DatasetContext {
    pub fn new(tree: &FileTree) -> Self {
        let descriptor = tree
            .files
            .iter()
            .find(|f| f.name == "dataset_description.json");
        let dataset_description = descriptor
            .and_then(|f| f.parsed_json.as_ref())
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Self {
            dataset_description,
            description_file: descriptor.map(FileRef::of),
            base_dirs: tree.base_dirs(),
        }
    }
}

/// Per-file evaluation context.
#[derive(Debug)]
pub struct FileContext<'t> {
    pub file: &'t FileEntry,
    pub filename: FilenameParts,
    pub stem: String,
    /// First path segment, or `/` for files at the dataset root.
    pub base_dir: String,
    /// Effective sidecar: the root descriptor overlaid by the ancestor
    /// sidecar chain, closest last.
    pub sidecar: Map<String, Value>,
    /// JSON-LD expansion of `sidecar`; empty when expansion failed.
    pub expanded_sidecar: Map<String, Value>,
    /// Top-level sidecar key -> file that introduced it.
    pub metadata_provenance: HashMap<String, FileRef>,
    /// Column view of the file when it is CSV.
    pub columns: Option<ParsedCsv>,
    /// Variable names declared by `variableMeasured`.
    pub valid_columns: Vec<String>,
    /// Schema rule paths matched by this file's name and location.
    pub filename_rules: Vec<String>,
    /// The root descriptor file, kept for issue attribution fallbacks.
    pub description_file: Option<FileRef>,
}

impl<'t> FileContext<'t> {
    pub fn new(file: &'t FileEntry, dataset: &DatasetContext) -> Self {
        let filename = parse_filename(&file.name);
        let mut metadata_provenance = HashMap::new();
        if let Some(source) = &dataset.description_file {
            for key in dataset.dataset_description.keys() {
                metadata_provenance.insert(key.clone(), source.clone());
            }
        }
        Self {
            file,
            stem: file.stem().to_string(),
            base_dir: base_dir_of(&file.path),
            sidecar: dataset.dataset_description.clone(),
            expanded_sidecar: Map::new(),
            metadata_provenance,
            columns: None,
            valid_columns: Vec::new(),
            filename_rules: Vec::new(),
            description_file: dataset.description_file.clone(),
            filename,
        }
    }

    pub fn extension(&self) -> &str {
        &self.filename.extension
    }

    /// An issue-file record pointing at this file.
    pub fn issue_file(&self) -> IssueFile {
        IssueFile::new(self.file.path.clone(), self.file.name.clone())
    }

    pub fn suffix(&self) -> &str {
        &self.filename.suffix
    }

    /// Walk the ancestor chain from the tree root to this file's
    /// directory, merging matching sidecars (root first, closest last),
    /// then expand the result and derive the declared variable names.
    pub fn load_sidecar(&mut self, tree: &FileTree) {
        let mut node = tree;
        loop {
            self.merge_level(node);
            let next = node
                .directories
                .iter()
                .find(|d| self.file.path.starts_with(&format!("{}/", d.path)));
            match next {
                Some(dir) => node = dir,
                None => break,
            }
        }
        self.expand_sidecar();
    }

    fn merge_level(&mut self, node: &FileTree) {
        let candidates: Vec<&FileEntry> = node
            .files
            .iter()
            .filter(|f| {
                if f.extension() != ".json" {
                    return false;
                }
                let parts = parse_filename(&f.name);
                (parts.suffix == "data" && f.stem() == self.stem) || f.stem() == "file_metadata"
            })
            .collect();

        let chosen = match candidates.len() {
            0 => return,
            1 => candidates[0],
            _ => {
                // Ambiguous: prefer the exact path replacement
                // (x.csv -> x.json), else keep the first candidate.
                let replaced = replace_extension(&self.file.path, self.extension());
                match candidates.iter().find(|f| f.path == replaced) {
                    Some(exact) => exact,
                    None => {
                        tracing::warn!(
                            target_file = %self.file.path,
                            directory = %node.path,
                            "multiple sidecar candidates in one directory, keeping the first"
                        );
                        candidates[0]
                    }
                }
            }
        };

        if let Some(Value::Object(map)) = &chosen.parsed_json {
            let source = FileRef::of(chosen);
            for (key, value) in map {
                self.sidecar.insert(key.clone(), value.clone());
                self.metadata_provenance.insert(key.clone(), source.clone());
            }
        }
    }

    fn expand_sidecar(&mut self) {
        if self.sidecar.is_empty() {
            return;
        }
        match jsonld::expand(&Value::Object(self.sidecar.clone())) {
            Ok(expanded) => {
                if let Some(Value::Object(map)) = expanded.into_iter().next() {
                    self.expanded_sidecar = map;
                }
            }
            Err(err) => {
                tracing::debug!(file = %self.file.path, %err, "sidecar expansion failed");
            }
        }
        self.valid_columns = derive_valid_columns(&self.expanded_sidecar);
    }

    /// Parse the file's CSV content into the column view.
    pub fn load_columns(&mut self) {
        if self.extension() == ".csv" && !self.file.read_failed {
            self.columns = Some(parse_csv(self.file.text()));
        }
    }

    /// The file a top-level metadata key came from, defaulting to this
    /// file itself.
    pub fn provenance_of(&self, key: &str) -> FileRef {
        self.metadata_provenance
            .get(key)
            .cloned()
            .unwrap_or_else(|| FileRef::of(self.file))
    }
}

fn base_dir_of(path: &str) -> String {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    if segments.len() > 1 {
        segments[0].to_string()
    } else {
        "/".to_string()
    }
}

fn replace_extension(path: &str, extension: &str) -> String {
    if extension.is_empty() {
        format!("{}.json", path)
    } else {
        format!("{}.json", &path[..path.len() - extension.len()])
    }
}

/// Pull the declared variable names out of an expanded sidecar: either
/// literal `@value` entries or PropertyValue objects with a `name`.
fn derive_valid_columns(expanded: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(entries)) = expanded.get("http://schema.org/variableMeasured") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for entry in entries {
        let Value::Object(map) = entry else { continue };
        if let Some(Value::String(name)) = map.get("@value") {
            out.push(name.clone());
            continue;
        }
        if let Some(Value::Array(names)) = map.get("http://schema.org/name") {
            if let Some(Value::Object(first)) = names.first() {
                if let Some(Value::String(name)) = first.get("@value") {
                    out.push(name.clone());
                }
            }
        }
    }
    out
}
