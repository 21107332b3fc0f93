//! The dataset file tree and its reader.
//!
//! The tree is built by a single recursive scan and is immutable
//! afterwards. Reading is eager: every file's text is loaded up front,
//! JSON files are parsed and JSON-LD expanded, and problems discovered
//! along the way are recorded as deferred issues on the file entry for
//! the orchestrator to replay.

use crate::fs::FileSystem;
use crate::ignore_rules::FileIgnoreRules;
use crate::issues::{CoreError, CoreResult};
use crate::parsers::filename;
use crate::parsers::jsonld;
use serde_json::Value;
use std::path::Path;

/// An issue discovered while reading a file, replayed during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredIssue {
    pub key: &'static str,
    pub evidence: Option<String>,
}

/// A file in the dataset tree, identified by its dataset-relative path.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    /// Dataset-relative, `/`-separated, with a leading `/`.
    pub path: String,
    pub size: u64,
    text: String,
    /// Parsed JSON content (with the root `@context` injected), if the
    /// file is JSON and parsing succeeded.
    pub parsed_json: Option<Value>,
    /// First JSON-LD expansion result of `parsed_json`.
    pub expanded: Option<Value>,
    pub issue_info: Vec<DeferredIssue>,
    /// Text decoding failed; content-level checks are skipped.
    pub read_failed: bool,
}

impl FileEntry {
    /// Full decoded text of the file (empty when decoding failed).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn stem(&self) -> &str {
        filename::stem(&self.name)
    }

    pub fn extension(&self) -> String {
        filename::parse_filename(&self.name).extension
    }
}

/// A directory node: ordered files and ordered child directories.
#[derive(Debug, Clone, Default)]
pub struct FileTree {
    /// Dataset-relative directory path; `/` for the root.
    pub path: String,
    pub name: String,
    pub files: Vec<FileEntry>,
    pub directories: Vec<FileTree>,
}

impl FileTree {
    /// Look up a file by dataset-relative path.
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        if let Some(file) = self.files.iter().find(|f| f.path == path) {
            return Some(file);
        }
        self.directories.iter().find_map(|d| d.get(path))
    }

    /// All files, depth-first: a node's files first, then its child
    /// directories in order.
    pub fn all_files(&self) -> Vec<&FileEntry> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a FileEntry>) {
        out.extend(self.files.iter());
        for dir in &self.directories {
            dir.collect_files(out);
        }
    }

    /// Names of the dataset's top-level subdirectories.
    pub fn base_dirs(&self) -> Vec<String> {
        self.directories.iter().map(|d| d.name.clone()).collect()
    }
}

/// A fully read dataset: the tree plus the ignore rules collected from
/// `.psychdsignore` files during traversal.
#[derive(Debug)]
pub struct ReadDataset {
    pub tree: FileTree,
    pub ignore: FileIgnoreRules,
}

/// Read a dataset directory into a [`FileTree`].
pub fn read_file_tree(fs: &dyn FileSystem, root: &Path) -> CoreResult<ReadDataset> {
    if !fs.is_dir(root) {
        return Err(CoreError::UnreadableRoot {
            path: root.to_path_buf(),
        });
    }
    let root_context = capture_root_context(fs, root);
    let mut ignore = FileIgnoreRules::new();
    let tree = read_dir_node(fs, root, "/", "", &root_context, &mut ignore)?;
    Ok(ReadDataset { tree, ignore })
}

/// The `@context` of the root dataset descriptor, if there is one. Errors
/// here resurface later when the descriptor is read for real.
fn capture_root_context(fs: &dyn FileSystem, root: &Path) -> Option<Value> {
    let text = fs
        .read_text(&root.join("dataset_description.json"))
        .ok()?;
    let parsed: Value = serde_json::from_str(&fix_schema_org_urls(&text)).ok()?;
    parsed.get("@context").cloned()
}

fn read_dir_node(
    fs: &dyn FileSystem,
    fs_dir: &Path,
    rel_path: &str,
    name: &str,
    root_context: &Option<Value>,
    ignore: &mut FileIgnoreRules,
) -> CoreResult<FileTree> {
    let mut node = FileTree {
        path: rel_path.to_string(),
        name: name.to_string(),
        ..Default::default()
    };

    let entries = fs.read_dir(fs_dir)?;
    for entry in &entries {
        if entry.is_dir {
            continue;
        }
        let file_path = if rel_path == "/" {
            format!("/{}", entry.name)
        } else {
            format!("{}/{}", rel_path, entry.name)
        };
        let fs_path = fs_dir.join(&entry.name);
        node.files
            .push(read_file_entry(fs, &fs_path, &entry.name, &file_path, root_context, ignore)?);
    }
    for entry in &entries {
        if !entry.is_dir {
            continue;
        }
        let dir_path = if rel_path == "/" {
            format!("/{}", entry.name)
        } else {
            format!("{}/{}", rel_path, entry.name)
        };
        let fs_path = fs_dir.join(&entry.name);
        node.directories.push(read_dir_node(
            fs,
            &fs_path,
            &dir_path,
            &entry.name,
            root_context,
            ignore,
        )?);
    }
    Ok(node)
}

fn read_file_entry(
    fs: &dyn FileSystem,
    fs_path: &Path,
    name: &str,
    rel_path: &str,
    root_context: &Option<Value>,
    ignore: &mut FileIgnoreRules,
) -> CoreResult<FileEntry> {
    let size = fs.size_of(fs_path)?;
    let mut entry = FileEntry {
        name: name.to_string(),
        path: rel_path.to_string(),
        size,
        text: String::new(),
        parsed_json: None,
        expanded: None,
        issue_info: Vec::new(),
        read_failed: false,
    };

    match fs.read_text(fs_path) {
        Ok(text) => entry.text = fix_schema_org_urls(&text),
        Err(CoreError::UnicodeDecode { .. }) => {
            entry.read_failed = true;
            entry.issue_info.push(DeferredIssue {
                key: "UNICODE_DECODE_ERROR",
                evidence: None,
            });
            return Ok(entry);
        }
        Err(other) => return Err(other),
    }

    if name == ".psychdsignore" {
        ignore.add_ignore_file(&entry.text);
    }

    if entry.extension() == ".json" {
        match serde_json::from_str::<Value>(&entry.text) {
            Ok(mut parsed) => {
                if let (Value::Object(map), Some(context)) = (&mut parsed, root_context) {
                    if !map.contains_key("@context") {
                        map.insert("@context".to_string(), context.clone());
                    }
                }
                match jsonld::expand(&parsed) {
                    Ok(expanded) => entry.expanded = expanded.into_iter().next(),
                    Err(err) => {
                        entry.issue_info.push(DeferredIssue {
                            key: "INVALID_JSONLD_SYNTAX",
                            evidence: Some(jsonld_evidence(&err.to_string())),
                        });
                    }
                }
                entry.parsed_json = Some(parsed);
            }
            Err(err) => {
                entry.issue_info.push(DeferredIssue {
                    key: "INVALID_JSON_FORMATTING",
                    evidence: Some(err.to_string()),
                });
            }
        }
    }

    Ok(entry)
}

/// Second `: `-separated segment of a JSON-LD diagnostic, used as issue
/// evidence.
fn jsonld_evidence(message: &str) -> String {
    message
        .split(':')
        .nth(1)
        .map(str::trim)
        .unwrap_or(message)
        .to_string()
}

/// Canonicalise schema.org URLs to the plain-http form used throughout
/// expansion. Fixed-string replacements, not a regex.
fn fix_schema_org_urls(text: &str) -> String {
    text.replace("https://www.schema.org", "http://www.schema.org")
        .replace("https://schema.org", "http://schema.org")
}
