//! Filename rule matching and the rules-satisfaction record.
//!
//! `rules.files.*` is a tree of leaf rules describing where files of each
//! kind may live and how they are named. Matching collects the rule paths
//! a file satisfies; enumeration flattens every leaf into a record used at
//! the end of the run to surface missing required objects.

use crate::context::FileContext;
use crate::issues::{DatasetIssues, Severity};
use crate::schema::Schema;
use serde_json::{Map, Value};
use std::collections::HashMap;

const FILES_RULES_ROOT: &str = "rules.files";
const CORE_RULES_PREFIX: &str = "rules.files.common.core";

/// Collect every filename rule the file matches into
/// `context.filename_rules`, reporting unmatched files.
pub fn find_rule_matches(
    schema: &Schema,
    context: &mut FileContext<'_>,
    issues: &mut DatasetIssues,
) {
    let mut matches = Vec::new();
    if let Some(root) = schema.get_object(FILES_RULES_ROOT) {
        walk_matches(root, FILES_RULES_ROOT, context, &mut matches);
    }
    context.filename_rules = matches;

    if context.filename_rules.is_empty() && context.file.path != "/.bidsignore" {
        issues.add(
            "FILE_NOT_CHECKED",
            [context.issue_file()],
        );
        if context.file.name == "dataset_description.json" && context.base_dir != "/" {
            issues.add(
                "WRONG_METADATA_LOCATION",
                [context.issue_file()],
            );
        }
    }
}

fn walk_matches(
    node: &Map<String, Value>,
    path: &str,
    context: &FileContext<'_>,
    matches: &mut Vec<String>,
) {
    if node.contains_key("arbitraryNesting") {
        if rule_matches(node, context) {
            matches.push(path.to_string());
        }
        return;
    }
    for (key, value) in node {
        if let Value::Object(child) = value {
            walk_matches(child, &format!("{}.{}", path, key), context, matches);
        }
    }
}

fn rule_matches(node: &Map<String, Value>, context: &FileContext<'_>) -> bool {
    let base_dir = node.get("baseDir").and_then(Value::as_str).unwrap_or("/");
    let arbitrary = node
        .get("arbitraryNesting")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if arbitrary {
        if context.base_dir != base_dir {
            return false;
        }
    } else {
        let expected = if base_dir == "/" {
            format!("/{}", context.file.name)
        } else {
            format!("/{}/{}", base_dir, context.file.name)
        };
        if context.file.path != expected {
            return false;
        }
    }

    let Some(Value::Array(extensions)) = node.get("extensions") else {
        return false;
    };
    if !extensions
        .iter()
        .any(|e| e.as_str() == Some(context.extension()))
    {
        return false;
    }

    if let Some(suffix) = node.get("suffix").and_then(Value::as_str) {
        context.suffix() == suffix
    } else if let Some(stem) = node.get("stem").and_then(Value::as_str) {
        context.file.name.starts_with(stem)
    } else {
        false
    }
}

/// Flatten every leaf rule under `rules.files` into a satisfaction
/// record, all entries starting unsatisfied.
pub fn find_file_rules(schema: &Schema) -> HashMap<String, bool> {
    let mut record = HashMap::new();
    if let Some(root) = schema.get_object(FILES_RULES_ROOT) {
        walk_rules(root, FILES_RULES_ROOT, &mut record);
    }
    record
}

fn walk_rules(node: &Map<String, Value>, path: &str, record: &mut HashMap<String, bool>) {
    if is_enumerable_leaf(node) {
        record.insert(path.to_string(), false);
        return;
    }
    for (key, value) in node {
        if let Value::Object(child) = value {
            walk_rules(child, &format!("{}.{}", path, key), record);
        }
    }
}

fn is_enumerable_leaf(node: &Map<String, Value>) -> bool {
    let filename_leaf = node.contains_key("baseDir")
        && node.contains_key("extensions")
        && (node.contains_key("suffix") || node.contains_key("stem"));
    let directory_leaf = node.contains_key("path") && node.contains_key("directory");
    filename_leaf || directory_leaf
}

/// Mark directory-kind core rules satisfied by the dataset's top-level
/// layout.
pub fn check_dir_rules(
    schema: &Schema,
    rules_record: &mut HashMap<String, bool>,
    base_dirs: &[String],
) {
    for (path, satisfied) in rules_record.iter_mut() {
        if *satisfied || !path.starts_with(CORE_RULES_PREFIX) {
            continue;
        }
        let Some(node) = schema.get_object(path) else {
            continue;
        };
        if node.get("directory").and_then(Value::as_bool) != Some(true) {
            continue;
        }
        if let Some(dir) = node.get("path").and_then(Value::as_str) {
            if base_dirs.iter().any(|b| b == dir) {
                *satisfied = true;
            }
        }
    }
}

/// Emit one issue per still-unsatisfied rule, using the rule's declared
/// code, reason, and level. Rules without a code are optional objects and
/// produce nothing.
pub fn check_missing_rules(
    schema: &Schema,
    rules_record: &HashMap<String, bool>,
    issues: &mut DatasetIssues,
) {
    // Sort for deterministic issue ordering.
    let mut missing: Vec<&String> = rules_record
        .iter()
        .filter(|(_, satisfied)| !**satisfied)
        .map(|(path, _)| path)
        .collect();
    missing.sort();

    for path in missing {
        let Some(node) = schema.get_object(path) else {
            continue;
        };
        let Some(code) = node.get("code").and_then(Value::as_str) else {
            continue;
        };
        let severity = match node.get("level").and_then(Value::as_str) {
            Some("warning") => Severity::Warning,
            _ => Severity::Error,
        };
        let reason = node
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("A required dataset object is missing.");
        let requires: Vec<String> = match node.get("requires") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(one)) => vec![one.clone()],
            _ => Vec::new(),
        };
        issues.add_custom(code, severity, reason, &requires, std::iter::empty());
    }
}
