//! The validation orchestrator: walks the tree, runs the per-file checks
//! in their fixed order, maintains the rules-satisfaction record, and
//! assembles the final result.

use crate::context::{DatasetContext, FileContext};
use crate::events::{EventEmitter, ValidationEvent};
use crate::fs::RealFileSystem;
use crate::issues::{CoreResult, DatasetIssues, IssueFile, IssuesOutput};
use crate::rules::apply_rules::apply_rules;
use crate::rules::expression::ExpressionCache;
use crate::rules::filename_identify::{
    check_dir_rules, check_missing_rules, find_file_rules, find_rule_matches,
};
use crate::rules::filename_validate::filename_validate;
use crate::schema::{loader, Schema};
use crate::summary::Summary;
use crate::tree::{read_file_tree, ReadDataset};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options controlling a validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorOptions {
    pub dataset_path: String,
    /// `latest` or semver `X.Y.Z`.
    pub schema_version: String,
    pub json: bool,
    pub verbose: bool,
    pub show_warnings: bool,
    /// Log filter level: `error`, `warn`, `info`, or `debug`.
    pub debug: String,
    pub use_events: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            dataset_path: String::new(),
            schema_version: "latest".to_string(),
            json: false,
            verbose: false,
            show_warnings: false,
            debug: "error".to_string(),
            use_events: false,
        }
    }
}

impl ValidatorOptions {
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            dataset_path: path.into(),
            ..Self::default()
        }
    }
}

/// The structured outcome of validating one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: IssuesOutput,
    pub summary: Summary,
}

/// Load the schema, read the dataset directory, and validate it.
pub fn validate_path(options: &ValidatorOptions) -> CoreResult<ValidationResult> {
    let schema = loader::load_schema(&options.schema_version)?;
    let dataset = read_file_tree(&RealFileSystem, Path::new(&options.dataset_path))?;
    validate(&dataset, &schema, options)
}

/// Validate an already-read dataset tree against a loaded schema.
pub fn validate(
    dataset: &ReadDataset,
    schema: &Schema,
    options: &ValidatorOptions,
) -> CoreResult<ValidationResult> {
    run(dataset, schema, options, None)
}

/// As [`validate`], with lifecycle events fanned out to `emitter`.
pub fn validate_with_events(
    dataset: &ReadDataset,
    schema: &Schema,
    options: &ValidatorOptions,
    emitter: &EventEmitter,
) -> CoreResult<ValidationResult> {
    run(dataset, schema, options, Some(emitter))
}

fn run(
    dataset: &ReadDataset,
    schema: &Schema,
    options: &ValidatorOptions,
    emitter: Option<&EventEmitter>,
) -> CoreResult<ValidationResult> {
    let emit = |event: ValidationEvent| {
        if options.use_events {
            if let Some(emitter) = emitter {
                emitter.emit(event);
            }
        }
    };

    let tree = &dataset.tree;
    let mut issues = DatasetIssues::new();
    let ds_context = DatasetContext::new(tree);
    let mut rules_record = find_file_rules(schema);
    let mut summary = Summary::new(schema.version());
    let cache = ExpressionCache::new();

    // Pass one: counts for progress reporting.
    let all_files = tree.all_files();
    let data_files = all_files
        .iter()
        .filter(|f| f.extension() == ".csv" && !dataset.ignore.test(&f.path))
        .count();
    emit(ValidationEvent::Start {
        total_files: all_files.len(),
        data_files,
    });
    emit(ValidationEvent::Step { name: "walk" });

    // Dataset-wide variable tracking: a declared variable is found iff
    // some CSV file that declared it also carries it as a header.
    let mut variables: Vec<(String, bool)> = Vec::new();

    for &file in &all_files {
        for deferred in &file.issue_info {
            let mut issue_file = IssueFile::new(file.path.clone(), file.name.clone());
            if let Some(evidence) = &deferred.evidence {
                issue_file = issue_file.with_evidence(evidence.clone());
            }
            issues.add(deferred.key, [issue_file]);
        }
        if dataset.ignore.test(&file.path) {
            continue;
        }

        emit(ValidationEvent::SubStep {
            step: "load",
            path: file.path.clone(),
        });
        let mut context = FileContext::new(file, &ds_context);
        context.load_sidecar(tree);
        context.load_columns();

        if let Some(columns) = &context.columns {
            summary.suggest_columns(columns.headers.iter().map(String::as_str));
            for issue in &columns.issues {
                let mut issue_file = IssueFile::new(file.path.clone(), file.name.clone());
                if let Some(evidence) = issue.evidence() {
                    issue_file = issue_file.with_evidence(evidence);
                }
                issues.add(issue.key(), [issue_file]);
            }
        }

        emit(ValidationEvent::SubStep {
            step: "checks",
            path: file.path.clone(),
        });
        empty_file(&context, &mut issues);
        find_rule_matches(schema, &mut context, &mut issues);
        filename_validate(schema, &mut context, &mut issues);
        apply_rules(schema, &cache, &context, &mut issues);

        for rule in &context.filename_rules {
            rules_record.insert(rule.clone(), true);
        }
        summary.update(&context);

        if context.extension() == ".csv" {
            let headers: Vec<&str> = context
                .columns
                .as_ref()
                .map(|c| c.headers.iter().map(String::as_str).collect())
                .unwrap_or_default();
            for declared in &context.valid_columns {
                let found = headers.iter().any(|h| h == declared);
                match variables.iter_mut().find(|(name, _)| name == declared) {
                    Some((_, seen)) => *seen |= found,
                    None => variables.push((declared.clone(), found)),
                }
            }
        }

        emit(ValidationEvent::FileDone {
            path: file.path.clone(),
        });
    }

    let unfound: Vec<&str> = variables
        .iter()
        .filter(|(_, found)| !found)
        .map(|(name, _)| name.as_str())
        .collect();
    if !unfound.is_empty() {
        let attributed = ds_context
            .description_file
            .clone()
            .map(|f| IssueFile::new(f.path, f.name))
            .unwrap_or_else(|| {
                IssueFile::new("/dataset_description.json", "dataset_description.json")
            });
        issues.add(
            "VARIABLE_MISSING_FROM_CSV_COLUMNS",
            [attributed.with_evidence(format!("[{}]", unfound.join(", ")))],
        );
    }

    emit(ValidationEvent::Step { name: "finalize" });
    check_dir_rules(schema, &mut rules_record, &ds_context.base_dirs);
    check_missing_rules(schema, &rules_record, &mut issues);
    issues.filter_issues(&rules_record);

    let valid = issues.error_count() == 0;
    emit(ValidationEvent::Complete { valid });

    Ok(ValidationResult {
        valid,
        issues: issues.partitioned(schema.version()),
        summary,
    })
}

/// A zero-byte file is worth flagging regardless of any matched rule.
fn empty_file(context: &FileContext<'_>, issues: &mut DatasetIssues) {
    if context.file.size == 0 {
        issues.add(
            "FILE_EMPTY",
            [context.issue_file()],
        );
    }
}
