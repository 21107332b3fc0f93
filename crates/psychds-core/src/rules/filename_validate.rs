//! Filename-rule validation: extension, keyword format, and official
//! keyword membership for the rules a file matched.

use crate::context::FileContext;
use crate::issues::DatasetIssues;
use crate::schema::Schema;
use serde_json::{Map, Value};

const KEYWORDS_PATH: &str = "meta.context.context.properties.keywords.properties";

/// Validate the file against its matched rules.
///
/// With a single match the checks report straight into the shared
/// collector. With several matches each candidate runs against a scratch
/// collector: the first clean candidate is adopted and the rest
/// discarded, else one aggregate issue lists every failed rule path.
pub fn filename_validate(
    schema: &Schema,
    context: &mut FileContext<'_>,
    issues: &mut DatasetIssues,
) {
    match context.filename_rules.len() {
        0 => {}
        1 => {
            let rule = context.filename_rules[0].clone();
            check_rule(schema, &rule, context, issues);
        }
        _ => {
            let candidates = context.filename_rules.clone();
            let mut adopted = None;
            for rule in &candidates {
                let mut scratch = DatasetIssues::new();
                check_rule(schema, rule, context, &mut scratch);
                if scratch.is_empty() {
                    adopted = Some(rule.clone());
                    break;
                }
            }
            match adopted {
                Some(rule) => context.filename_rules = vec![rule],
                None => {
                    issues.add(
                        "ALL_FILENAME_RULES_HAVE_ISSUES",
                        [
                            context.issue_file()
                                .with_evidence(format!("Rules: {}", candidates.join(", "))),
                        ],
                    );
                }
            }
        }
    }
}

fn check_rule(
    schema: &Schema,
    rule_path: &str,
    context: &FileContext<'_>,
    issues: &mut DatasetIssues,
) {
    let Some(rule) = schema.get_object(rule_path) else {
        return;
    };
    check_extension(rule, context, issues);
    check_keywords(schema, rule, context, issues);
}

fn check_extension(
    rule: &Map<String, Value>,
    context: &FileContext<'_>,
    issues: &mut DatasetIssues,
) {
    let Some(Value::Array(extensions)) = rule.get("extensions") else {
        return;
    };
    let allowed = extensions
        .iter()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>();
    if !allowed.contains(&context.extension()) {
        issues.add(
            "EXTENSION_MISMATCH",
            [context.issue_file()
                .with_evidence(format!("Allowed extensions: [{}]", allowed.join(", ")))],
        );
    }
}

fn check_keywords(
    schema: &Schema,
    rule: &Map<String, Value>,
    context: &FileContext<'_>,
    issues: &mut DatasetIssues,
) {
    if rule.get("usesKeywords").and_then(Value::as_bool) != Some(true) {
        return;
    }

    if let Some(pattern) = rule.get("fileRegex").and_then(Value::as_str) {
        match regex::Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(regex) => {
                if !regex.is_match(&context.file.name) {
                    issues.add(
                        "FILENAME_KEYWORD_FORMATTING_ERROR",
                        [context.issue_file()
                            .with_evidence(context.file.name.clone())],
                    );
                }
            }
            Err(err) => {
                tracing::debug!(%pattern, %err, "unusable fileRegex in schema rule");
            }
        }
    }

    let official: Vec<&String> = schema
        .get_object(KEYWORDS_PATH)
        .map(|props| props.keys().collect())
        .unwrap_or_default();
    let unofficial: Vec<&str> = context
        .filename
        .keywords
        .iter()
        .filter(|(key, _)| !official.iter().any(|o| *o == key))
        .map(|(key, _)| key.as_str())
        .collect();
    if !unofficial.is_empty() {
        issues.add(
            "FILENAME_UNOFFICIAL_KEYWORD_WARNING",
            [context.issue_file()
                .with_evidence(format!("Unofficial keywords: [{}]", unofficial.join(", ")))],
        );
    }
}
