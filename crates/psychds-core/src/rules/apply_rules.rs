//! The schema rule engine: selector-gated rules evaluated against each
//! per-file context.
//!
//! Any schema node carrying `selectors` is a rule. Selectors run in
//! order; the first false (or failed) selector skips the rule. Passing
//! rules dispatch on the attributes the engine knows:
//! `columnsMatchMetadata` and `fields`.

use crate::context::FileContext;
use crate::issues::DatasetIssues;
use crate::parsers::jsonld::SCHEMA_ORG_NS;
use crate::rules::expression::{EvalScope, ExpressionCache};
use crate::rules::schemaorg::validate_schemaorg;
use crate::schema::Schema;
use serde_json::{Map, Value};

const RULES_ROOT: &str = "rules";

/// How strongly a metadata field is required of this context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldSeverity {
    Error,
    Ignore,
}

/// Selector expressions see the per-file context as their implicit
/// top-level scope.
impl EvalScope for FileContext<'_> {
    fn resolve(&self, path: &[&str]) -> Option<Value> {
        let (head, rest) = path.split_first()?;
        let root = match *head {
            "extension" => Value::String(self.filename.extension.clone()),
            "suffix" => Value::String(self.filename.suffix.clone()),
            "stem" => Value::String(self.stem.clone()),
            "baseDir" => Value::String(self.base_dir.clone()),
            "path" => Value::String(self.file.path.clone()),
            "name" => Value::String(self.file.name.clone()),
            "size" => Value::Number(self.file.size.into()),
            "keywords" => Value::Object(
                self.filename
                    .keywords
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            "sidecar" => Value::Object(self.sidecar.clone()),
            _ => return None,
        };
        let mut node = root;
        for segment in rest {
            node = node.get(segment)?.clone();
        }
        Some(node)
    }
}

/// Evaluate every selector-gated rule in the schema against a context.
pub fn apply_rules(
    schema: &Schema,
    cache: &ExpressionCache,
    context: &FileContext<'_>,
    issues: &mut DatasetIssues,
) {
    let Some(root) = schema.get_object(RULES_ROOT) else {
        return;
    };
    walk(schema, cache, root, RULES_ROOT, context, issues);
}

fn walk(
    schema: &Schema,
    cache: &ExpressionCache,
    node: &Map<String, Value>,
    path: &str,
    context: &FileContext<'_>,
    issues: &mut DatasetIssues,
) {
    if let Some(Value::Array(selectors)) = node.get("selectors") {
        if !selectors_pass(cache, selectors, context) {
            return;
        }
        if node.contains_key("columnsMatchMetadata") {
            columns_match_metadata(schema, context, path, issues);
        }
        if let Some(Value::Object(fields)) = node.get("fields") {
            check_fields(fields, context, path, issues);
        }
    }
    for (key, value) in node {
        if matches!(key.as_str(), "selectors" | "fields" | "columnsMatchMetadata") {
            continue;
        }
        if let Value::Object(child) = value {
            walk(schema, cache, child, &format!("{}.{}", path, key), context, issues);
        }
    }
}

fn selectors_pass(cache: &ExpressionCache, selectors: &[Value], context: &FileContext<'_>) -> bool {
    for selector in selectors {
        let Some(text) = selector.as_str() else {
            return false;
        };
        match cache.eval_selector(text, context) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(err) => {
                tracing::debug!(selector = %text, %err, "selector evaluation failed");
                return false;
            }
        }
    }
    true
}

/// CSV headers must be declared in `variableMeasured`; afterwards the
/// merged metadata itself is structurally validated against schema.org.
fn columns_match_metadata(
    schema: &Schema,
    context: &FileContext<'_>,
    rule_path: &str,
    issues: &mut DatasetIssues,
) {
    if context.extension() != ".csv" {
        return;
    }
    if let Some(columns) = &context.columns {
        let mut missing: Vec<&str> = Vec::new();
        for header in &columns.headers {
            if !context.valid_columns.iter().any(|v| v == header)
                && !missing.contains(&header.as_str())
            {
                missing.push(header);
            }
        }
        if !missing.is_empty() {
            issues.add(
                "CSV_COLUMN_MISSING",
                [context.issue_file().with_evidence(
                    format!(
                        "Column headers: [{}] do not appear in variableMeasured. Rule: {}",
                        missing.join(", "),
                        rule_path
                    ),
                )],
            );
        }
    }
    validate_schemaorg(schema, context, issues);
}

/// Require each declared field (at its computed severity) to be present
/// in the expanded sidecar under its schema.org IRI.
fn check_fields(
    fields: &Map<String, Value>,
    context: &FileContext<'_>,
    rule_path: &str,
    issues: &mut DatasetIssues,
) {
    let mut missing = Vec::new();
    for (field, requirement) in fields {
        if field_severity(requirement, context) == FieldSeverity::Ignore {
            continue;
        }
        let iri = format!("{}{}", SCHEMA_ORG_NS, field);
        if context.expanded_sidecar.contains_key(&iri) {
            continue;
        }
        if let Some(issue) = declared_issue(requirement) {
            issues.add_custom(
                &issue.code,
                issue.severity,
                &issue.reason,
                &[],
                [context.issue_file()],
            );
        } else {
            missing.push(field.clone());
        }
    }
    if !missing.is_empty() {
        issues.add(
            "JSON_KEY_REQUIRED",
            [context.issue_file().with_evidence(format!(
                "Missing required fields: [{}] Rule: {}",
                missing.join(", "),
                rule_path
            ))],
        );
    }
}

struct DeclaredIssue {
    code: String,
    severity: crate::issues::Severity,
    reason: String,
}

/// A field requirement may declare its own issue to emit instead of the
/// aggregated `JSON_KEY_REQUIRED`.
fn declared_issue(requirement: &Value) -> Option<DeclaredIssue> {
    let issue = requirement.get("issue")?.as_object()?;
    let code = issue.get("code")?.as_str()?.to_string();
    let severity = match issue.get("level").and_then(Value::as_str) {
        Some("warning") => crate::issues::Severity::Warning,
        _ => crate::issues::Severity::Error,
    };
    let reason = issue
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("A required metadata field is missing.")
        .to_string();
    Some(DeclaredIssue {
        code,
        severity,
        reason,
    })
}

/// Compute a field's effective severity.
///
/// String requirements map `required` to error and everything else to
/// ignore. Object requirements carry a base `level` plus an optional
/// `level_addendum` of the form ``(required|recommended) if `KEY` is
/// `VALUE` ``; when the sidecar matches the condition, the addendum level
/// wins.
fn field_severity(requirement: &Value, context: &FileContext<'_>) -> FieldSeverity {
    match requirement {
        Value::String(level) => level_to_severity(level),
        Value::Object(object) => {
            let base = object
                .get("level")
                .and_then(Value::as_str)
                .map(level_to_severity)
                .unwrap_or(FieldSeverity::Ignore);
            let Some(addendum) = object.get("level_addendum").and_then(Value::as_str) else {
                return base;
            };
            match parse_addendum(addendum) {
                Some((level, key, expected)) if sidecar_value_is(context, &key, &expected) => {
                    level_to_severity(&level)
                }
                _ => base,
            }
        }
        _ => FieldSeverity::Ignore,
    }
}

fn level_to_severity(level: &str) -> FieldSeverity {
    match level {
        "required" => FieldSeverity::Error,
        _ => FieldSeverity::Ignore,
    }
}

/// Parse ``required if `KEY` is `VALUE` `` into its parts.
fn parse_addendum(addendum: &str) -> Option<(String, String, String)> {
    let (level, rest) = addendum.split_once(" if ")?;
    if level != "required" && level != "recommended" {
        return None;
    }
    let rest = rest.trim();
    let (key, rest) = rest.strip_prefix('`')?.split_once('`')?;
    let rest = rest.trim().strip_prefix("is")?.trim();
    let value = rest.strip_prefix('`')?.strip_suffix('`')?;
    Some((level.to_string(), key.to_string(), value.to_string()))
}

fn sidecar_value_is(context: &FileContext<'_>, key: &str, expected: &str) -> bool {
    match context.sidecar.get(key) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        _ => false,
    }
}
