//! Structural validation of expanded metadata against the schema.org
//! vocabulary: dataset type, term membership, property ranges, and nested
//! object types.

use crate::context::{FileContext, FileRef};
use crate::issues::{DatasetIssues, IssueFile};
use crate::parsers::jsonld::SCHEMA_ORG_NS;
use crate::schema::Schema;
use serde_json::{Map, Value};

/// Value kinds always acceptable for typed nested objects, on top of the
/// property's declared range.
const UNIVERSAL_RANGES: &[&str] = &["Text", "URL"];

#[derive(Debug, Default)]
struct Collected {
    /// (top-level origin key, offending location)
    unknown_namespace: Vec<(String, String)>,
    invalid_property: Vec<(String, String)>,
    invalid_type: Vec<(String, String)>,
    type_missing: Vec<(String, String)>,
}

/// Validate `context.expanded_sidecar` as schema.org metadata. An empty
/// expansion (absent or failed) is treated as absent and skipped.
pub fn validate_schemaorg(
    schema: &Schema,
    context: &FileContext<'_>,
    issues: &mut DatasetIssues,
) {
    let expanded = &context.expanded_sidecar;
    if expanded.is_empty() {
        return;
    }

    let dataset_iri = format!("{}Dataset", SCHEMA_ORG_NS);
    let root_type = match expanded.get("@type") {
        Some(Value::Array(types)) => types.first().and_then(Value::as_str),
        Some(Value::String(t)) => Some(t.as_str()),
        _ => None,
    };
    match root_type {
        None => {
            issues.add(
                "MISSING_DATASET_TYPE",
                [type_attribution(context).into_issue_file()],
            );
            return;
        }
        Some(t) if t != dataset_iri => {
            issues.add(
                "INCORRECT_DATASET_TYPE",
                [type_attribution(context)
                    .into_issue_file_with_evidence(strip_ns(t).to_string())],
            );
        }
        Some(_) => {}
    }
    let enclosing = root_type.map(strip_ns).unwrap_or("Dataset").to_string();

    let mut collected = Collected::default();
    walk(schema, expanded, &enclosing, None, "", &mut collected);

    report(context, issues, "UNKNOWN_NAMESPACE", &collected.unknown_namespace);
    report(
        context,
        issues,
        "INVALID_SCHEMAORG_PROPERTY",
        &collected.invalid_property,
    );
    report(context, issues, "INVALID_OBJECT_TYPE", &collected.invalid_type);
    report(context, issues, "OBJECT_TYPE_MISSING", &collected.type_missing);
}

struct Attribution(FileRef);

impl Attribution {
    fn into_issue_file(self) -> IssueFile {
        IssueFile::new(self.0.path, self.0.name)
    }

    fn into_issue_file_with_evidence(self, evidence: String) -> IssueFile {
        IssueFile::new(self.0.path, self.0.name).with_evidence(evidence)
    }
}

/// Where to pin root `@type` problems: the file that set `@type`, else
/// the root descriptor, else the file under validation.
fn type_attribution(context: &FileContext<'_>) -> Attribution {
    if let Some(source) = context.metadata_provenance.get("@type") {
        return Attribution(source.clone());
    }
    if let Some(desc) = &context.description_file {
        return Attribution(desc.clone());
    }
    Attribution(FileRef {
        path: context.file.path.clone(),
        name: context.file.name.clone(),
    })
}

fn walk(
    schema: &Schema,
    object: &Map<String, Value>,
    enclosing_type: &str,
    origin: Option<&str>,
    location: &str,
    out: &mut Collected,
) {
    let slot_set = slots_of(schema, enclosing_type);

    for (key, value) in object {
        if key.starts_with('@') {
            continue;
        }
        // The top-level key this location lives under, in the compact
        // form used by metadataProvenance.
        let origin_key = origin
            .map(str::to_string)
            .unwrap_or_else(|| strip_ns(key).to_string());

        if !key.starts_with(SCHEMA_ORG_NS) {
            out.unknown_namespace.push((origin_key, key.clone()));
            continue;
        }
        let prop = strip_ns(key);
        let loc = if location.is_empty() {
            prop.to_string()
        } else {
            format!("{}.{}", location, prop)
        };

        if !slot_set.iter().any(|s| s == prop) {
            out.invalid_property.push((origin_key, loc));
            continue;
        }

        let ranges = ranges_of(schema, prop);
        let Value::Array(items) = value else { continue };
        for item in items {
            let Value::Object(map) = item else { continue };
            if is_terminal(map) {
                continue;
            }
            match map.get("@type") {
                Some(type_value) => {
                    // Multi-typed objects are checked against their first
                    // entry only, for compatibility.
                    let declared = match type_value {
                        Value::Array(types) => types.first().and_then(Value::as_str),
                        Value::String(t) => Some(t.as_str()),
                        _ => None,
                    };
                    if let Some(declared) = declared {
                        let stripped = strip_ns(declared);
                        let in_range = ranges.iter().any(|r| r == stripped)
                            || UNIVERSAL_RANGES.contains(&stripped);
                        if !in_range {
                            out.invalid_type
                                .push((origin_key.clone(), format!("{} ({})", loc, stripped)));
                        }
                        walk(schema, map, stripped, Some(&origin_key), &loc, out);
                    }
                }
                None => {
                    out.type_missing.push((origin_key.clone(), loc.clone()));
                }
            }
        }
    }
}

/// Keys `{@id}` or `{@value}` exactly: a terminal node, nothing to check.
fn is_terminal(map: &Map<String, Value>) -> bool {
    map.len() == 1 && (map.contains_key("@id") || map.contains_key("@value"))
}

fn strip_ns(iri: &str) -> &str {
    iri.strip_prefix(SCHEMA_ORG_NS).unwrap_or(iri)
}

/// The slot set of a type: its own slots plus those of every transitive
/// superclass.
fn slots_of(schema: &Schema, type_name: &str) -> Vec<String> {
    let mut slots = Vec::new();
    let mut current = Some(type_name.to_string());
    let mut hops = 0;
    while let Some(name) = current {
        // Defend against is_a cycles in a hand-edited vocabulary.
        hops += 1;
        if hops > 32 {
            break;
        }
        let Some(class) = schema.get_object(&format!("schemaOrg.classes.{}", name)) else {
            break;
        };
        if let Some(Value::Array(own)) = class.get("slots") {
            slots.extend(own.iter().filter_map(Value::as_str).map(str::to_string));
        }
        current = class.get("is_a").and_then(Value::as_str).map(str::to_string);
    }
    slots
}

/// Valid range types for a property: the declared `range`, every
/// `any_of[i].range`, and the transitive subclasses of each.
fn ranges_of(schema: &Schema, prop: &str) -> Vec<String> {
    let mut ranges = Vec::new();
    let Some(slot) = schema.get_object(&format!("schemaOrg.slots.{}", prop)) else {
        return ranges;
    };
    if let Some(range) = slot.get("range").and_then(Value::as_str) {
        ranges.push(range.to_string());
    }
    if let Some(Value::Array(any_of)) = slot.get("any_of") {
        for entry in any_of {
            if let Some(range) = entry.get("range").and_then(Value::as_str) {
                ranges.push(range.to_string());
            }
        }
    }

    let Some(classes) = schema.get_object("schemaOrg.classes") else {
        return ranges;
    };
    let mut with_subclasses = ranges.clone();
    for candidate in classes.keys() {
        if with_subclasses.iter().any(|r| r == candidate) {
            continue;
        }
        if ranges.iter().any(|r| is_subclass_of(schema, candidate, r)) {
            with_subclasses.push(candidate.clone());
        }
    }
    with_subclasses
}

fn is_subclass_of(schema: &Schema, candidate: &str, ancestor: &str) -> bool {
    let mut current = candidate.to_string();
    let mut hops = 0;
    loop {
        hops += 1;
        if hops > 32 {
            return false;
        }
        let Some(parent) = schema
            .get_object(&format!("schemaOrg.classes.{}", current))
            .and_then(|c| c.get("is_a"))
            .and_then(Value::as_str)
        else {
            return false;
        };
        if parent == ancestor {
            return true;
        }
        current = parent.to_string();
    }
}

/// Report one aggregate issue per category, attributed to the metadata
/// file whose top-level key contains each offending location.
fn report(
    context: &FileContext<'_>,
    issues: &mut DatasetIssues,
    key: &str,
    entries: &[(String, String)],
) {
    if entries.is_empty() {
        return;
    }
    // Group locations by originating file, preserving first-seen order.
    let mut grouped: Vec<(FileRef, Vec<&str>)> = Vec::new();
    for (origin_key, location) in entries {
        let source = context.provenance_of(origin_key);
        match grouped.iter_mut().find(|(file, _)| file.path == source.path) {
            Some((_, locations)) => locations.push(location),
            None => grouped.push((source, vec![location])),
        }
    }
    let files = grouped.into_iter().map(|(file, locations)| {
        IssueFile::new(file.path, file.name).with_evidence(format!("[{}]", locations.join(", ")))
    });
    issues.add(key, files);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DatasetContext;
    use crate::fs::RealFileSystem;
    use crate::schema::loader::load_bundled;
    use crate::tree::read_file_tree;
    use std::fs as stdfs;
    use tempfile::TempDir;

    fn context_from_descriptor(descriptor: &str) -> (DatasetIssues, bool) {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("dataset_description.json"), descriptor).unwrap();
        stdfs::create_dir_all(dir.path().join("data")).unwrap();
        stdfs::write(dir.path().join("data/study-a_data.csv"), "row_id\n1\n").unwrap();

        let ds = read_file_tree(&RealFileSystem, dir.path()).unwrap();
        let schema = load_bundled().unwrap();
        let dataset = DatasetContext::new(&ds.tree);
        let file = ds.tree.get("/data/study-a_data.csv").unwrap();
        let mut ctx = FileContext::new(file, &dataset);
        ctx.load_sidecar(&ds.tree);

        let mut issues = DatasetIssues::new();
        validate_schemaorg(&schema, &ctx, &mut issues);
        let attributed_to_descriptor = issues.iter().all(|issue| {
            issue
                .files()
                .iter()
                .all(|f| f.path == "/dataset_description.json")
        });
        (issues, attributed_to_descriptor)
    }

    #[test]
    fn test_valid_metadata_is_clean() {
        let (issues, _) = context_from_descriptor(
            r#"{
                "@context": "https://schema.org",
                "@type": "Dataset",
                "name": "t",
                "description": "d",
                "author": [{"@type": "Person", "givenName": "Ada"}],
                "variableMeasured": ["row_id"]
            }"#,
        );
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_missing_dataset_type() {
        let (issues, attributed) = context_from_descriptor(
            r#"{
                "@context": "https://schema.org",
                "name": "t"
            }"#,
        );
        assert!(issues.has_issue("MISSING_DATASET_TYPE"));
        assert!(attributed);
    }

    #[test]
    fn test_incorrect_dataset_type() {
        let (issues, _) = context_from_descriptor(
            r#"{
                "@context": "https://schema.org",
                "@type": "CreativeWork",
                "name": "t"
            }"#,
        );
        let issue = issues.get("INCORRECT_DATASET_TYPE").unwrap();
        assert_eq!(
            issue.files()[0].evidence.as_deref(),
            Some("CreativeWork")
        );
    }

    #[test]
    fn test_unknown_namespace_lists_key() {
        let (issues, _) = context_from_descriptor(
            r#"{
                "@context": "https://schema.org",
                "@type": "Dataset",
                "name": "t",
                "http://example.org/custom": "x"
            }"#,
        );
        let issue = issues.get("UNKNOWN_NAMESPACE").unwrap();
        assert!(issue.files()[0]
            .evidence
            .as_deref()
            .unwrap()
            .contains("http://example.org/custom"));
    }

    #[test]
    fn test_invalid_property_for_enclosing_type() {
        // givenName is a Person slot, not valid on Dataset.
        let (issues, _) = context_from_descriptor(
            r#"{
                "@context": "https://schema.org",
                "@type": "Dataset",
                "name": "t",
                "givenName": "Ada"
            }"#,
        );
        let issue = issues.get("INVALID_SCHEMAORG_PROPERTY").unwrap();
        assert!(issue.files()[0]
            .evidence
            .as_deref()
            .unwrap()
            .contains("givenName"));
    }

    #[test]
    fn test_invalid_object_type_out_of_range() {
        // author must be Person or Organization.
        let (issues, _) = context_from_descriptor(
            r#"{
                "@context": "https://schema.org",
                "@type": "Dataset",
                "name": "t",
                "author": [{"@type": "Place", "name": "somewhere"}]
            }"#,
        );
        assert!(issues.has_issue("INVALID_OBJECT_TYPE"));
    }

    #[test]
    fn test_object_type_missing() {
        let (issues, _) = context_from_descriptor(
            r#"{
                "@context": "https://schema.org",
                "@type": "Dataset",
                "name": "t",
                "author": [{"givenName": "Ada"}]
            }"#,
        );
        assert!(issues.has_issue("OBJECT_TYPE_MISSING"));
    }

    #[test]
    fn test_property_value_variables_accepted() {
        let (issues, _) = context_from_descriptor(
            r#"{
                "@context": "https://schema.org",
                "@type": "Dataset",
                "name": "t",
                "variableMeasured": [
                    {"@type": "PropertyValue", "name": "age", "unitText": "years"},
                    "score"
                ]
            }"#,
        );
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_nested_recursion_checks_inner_slots() {
        // affiliation is valid on Person; jobTitle on Organization is not.
        let (issues, _) = context_from_descriptor(
            r#"{
                "@context": "https://schema.org",
                "@type": "Dataset",
                "name": "t",
                "author": [{
                    "@type": "Person",
                    "givenName": "Ada",
                    "affiliation": {"@type": "Organization", "jobTitle": "x"}
                }]
            }"#,
        );
        let issue = issues.get("INVALID_SCHEMAORG_PROPERTY").unwrap();
        assert!(issue.files()[0]
            .evidence
            .as_deref()
            .unwrap()
            .contains("author.affiliation.jobTitle"));
    }

    #[test]
    fn test_slots_inherit_through_superclasses() {
        let schema = load_bundled().unwrap();
        let slots = slots_of(&schema, "Dataset");
        assert!(slots.iter().any(|s| s == "variableMeasured"));
        assert!(slots.iter().any(|s| s == "author"));
        assert!(slots.iter().any(|s| s == "name"));
    }

    #[test]
    fn test_ranges_include_subclasses() {
        let schema = load_bundled().unwrap();
        // citation ranges over CreativeWork; Dataset is a subclass.
        let ranges = ranges_of(&schema, "citation");
        assert!(ranges.iter().any(|r| r == "CreativeWork"));
        assert!(ranges.iter().any(|r| r == "Dataset"));
    }
}
