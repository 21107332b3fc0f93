//! JSON-LD expansion under the fixed schema.org context.
//!
//! Psych-DS metadata always uses the schema.org vocabulary, so expansion
//! does not fetch remote contexts: compact keys are rewritten to
//! `http://schema.org/` IRIs, `@type` values are canonicalised, and scalar
//! values are wrapped in `@value` objects.

use serde_json::{Map, Value};
use thiserror::Error;

pub const SCHEMA_ORG_NS: &str = "http://schema.org/";

const KNOWN_KEYWORDS: &[&str] = &["@context", "@id", "@type", "@value", "@list", "@graph"];

/// Expansion failure. The `Display` form follows the
/// `jsonld.SyntaxError: <detail>` convention so callers can pull the
/// detail segment out as issue evidence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("jsonld.SyntaxError: {detail}")]
pub struct JsonLdError {
    pub detail: String,
}

impl JsonLdError {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Expand a compact JSON-LD document. Returns the expansion result list;
/// for a single node object this is a one-element list.
pub fn expand(value: &Value) -> Result<Vec<Value>, JsonLdError> {
    match value {
        Value::Object(map) => {
            check_context(map)?;
            Ok(vec![expand_node(map)?])
        }
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => {
                    check_context(map)?;
                    expand_node(map)
                }
                other => Err(JsonLdError::new(format!(
                    "top-level value must be a node object, found {}",
                    json_kind(other)
                ))),
            })
            .collect(),
        other => Err(JsonLdError::new(format!(
            "document must be an object or array, found {}",
            json_kind(other)
        ))),
    }
}

fn check_context(map: &Map<String, Value>) -> Result<(), JsonLdError> {
    match map.get("@context") {
        None => Ok(()),
        Some(Value::String(_)) | Some(Value::Object(_)) => Ok(()),
        Some(Value::Array(items)) if items.iter().all(|i| i.is_string() || i.is_object()) => Ok(()),
        Some(other) => Err(JsonLdError::new(format!(
            "@context must be a string, object, or array, found {}",
            json_kind(other)
        ))),
    }
}

fn expand_node(map: &Map<String, Value>) -> Result<Value, JsonLdError> {
    let mut out = Map::new();
    for (key, value) in map {
        if key == "@context" {
            continue;
        }
        if key.starts_with('@') {
            if !KNOWN_KEYWORDS.contains(&key.as_str()) {
                return Err(JsonLdError::new(format!("invalid keyword: {}", key)));
            }
            match key.as_str() {
                "@type" => {
                    out.insert("@type".to_string(), expand_types(value)?);
                }
                "@id" => match value {
                    Value::String(id) => {
                        out.insert("@id".to_string(), Value::String(id.clone()));
                    }
                    other => {
                        return Err(JsonLdError::new(format!(
                            "@id must be a string, found {}",
                            json_kind(other)
                        )))
                    }
                },
                // @value / @list / @graph pass through untouched.
                _ => {
                    out.insert(key.clone(), value.clone());
                }
            }
            continue;
        }
        out.insert(expand_iri(key), expand_values(value)?);
    }
    Ok(Value::Object(out))
}

fn expand_types(value: &Value) -> Result<Value, JsonLdError> {
    let types = match value {
        Value::String(t) => vec![t.clone()],
        Value::Array(items) => {
            let mut types = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(t) => types.push(t.clone()),
                    other => {
                        return Err(JsonLdError::new(format!(
                            "@type values must be strings, found {}",
                            json_kind(other)
                        )))
                    }
                }
            }
            types
        }
        other => {
            return Err(JsonLdError::new(format!(
                "@type must be a string or array of strings, found {}",
                json_kind(other)
            )))
        }
    };
    Ok(Value::Array(
        types
            .into_iter()
            .map(|t| Value::String(expand_iri(&t)))
            .collect(),
    ))
}

fn expand_values(value: &Value) -> Result<Value, JsonLdError> {
    let items = match value {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        other => vec![other],
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => out.push(expand_node(map)?),
            Value::Null => continue,
            scalar => {
                let mut wrapped = Map::new();
                wrapped.insert("@value".to_string(), scalar.clone());
                out.push(Value::Object(wrapped));
            }
        }
    }
    Ok(Value::Array(out))
}

/// Rewrite a compact term to a full IRI under the schema.org vocabulary.
/// Already-absolute IRIs are kept as-is.
fn expand_iri(term: &str) -> String {
    if term.starts_with("http://") || term.starts_with("https://") {
        term.to_string()
    } else {
        format!("{}{}", SCHEMA_ORG_NS, term)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_keys_become_iris() {
        let doc = json!({
            "@context": "https://schema.org",
            "@type": "Dataset",
            "name": "my dataset"
        });
        let expanded = expand(&doc).unwrap();
        assert_eq!(expanded.len(), 1);
        let node = &expanded[0];
        assert_eq!(
            node["@type"],
            json!(["http://schema.org/Dataset"])
        );
        assert_eq!(
            node["http://schema.org/name"],
            json!([{"@value": "my dataset"}])
        );
        assert!(node.get("@context").is_none());
    }

    #[test]
    fn test_nested_objects_recurse() {
        let doc = json!({
            "@type": "Dataset",
            "variableMeasured": [
                {"@type": "PropertyValue", "name": "age"},
                "height"
            ]
        });
        let node = &expand(&doc).unwrap()[0];
        let vars = node["http://schema.org/variableMeasured"]
            .as_array()
            .unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0]["@type"], json!(["http://schema.org/PropertyValue"]));
        assert_eq!(
            vars[0]["http://schema.org/name"],
            json!([{"@value": "age"}])
        );
        assert_eq!(vars[1], json!({"@value": "height"}));
    }

    #[test]
    fn test_absolute_iri_keys_kept() {
        let doc = json!({
            "@type": "Dataset",
            "http://example.org/custom": "x"
        });
        let node = &expand(&doc).unwrap()[0];
        assert!(node.get("http://example.org/custom").is_some());
    }

    #[test]
    fn test_unknown_keyword_is_syntax_error() {
        let doc = json!({"@type": "Dataset", "@bogus": 1});
        let err = expand(&doc).unwrap_err();
        assert!(err.detail.contains("@bogus"));
        assert!(err.to_string().starts_with("jsonld.SyntaxError:"));
    }

    #[test]
    fn test_invalid_context_rejected() {
        let doc = json!({"@context": 7, "name": "x"});
        let err = expand(&doc).unwrap_err();
        assert!(err.detail.contains("@context"));
    }

    #[test]
    fn test_invalid_type_value_rejected() {
        let doc = json!({"@type": {"bad": true}});
        assert!(expand(&doc).is_err());
    }

    #[test]
    fn test_scalar_document_rejected() {
        assert!(expand(&json!("just a string")).is_err());
    }

    #[test]
    fn test_null_values_dropped() {
        let doc = json!({"name": null});
        let node = &expand(&doc).unwrap()[0];
        assert_eq!(node["http://schema.org/name"], json!([]));
    }
}
