//! The Psych-DS schema: a deeply nested, dynamically keyed JSON document.
//!
//! The schema is data, not code: no typed reflection. Everything reads
//! through [`Schema::get`], a dotted-path accessor returning the node or
//! `None` for "absent".

pub mod loader;

use serde_json::Value;

/// Combined schema document: the versioned Psych-DS schema with the
/// schema.org vocabulary merged under the `schemaOrg` key.
#[derive(Debug, Clone)]
pub struct Schema {
    root: Value,
}

impl Schema {
    /// Wrap an already-combined schema document.
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Combine a Psych-DS schema document with the schema.org vocabulary.
    pub fn from_parts(mut schema: Value, schema_org: Value) -> Self {
        if let Value::Object(map) = &mut schema {
            map.insert("schemaOrg".to_string(), schema_org);
        }
        Self { root: schema }
    }

    /// Resolve a dotted path through the tree. Returns `None` when any
    /// segment is absent or the walk hits a non-object.
    pub fn get(&self, path: &str) -> Option<&Value> {
        resolve_path(&self.root, path)
    }

    /// Resolve a dotted path and view the node as an object.
    pub fn get_object(&self, path: &str) -> Option<&serde_json::Map<String, Value>> {
        self.get(path).and_then(Value::as_object)
    }

    /// Resolve a dotted path to a string value.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// The declared version of the loaded schema.
    pub fn version(&self) -> &str {
        self.get_str("schema_version").unwrap_or("unknown")
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

/// Dotted-path resolution against any JSON value.
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.split('.') {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}
