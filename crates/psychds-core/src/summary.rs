//! Dataset summary accumulated over the validation walk.

use crate::context::FileContext;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_files: usize,
    /// Total bytes across counted files.
    pub size: u64,
    /// Compatibility stub; the validator never processes data contents.
    pub data_processed: bool,
    /// Rule groups encountered (e.g. `tabular_data`).
    pub data_types: Vec<String>,
    pub schema_version: String,
    /// Union of CSV column headers seen anywhere in the dataset.
    pub suggested_columns: Vec<String>,
}

impl Summary {
    pub fn new(schema_version: &str) -> Self {
        Self {
            total_files: 0,
            size: 0,
            data_processed: false,
            data_types: Vec::new(),
            schema_version: schema_version.to_string(),
            suggested_columns: Vec::new(),
        }
    }

    /// Fold one validated file context into the totals.
    pub fn update(&mut self, context: &FileContext<'_>) {
        self.total_files += 1;
        self.size += context.file.size;
        for rule in &context.filename_rules {
            // rules.files.<group>.<...>: the group names the data type.
            if let Some(group) = rule.strip_prefix("rules.files.").and_then(|r| r.split('.').next())
            {
                if group != "common" && !self.data_types.iter().any(|t| t == group) {
                    self.data_types.push(group.to_string());
                }
            }
        }
    }

    /// Record the column headers of a CSV file.
    pub fn suggest_columns<'a>(&mut self, headers: impl IntoIterator<Item = &'a str>) {
        for header in headers {
            if !self.suggested_columns.iter().any(|c| c == header) {
                self.suggested_columns.push(header.to_string());
            }
        }
    }
}
