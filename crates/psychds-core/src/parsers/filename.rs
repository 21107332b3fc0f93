//! Filename element reader.
//!
//! Psych-DS data filenames are composed of underscore-separated
//! `key-value` keyword pairs followed by a suffix and an extension, e.g.
//! `study-bfi_subject-01_data.csv`.

/// Sentinel value for a keyword segment without a `-` separator.
pub const NO_KEYWORD: &str = "NOKEYWORD";

/// The decomposed elements of a filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameParts {
    /// keyword -> value, in filename order.
    pub keywords: Vec<(String, String)>,
    /// Final underscore-separated segment, minus the extension.
    pub suffix: String,
    /// Everything from the last dot of the final segment; empty if absent.
    pub extension: String,
}

impl FilenameParts {
    pub fn keyword(&self, key: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Split a filename into keywords, suffix, and extension.
pub fn parse_filename(name: &str) -> FilenameParts {
    let mut segments: Vec<&str> = name.split('_').collect();
    let last = segments.pop().unwrap_or_default();

    let (suffix, extension) = match last.rfind('.') {
        Some(dot) => (&last[..dot], &last[dot..]),
        None => (last, ""),
    };

    let keywords = segments
        .iter()
        .map(|segment| match segment.split_once('-') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (segment.to_string(), NO_KEYWORD.to_string()),
        })
        .collect();

    FilenameParts {
        keywords,
        suffix: suffix.to_string(),
        extension: extension.to_string(),
    }
}

/// The filename stem: the name with the extension removed.
pub fn stem(name: &str) -> &str {
    let parts = parse_filename(name);
    if parts.extension.is_empty() {
        name
    } else {
        &name[..name.len() - parts.extension.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_data_filename() {
        let parts = parse_filename("study-bfi_subject-01_data.csv");
        assert_eq!(
            parts.keywords,
            vec![
                ("study".to_string(), "bfi".to_string()),
                ("subject".to_string(), "01".to_string()),
            ]
        );
        assert_eq!(parts.suffix, "data");
        assert_eq!(parts.extension, ".csv");
    }

    #[test]
    fn test_keyword_without_value_gets_sentinel() {
        let parts = parse_filename("study_data.csv");
        assert_eq!(parts.keyword("study"), Some(NO_KEYWORD));
    }

    #[test]
    fn test_no_extension() {
        let parts = parse_filename("README");
        assert_eq!(parts.suffix, "README");
        assert_eq!(parts.extension, "");
        assert!(parts.keywords.is_empty());
    }

    #[test]
    fn test_extension_from_last_dot_of_final_segment() {
        let parts = parse_filename("study-v1.2_data.tar.gz");
        assert_eq!(parts.keyword("study"), Some("v1.2"));
        assert_eq!(parts.suffix, "data.tar");
        assert_eq!(parts.extension, ".gz");
    }

    #[test]
    fn test_value_may_contain_hyphen() {
        let parts = parse_filename("condition-high-low_data.csv");
        assert_eq!(parts.keyword("condition"), Some("high-low"));
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("study-bfi_data.csv"), "study-bfi_data");
        assert_eq!(stem("dataset_description.json"), "dataset_description");
        assert_eq!(stem("README"), "README");
    }
}
