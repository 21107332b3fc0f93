//! RFC-4180-style CSV parser returning a column-oriented view plus
//! structural issues.
//!
//! The parser never fails the validation run; malformed input is reported
//! through [`CsvIssue`] values and column-level checks are skipped upstream.

use std::collections::HashSet;

/// Structural problems found while parsing a CSV data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvIssue {
    NoHeader,
    HeaderRowMismatch {
        row: usize,
        actual: usize,
        expected: usize,
    },
    RowidValuesNotUnique,
    FormattingError { message: String },
}

impl CsvIssue {
    /// Stable issue key this structural problem maps to.
    pub fn key(&self) -> &'static str {
        match self {
            CsvIssue::NoHeader => "NO_HEADER",
            CsvIssue::HeaderRowMismatch { .. } => "HEADER_ROW_MISMATCH",
            CsvIssue::RowidValuesNotUnique => "ROWID_VALUES_NOT_UNIQUE",
            CsvIssue::FormattingError { .. } => "CSV_FORMATTING_ERROR",
        }
    }

    /// Evidence string attached to the reporting issue, if any.
    pub fn evidence(&self) -> Option<String> {
        match self {
            CsvIssue::HeaderRowMismatch {
                row,
                actual,
                expected,
            } => Some(format!(
                "Row {} has {} columns, expected {}",
                row, actual, expected
            )),
            CsvIssue::FormattingError { message } => Some(message.clone()),
            _ => None,
        }
    }
}

/// Column-oriented parse result.
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    /// Header cells in order, duplicates included.
    pub headers: Vec<String>,
    /// header -> values from well-formed rows; insertion-ordered, one
    /// entry per distinct header name.
    pub columns: Vec<(String, Vec<String>)>,
    pub issues: Vec<CsvIssue>,
}

impl ParsedCsv {
    pub fn column(&self, header: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_slice())
    }
}

/// Parse CSV text into rows and a column view, collecting structural
/// issues along the way.
pub fn parse_csv(text: &str) -> ParsedCsv {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let rows = match split_rows(&normalized) {
        Ok(rows) => rows,
        Err(message) => {
            return ParsedCsv {
                issues: vec![CsvIssue::FormattingError { message }],
                ..Default::default()
            }
        }
    };

    let mut result = ParsedCsv::default();

    let header = match rows.first() {
        Some(row) if !is_empty_row(row) => row.clone(),
        _ => {
            result.issues.push(CsvIssue::NoHeader);
            return result;
        }
    };
    result.headers = header.clone();
    for name in &header {
        if !result.columns.iter().any(|(h, _)| h == name) {
            result.columns.push((name.clone(), Vec::new()));
        }
    }

    for (index, row) in rows.iter().enumerate().skip(1) {
        if is_empty_row(row) {
            continue;
        }
        // 1-based rows with the header at row 1.
        if row.len() != header.len() {
            result.issues.push(CsvIssue::HeaderRowMismatch {
                row: index + 1,
                actual: row.len(),
                expected: header.len(),
            });
            continue;
        }
        for (name, value) in header.iter().zip(row) {
            if let Some((_, values)) = result.columns.iter_mut().find(|(h, _)| h == name) {
                values.push(value.clone());
            }
        }
    }

    if let Some(values) = result.column("row_id") {
        let mut seen = HashSet::new();
        if values.iter().any(|v| !seen.insert(v)) {
            result.issues.push(CsvIssue::RowidValuesNotUnique);
        }
    }

    result
}

fn is_empty_row(row: &[String]) -> bool {
    row.is_empty() || (row.len() == 1 && row[0].is_empty())
}

/// Split normalised text into rows of fields, honouring double-quoted
/// fields that may contain commas, newlines, and doubled quotes.
fn split_rows(text: &str) -> Result<Vec<Vec<String>>, String> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => in_quotes = true,
            ',' => {
                row.push(std::mem::take(&mut field));
            }
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_columns() {
        let parsed = parse_csv("a,b,c\n1,2,3\n4,5,6\n");
        assert!(parsed.issues.is_empty());
        assert_eq!(parsed.headers, vec!["a", "b", "c"]);
        assert_eq!(parsed.column("a").unwrap(), ["1", "4"]);
        assert_eq!(parsed.column("c").unwrap(), ["3", "6"]);
    }

    #[test]
    fn test_crlf_and_cr_normalised() {
        let parsed = parse_csv("a,b\r\n1,2\r3,4");
        assert!(parsed.issues.is_empty());
        assert_eq!(parsed.column("b").unwrap(), ["2", "4"]);
    }

    #[test]
    fn test_quoted_fields_with_commas() {
        let parsed = parse_csv("name,desc\nx,\"a, b\"\n");
        assert!(parsed.issues.is_empty());
        assert_eq!(parsed.column("desc").unwrap(), ["a, b"]);
    }

    #[test]
    fn test_doubled_quote_escape() {
        let parsed = parse_csv("q\n\"say \"\"hi\"\"\"\n");
        assert_eq!(parsed.column("q").unwrap(), ["say \"hi\""]);
    }

    #[test]
    fn test_no_header_on_leading_blank_line() {
        let parsed = parse_csv("\na,b\n1,2\n");
        assert_eq!(parsed.issues, vec![CsvIssue::NoHeader]);
        assert!(parsed.headers.is_empty());
    }

    #[test]
    fn test_no_header_on_empty_input() {
        let parsed = parse_csv("");
        assert_eq!(parsed.issues, vec![CsvIssue::NoHeader]);
    }

    #[test]
    fn test_ragged_row_message() {
        let parsed = parse_csv("a,b,c\n1,2\n");
        assert_eq!(
            parsed.issues,
            vec![CsvIssue::HeaderRowMismatch {
                row: 2,
                actual: 2,
                expected: 3
            }]
        );
        assert_eq!(
            parsed.issues[0].evidence().unwrap(),
            "Row 2 has 2 columns, expected 3"
        );
        // The malformed row contributes no column values.
        assert!(parsed.column("a").unwrap().is_empty());
    }

    #[test]
    fn test_fully_empty_lines_skipped() {
        let parsed = parse_csv("a,b\n1,2\n\n3,4\n");
        assert!(parsed.issues.is_empty());
        assert_eq!(parsed.column("a").unwrap(), ["1", "3"]);
    }

    #[test]
    fn test_row_id_duplicates() {
        let parsed = parse_csv("row_id,v\n1,a\n2,b\n1,c\n");
        assert_eq!(parsed.issues, vec![CsvIssue::RowidValuesNotUnique]);
    }

    #[test]
    fn test_row_id_unique_ok() {
        let parsed = parse_csv("row_id,v\n1,a\n2,b\n");
        assert!(parsed.issues.is_empty());
    }

    #[test]
    fn test_unterminated_quote_is_formatting_error() {
        let parsed = parse_csv("a,b\n\"open,2\n");
        assert_eq!(parsed.issues.len(), 1);
        assert_eq!(parsed.issues[0].key(), "CSV_FORMATTING_ERROR");
    }

    #[test]
    fn test_duplicate_headers_share_a_column() {
        let parsed = parse_csv("a,a\n1,2\n");
        assert_eq!(parsed.headers, vec!["a", "a"]);
        assert_eq!(parsed.columns.len(), 1);
        assert_eq!(parsed.column("a").unwrap(), ["1", "2"]);
    }
}
