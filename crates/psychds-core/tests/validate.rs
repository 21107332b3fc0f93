//! End-to-end validation scenarios over on-disk datasets.

use psychds_core::{
    load_bundled, read_file_tree, validate, RealFileSystem, ValidationResult, ValidatorOptions,
};
use std::fs;
use tempfile::TempDir;

const BFI_VARIABLES: [&str; 28] = [
    "row_id", "A1", "A2", "A3", "A4", "A5", "C1", "C2", "C3", "C4", "C5", "E1", "E2", "E3", "E4",
    "E5", "N1", "N2", "N3", "N4", "N5", "O1", "O2", "O3", "O4", "O5", "gender", "age",
];

fn write(dir: &TempDir, rel: &str, content: &str) {
    let path = dir.path().join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn descriptor_with_variables(variables: &[&str]) -> String {
    let vars = variables
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"{{
            "@context": "https://schema.org",
            "@type": "Dataset",
            "name": "bfi-dataset",
            "description": "Answers to the Big Five personality inventory",
            "variableMeasured": [{}]
        }}"#,
        vars
    )
}

fn bfi_dataset() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "dataset_description.json",
        &descriptor_with_variables(&BFI_VARIABLES),
    );
    let header = BFI_VARIABLES.join(",");
    let row: Vec<String> = (0..BFI_VARIABLES.len()).map(|i| i.to_string()).collect();
    write(
        &dir,
        "data/raw_data/study-bfi_data.csv",
        &format!("{}\n{}\n", header, row.join(",")),
    );
    dir
}

fn run(dir: &TempDir) -> ValidationResult {
    let dataset = read_file_tree(&RealFileSystem, dir.path()).unwrap();
    let schema = load_bundled().unwrap();
    let options = ValidatorOptions::for_path(dir.path().display().to_string());
    validate(&dataset, &schema, &options).unwrap()
}

fn error_keys(result: &ValidationResult) -> Vec<&str> {
    result.issues.errors.iter().map(|i| i.key.as_str()).collect()
}

fn warning_keys(result: &ValidationResult) -> Vec<&str> {
    result
        .issues
        .warnings
        .iter()
        .map(|i| i.key.as_str())
        .collect()
}

#[test]
fn valid_baseline_dataset() {
    let dir = bfi_dataset();
    let result = run(&dir);

    assert!(result.valid, "unexpected errors: {:?}", error_keys(&result));
    assert!(result.issues.errors.is_empty());
    assert!(result.summary.total_files >= 1);
    assert_eq!(result.summary.schema_version, "1.4.0");
    assert!(result.summary.size > 0);
    assert_eq!(result.summary.data_types, vec!["tabular_data"]);
    for variable in BFI_VARIABLES {
        assert!(result
            .summary
            .suggested_columns
            .iter()
            .any(|c| c == variable));
    }
}

#[test]
fn missing_header_reported() {
    let dir = bfi_dataset();
    write(&dir, "data/raw_data/study-noheader_data.csv", "\na,b\n1,2\n");
    let result = run(&dir);

    assert!(!result.valid);
    let issue = result
        .issues
        .errors
        .iter()
        .find(|i| i.key == "NO_HEADER")
        .unwrap();
    assert_eq!(
        issue.files[0].file.path,
        "/data/raw_data/study-noheader_data.csv"
    );
}

#[test]
fn ragged_row_reported_with_message() {
    let dir = bfi_dataset();
    write(
        &dir,
        "data/raw_data/study-ragged_data.csv",
        "row_id,A1,A2\n1,2\n",
    );
    let result = run(&dir);

    let issue = result
        .issues
        .errors
        .iter()
        .find(|i| i.key == "HEADER_ROW_MISMATCH")
        .unwrap();
    assert_eq!(
        issue.files[0].evidence.as_deref(),
        Some("Row 2 has 2 columns, expected 3")
    );
}

#[test]
fn duplicate_row_id_reported() {
    let dir = bfi_dataset();
    write(
        &dir,
        "data/raw_data/study-dup_data.csv",
        "row_id,A1\n1,x\n1,y\n",
    );
    let result = run(&dir);

    assert!(error_keys(&result).contains(&"ROWID_VALUES_NOT_UNIQUE"));
}

#[test]
fn missing_dataset_type_attributed_to_descriptor() {
    let dir = bfi_dataset();
    write(
        &dir,
        "dataset_description.json",
        r#"{
            "@context": "https://schema.org",
            "name": "bfi-dataset",
            "description": "d",
            "variableMeasured": ["row_id"]
        }"#,
    );
    write(&dir, "data/raw_data/study-bfi_data.csv", "row_id\n1\n");
    let result = run(&dir);

    let issue = result
        .issues
        .errors
        .iter()
        .find(|i| i.key == "MISSING_DATASET_TYPE")
        .unwrap();
    assert_eq!(issue.files[0].file.path, "/dataset_description.json");
}

#[test]
fn incorrect_dataset_type_reported() {
    let dir = bfi_dataset();
    write(
        &dir,
        "dataset_description.json",
        r#"{
            "@context": "https://schema.org",
            "@type": "CreativeWork",
            "name": "bfi-dataset",
            "description": "d",
            "variableMeasured": ["row_id"]
        }"#,
    );
    write(&dir, "data/raw_data/study-bfi_data.csv", "row_id\n1\n");
    let result = run(&dir);

    assert!(error_keys(&result).contains(&"INCORRECT_DATASET_TYPE"));
}

#[test]
fn unknown_namespace_lists_key_as_evidence() {
    let dir = bfi_dataset();
    write(
        &dir,
        "dataset_description.json",
        r#"{
            "@context": "https://schema.org",
            "@type": "Dataset",
            "name": "bfi-dataset",
            "description": "d",
            "variableMeasured": ["row_id"],
            "http://example.org/custom": "x"
        }"#,
    );
    write(&dir, "data/raw_data/study-bfi_data.csv", "row_id\n1\n");
    let result = run(&dir);

    let issue = result
        .issues
        .warnings
        .iter()
        .find(|i| i.key == "UNKNOWN_NAMESPACE")
        .unwrap();
    assert!(issue.files[0]
        .evidence
        .as_deref()
        .unwrap()
        .contains("http://example.org/custom"));
}

#[test]
fn keyword_filename_violation() {
    let dir = bfi_dataset();
    write(&dir, "data/raw_data/study_bfi_data.csv", "row_id\n1\n");
    let result = run(&dir);

    let issue = result
        .issues
        .errors
        .iter()
        .find(|i| i.key == "FILENAME_KEYWORD_FORMATTING_ERROR")
        .unwrap();
    assert_eq!(
        issue.files[0].file.path,
        "/data/raw_data/study_bfi_data.csv"
    );
}

#[test]
fn missing_dataset_description_via_missing_rules() {
    let dir = TempDir::new().unwrap();
    write(&dir, "data/raw_data/study-bfi_data.csv", "row_id\n1\n");
    let result = run(&dir);

    assert!(!result.valid);
    assert!(error_keys(&result).contains(&"MISSING_DATASET_DESCRIPTION"));
    // MISSING_DATAFILE requires the descriptor rule and must not appear;
    // the data files themselves satisfied their rule anyway.
    assert!(!error_keys(&result).contains(&"MISSING_DATAFILE"));
}

#[test]
fn missing_datafile_when_no_csv_present() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "dataset_description.json",
        &descriptor_with_variables(&["row_id"]),
    );
    let result = run(&dir);

    assert!(!result.valid);
    assert!(error_keys(&result).contains(&"MISSING_DATAFILE"));
    assert!(error_keys(&result).contains(&"MISSING_DATA_DIRECTORY"));
}

#[test]
fn unrealised_variable_reported() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "dataset_description.json",
        &descriptor_with_variables(&["row_id", "age"]),
    );
    write(&dir, "data/raw_data/study-bfi_data.csv", "row_id\n1\n");
    let result = run(&dir);

    let issue = result
        .issues
        .warnings
        .iter()
        .find(|i| i.key == "VARIABLE_MISSING_FROM_CSV_COLUMNS")
        .unwrap();
    assert_eq!(issue.files[0].evidence.as_deref(), Some("[age]"));
    assert_eq!(issue.files[0].file.path, "/dataset_description.json");
    assert!(result.valid);
}

#[test]
fn undeclared_csv_column_warns() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "dataset_description.json",
        &descriptor_with_variables(&["row_id"]),
    );
    write(
        &dir,
        "data/raw_data/study-bfi_data.csv",
        "row_id,undeclared\n1,2\n",
    );
    let result = run(&dir);

    assert!(warning_keys(&result).contains(&"CSV_COLUMN_MISSING"));
    assert!(result.valid);
}

#[test]
fn broken_descriptor_json_is_an_error() {
    let dir = TempDir::new().unwrap();
    write(&dir, "dataset_description.json", "{broken json");
    write(&dir, "data/raw_data/study-bfi_data.csv", "row_id\n1\n");
    let result = run(&dir);

    assert!(!result.valid);
    assert!(error_keys(&result).contains(&"INVALID_JSON_FORMATTING"));
}

#[test]
fn utf16_file_is_an_error() {
    let dir = bfi_dataset();
    fs::write(
        dir.path().join("data/raw_data/study-utf_data.csv"),
        b"\xFF\xFEr\x00o\x00w\x00",
    )
    .unwrap();
    let result = run(&dir);

    assert!(!result.valid);
    assert!(error_keys(&result).contains(&"UNICODE_DECODE_ERROR"));
}

#[test]
fn empty_file_warns() {
    let dir = bfi_dataset();
    write(&dir, "README.md", "");
    let result = run(&dir);

    let issue = result
        .issues
        .warnings
        .iter()
        .find(|i| i.key == "FILE_EMPTY")
        .unwrap();
    assert_eq!(issue.files[0].file.path, "/README.md");
}

#[test]
fn ignored_files_are_not_checked() {
    let dir = bfi_dataset();
    write(&dir, ".psychdsignore", "*.tmp\n");
    write(&dir, "data/scratch.tmp", "not a dataset file");
    write(&dir, "sourcedata/raw.bin", "binary-ish");
    let result = run(&dir);

    assert!(result.valid);
    let all_files: Vec<&str> = result
        .issues
        .errors
        .iter()
        .chain(result.issues.warnings.iter())
        .flat_map(|i| i.files.iter())
        .map(|f| f.file.path.as_str())
        .collect();
    assert!(!all_files.contains(&"/data/scratch.tmp"));
    assert!(!all_files.contains(&"/sourcedata/raw.bin"));
}

#[test]
fn issue_files_keyed_by_their_own_path() {
    let dir = bfi_dataset();
    write(&dir, "data/raw_data/study-dup_data.csv", "row_id\n1\n1\n");
    write(&dir, "stray.bin", "x");
    let result = run(&dir);

    for issue in result.issues.errors.iter().chain(result.issues.warnings.iter()) {
        for file in &issue.files {
            assert_eq!(file.file.path, file.file.relative_path);
            assert_eq!(file.key, issue.key);
        }
    }
}

#[test]
fn validation_is_idempotent() {
    let dir = bfi_dataset();
    write(&dir, "data/raw_data/study-dup_data.csv", "row_id\n1\n1\n");

    let first = run(&dir);
    let second = run(&dir);

    let keys = |r: &ValidationResult| {
        let mut keys: Vec<String> = r
            .issues
            .errors
            .iter()
            .chain(r.issues.warnings.iter())
            .map(|i| i.key.clone())
            .collect();
        keys.sort();
        keys
    };
    assert_eq!(first.valid, second.valid);
    assert_eq!(keys(&first), keys(&second));
    assert_eq!(first.summary.total_files, second.summary.total_files);
    assert_eq!(first.summary.size, second.summary.size);
}

#[test]
fn result_serialises_with_compat_code() {
    let dir = bfi_dataset();
    write(&dir, "data/raw_data/study-dup_data.csv", "row_id\n1\n1\n");
    let result = run(&dir);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["valid"], false);
    let first_error = &json["issues"]["errors"][0];
    assert_eq!(first_error["code"], -9007199254740991i64);
    assert!(first_error["helpUrl"].as_str().is_some());
    assert!(json["summary"]["totalFiles"].as_u64().is_some());
}
