//! Behavior-driven tests for CSV input handling
//!
//! These tests read real files from disk and check what reaches the engine,
//! focusing on the faults that must stop a run before any remote call.

use std::collections::BTreeMap;
use std::io::Write;

use csv2api_core::{
    check_batch, CsvSource, ExtraField, Generator, InputError, Normalizer, DEVICE, GUEST,
};
use serde_json::Value;
use tempfile::NamedTempFile;

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

// =============================================================================
// Reading files
// =============================================================================

#[test]
fn when_file_is_well_formed_records_follow_header_order() {
    // Given: A device file exported with a byte-order mark
    let file = write_csv("\u{feff}mac,role_id,enabled\nAA-BB-CC-00-00-01,3,yes\n");

    // When: It is loaded
    let batch = CsvSource::open(file.path())
        .expect("file opens")
        .read_all()
        .expect("file parses");

    // Then: Headers are clean and values stay strings until normalization
    assert_eq!(batch.headers, vec!["mac", "role_id", "enabled"]);
    assert_eq!(batch.records.len(), 1);
    let fields = batch.records[0].field_names().collect::<Vec<_>>();
    assert_eq!(fields, vec!["mac", "role_id", "enabled"]);
    assert_eq!(batch.records[0].get_str("enabled"), Some("yes"));
}

#[test]
fn when_file_is_missing_error_names_the_path() {
    // Given: A path that does not exist
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.csv");

    // When: It is opened
    let result = CsvSource::open(&path);

    // Then: The error says which file could not be opened
    let Err(error) = result else {
        panic!("opening a missing file should fail");
    };
    assert!(matches!(error, InputError::Open { .. }));
    assert!(
        error.to_string().contains("absent.csv"),
        "error should mention the file: {error}"
    );
}

#[test]
fn when_a_row_is_short_the_whole_file_is_rejected() {
    // Given: A file whose third line has a missing column
    let file = write_csv("mac,role_id\nAA-BB-CC-00-00-01,3\nAA-BB-CC-00-00-02\n");

    // When: It is loaded
    let result = CsvSource::open(file.path())
        .expect("file opens")
        .read_all();

    // Then: The column count fault points at the offending line
    match result {
        Err(InputError::ColumnCount {
            line,
            expected,
            found,
        }) => {
            assert_eq!(line, 3);
            assert_eq!(expected, 2);
            assert_eq!(found, 1);
        }
        other => panic!("expected a column count fault, got {other:?}"),
    }
}

// =============================================================================
// Offline checks
// =============================================================================

#[test]
fn when_guest_file_has_gaps_each_problem_is_counted() {
    // Given: A guest file with one good row and two rows missing a password
    let file = write_csv(
        "username,password,role_id,enabled\n\
         alice,ecila,2,1\n\
         bob,,2,0\n\
         carol,,2,0\n",
    );
    let batch = CsvSource::open(file.path())
        .expect("file opens")
        .read_all()
        .expect("file parses");

    // When: The batch is checked offline
    let check = check_batch(&batch.headers, batch.records, &GUEST, &Normalizer::new());

    // Then: The first record is shown normalized and both gaps are reported
    assert!(!check.is_clean());
    let first = check.first.expect("first record");
    assert_eq!(first.get("enabled"), Some(&Value::Bool(true)));
    assert_eq!(check.errors.values().sum::<usize>(), 2);
}

#[test]
fn when_excluding_a_required_column_the_header_check_fails() {
    // Given: A complete device file
    let file = write_csv("mac,role_id\nAA-BB-CC-00-00-01,3\n");
    let batch = CsvSource::open(file.path())
        .expect("file opens")
        .read_all()
        .expect("file parses");

    // When: role_id is excluded
    let normalizer = Normalizer::new().with_exclude(["role_id"]);
    let check = check_batch(&batch.headers, batch.records, &DEVICE, &normalizer);

    // Then: The missing header is reported
    assert!(check
        .errors
        .keys()
        .any(|message| message.contains("headers are required: role_id")));
}

// =============================================================================
// Generated input
// =============================================================================

#[test]
fn when_sample_input_is_generated_it_passes_the_offline_check() {
    // Given: A generated guest file with an extra constant column
    let mut extra = BTreeMap::new();
    extra.insert(String::from("sponsor_name"), String::from("Front Desk"));
    let mut buffer = Vec::new();
    Generator::new(&GUEST, &extra)
        .with_seed(7)
        .write(25, &mut buffer)
        .expect("generation succeeds");
    let file = write_csv(std::str::from_utf8(&buffer).expect("utf-8 output"));

    // When: It is read back and checked
    let batch = CsvSource::open(file.path())
        .expect("file opens")
        .read_all()
        .expect("file parses");
    let role = "role_id=2".parse::<ExtraField>().expect("valid extra");
    let check = check_batch(
        &batch.headers,
        batch.records.clone(),
        &GUEST,
        &Normalizer::new().with_extra([role]),
    );

    // Then: Every row is complete and carries the extra column
    assert_eq!(batch.records.len(), 25);
    assert!(check.is_clean(), "unexpected problems: {:?}", check.errors);
    assert!(batch
        .records
        .iter()
        .all(|record| record.get_str("sponsor_name") == Some("Front Desk")));
}
