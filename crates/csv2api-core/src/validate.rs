//! Header and record checks against an [`EntityContract`].

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::contract::EntityContract;
use crate::normalize::Normalizer;
use crate::record::Record;

/// Placeholder used in skip messages when the key itself is empty.
const UNKNOWN_KEY: &str = "?";

/// The header row lacks mandatory columns. Aborts the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("The following headers are required: {}", .missing.join(", "))]
pub struct MissingHeaders {
    pub missing: Vec<String>,
}

/// A record has mandatory fields present but empty. The record is skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{key} - SKIPPING: The following fields are empty: {}", .missing.join(", "))]
pub struct MissingFields {
    pub key: String,
    pub missing: Vec<String>,
}

/// Callers pass the header row as it looks after normalization (see
/// [`Normalizer::effective_headers`]), so extra fields count as present and
/// excluded columns as absent.
pub fn validate_headers<S: AsRef<str>>(
    headers: &[S],
    contract: &EntityContract,
) -> Result<(), MissingHeaders> {
    let missing = contract
        .mandatory_fields()
        .filter(|field| !headers.iter().any(|header| header.as_ref() == *field))
        .map(str::to_owned)
        .collect::<Vec<_>>();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingHeaders { missing })
    }
}

/// Reports mandatory fields that are present but empty. Absent fields are
/// a header problem and are caught by [`validate_headers`].
pub fn validate_record(record: &Record, contract: &EntityContract) -> Result<(), MissingFields> {
    let is_empty = |field: &str| match record.get(field) {
        None => false,
        Some(Value::Null) => true,
        Some(Value::String(value)) => value.is_empty(),
        Some(_) => false,
    };

    let missing = contract
        .mandatory_fields()
        .filter(|field| is_empty(*field))
        .map(str::to_owned)
        .collect::<Vec<_>>();

    if missing.is_empty() {
        return Ok(());
    }

    let key = match record.key(contract) {
        Some(key) if !key.is_empty() => key.to_owned(),
        _ => String::from(UNKNOWN_KEY),
    };
    Err(MissingFields { key, missing })
}

/// Offline review of a whole input batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchCheck {
    /// First record after normalization, for eyeballing the payload shape.
    pub first: Option<Record>,
    /// Distinct problem messages with their occurrence counts.
    pub errors: BTreeMap<String, usize>,
}

impl BatchCheck {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs header and record validation over a batch without stopping at the
/// first problem.
pub fn check_batch<S, I>(
    headers: &[S],
    records: I,
    contract: &EntityContract,
    normalizer: &Normalizer,
) -> BatchCheck
where
    S: AsRef<str>,
    I: IntoIterator<Item = Record>,
{
    let mut check = BatchCheck::default();
    let mut tally = |message: String| *check.errors.entry(message).or_insert(0) += 1;

    if let Err(error) = validate_headers(&normalizer.effective_headers(headers), contract) {
        tally(error.to_string());
    }

    let mut first = None;
    for record in records {
        let record = normalizer.normalize(record);
        if let Err(error) = validate_record(&record, contract) {
            tally(error.to_string());
        }
        if first.is_none() {
            first = Some(record);
        }
    }

    check.first = first;
    check
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{DEVICE, GUEST};

    #[test]
    fn headers_report_every_missing_column() {
        let error = validate_headers(&["visitor_name"], &GUEST).expect_err("missing headers");

        assert_eq!(error.missing, vec!["username", "password", "role_id"]);
        assert_eq!(
            error.to_string(),
            "The following headers are required: username, password, role_id"
        );
    }

    #[test]
    fn headers_pass_when_all_present() {
        assert!(validate_headers(&["role_id", "mac", "notes"], &DEVICE).is_ok());
    }

    #[test]
    fn empty_required_field_skips_record() {
        let record = Record::from_row(["username", "password", "role_id"], ["alice", "", "3"]);

        let error = validate_record(&record, &GUEST).expect_err("password is empty");

        assert_eq!(error.key, "alice");
        assert_eq!(error.missing, vec!["password"]);
        assert_eq!(
            error.to_string(),
            "alice - SKIPPING: The following fields are empty: password"
        );
    }

    #[test]
    fn empty_key_uses_placeholder() {
        let record = Record::from_row(["mac", "role_id"], ["", ""]);

        let error = validate_record(&record, &DEVICE).expect_err("key is empty");

        assert_eq!(error.key, "?");
        assert_eq!(error.missing, vec!["mac", "role_id"]);
    }

    #[test]
    fn absent_fields_are_left_to_the_header_check() {
        let record = Record::from_row(["mac"], ["AA-BB"]);

        assert!(validate_record(&record, &DEVICE).is_ok());
    }

    #[test]
    fn complete_record_passes() {
        let record = Record::from_row(["mac", "role_id"], ["AA-BB", "3"]);

        assert!(validate_record(&record, &DEVICE).is_ok());
    }

    #[test]
    fn batch_check_tallies_distinct_messages() {
        let normalizer = Normalizer::new().with_exclude(["id"]);
        let records = vec![
            Record::from_row(["id", "mac", "role_id"], ["1", "AA-01", ""]),
            Record::from_row(["id", "mac", "role_id"], ["2", "AA-01", ""]),
            Record::from_row(["id", "mac", "role_id"], ["3", "AA-03", "3"]),
        ];

        let check = check_batch(&["id", "mac", "role_id"], records, &DEVICE, &normalizer);

        assert!(!check.is_clean());
        assert_eq!(
            check.errors.get("AA-01 - SKIPPING: The following fields are empty: role_id"),
            Some(&2)
        );
        let first = check.first.expect("first record kept");
        assert!(!first.contains("id"));
    }

    #[test]
    fn batch_check_reports_missing_headers() {
        let check = check_batch(&["mac"], Vec::new(), &GUEST, &Normalizer::new());

        assert_eq!(check.first, None);
        assert_eq!(
            check.errors.keys().collect::<Vec<_>>(),
            vec!["The following headers are required: username, password, role_id"]
        );
    }
}
