// Property-based tests for record normalization.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, BTreeSet};

use csv2api_core::{coerce_bool, ExtraField, Normalizer, Record};
use proptest::prelude::*;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

const FIELDS: &[&str] = &[
    "mac",
    "username",
    "password",
    "role_id",
    "enabled",
    "visitor_name",
    "notes",
];

fn arb_field() -> impl Strategy<Value = String> {
    prop::sample::select(FIELDS).prop_map(str::to_owned)
}

/// Mostly plain text, sometimes a boolean spelling in odd case.
fn arb_value() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"[a-zA-Z0-9 _-]{0,12}",
        1 => prop::sample::select(&["1", "0", "TRUE", "yes", "On", "off", "no"][..])
            .prop_map(str::to_owned),
    ]
}

fn arb_row() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    prop::collection::btree_set(arb_field(), 1..=FIELDS.len())
        .prop_flat_map(|headers| {
            let len = headers.len();
            (
                Just(headers.into_iter().collect::<Vec<_>>()),
                prop::collection::vec(arb_value(), len),
            )
        })
}

fn arb_normalizer() -> impl Strategy<Value = Normalizer> {
    (
        prop::collection::btree_set(arb_field(), 0..3),
        prop::collection::btree_map(arb_field(), arb_value(), 0..3),
    )
        .prop_map(|(exclude, extra): (BTreeSet<String>, BTreeMap<String, String>)| {
            let extra = extra
                .into_iter()
                .map(|(key, value)| ExtraField { key, value });
            Normalizer::new().with_exclude(exclude).with_extra(extra)
        })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config())]

    #[test]
    fn normalizing_twice_changes_nothing(
        (headers, values) in arb_row(),
        normalizer in arb_normalizer(),
    ) {
        let once = normalizer.normalize(Record::from_row(headers, values));
        let twice = normalizer.normalize(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalized_fields_match_effective_headers(
        (headers, values) in arb_row(),
        normalizer in arb_normalizer(),
    ) {
        let effective = normalizer
            .effective_headers(&headers)
            .into_iter()
            .collect::<BTreeSet<_>>();
        let record = normalizer.normalize(Record::from_row(headers, values));
        let fields = record.field_names().map(str::to_owned).collect::<BTreeSet<_>>();
        prop_assert_eq!(fields, effective);
    }

    #[test]
    fn extra_fields_override_and_excluded_fields_vanish(
        (headers, values) in arb_row(),
        normalizer in arb_normalizer(),
    ) {
        let record = normalizer.normalize(Record::from_row(headers, values));

        for ExtraField { key, value } in normalizer.extra() {
            let expected = if key == "enabled" {
                Value::Bool(coerce_bool(value))
            } else {
                Value::String(value.clone())
            };
            prop_assert_eq!(record.get(key), Some(&expected));
        }
        for field in normalizer.excluded() {
            if !normalizer.extra().iter().any(|extra| extra.key == field) {
                prop_assert!(!record.contains(field));
            }
        }
    }

    #[test]
    fn enabled_is_always_a_boolean_after_normalization(value in arb_value()) {
        let record = Normalizer::new().normalize(Record::from_row(["enabled"], [value.clone()]));
        prop_assert_eq!(record.get("enabled"), Some(&Value::Bool(coerce_bool(&value))));
    }

    #[test]
    fn coercion_ignores_case(value in arb_value()) {
        prop_assert_eq!(coerce_bool(&value), coerce_bool(&value.to_ascii_uppercase()));
        prop_assert_eq!(
            coerce_bool(&value),
            ["1", "true", "yes", "on"].contains(&value.to_ascii_lowercase().as_str())
        );
    }
}
