//! Record normalization: field exclusion, field injection and boolean coercion.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde_json::Value;

use crate::record::Record;
use crate::ValidationError;

/// Fields that the remote API expects as JSON booleans.
pub const BOOLEAN_FIELDS: &[&str] = &["enabled"];

/// String encodings (compared case-insensitively) that coerce to `true`.
const TRUTHY: &[&str] = &["1", "true", "yes", "on"];

/// A fixed `key=value` override injected into every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraField {
    pub key: String,
    pub value: String,
}

impl FromStr for ExtraField {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let Some((key, value)) = raw.split_once('=') else {
            return Err(ValidationError::MalformedExtraField {
                value: raw.to_owned(),
            });
        };
        if key.is_empty() {
            return Err(ValidationError::MalformedExtraField {
                value: raw.to_owned(),
            });
        }
        if !key.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(ValidationError::InvalidExtraKey {
                key: key.to_owned(),
            });
        }

        Ok(Self {
            key: key.to_owned(),
            value: value.to_owned(),
        })
    }
}

impl Display for ExtraField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Applies the run's exclusion list and extra fields to raw records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalizer {
    exclude: BTreeSet<String>,
    /// Kept in the order given; injected fields follow that order.
    extra: Vec<ExtraField>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(
            fields
                .into_iter()
                .map(Into::into)
                .filter(|field: &String| !field.is_empty()),
        );
        self
    }

    /// Later entries for the same key win.
    pub fn with_extra<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = ExtraField>,
    {
        for field in fields {
            match self.extra.iter_mut().find(|existing| existing.key == field.key) {
                Some(existing) => existing.value = field.value,
                None => self.extra.push(field),
            }
        }
        self
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(String::as_str)
    }

    pub fn extra(&self) -> &[ExtraField] {
        &self.extra
    }

    /// Removes excluded fields, merges extra fields over the record and
    /// coerces [`BOOLEAN_FIELDS`]. Never fails; applying it twice is a no-op.
    pub fn normalize(&self, mut record: Record) -> Record {
        for field in &self.exclude {
            record.remove(field);
        }
        for field in &self.extra {
            record.insert(field.key.clone(), field.value.clone());
        }

        let fields = record.as_map_mut();
        for name in BOOLEAN_FIELDS {
            if let Some(Value::String(raw)) = fields.get(*name) {
                let coerced = coerce_bool(raw);
                fields.insert((*name).to_owned(), Value::Bool(coerced));
            }
        }

        record
    }

    /// Header names as the records will look after normalization.
    pub fn effective_headers<S: AsRef<str>>(&self, headers: &[S]) -> Vec<String> {
        let mut effective = headers
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.exclude.contains(*name))
            .map(str::to_owned)
            .collect::<Vec<_>>();
        for field in &self.extra {
            if !effective.contains(&field.key) {
                effective.push(field.key.clone());
            }
        }
        effective
    }
}

/// `"1"`, `"true"`, `"yes"` and `"on"` in any case are true; everything else is false.
pub fn coerce_bool(raw: &str) -> bool {
    let lowered = raw.to_ascii_lowercase();
    TRUTHY.contains(&lowered.as_str())
}
