//! Maps a failed remote call onto an [`OutcomeKind`].
//!
//! Rules are evaluated in order and the first match wins:
//!
//! | Failure | Outcome |
//! |---------|---------|
//! | no structured response | `remote_error` |
//! | 400, `title == "invalid_client"` | `remote_error` |
//! | 404, `title == "Not Found"` | `not_found_conflict` |
//! | 422, truthy `result.user_exists` | `exists_conflict` |
//! | 422, any other body | `remote_error` |
//! | anything else | `unknown_status` |

use serde_json::Value;

use crate::api::{ApiFailure, ApiResponse};
use crate::outcome::OutcomeKind;

/// Outcome kind plus a human-readable explanation pulled from the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: OutcomeKind,
    pub detail: String,
}

impl Classification {
    fn new(kind: OutcomeKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Never fails; every failure maps to exactly one kind.
pub fn classify(failure: &ApiFailure) -> Classification {
    let Some(response) = failure.response() else {
        return Classification::new(
            OutcomeKind::RemoteError,
            format!("Unknown error: {}", failure.message()),
        );
    };
    let body = &response.body;

    match response.status {
        400 if text(body, "title") == Some("invalid_client") => Classification::new(
            OutcomeKind::RemoteError,
            format!("Bad keys?: {}", text(body, "detail").unwrap_or_default()),
        ),
        404 if text(body, "title") == Some("Not Found") => Classification::new(
            OutcomeKind::NotFoundConflict,
            non_empty(text(body, "detail")).unwrap_or("Not found"),
        ),
        422 if is_truthy(body.pointer("/result/user_exists")) => Classification::new(
            OutcomeKind::ExistsConflict,
            non_empty(body.pointer("/result/message").and_then(Value::as_str))
                .unwrap_or("Already exists"),
        ),
        422 if !body.is_null() => {
            Classification::new(OutcomeKind::RemoteError, validation_detail(body))
        }
        _ => Classification::new(OutcomeKind::UnknownStatus, unknown_status(response)),
    }
}

fn text<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field).and_then(Value::as_str)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Loose truthiness: `false`, `0`, `""` and `null` are false.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

fn validation_detail(body: &Value) -> String {
    let detail = text(body, "detail").unwrap_or("Validation failed");
    match body.get("validation_messages") {
        Some(messages) if !messages.is_null() => format!("{detail} {messages}"),
        _ => detail.to_owned(),
    }
}

fn unknown_status(response: &ApiResponse) -> String {
    if response.body.is_null() {
        format!("Unknown status: {}", response.status)
    } else {
        format!("Unknown status: {} {}", response.status, response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn failure(status: u16, body: Value) -> ApiFailure {
        ApiFailure::status(ApiResponse::new(status, body))
    }

    #[test]
    fn transport_failures_are_remote_errors() {
        let classification = classify(&ApiFailure::transport("connection refused"));
        assert_eq!(classification.kind, OutcomeKind::RemoteError);
        assert_eq!(classification.detail, "Unknown error: connection refused");

        let classification = classify(&ApiFailure::timeout(Duration::from_secs(30)));
        assert_eq!(classification.kind, OutcomeKind::RemoteError);
    }

    #[test]
    fn invalid_client_is_a_remote_error() {
        let classification = classify(&failure(
            400,
            json!({ "title": "invalid_client", "detail": "Client secret mismatch" }),
        ));

        assert_eq!(classification.kind, OutcomeKind::RemoteError);
        assert_eq!(classification.detail, "Bad keys?: Client secret mismatch");
    }

    #[test]
    fn not_found_triggers_conflict() {
        let classification = classify(&failure(404, json!({ "title": "Not Found" })));

        assert_eq!(classification.kind, OutcomeKind::NotFoundConflict);
        assert_eq!(classification.detail, "Not found");
    }

    #[test]
    fn existing_user_is_an_exists_conflict() {
        let classification = classify(&failure(
            422,
            json!({ "result": { "user_exists": true, "message": "MAC already registered" } }),
        ));

        assert_eq!(classification.kind, OutcomeKind::ExistsConflict);
        assert_eq!(classification.detail, "MAC already registered");

        let classification = classify(&failure(422, json!({ "result": { "user_exists": 1 } })));
        assert_eq!(classification.kind, OutcomeKind::ExistsConflict);
        assert_eq!(classification.detail, "Already exists");
    }

    #[test]
    fn other_validation_bodies_are_remote_errors() {
        let classification = classify(&failure(
            422,
            json!({
                "detail": "Validation failed",
                "validation_messages": { "role_id": "Invalid role" },
                "result": { "user_exists": false }
            }),
        ));

        assert_eq!(classification.kind, OutcomeKind::RemoteError);
        assert!(classification.detail.starts_with("Validation failed"));
        assert!(classification.detail.contains("Invalid role"));
    }

    #[test]
    fn anything_else_is_unknown_status() {
        for (status, body) in [
            (500, json!({ "detail": "boom" })),
            (404, json!({ "title": "Gone" })),
            (400, json!({ "title": "bad_request" })),
            (422, Value::Null),
        ] {
            let classification = classify(&failure(status, body));
            assert_eq!(classification.kind, OutcomeKind::UnknownStatus, "status {status}");
            assert!(classification.detail.starts_with("Unknown status: "));
        }
    }
}
