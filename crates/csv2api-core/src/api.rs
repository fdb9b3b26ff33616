//! Remote capability contracts consumed by the reconciliation engine.
//!
//! The engine only sees [`RecordApi`]: one method per verb, selected through
//! [`Verb`](crate::strategy::Verb). [`IdentityApi`] serves the connectivity
//! check and is never touched by a reconciliation run.
//!
//! | Method | Expected status | Locator |
//! |--------|-----------------|---------|
//! | [`RecordApi::create`] | 201 | none |
//! | [`RecordApi::update`] | 200 | record key |
//! | [`RecordApi::replace`] | 200 | record key |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;

use crate::contract::EntityContract;
use crate::record::Record;

/// Status and parsed body of a remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// JSON body; non-JSON bodies are kept as a string, empty bodies as null.
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn from_text(status: u16, text: &str) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
        };
        Self { status, body }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Identifier the remote assigned to the entity, when the body carries one.
    pub fn remote_id(&self) -> Option<String> {
        match self.body.get("id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// A failed remote call.
///
/// `response` is `None` when no structured response exists: connection
/// failures, TLS errors and timeouts.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    response: Option<ApiResponse>,
    message: String,
}

impl ApiFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            response: None,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::transport(format!("no response within {}ms", after.as_millis()))
    }

    pub fn status(response: ApiResponse) -> Self {
        let message = format!("remote returned status {}", response.status);
        Self {
            response: Some(response),
            message,
        }
    }

    pub fn response(&self) -> Option<&ApiResponse> {
        self.response.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ApiFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiFailure {}

pub type ApiFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse, ApiFailure>> + Send + 'a>>;

/// Verb-per-method remote capability.
///
/// `change_of_authorization` is forwarded verbatim and asks the remote to
/// trigger downstream reauthorization of the affected entity.
pub trait RecordApi: Send + Sync {
    fn create<'a>(
        &'a self,
        contract: &'a EntityContract,
        record: &'a Record,
        change_of_authorization: bool,
    ) -> ApiFuture<'a>;

    fn update<'a>(
        &'a self,
        contract: &'a EntityContract,
        key: &'a str,
        record: &'a Record,
        change_of_authorization: bool,
    ) -> ApiFuture<'a>;

    fn replace<'a>(
        &'a self,
        contract: &'a EntityContract,
        key: &'a str,
        record: &'a Record,
        change_of_authorization: bool,
    ) -> ApiFuture<'a>;
}

/// Operator identity lookups used by the connectivity check.
pub trait IdentityApi: Send + Sync {
    fn me(&self) -> ApiFuture<'_>;

    fn privileges(&self) -> ApiFuture<'_>;
}
