use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;

use crate::api::{ApiFailure, ApiFuture, ApiResponse, IdentityApi, RecordApi};
use crate::contract::EntityContract;
use crate::http_client::{HttpAuth, HttpClient, HttpMethod, HttpRequest};
use crate::record::Record;
use crate::ValidationError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_PATH: &str = "/api/oauth";

/// How the client authenticates against the appliance.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-issued access token.
    Token(String),
    /// OAuth2 client credentials, exchanged for a token on first use.
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
}

impl Credentials {
    /// A token wins over client credentials. A leading `Bearer ` on the token
    /// (any case) is dropped.
    pub fn resolve(
        token: Option<&str>,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> Result<Self, ValidationError> {
        if let Some(token) = token.map(strip_bearer).filter(|token| !token.is_empty()) {
            return Ok(Self::Token(token.to_owned()));
        }

        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret))
                if !client_id.is_empty() && !client_secret.is_empty() =>
            {
                Ok(Self::ClientCredentials {
                    client_id: client_id.to_owned(),
                    client_secret: client_secret.to_owned(),
                })
            }
            _ => Err(ValidationError::MissingCredentials),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

fn strip_bearer(token: &str) -> &str {
    let token = token.trim();
    match token.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => token[7..].trim_start(),
        _ => token,
    }
}

/// Accepts `host`, `host:port` or a full `http(s)://` URL.
fn base_url(host: &str) -> Result<String, ValidationError> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(ValidationError::EmptyHost);
    }
    if host.starts_with("https://") || host.starts_with("http://") {
        Ok(host.to_owned())
    } else {
        Ok(format!("https://{host}"))
    }
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: String,
}

/// ClearPass REST API client.
pub struct ClearPassClient {
    base_url: String,
    credentials: Credentials,
    http_client: Arc<dyn HttpClient>,
    timeout: Duration,
    token: OnceCell<String>,
}

impl ClearPassClient {
    pub fn new(
        host: &str,
        credentials: Credentials,
        http_client: Arc<dyn HttpClient>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            base_url: base_url(host)?,
            credentials,
            http_client,
            timeout: DEFAULT_TIMEOUT,
            token: OnceCell::new(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, change_of_authorization: bool) -> String {
        if change_of_authorization {
            format!("{}{path}?change_of_authorization=true", self.base_url)
        } else {
            format!("{}{path}", self.base_url)
        }
    }

    fn entity_path(contract: &EntityContract, key: &str) -> String {
        format!(
            "/api/{}/{}/{}",
            contract.collection,
            contract.locator,
            urlencoding::encode(key)
        )
    }

    async fn access_token(&self) -> Result<&str, ApiFailure> {
        let token = self
            .token
            .get_or_try_init(|| async {
                match &self.credentials {
                    Credentials::Token(token) => Ok(token.clone()),
                    Credentials::ClientCredentials {
                        client_id,
                        client_secret,
                    } => self.fetch_token(client_id, client_secret).await,
                }
            })
            .await?;
        Ok(token.as_str())
    }

    async fn fetch_token(&self, client_id: &str, client_secret: &str) -> Result<String, ApiFailure> {
        tracing::debug!(client_id, "requesting access token");
        let body = json!({
            "grant_type": "client_credentials",
            "client_id": client_id,
            "client_secret": client_secret,
        });
        let request = HttpRequest::new(HttpMethod::Post, self.url(TOKEN_PATH, false))
            .with_header("accept", "application/json")
            .with_json(&body)
            .with_timeout(self.timeout);

        let response = self.send(request).await?;
        let payload = serde_json::from_value::<TokenPayload>(response.body).map_err(|error| {
            ApiFailure::transport(format!("token response missing access_token: {error}"))
        })?;
        Ok(payload.access_token)
    }

    async fn send(&self, request: HttpRequest) -> Result<ApiResponse, ApiFailure> {
        let method = request.method.as_str();
        // token responses carry credentials
        let log_body = !request.url.ends_with(TOKEN_PATH);
        tracing::debug!(method, url = %request.url, "sending request");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| {
                if error.timed_out() {
                    ApiFailure::timeout(self.timeout)
                } else {
                    ApiFailure::transport(error.message())
                }
            })?;
        let response = ApiResponse::from_text(response.status, &response.body);

        if log_body {
            tracing::debug!(method, status = response.status, body = %response.body, "received response");
        } else {
            tracing::debug!(method, status = response.status, "received response");
        }
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiFailure::status(response))
        }
    }

    async fn call(
        &self,
        method: HttpMethod,
        url: String,
        record: Option<&Record>,
    ) -> Result<ApiResponse, ApiFailure> {
        let token = self.access_token().await?;
        let mut request = HttpRequest::new(method, url)
            .with_header("accept", "application/json")
            .with_auth(&HttpAuth::BearerToken(token.to_owned()))
            .with_timeout(self.timeout);
        if let Some(record) = record {
            request = request.with_json(&record.clone().into_value());
        }
        self.send(request).await
    }
}

impl std::fmt::Debug for ClearPassClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClearPassClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RecordApi for ClearPassClient {
    fn create<'a>(
        &'a self,
        contract: &'a EntityContract,
        record: &'a Record,
        change_of_authorization: bool,
    ) -> ApiFuture<'a> {
        Box::pin(async move {
            let path = format!("/api/{}", contract.collection);
            let url = self.url(&path, change_of_authorization);
            self.call(HttpMethod::Post, url, Some(record)).await
        })
    }

    fn update<'a>(
        &'a self,
        contract: &'a EntityContract,
        key: &'a str,
        record: &'a Record,
        change_of_authorization: bool,
    ) -> ApiFuture<'a> {
        Box::pin(async move {
            let url = self.url(&Self::entity_path(contract, key), change_of_authorization);
            self.call(HttpMethod::Patch, url, Some(record)).await
        })
    }

    fn replace<'a>(
        &'a self,
        contract: &'a EntityContract,
        key: &'a str,
        record: &'a Record,
        change_of_authorization: bool,
    ) -> ApiFuture<'a> {
        Box::pin(async move {
            let url = self.url(&Self::entity_path(contract, key), change_of_authorization);
            self.call(HttpMethod::Put, url, Some(record)).await
        })
    }
}

impl IdentityApi for ClearPassClient {
    fn me(&self) -> ApiFuture<'_> {
        Box::pin(async move {
            let url = self.url("/api/oauth/me", false);
            self.call(HttpMethod::Get, url, None).await
        })
    }

    fn privileges(&self) -> ApiFuture<'_> {
        Box::pin(async move {
            let url = self.url("/api/oauth/privileges", false);
            self.call(HttpMethod::Get, url, None).await
        })
    }
}
