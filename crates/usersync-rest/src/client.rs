//! Platform REST client
//!
//! Provides a thin authenticated HTTP client over the platform API. Every
//! call takes a server-relative path, sends and receives JSON, and maps
//! non-success statuses to [`RestError`] so adapters can classify them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use usersync_rest::RestClient;
//!
//! # async fn example() -> Result<(), usersync_rest::RestError> {
//! let client = RestClient::new("api-token");
//! let profile = client.get("/gdc/account/profile/current").await?;
//! println!("{profile}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::RestError;

/// Default server of the platform
pub const DEFAULT_BASE_URL: &str = "https://secure.gooddata.com";

/// Wait applied to a throttled call when the server gives no `Retry-After`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Number of retries of a throttled call
const MAX_RETRIES: u32 = 3;

/// HTTP client for platform API calls
///
/// Wraps `reqwest::Client` with the bearer token and base URL. Cloning is
/// cheap and shares the connection pool.
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    token: String,
}

impl RestClient {
    /// Creates a client for the default server
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Creates a client for a custom server (useful for testing)
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for `method` and `path`
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    pub async fn get(&self, path: &str) -> Result<Value, RestError> {
        self.execute(Method::GET, path, &[], None).await
    }

    /// GET with query parameters, encoded by the HTTP client
    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, RestError> {
        self.execute(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, RestError> {
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, RestError> {
        self.execute(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), RestError> {
        self.execute(Method::DELETE, path, &[], None).await.map(|_| ())
    }

    /// Sends a request, retrying throttled calls
    ///
    /// An empty response body reads as `Value::Null`.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, RestError> {
        for attempt in 0..=MAX_RETRIES {
            let mut request = self.request(method.clone(), path);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            debug!(method = %method, path, attempt, "Sending request");
            let response = request.send().await?;

            let status = response.status();
            if (status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE)
                && attempt < MAX_RETRIES
            {
                let retry_after = retry_after(&response);
                info!(
                    path,
                    attempt,
                    retry_after_ms = retry_after.as_millis(),
                    "Request throttled, backing off"
                );
                tokio::time::sleep(retry_after).await;
                continue;
            }

            let response = check_status(response, path).await?;
            let text = response.text().await?;
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text)
                .map_err(|e| RestError::InvalidResponse(format!("{path}: {e}")));
        }

        Err(RestError::ServerError(format!(
            "{path}: retry limit exhausted after {} attempts",
            MAX_RETRIES + 1
        )))
    }
}

/// Parses `Retry-After` as seconds, falling back to the default wait
fn retry_after(response: &Response) -> Duration {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Maps a non-success status to a [`RestError`]
async fn check_status(response: Response, path: &str) -> Result<Response, RestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .map(|m| format!("{path}: {m}"))
        .unwrap_or_else(|| path.to_string());
    warn!(status = status.as_u16(), path, "Request failed");

    Err(match status {
        StatusCode::UNAUTHORIZED => RestError::Unauthorized(message),
        StatusCode::FORBIDDEN => RestError::Forbidden(message),
        StatusCode::NOT_FOUND => RestError::NotFound(message),
        StatusCode::GONE => RestError::Gone(message),
        StatusCode::CONFLICT => RestError::Conflict(message),
        s if s.is_server_error() => RestError::ServerError(format!("{} {message}", s.as_u16())),
        s => RestError::InvalidResponse(format!("unexpected status {} for {message}", s.as_u16())),
    })
}

/// Extracts the message of a platform error body
///
/// Error bodies look like `{"error": {"message": "...", "parameters": [...]}}`
/// with `%s` placeholders filled from the parameters.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    let mut message = error.get("message")?.as_str()?.to_string();
    if let Some(parameters) = error.get("parameters").and_then(Value::as_array) {
        for parameter in parameters {
            let text = match parameter {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            message = message.replacen("%s", &text, 1);
        }
    }
    Some(message)
}
