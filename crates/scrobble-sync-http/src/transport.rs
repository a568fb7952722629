use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use scrobble_sync::RemoteError;
use serde::de::DeserializeOwned;

/// Per-request timeout applied to every call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay before the single retry of a server-side failure.
pub const RETRY_DELAY: Duration = Duration::from_secs(3);

const USER_AGENT: &str = "scrobble-sync";

/// Errors from a single HTTP exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response body: {0}")]
    Decode(String),

    /// The body was valid JSON but not the expected shape.
    #[error("unexpected response shape: {0}")]
    Validation(String),
}

impl From<TransportError> for RemoteError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Validation(msg) => RemoteError::Validation(msg),
            other => RemoteError::Transport(other.to_string()),
        }
    }
}

/// Constraints a decoded response must satisfy beyond its serde shape.
///
/// Every response type states its own constraints; there is no default.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Reject empty or whitespace-only strings.
pub(crate) fn non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}

/// HTTP client with a fixed timeout and a single retry on server errors.
///
/// Responses are decoded as JSON, deserialized into the expected type and
/// validated. Client errors, network failures and malformed bodies are
/// never retried.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    retry_delay: Duration,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_policy(REQUEST_TIMEOUT, RETRY_DELAY)
    }

    pub fn with_policy(timeout: Duration, retry_delay: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry_delay,
        })
    }

    /// Start building a request. Send it with [`HttpTransport::execute`].
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send a request and decode the response into `T`.
    pub async fn execute<T>(&self, request: RequestBuilder) -> Result<T, TransportError>
    where
        T: DeserializeOwned + Validate,
    {
        let retry = request.try_clone();
        let mut response = send(request).await?;

        if response.status().is_server_error()
            && let Some(retry) = retry
        {
            tracing::warn!(
                status = response.status().as_u16(),
                url = %response.url(),
                "server error, retrying once in {:?}",
                self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
            response = send(retry).await?;
        }

        decode(response).await
    }
}

async fn send(request: RequestBuilder) -> Result<Response, TransportError> {
    request.send().await.map_err(classify)
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

async fn decode<T>(response: Response) -> Result<T, TransportError>
where
    T: DeserializeOwned + Validate,
{
    let status = response.status();
    let body = response.text().await.map_err(classify)?;

    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let value: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
    let parsed: T =
        serde_json::from_value(value).map_err(|e| TransportError::Validation(e.to_string()))?;
    parsed.validate().map_err(TransportError::Validation)?;

    Ok(parsed)
}
