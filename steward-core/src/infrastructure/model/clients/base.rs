//! Base HTTP client with shared logic

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::infrastructure::model::types::ModelError;

/// Phrases providers use when a prompt does not fit the context window.
const CONTEXT_MARKERS: &[&str] = &[
    "context_length_exceeded",
    "context length",
    "maximum context",
    "too many tokens",
    "prompt is too long",
];

/// Base HTTP client with shared functionality
#[derive(Clone)]
pub struct HttpClientBase {
    pub id: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub http: Client,
}

impl HttpClientBase {
    pub fn new(id: String, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            id,
            endpoint,
            api_key,
            http: Client::new(),
        }
    }

    /// Build URL from endpoint and path
    pub fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Post JSON, with bearer auth when `bearer` is set.
    pub async fn post_json<Req, Res>(&self, url: &str, body: &Req, bearer: bool) -> Result<Res, ModelError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let mut request = self.http.post(url).json(body);
        if bearer {
            let api_key = self.require_api_key()?;
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            debug!(model = self.id.as_str(), %status, "Provider returned error status");
            return Err(classify_status(&self.id, status, retry_after, &body));
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(&self.id, format!("undecodable body: {e}")))
    }

    fn require_api_key(&self) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ModelError::missing_api_key(&self.id))
    }

    fn transport_error(&self, error: reqwest::Error) -> ModelError {
        ModelError::Network {
            model: self.id.clone(),
            source: error,
        }
    }
}

/// Maps a non-success HTTP status onto the fallback chain's failure classes.
pub fn classify_status(
    model: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> ModelError {
    let lowered = body.to_lowercase();
    let mentions_context = CONTEXT_MARKERS.iter().any(|marker| lowered.contains(marker));

    match status {
        StatusCode::TOO_MANY_REQUESTS => ModelError::rate_limited(model, retry_after),
        StatusCode::PAYLOAD_TOO_LARGE => ModelError::context_too_long(model),
        StatusCode::BAD_REQUEST if mentions_context => ModelError::context_too_long(model),
        StatusCode::REQUEST_TIMEOUT => ModelError::unavailable(model, status.to_string()),
        status if status.is_server_error() => ModelError::unavailable(model, status.to_string()),
        status => ModelError::fatal(model, format!("{status}: {}", truncate(body, 200))),
    }
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
