use crate::config::YouTrackConfig;
use crate::error::{AppError, Result};
use crate::search::{FetchError, FetchRequest, Issue, IssueFetcher};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const USER_AGENT: &str = concat!("youtrack-search/", env!("CARGO_PKG_VERSION"));

/// Mask a token for logs and error messages, keeping its last four characters
pub fn mask_token(token: &str) -> String {
    const SHOW: usize = 4;
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= SHOW {
        return "***".to_string();
    }
    let tail: String = chars[chars.len() - SHOW..].iter().collect();
    format!("***{}", tail)
}

/// HTTP client for the YouTrack issues endpoint
#[derive(Clone)]
pub struct YouTrackClient {
    client: Client,
    base_url: String,
    token: String,
    timeout_secs: u64,
    max_retries: u32,
    retry_delay: Duration,
}

impl YouTrackClient {
    /// Create a client for `base_url` (the `/api` root)
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_http_client(client, base_url, token, timeout_secs, max_retries))
    }

    /// Create a client from configuration, resolving the token and base URL
    pub fn from_config(config: &YouTrackConfig) -> Result<Self> {
        let token = config.resolve_token()?;
        let base_url = config.base_url(&token)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        if !config.verify_ssl {
            warn!(base_url = %base_url, "TLS certificate verification is disabled");
        }

        Ok(Self::with_http_client(
            client,
            base_url,
            token,
            config.timeout_secs,
            config.max_retries,
        )
        .with_retry_delay(Duration::from_millis(config.retry_delay_ms)))
    }

    fn with_http_client(
        client: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout_secs,
            max_retries,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Initial backoff; doubled after every retry
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of issues, retrying rate limits and server errors
    pub async fn get_issues(&self, request: &FetchRequest) -> std::result::Result<Vec<Issue>, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self.get_issues_once(request).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = self.retry_delay.saturating_mul(2u32.saturating_pow(attempt - 1));
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient YouTrack error, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                result => return result,
            }
        }
    }

    async fn get_issues_once(&self, request: &FetchRequest) -> std::result::Result<Vec<Issue>, FetchError> {
        let url = format!("{}/issues", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("query", request.query.clone()),
            ("$top", request.limit.to_string()),
            ("$skip", request.offset.to_string()),
        ];
        if let Some(order_by) = request.order_by() {
            params.push(("$orderBy", order_by));
        }
        let fields = request.fields.to_param();
        if !fields.is_empty() {
            params.push(("fields", fields));
        }

        debug!(url = %url, query = %request.query, limit = request.limit, offset = request.offset, "GET issues");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(format!(
                        "YouTrack request timed out after {} seconds",
                        self.timeout_secs
                    ))
                } else if e.is_connect() {
                    FetchError::Network(self.mask(&format!("Failed to connect to YouTrack: {}", e)))
                } else {
                    FetchError::Network(self.mask(&format!("YouTrack request failed: {}", e)))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            FetchError::Network(self.mask(&format!("Failed to read YouTrack response: {}", e)))
        })?;

        if !status.is_success() {
            return Err(self.status_error(status, &body));
        }

        parse_issues(&body)
    }

    fn status_error(&self, status: StatusCode, body: &str) -> FetchError {
        let message = self.mask(&if body.is_empty() {
            format!("API request failed with status {}", status.as_u16())
        } else {
            format!("API request failed with status {}: {}", status.as_u16(), body)
        });

        match status.as_u16() {
            400 => FetchError::Rejected(message),
            401 => FetchError::Authentication(message),
            403 => FetchError::PermissionDenied(message),
            404 => FetchError::NotFound(message),
            429 => FetchError::RateLimited(message),
            code @ 500..=599 => FetchError::Server {
                status: code,
                message,
            },
            _ => FetchError::Other(message),
        }
    }

    fn mask(&self, message: &str) -> String {
        if self.token.is_empty() {
            message.to_string()
        } else {
            message.replace(&self.token, &mask_token(&self.token))
        }
    }
}

fn parse_issues(body: &str) -> std::result::Result<Vec<Issue>, FetchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::InvalidResponse(format!("body is not JSON: {}", e)))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(issue) => Ok(issue),
                other => Err(FetchError::InvalidResponse(format!(
                    "expected an issue object, got {}",
                    other
                ))),
            })
            .collect(),
        other => Err(FetchError::InvalidResponse(format!(
            "expected a list of issues, got {}",
            other
        ))),
    }
}

#[async_trait]
impl IssueFetcher for YouTrackClient {
    async fn fetch(&self, request: &FetchRequest) -> std::result::Result<Vec<Issue>, FetchError> {
        self.get_issues(request).await
    }
}
