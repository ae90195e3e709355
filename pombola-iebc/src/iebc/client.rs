//! IEBC API client
//!
//! Authentication is two-step: an application key derived from the shared
//! secret buys a session token, and every data request is signed with a key
//! derived from that token. Responses may be split into pages; the client
//! merges them so callers always see the complete list.

use hmac::{Hmac, Mac};
use reqwest::Url;
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const USER_AGENT: &str = concat!("pombola-iebc/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 60;

type HmacSha256 = Hmac<Sha256>;

/// IEBC client errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API rejected the credentials or token")]
    InvalidToken,

    #[error("Token response did not contain a token")]
    MissingToken,

    #[error("Client used before authenticating")]
    NotAuthenticated,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Cache error: {0}")]
    CacheError(String),
}

/// Hex-encoded HMAC-SHA256 of `message` under `secret`
pub fn signing_key(secret: &str, message: &str) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::ParseError(format!("Invalid HMAC key: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("IEBC rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// IEBC API client
pub struct IebcClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    api_id: String,
    api_secret: String,
    token: Option<String>,
}

impl IebcClient {
    pub fn new(
        base_url: &str,
        api_id: String,
        api_secret: String,
        rate_limit_ms: u64,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(rate_limit_ms)),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_id,
            api_secret,
            token: None,
        })
    }

    /// Application key: HMAC of `appid=<id>` under the API secret
    pub fn application_key(&self) -> Result<String, ApiError> {
        signing_key(&self.api_secret, &format!("appid={}", self.api_id))
    }

    pub fn token_url(&self) -> Result<Url, ApiError> {
        let key = self.application_key()?;
        Url::parse_with_params(
            &format!("{}/token/", self.base_url),
            &[("appid", self.api_id.as_str()), ("key", key.as_str())],
        )
        .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    /// Signed URL for a data endpoint such as `/county/` or `/candidate/`
    pub fn data_url(
        &self,
        path: &str,
        filter: Option<(&str, &str)>,
        page: u32,
    ) -> Result<Url, ApiError> {
        let token = self.token.as_deref().ok_or(ApiError::NotAuthenticated)?;
        let key = signing_key(&self.api_secret, token)?;
        let page = page.to_string();

        let mut params: Vec<(&str, &str)> = vec![("token", token), ("key", key.as_str())];
        if let Some((name, value)) = filter {
            params.push((name, value));
        }
        params.push(("page", page.as_str()));

        Url::parse_with_params(&format!("{}{}", self.base_url, path), &params)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    /// Obtain a session token
    pub async fn authenticate(&mut self) -> Result<(), ApiError> {
        let url = self.token_url()?;
        let response = self.get_json(url).await?;

        let token = response
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingToken)?;

        tracing::info!("Authenticated with IEBC API");
        self.token = Some(token.to_string());
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Fetch every page of a data endpoint and merge them into one document
    pub async fn get_all_pages(
        &self,
        path: &str,
        filter: Option<(&str, &str)>,
    ) -> Result<Value, ApiError> {
        let mut merged = self.get_json(self.data_url(path, filter, 1)?).await?;
        let mut page = 1;
        let pages = page_count(&merged);

        while page < pages {
            page += 1;
            tracing::debug!(path = %path, page, pages, "Fetching next page");
            let next = self.get_json(self.data_url(path, filter, page)?).await?;
            merge_page(&mut merged, next)?;
        }

        if let Some(object) = merged.as_object_mut() {
            object.remove("pagination");
        }

        Ok(merged)
    }

    async fn get_json(&self, url: Url) -> Result<Value, ApiError> {
        self.rate_limiter.wait().await;

        tracing::debug!(path = %url.path(), "Querying IEBC API");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(ApiError::InvalidToken);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::ApiError(status.as_u16(), error_text));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::ParseError(e.to_string()))
    }
}

/// Total pages advertised by a response; 1 when unpaginated
fn page_count(value: &Value) -> u32 {
    value
        .get("pagination")
        .and_then(|p| p.get("pages"))
        .and_then(Value::as_u64)
        .map(|n| n.max(1) as u32)
        .unwrap_or(1)
}

/// The list a page contributes: area locations or candidate races
fn page_items_mut(value: &mut Value) -> Option<&mut Vec<Value>> {
    if value.pointer("/region/locations").is_some_and(Value::is_array) {
        return value.pointer_mut("/region/locations").and_then(Value::as_array_mut);
    }
    value.get_mut("candidates").and_then(Value::as_array_mut)
}

fn merge_page(merged: &mut Value, mut next: Value) -> Result<(), ApiError> {
    let items = page_items_mut(&mut next)
        .map(std::mem::take)
        .ok_or_else(|| ApiError::ParseError("page has no list to merge".to_string()))?;
    let target = page_items_mut(merged)
        .ok_or_else(|| ApiError::ParseError("first page has no list to merge into".to_string()))?;
    target.extend(items);
    Ok(())
}
