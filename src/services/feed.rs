//! Resilient HTTP client shared by both upstream feed providers.
//!
//! Retries are reserved for network-class failures (timeout, DNS,
//! connection reset, 5xx). Auth rejections and rate limits fail on the
//! first attempt with a distinguishable error kind so callers can
//! short-circuit a whole batch instead of burning retries.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);
const BACKOFF_BASE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network failure after {attempts} attempts: {message}")]
    Network { attempts: u32, message: String },

    #[error("authentication rejected by provider (HTTP {status})")]
    Auth { status: u16 },

    #[error("rate limited by provider")]
    RateLimit,

    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl FeedError {
    /// Provider-level errors that should abort this provider's portion of
    /// the batch rather than be recorded against a single fixture.
    pub fn aborts_provider(&self) -> bool {
        matches!(self, FeedError::Auth { .. } | FeedError::RateLimit)
    }
}

/// How a provider authenticates. The secret never appears in logs; the
/// client appends it after building the loggable request summary.
pub enum FeedAuth {
    QueryParam { name: &'static str, key: String },
    Header { name: &'static str, key: String },
    None,
}

pub struct FeedClient {
    http: reqwest::Client,
    base_url: String,
    auth: FeedAuth,
}

impl FeedClient {
    pub fn new(base_url: String, auth: FeedAuth) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// GET `base_url + path` with `params`, deserializing the JSON body.
    /// Retries up to three times with exponential backoff on network-class
    /// failures only.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, FeedError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let mut headers = HeaderMap::new();

        // Redacted summary first, credentials attached after.
        let summary = format!(
            "{}?{}",
            url,
            query
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&")
        );

        match &self.auth {
            FeedAuth::QueryParam { name, key } => {
                query.push((name.to_string(), key.clone()));
            }
            FeedAuth::Header { name, key } => {
                let name = HeaderName::from_static(*name);
                let value = HeaderValue::from_str(key)
                    .map_err(|e| FeedError::Malformed(format!("bad credential header: {}", e)))?;
                headers.insert(name, value);
            }
            FeedAuth::None => {}
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            tracing::debug!("GET {} (attempt {})", summary, attempt);

            let result = self
                .http
                .get(&url)
                .query(&query)
                .headers(headers.clone())
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await;

            let response = match result {
                Ok(r) => r,
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(FeedError::Network {
                            attempts: attempt,
                            message: e.to_string(),
                        });
                    }
                    let wait = BACKOFF_BASE * 2u32.pow(attempt - 1);
                    tracing::warn!(
                        "GET {} failed ({}), retrying in {:?}",
                        summary, e, wait
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(FeedError::Auth { status: status.as_u16() });
            }
            if status.as_u16() == 429 {
                return Err(FeedError::RateLimit);
            }
            if status.is_server_error() {
                if attempt >= MAX_ATTEMPTS {
                    return Err(FeedError::Network {
                        attempts: attempt,
                        message: format!("HTTP {}", status),
                    });
                }
                let wait = BACKOFF_BASE * 2u32.pow(attempt - 1);
                tracing::warn!("GET {} returned {}, retrying in {:?}", summary, status, wait);
                tokio::time::sleep(wait).await;
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(FeedError::Malformed(format!("HTTP {}: {}", status, body)));
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| FeedError::Malformed(e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_rate_limit_abort_provider() {
        assert!(FeedError::Auth { status: 401 }.aborts_provider());
        assert!(FeedError::RateLimit.aborts_provider());
        assert!(!FeedError::Malformed("x".into()).aborts_provider());
        assert!(!FeedError::Network { attempts: 3, message: "t".into() }.aborts_provider());
    }
}
