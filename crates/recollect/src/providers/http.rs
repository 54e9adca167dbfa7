//! Shared JSON-over-HTTP client with retry
//!
//! Rate limiting (429) and transport failures are retried with exponential
//! backoff starting at one second. Any other non-success status is returned
//! immediately.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::providers::types::ProviderError;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct JsonClient {
    client: Client,
    max_attempts: u32,
    initial_backoff: Duration,
    bearer_token: Option<String>,
}

impl JsonClient {
    /// `max_attempts` counts the first request; zero is treated as one
    pub fn new(timeout_secs: u64, max_attempts: u32) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            initial_backoff: INITIAL_BACKOFF,
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: String) -> Self {
        self.bearer_token = Some(token);
        self
    }

    pub fn with_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    /// POST `body` as JSON and decode the JSON response
    pub async fn post_json<B, R>(&self, url: &Url, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("Calling provider at: {}", url);

        let mut last_error = None;
        let mut delay = self.initial_backoff;

        for attempt in 0..self.max_attempts {
            let mut request = self.client.post(url.clone()).json(body);
            if let Some(ref token) = self.bearer_token {
                request = request.header("Authorization", format!("Bearer {token}"));
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == 429 {
                        last_error = Some(format!("rate limited ({status})"));
                        if attempt + 1 < self.max_attempts {
                            warn!(
                                "Rate limited on attempt {}/{}, waiting {:?}",
                                attempt + 1,
                                self.max_attempts,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                            delay *= 2;
                        }
                        continue;
                    }

                    if !status.is_success() {
                        let body = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        return Err(ProviderError::Rejected {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    return response
                        .json::<R>()
                        .await
                        .map_err(|e| ProviderError::Parse(e.to_string()));
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    last_error = Some(err_msg.clone());
                    if attempt + 1 < self.max_attempts {
                        warn!(
                            "Request failed on attempt {}/{}, retrying: {}",
                            attempt + 1,
                            self.max_attempts,
                            err_msg
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(ProviderError::Unavailable(format!(
            "Failed after {} attempts: {}",
            self.max_attempts,
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }
}

/// Resolve `path` below `base_url`, keeping any path prefix the base carries
pub fn endpoint(base_url: &str, path: &str) -> Result<Url, ProviderError> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };

    let base = Url::parse(&normalized)
        .map_err(|e| ProviderError::Config(format!("Invalid URL '{base_url}': {e}")))?;

    let scheme = base.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ProviderError::Config(format!(
            "Unsupported URL scheme '{scheme}': only http and https are allowed"
        )));
    }

    base.join(path.trim_start_matches('/'))
        .map_err(|e| ProviderError::Config(format!("Invalid endpoint path '{path}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(attempts: u32) -> JsonClient {
        JsonClient::new(5, attempts)
            .unwrap()
            .with_backoff(Duration::from_millis(10))
    }

    #[test]
    fn test_endpoint_join() {
        let url = endpoint("http://localhost:11434", "api/generate").unwrap();
        assert_eq!(url.as_str(), "http://localhost:11434/api/generate");

        let url = endpoint("https://example.com/v1", "/chat/completions").unwrap();
        assert_eq!(url.as_str(), "https://example.com/v1/chat/completions");

        let url = endpoint("https://example.com/v1/", "chat/completions").unwrap();
        assert_eq!(url.as_str(), "https://example.com/v1/chat/completions");
    }

    #[test]
    fn test_endpoint_rejects_bad_scheme() {
        assert!(matches!(
            endpoint("ftp://example.com", "x"),
            Err(ProviderError::Config(_))
        ));
        assert!(matches!(
            endpoint("not a url", "x"),
            Err(ProviderError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_post_json_success_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = test_client(1).with_bearer_token("secret".to_string());
        let url = endpoint(&server.uri(), "echo").unwrap();
        let body: Value = client.post_json(&url, &json!({"a": 1})).await.unwrap();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_post_json_retries_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"n": 2})))
            .mount(&server)
            .await;

        let url = endpoint(&server.uri(), "x").unwrap();
        let body: Value = test_client(3).post_json(&url, &json!({})).await.unwrap();
        assert_eq!(body["n"], 2);
    }

    #[tokio::test]
    async fn test_post_json_rate_limit_exhausts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let url = endpoint(&server.uri(), "x").unwrap();
        let result: Result<Value, _> = test_client(2).post_json(&url, &json!({})).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_post_json_server_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .expect(1)
            .mount(&server)
            .await;

        let url = endpoint(&server.uri(), "x").unwrap();
        let result: Result<Value, _> = test_client(3).post_json(&url, &json!({})).await;
        match result {
            Err(ProviderError::Rejected { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "model crashed");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_post_json_unreachable() {
        // Nothing listens on port 9 on loopback in test environments
        let url = endpoint("http://127.0.0.1:9", "x").unwrap();
        let result: Result<Value, _> = test_client(2).post_json(&url, &json!({})).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_post_json_bad_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let url = endpoint(&server.uri(), "x").unwrap();
        let result: Result<Value, _> = test_client(1).post_json(&url, &json!({})).await;
        assert!(matches!(result, Err(ProviderError::Parse(_))));
    }
}
