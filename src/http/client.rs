//! HTTP client shared by the feed fetcher and the downloader.

use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::retry::{RetryPolicy, with_retry};
use crate::error::{DownloadError, FetchError};

/// HTTP client with token authentication and retry support.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
    fetch_timeout: Option<Duration>,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    /// Requests are attempted once and have no per-request timeout.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::single(),
            fetch_timeout: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bounds each metadata request (connect + headers + body).
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Performs a GET request and deserializes the JSON response.
    #[tracing::instrument(skip(self, token))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, token: Option<&str>) -> Result<T, FetchError> {
        debug!("GET JSON from {}...", url);

        with_retry(self.retry, "GET JSON", || async move {
            let mut request = authorize(self.client.get(url), token);
            if let Some(timeout) = self.fetch_timeout {
                request = request.timeout(timeout);
            }

            let response = request.send().await.map_err(FetchError::Network)?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::HttpStatus { status });
            }

            let body = response.bytes().await.map_err(FetchError::Network)?;
            serde_json::from_slice::<T>(&body).map_err(FetchError::Decode)
        })
        .await
    }

    /// Opens a streaming GET for a binary asset. Redirects are followed by the
    /// underlying client; the body is left unread for the caller.
    #[tracing::instrument(skip(self, token))]
    pub async fn open_download(&self, url: &str, token: Option<&str>) -> Result<Response, DownloadError> {
        debug!("Opening download stream from {}...", url);

        with_retry(self.retry, "Opening download", || async move {
            let request = authorize(self.client.get(url), token)
                .header(ACCEPT, "application/octet-stream");

            let response = request.send().await.map_err(DownloadError::Network)?;

            let status = response.status();
            if !status.is_success() {
                return Err(DownloadError::HttpStatus { status });
            }

            Ok(response)
        })
        .await
    }
}

/// Attaches `Authorization: token <token>` when a non-empty token is given.
fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return request;
    };

    match HeaderValue::from_str(&format!("token {}", token)) {
        Ok(mut value) => {
            value.set_sensitive(true);
            debug!("Using token for authentication: {}", mask_token(token));
            request.header(AUTHORIZATION, value)
        }
        Err(_) => {
            warn!("Ignoring token containing characters not allowed in a header");
            request
        }
    }
}

/// Renders a token for logs without revealing it.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct TestResponse {
        name: String,
        value: i32,
    }

    #[tokio::test]
    async fn test_get_json_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "test", "value": 42}"#)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result: TestResponse = client.get_json(&format!("{}/test", url), None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.name, "test");
        assert_eq!(result.value, 42);
    }

    #[tokio::test]
    async fn test_get_json_sends_token_header() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test")
            .match_header("authorization", "token secret-token")
            .with_status(200)
            .with_body(r#"{"name": "auth", "value": 1}"#)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result: TestResponse = client
            .get_json(&format!("{}/test", url), Some("secret-token"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.name, "auth");
    }

    #[tokio::test]
    async fn test_get_json_empty_token_sends_no_header() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"name": "anon", "value": 0}"#)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result: TestResponse = client.get_json(&format!("{}/test", url), Some("")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.name, "anon");
    }

    #[tokio::test]
    async fn test_get_json_not_found() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result: Result<serde_json::Value, _> = client.get_json(&format!("{}/test", url), None).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_get_json_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result: Result<serde_json::Value, _> = client.get_json(&format!("{}/test", url), None).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_get_json_connection_refused() {
        let client = HttpClient::new(Client::new());
        let result: Result<serde_json::Value, _> = client.get_json("http://127.0.0.1:1/feed", None).await;

        assert!(matches!(result, Err(FetchError::Network(_))));
    }

    #[tokio::test]
    async fn test_get_json_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new()).with_retry_policy(RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        });
        let result: Result<serde_json::Value, _> = client.get_json(&format!("{}/test", url), None).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(FetchError::HttpStatus { .. })));
    }

    #[tokio::test]
    async fn test_get_json_does_not_retry_client_errors() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/test")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new()).with_retry_policy(RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        });
        let result: Result<serde_json::Value, _> = client.get_json(&format!("{}/test", url), None).await;

        mock.assert_async().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_json_times_out_on_stalled_body() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _mock = server
            .mock("GET", "/slow")
            .with_status(200)
            .with_chunked_body(|w: &mut dyn std::io::Write| {
                std::thread::sleep(Duration::from_millis(500));
                w.write_all(b"{}")
            })
            .create_async()
            .await;

        let client = HttpClient::new(Client::new()).with_fetch_timeout(Duration::from_millis(50));
        let result: Result<serde_json::Value, _> = client.get_json(&format!("{}/slow", url), None).await;

        match result {
            Err(FetchError::Network(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_download_sends_accept_header() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/asset")
            .match_header("accept", "application/octet-stream")
            .match_header("authorization", "token abc")
            .with_status(200)
            .with_body("binary")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let response = client
            .open_download(&format!("{}/asset", url), Some("abc"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content_length(), Some(6));
    }

    #[tokio::test]
    async fn test_open_download_http_error() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/asset")
            .with_status(403)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new());
        let result = client.open_download(&format!("{}/asset", url), None).await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(DownloadError::HttpStatus { status }) if status == reqwest::StatusCode::FORBIDDEN
        ));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("ghp_1234567890abcd"), "ghp_****abcd");
        assert_eq!(mask_token("short"), "*****");
    }
}
