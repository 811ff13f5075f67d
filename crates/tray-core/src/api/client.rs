use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::errors::ApiError;
use super::types::{LoginRequest, RawDashboard, RawGpu, RawJobs, RawLogin};
use super::{StatusSource, WorkerControl};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the backend admin API.
///
/// The bearer token lives in memory only and can be swapped at runtime
/// after re-authentication.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: RwLock<String>,
    token: RwLock<Option<String>>,
}

/// Trim trailing slashes and reject anything `reqwest` cannot parse.
fn checked_base_url(url: &str) -> Result<String, ApiError> {
    let base_url = url.trim().trim_end_matches('/').to_string();
    reqwest::Url::parse(&base_url).map_err(|e| ApiError::InvalidRequest {
        message: format!("invalid server URL '{}': {}", base_url, e),
    })?;
    Ok(base_url)
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base_url = checked_base_url(base_url)?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::InvalidRequest {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: RwLock::new(base_url),
            token: RwLock::new(token),
        })
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Point the client at another backend. The current URL is kept when
    /// `url` does not parse.
    pub fn set_base_url(&self, url: &str) -> Result<(), ApiError> {
        let url = checked_base_url(url)?;
        let mut guard = self.base_url.write().unwrap_or_else(|e| e.into_inner());
        *guard = url;
        Ok(())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url(), endpoint)
    }

    /// Exchange credentials for a bearer token via `POST /api/admin/login`.
    ///
    /// The token is returned, not installed; the caller decides when polling
    /// switches over to it. A non-2xx answer (401 included) is
    /// [`ApiError::LoginRejected`], never [`ApiError::AuthExpired`].
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        const ENDPOINT: &str = "/api/admin/login";

        debug!(event = "core.api.login_started", username = username);
        let res = self
            .http
            .post(self.url(ENDPOINT))
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| ApiError::Network {
                message: e.to_string(),
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let detail = error_detail(status, &text);
            warn!(
                event = "core.api.login_failed",
                status = status.as_u16(),
                detail = %detail
            );
            return Err(ApiError::LoginRejected { detail });
        }

        let body: RawLogin = res.json().await.map_err(|e| ApiError::Decode {
            endpoint: ENDPOINT.to_string(),
            message: e.to_string(),
        })?;
        if body.token.is_empty() {
            return Err(ApiError::Decode {
                endpoint: ENDPOINT.to_string(),
                message: "response carries no token".to_string(),
            });
        }

        debug!(event = "core.api.login_completed", username = username);
        Ok(body.token)
    }

    /// Replace the bearer token. `None` sends unauthenticated requests.
    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token;
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self
            .token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, endpoint: &str, builder: RequestBuilder) -> Result<Response, ApiError> {
        let res = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| ApiError::Network {
                message: e.to_string(),
            })?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(event = "core.api.auth_expired", endpoint = endpoint);
            return Err(ApiError::AuthExpired);
        }

        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let detail = error_detail(status, &text);
            debug!(
                event = "core.api.request_failed",
                endpoint = endpoint,
                status = status.as_u16(),
                detail = %detail
            );
            return Err(ApiError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(res)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let res = self.send(endpoint, self.http.get(self.url(endpoint))).await?;
        res.json::<T>().await.map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    async fn post_empty(&self, endpoint: &str) -> Result<(), ApiError> {
        self.send(endpoint, self.http.post(self.url(endpoint))).await?;
        Ok(())
    }
}

/// Message for a non-2xx response: the JSON `detail` field when present,
/// else the raw body, else `HTTP <status>`.
fn error_detail(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string));

    match from_json {
        Some(detail) if !detail.is_empty() => detail,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => format!("HTTP {}", status.as_u16()),
    }
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn dashboard(&self) -> Result<RawDashboard, ApiError> {
        self.get_json("/api/admin/dashboard").await
    }

    async fn gpu(&self) -> Result<RawGpu, ApiError> {
        self.get_json("/api/admin/gpu").await
    }

    async fn jobs(&self, limit: usize) -> Result<RawJobs, ApiError> {
        self.get_json(&format!("/api/admin/jobs?limit={}", limit))
            .await
    }
}

#[async_trait]
impl WorkerControl for ApiClient {
    async fn pause_worker(&self) -> Result<(), ApiError> {
        self.post_empty("/api/admin/worker/pause").await
    }

    async fn resume_worker(&self) -> Result<(), ApiError> {
        self.post_empty("/api/admin/worker/resume").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request text.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            request
        });
        (format!("http://{}", addr), handle)
    }

    /// Read headers, then as many body bytes as `Content-Length` announces.
    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    #[test]
    fn test_error_detail_prefers_json_detail() {
        assert_eq!(
            error_detail(StatusCode::CONFLICT, r#"{"detail": "Worker already paused"}"#),
            "Worker already paused"
        );
    }

    #[test]
    fn test_error_detail_falls_back_to_body_then_status() {
        assert_eq!(
            error_detail(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(error_detail(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        assert!(matches!(
            ApiClient::new("not a url", None),
            Err(ApiError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_set_base_url_keeps_old_value_on_error() {
        let client = ApiClient::new("http://localhost:8000", None).unwrap();
        assert!(client.set_base_url("::nope::").is_err());
        assert_eq!(client.base_url(), "http://localhost:8000");

        client.set_base_url("https://3dify.example.com/").unwrap();
        assert_eq!(client.base_url(), "https://3dify.example.com");
    }

    #[test]
    fn test_set_token() {
        let client = ApiClient::new("http://localhost:8000/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert!(!client.has_token());
        client.set_token(Some("abc".to_string()));
        assert!(client.has_token());
    }

    #[tokio::test]
    async fn test_dashboard_sends_bearer_token() {
        let (url, server) =
            serve_once("200 OK", r#"{"worker": {"connected": true}, "queue": {}}"#).await;
        let client = ApiClient::new(&url, Some("secret-token".to_string())).unwrap();

        let dashboard = client.dashboard().await.unwrap();
        assert_eq!(dashboard.worker.unwrap().connected, Some(true));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/admin/dashboard "));
        assert!(
            request
                .to_ascii_lowercase()
                .contains("authorization: bearer secret-token")
        );
    }

    #[tokio::test]
    async fn test_jobs_passes_limit() {
        let (url, server) = serve_once("200 OK", r#"{"jobs": []}"#).await;
        let client = ApiClient::new(&url, None).unwrap();

        let jobs = client.jobs(5).await.unwrap();
        assert!(jobs.jobs.is_empty());
        assert!(
            server
                .await
                .unwrap()
                .starts_with("GET /api/admin/jobs?limit=5 ")
        );
    }

    #[tokio::test]
    async fn test_401_maps_to_auth_expired() {
        let (url, _server) = serve_once("401 Unauthorized", "").await;
        let client = ApiClient::new(&url, Some("stale".to_string())).unwrap();

        let err = client.gpu().await.unwrap_err();
        assert!(err.is_auth_expired());
    }

    #[tokio::test]
    async fn test_pause_surfaces_detail() {
        let (url, server) =
            serve_once("409 Conflict", r#"{"detail": "No worker connected"}"#).await;
        let client = ApiClient::new(&url, None).unwrap();

        let err = client.pause_worker().await.unwrap_err();
        assert_eq!(err.to_string(), "No worker connected");
        assert!(
            server
                .await
                .unwrap()
                .starts_with("POST /api/admin/worker/pause ")
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(&format!("http://{}", addr), None).unwrap();
        let err = client.dashboard().await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));
    }

    #[tokio::test]
    async fn test_login_posts_credentials_and_returns_token() {
        let (url, server) = serve_once("200 OK", r#"{"token": "fresh-token"}"#).await;
        let client = ApiClient::new(&url, Some("stale".to_string())).unwrap();

        let token = client.login("admin", "hunter2").await.unwrap();
        assert_eq!(token, "fresh-token");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/admin/login "));
        assert!(request.contains(r#""username":"admin""#));
        assert!(request.contains(r#""password":"hunter2""#));
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_login_bad_credentials_is_rejected_not_expired() {
        let (url, _server) =
            serve_once("401 Unauthorized", r#"{"detail": "Invalid credentials"}"#).await;
        let client = ApiClient::new(&url, None).unwrap();

        let err = client.login("admin", "wrong").await.unwrap_err();
        assert!(!err.is_auth_expired());
        assert_eq!(err.to_string(), "Login failed: Invalid credentials");
    }

    #[tokio::test]
    async fn test_login_without_token_in_body_fails() {
        let (url, _server) = serve_once("200 OK", r#"{"user": "admin"}"#).await;
        let client = ApiClient::new(&url, None).unwrap();

        assert!(matches!(
            client.login("admin", "hunter2").await,
            Err(ApiError::Decode { .. })
        ));
    }
}
