//! HTTP client for the survey backend.
//!
//! Thin reqwest wrapper around the endpoints the pipeline needs: the
//! route payload, image blobs for export, pothole removal, and the
//! login/register auth flow. Error bodies carry a JSON `detail` field;
//! when present it becomes the error message, otherwise the HTTP
//! status does.

use std::time::Duration;

use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Credentials;
use crate::error::{Result, RoadscanError};
use crate::session::RouteSource;
use crate::RawPoint;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const POOL_MAX_IDLE_PER_HOST: usize = 8;

/// Route payload as served by the backend.
#[derive(Debug, Deserialize)]
struct RoutePayload {
    #[serde(default)]
    points: Vec<RawPoint>,
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Error body shape used by the backend for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Authenticated client for one backend server.
pub struct RouteClient {
    client: Client,
    base_url: String,
    auth_header: String,
}

impl RouteClient {
    /// Create a client for `server` authenticating with `jwt`.
    pub fn new(server: &str, jwt: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: server.trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {}", jwt),
        })
    }

    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        Self::new(&credentials.server, &credentials.jwt)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange email/password for a JWT.
    pub async fn login(server: &str, email: &str, password: &str) -> Result<String> {
        let server = server.trim_end_matches('/');
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let resp = client
            .post(format!("{}/login", server))
            .json(&AuthRequest { email, password })
            .send()
            .await?;
        let resp = check(resp).await?;
        let token: TokenResponse = resp.json().await?;
        info!("logged in to {}", server);
        Ok(token.token)
    }

    /// Register a new account on `server`.
    pub async fn register(server: &str, email: &str, password: &str) -> Result<()> {
        let server = server.trim_end_matches('/');
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let resp = client
            .post(format!("{}/register", server))
            .json(&AuthRequest { email, password })
            .send()
            .await?;
        check(resp).await?;
        info!("registered account on {}", server);
        Ok(())
    }

    /// Fetch the full route payload.
    pub async fn fetch_route(&self) -> Result<Vec<RawPoint>> {
        let url = format!("{}/route", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", &self.auth_header)
            .send()
            .await?;
        let resp = check(resp).await?;
        let payload: RoutePayload = resp.json().await?;
        debug!("fetched route: {} points", payload.points.len());
        Ok(payload.points)
    }

    /// Fetch an image blob by its server-relative path.
    pub async fn fetch_image(&self, file_path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url, file_path.trim_start_matches('/'));
        let resp = self
            .client
            .get(&url)
            .header("Authorization", &self.auth_header)
            .send()
            .await?;
        let resp = check(resp).await?;
        let bytes = resp.bytes().await?;
        debug!("fetched image {} ({} bytes)", file_path, bytes.len());
        Ok(bytes.to_vec())
    }

    /// Mark the pothole at the given coordinates as removed.
    pub async fn delete_pothole(&self, lat: f64, lon: f64) -> Result<()> {
        let url = format!("{}/pothole/{}/{}", self.base_url, lat, lon);
        let resp = self
            .client
            .patch(&url)
            .header("Authorization", &self.auth_header)
            .send()
            .await?;
        check(resp).await?;
        info!("deleted pothole at {}, {}", lat, lon);
        Ok(())
    }
}

impl RouteSource for RouteClient {
    fn fetch_route(&self) -> impl std::future::Future<Output = Result<Vec<RawPoint>>> {
        RouteClient::fetch_route(self)
    }
}

/// Turn a non-2xx response into an error carrying the backend's
/// `detail` message when the body has one.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let code = status.as_u16();
    let detail = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail)
        .unwrap_or_else(|| format!("HTTP {}", status));
    Err(RoadscanError::http(Some(code), detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_payload_deserialization() {
        let json = r#"{
            "points": [
                {"lat": 30.7, "lon": 76.7, "isPothole": true, "filePath": "images/p1.jpg"},
                {"lat": 30.71, "lon": 76.71}
            ]
        }"#;
        let payload: RoutePayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.points.len(), 2);
        assert!(payload.points[0].is_pothole);
        assert_eq!(payload.points[0].file_path.as_deref(), Some("images/p1.jpg"));
        assert!(!payload.points[1].is_pothole);
    }

    #[test]
    fn test_route_payload_missing_points_defaults_empty() {
        let payload: RoutePayload = serde_json::from_str("{}").unwrap();
        assert!(payload.points.is_empty());
    }

    #[test]
    fn test_error_body_detail_optional() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "bad token"}"#).unwrap();
        assert_eq!(body.detail.as_deref(), Some("bad token"));

        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.detail.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = RouteClient::new("https://api.example.com/", "tok").unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_auth_request_serialization() {
        let req = AuthRequest {
            email: "a@b.c",
            password: "secret",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["email"], "a@b.c");
        assert_eq!(json["password"], "secret");
    }
}
