// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Recon HTTP Client
 * Shared reqwest wrapper for the fingerprint passes: follow/no-follow
 * variants, per-request timeouts, proxy support, raw header capture
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::errors::ScannerError;

/// Realistic browser User-Agent to avoid trivial blocks
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Connection pool settings shared by both client variants
const POOL_IDLE_PER_HOST: usize = 32;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Response snapshot consumed by the fingerprint matcher.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    /// Header block as it would appear on the wire, one "Key: Value" per line.
    pub raw_headers: String,
    pub body: Vec<u8>,
    /// Final URL after any client-side redirects.
    pub url: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|v| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First `max` bytes of the body; fingerprint matching never needs more.
    pub fn body_limited(&self, max: usize) -> &[u8] {
        &self.body[..self.body.len().min(max)]
    }
}

/// HTTP client handle shared across scan workers. Cheap to clone.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build a client. `follow_redirects` selects the redirect policy; the
    /// passive pass needs both variants to catch pre-redirect headers.
    pub fn new(follow_redirects: bool, proxy_url: &str) -> Result<Self> {
        let policy = if follow_redirects {
            reqwest::redirect::Policy::limited(5)
        } else {
            reqwest::redirect::Policy::none()
        };

        let mut builder = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(policy)
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(POOL_IDLE_PER_HOST)
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true);

        if !proxy_url.is_empty() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .with_context(|| format!("Invalid proxy URL: {}", proxy_url))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Issue one request with a per-call timeout. Transport failures map to
    /// [`ScannerError::Transport`] so callers can count them against the
    /// per-target budget.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<String>,
        timeout_secs: u64,
    ) -> Result<HttpResponse, ScannerError> {
        let mut header_map = HeaderMap::new();
        for (key, value) in headers {
            let name = match HeaderName::from_bytes(key.as_bytes()) {
                Ok(n) => n,
                Err(_) => continue,
            };
            if let Ok(v) = HeaderValue::from_str(value) {
                header_map.insert(name, v);
            }
        }

        let mut request = self
            .client
            .request(method, url)
            .headers(header_map)
            .timeout(Duration::from_secs(timeout_secs));
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|source| {
            debug!("request to {} failed: {}", url, source);
            ScannerError::Transport {
                url: url.to_string(),
                source,
            }
        })?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();

        let mut headers = HashMap::new();
        let mut raw_headers = String::new();
        for (key, value) in response.headers() {
            let value = value.to_str().unwrap_or_default();
            raw_headers.push_str(&format!("{}: {}\r\n", key, value));
            headers.insert(key.as_str().to_lowercase(), value.to_string());
        }

        let body = response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .unwrap_or_default();

        Ok(HttpResponse {
            status_code,
            headers,
            raw_headers,
            body,
            url: final_url,
        })
    }

    /// Convenience GET with no extra headers.
    pub async fn get(&self, url: &str, timeout_secs: u64) -> Result<HttpResponse, ScannerError> {
        self.request(Method::GET, url, &HashMap::new(), None, timeout_secs)
            .await
    }
}

/// Promote a scheme-less target by probing http then https and keeping the
/// first scheme that answers with any response.
pub async fn check_protocol(target: &str, client: &HttpClient) -> Result<String, ScannerError> {
    for scheme in ["http", "https"] {
        let candidate = format!("{}://{}", scheme, target);
        if client.get(&candidate, 10).await.is_ok() {
            return Ok(candidate);
        }
    }
    Err(ScannerError::Configuration(format!(
        "{} answers on neither http nor https",
        target
    )))
}

/// Reduce a URL to scheme://host(:port), dropping path, query and fragment.
/// Default ports are not re-appended.
pub fn basic_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(u) => {
            let mut out = format!("{}://{}", u.scheme(), u.host_str().unwrap_or_default());
            if let Some(port) = u.port() {
                out.push_str(&format!(":{}", port));
            }
            out
        }
        Err(_) => raw.to_string(),
    }
}

/// Effective port of a URL, filling in the scheme default.
pub fn url_port(u: &url::Url) -> u16 {
    u.port_or_known_default().unwrap_or(0)
}

/// host or host:port as it appeared in the target URL.
pub fn host_with_port(u: &url::Url) -> String {
    match u.port() {
        Some(port) => format!("{}:{}", u.host_str().unwrap_or_default(), port),
        None => u.host_str().unwrap_or_default().to_string(),
    }
}
