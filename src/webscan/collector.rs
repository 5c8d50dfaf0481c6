// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Target Observation Collector
 * Runs the full probing sequence for one passive-scan target: redirect
 * header capture, body harvest, favicon hashing, Shiro cookie echo,
 * JS-redirect follow, TLS/WAF lookups, fingerprint matching
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use reqwest::Method;
use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use super::{tls, waf, FingerScanner};
use crate::fingerprint::matcher::{evaluate, WebInfo};
use crate::http_client::{host_with_port, url_port};
use crate::types::{Detect, InfoResult};

/// Fingerprint matching never looks past the first 100 KiB of a body.
pub const MAX_INFO_RESPONSE_SIZE: usize = 1024 * 100;

/// Unicode-escaped Fastjson autotype probe; the escapes dodge naive WAF
/// keyword filters.
const FASTJSON_PAYLOAD: &str =
    r#"{"\u+040\u+074\u+079\u+070\u+065":"java.lang.AutoCloseabl\u+065""#;

static JS_REDIRECT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)window\.location(?:\.href)?\s*=\s*['"]([^'"]+)['"]"#,
        r#"(?i)window\.location\.replace\(\s*['"]([^'"]+)['"]\s*\)"#,
        r#"(?i)top\.location(?:\.href)?\s*=\s*['"]([^'"]+)['"]"#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static TITLE_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok());

impl FingerScanner {
    /// Observe one target. Returns the result to publish and whether the
    /// target counts as alive for the active pass.
    pub(crate) async fn observe_target(&self, u: &Url) -> (InfoResult, bool) {
        let target = u.as_str();

        // Unfollowed probe first: a 302 leaks pre-redirect fingerprint
        // headers, a 422 is the CDN-blocked signal.
        let mut pre_headers = String::new();
        match self
            .not_follow_client
            .request(Method::GET, target, &self.headers, None, 10)
            .await
        {
            Ok(resp) if resp.status_code == 422 => {
                return (
                    InfoResult::unreachable(&self.task_id, target, u.scheme(), 422),
                    false,
                );
            }
            Ok(resp) if resp.status_code == 302 => {
                pre_headers = resp.raw_headers;
            }
            _ => {}
        }

        let (status_code, mut raw_headers, body, full_length, server, content_type) = match self
            .client
            .request(Method::GET, target, &self.headers, None, 10)
            .await
        {
            Ok(resp) => {
                let body = resp.body_limited(MAX_INFO_RESPONSE_SIZE).to_vec();
                (
                    resp.status_code,
                    format!("{}{}", pre_headers, resp.raw_headers),
                    body,
                    resp.body.len(),
                    resp.header("server").unwrap_or_default().to_string(),
                    resp.header("content-type").unwrap_or_default().to_string(),
                )
            }
            Err(err) => {
                if pre_headers.is_empty() {
                    debug!("{} unreachable: {}", target, err);
                    return (
                        InfoResult::unreachable(&self.task_id, target, u.scheme(), 0),
                        false,
                    );
                }
                // The redirect target is dead but the 302 itself carried
                // headers worth matching.
                debug!("{} errored after 302, matching on redirect headers", target);
                (302, pre_headers, Vec::new(), 0, String::new(), String::new())
            }
        };

        let (icon_hash, icon_md5) =
            super::favicon::favicon_hash(u, &self.headers, &self.client).await;

        raw_headers.push_str(&format!("Set-Cookie: {}", self.shiro_scan(u).await));

        let mut body = body;
        if let Some(redirect_body) = self.js_redirect_response(u, &body).await {
            // The pre-redirect page often holds the only fingerprintable
            // markup, so the second hop is appended, not substituted.
            body.extend_from_slice(&redirect_body);
        }

        let title = extract_title(&body);

        let web = WebInfo {
            protocol: u.scheme().to_string(),
            port: url_port(u),
            path: u.path().to_lowercase(),
            title: title.to_lowercase(),
            status_code,
            content_length: full_length,
            icon_hash,
            icon_md5,
            body_string: String::from_utf8_lossy(&body).to_lowercase(),
            header_string: raw_headers.to_lowercase(),
            content_type: content_type.to_lowercase(),
            server: server.to_lowercase(),
            cert: tls::cert_summary(u.scheme(), u.host_str().unwrap_or_default(), url_port(u), 5)
                .await,
            banner: String::new(),
        };

        let waf_info =
            waf::resolve_and_identify(u.host_str().unwrap_or_default(), &self.dns_servers).await;

        let mut fingerprints = evaluate(&self.web_db, &web);

        if self.generate_log4j2 {
            fingerprints.push("Generate-Log4j2".to_string());
        }

        if self.fastjson_scan(u).await {
            fingerprints.push("Fastjson".to_string());
        }

        let fingerprints = self.honeypot.apply(&web.header_string, fingerprints);

        let mut screenshot = String::new();
        if self.screenshot && (u.scheme() == "http" || u.scheme() == "https") {
            if let Some(shooter) = &self.screenshotter {
                match shooter.capture(target) {
                    Ok(path) => screenshot = path,
                    Err(err) => debug!("screenshot failed for {}: {}", target, err),
                }
            }
        }

        let result = InfoResult {
            task_id: self.task_id.clone(),
            url: target.to_string(),
            scheme: u.scheme().to_string(),
            host: host_with_port(u),
            port: web.port,
            status_code: web.status_code,
            length: web.content_length,
            title,
            fingerprints,
            is_waf: waf_info.exists,
            waf: waf_info.name,
            detect: Detect::Default,
            screenshot,
        };

        (result, true)
    }

    /// Elicit a Set-Cookie echo with the Shiro rememberMe cookie pattern.
    pub(crate) async fn shiro_scan(&self, u: &Url) -> String {
        let session_id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let mut headers = self.headers.clone();
        headers.insert(
            "Cookie".to_string(),
            format!("JSESSIONID={};rememberMe=123", session_id),
        );
        match self
            .client
            .request(Method::GET, u.as_str(), &headers, None, 10)
            .await
        {
            Ok(resp) => resp.header("set-cookie").unwrap_or_default().to_string(),
            Err(_) => String::new(),
        }
    }

    /// POST the autotype probe; Fastjson leaks its version in the error.
    pub(crate) async fn fastjson_scan(&self, u: &Url) -> bool {
        let mut headers = self.headers.clone();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        match self
            .client
            .request(
                Method::POST,
                u.as_str(),
                &headers,
                Some(FASTJSON_PAYLOAD.to_string()),
                10,
            )
            .await
        {
            Ok(resp) => resp.body_text().contains("fastjson-version"),
            Err(_) => false,
        }
    }

    /// Follow a single JS redirect hop and return its body.
    pub(crate) async fn js_redirect_response(&self, u: &Url, body: &[u8]) -> Option<Vec<u8>> {
        let body = String::from_utf8_lossy(body);
        let new_path = check_js_redirect(&body)?;
        // The IE-compat shim page carries no fingerprint value.
        if new_path.is_empty() || new_path == "/html/ie.html" {
            return None;
        }

        let new_path = new_path.trim().trim_matches('\'').trim_matches('"');
        let host = host_with_port(u);
        let next_url = if new_path.starts_with("http://") || new_path.starts_with("https://") {
            // Absolute redirects are only followed on the same host.
            if new_path.contains(&host) {
                new_path.to_string()
            } else {
                return None;
            }
        } else if let Some(rest) = new_path.strip_prefix("//") {
            format!("{}://{}", u.scheme(), rest)
        } else {
            let rel = new_path.trim_start_matches('/');
            format!("{}://{}/{}", u.scheme(), host, rel)
        };

        match self
            .client
            .request(Method::GET, &next_url, &self.headers, None, 10)
            .await
        {
            Ok(resp) => Some(resp.body),
            Err(_) => None,
        }
    }
}

/// Extract the redirect target from a JS location assignment.
pub(crate) fn check_js_redirect(body: &str) -> Option<String> {
    for pattern in JS_REDIRECT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(body) {
            if let Some(m) = caps.get(1) {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}

/// Lenient `<title>` extraction: DOM parse first, regex fallback for
/// markup too broken to build a head.
pub(crate) fn extract_title(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if let Ok(selector) = Selector::parse("title") {
        let document = Html::parse_document(&text);
        if let Some(el) = document.select(&selector).next() {
            let title = el.text().collect::<String>().trim().to_string();
            if !title.is_empty() {
                return title;
            }
        }
    }
    if let Some(re) = TITLE_RE.as_ref() {
        if let Some(caps) = re.captures(&text) {
            if let Some(m) = caps.get(1) {
                return m.as_str().trim().to_string();
            }
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_js_redirect_variants() {
        assert_eq!(
            check_js_redirect("<script>window.location='/app'</script>"),
            Some("/app".to_string())
        );
        assert_eq!(
            check_js_redirect(r#"window.location.href = "/portal/index""#),
            Some("/portal/index".to_string())
        );
        assert_eq!(
            check_js_redirect(r#"window.location.replace("/login")"#),
            Some("/login".to_string())
        );
        assert_eq!(
            check_js_redirect("top.location.href='/home'"),
            Some("/home".to_string())
        );
        assert_eq!(check_js_redirect("<p>no redirect here</p>"), None);
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title(b"<html><head><title> Admin Console </title></head></html>"),
            "Admin Console"
        );
        assert_eq!(
            extract_title(b"<TITLE>upper</TITLE>"),
            "upper"
        );
        assert_eq!(extract_title(b"<html><body>none</body></html>"), "");
    }

    #[test]
    fn test_fastjson_payload_keeps_unicode_escapes() {
        assert!(FASTJSON_PAYLOAD.contains(r"\u+040"));
        assert!(FASTJSON_PAYLOAD.contains("java.lang.AutoCloseabl"));
    }
}
