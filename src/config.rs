// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Session Configuration
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Options accepted by a web scan session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebscanOptions {
    /// Raw targets: absolute URLs or bare host:port pairs.
    #[serde(default)]
    pub target: Vec<String>,

    /// Pre-seeded URL -> fingerprint entries that skip the passive pass
    /// entirely (non-HTTP services identified elsewhere, e.g. mysql://).
    #[serde(default)]
    pub tcp_target: HashMap<String, Vec<String>>,

    /// Worker pool width for the passive and active passes.
    #[serde(default = "default_thread")]
    pub thread: usize,

    /// Capture a screenshot of each alive http(s) target.
    #[serde(default)]
    pub screenshot: bool,

    /// Run the active fingerprint pass after the passive pass.
    #[serde(default)]
    pub deep_scan: bool,

    /// Anchor active probes at scheme://host instead of the full target URL.
    #[serde(default)]
    pub root_path: bool,

    /// Extra request headers, one "Key: Value" pair per line.
    #[serde(default)]
    pub custom_headers: String,

    /// Tag every alive target with "Generate-Log4j2" so the template pass
    /// picks up log4j2 checks.
    #[serde(default)]
    pub generate_log4j2: bool,

    /// Outbound proxy for every HTTP client in the session.
    #[serde(default)]
    pub proxy_url: String,
}

fn default_thread() -> usize {
    50
}

impl Default for WebscanOptions {
    fn default() -> Self {
        Self {
            target: Vec::new(),
            tcp_target: HashMap::new(),
            thread: default_thread(),
            screenshot: false,
            deep_scan: false,
            root_path: false,
            custom_headers: String::new(),
            generate_log4j2: false,
            proxy_url: String::new(),
        }
    }
}

/// Parse "Key: Value" lines into a header map. Lines without a colon and
/// empty lines are ignored.
pub fn parse_custom_headers(raw: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                headers.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    headers
}

/// Flatten a header map back into "Key: Value" strings for collaborators
/// that take header lists (the template engine contract).
pub fn headers_to_lines(headers: &HashMap<String, String>) -> Vec<String> {
    headers
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_custom_headers() {
        let parsed = parse_custom_headers("X-Forwarded-For: 127.0.0.1\nAuthorization: Bearer abc\n\nnot-a-header\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("X-Forwarded-For").unwrap(), "127.0.0.1");
        assert_eq!(parsed.get("Authorization").unwrap(), "Bearer abc");
    }

    #[test]
    fn test_parse_custom_headers_keeps_colons_in_value() {
        let parsed = parse_custom_headers("Referer: https://example.com/login");
        assert_eq!(parsed.get("Referer").unwrap(), "https://example.com/login");
    }

    #[test]
    fn test_default_thread_width() {
        let opts = WebscanOptions::default();
        assert_eq!(opts.thread, 50);
        assert!(!opts.deep_scan);
    }
}
