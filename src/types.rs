// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which pass produced an [`InfoResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Detect {
    Default,
    Active,
}

impl std::fmt::Display for Detect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Detect::Default => write!(f, "Default"),
            Detect::Active => write!(f, "Active"),
        }
    }
}

/// Per-target fingerprint result published to observers by both scan passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResult {
    pub task_id: String,
    pub url: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub status_code: u16,
    pub length: usize,
    pub title: String,
    pub fingerprints: Vec<String>,
    pub is_waf: bool,
    pub waf: String,
    pub detect: Detect,
    pub screenshot: String,
}

impl InfoResult {
    /// Minimal record for a target that produced no usable response.
    /// `status_code` 0 means transport failure, 422 means CDN block.
    pub fn unreachable(task_id: &str, url: &str, scheme: &str, status_code: u16) -> Self {
        Self {
            task_id: task_id.to_string(),
            url: url.to_string(),
            scheme: scheme.to_string(),
            host: String::new(),
            port: 0,
            status_code,
            length: 0,
            title: String::new(),
            fingerprints: Vec::new(),
            is_waf: false,
            waf: String::new(),
            detect: Detect::Default,
            screenshot: String::new(),
        }
    }
}

/// Normalized finding emitted by the vulnerability driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityInfo {
    pub task_id: String,
    pub id: String,
    pub name: String,
    pub description: String,
    pub reference: String,
    pub url: String,
    pub request: String,
    pub response: String,
    pub response_time: String,
    pub extract: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
}

/// WAF identification result for a host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WafInfo {
    pub exists: bool,
    pub name: String,
}

/// Cooperative cancellation flag shared across worker pools.
///
/// Workers poll before claiming new work; in-flight HTTP calls run to their
/// own timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}
