// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Web Fingerprint Scanner
 * Per-session scan context shared by the passive and active passes
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod active;
pub mod collector;
pub mod favicon;
pub mod passive;
pub mod tls;
pub mod waf;

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

use crate::config::{parse_custom_headers, WebscanOptions};
use crate::errors::ScannerError;
use crate::fingerprint::honeypot::HoneypotPolicy;
use crate::fingerprint::{ActiveFingerprintEntry, FingerPEntity};
use crate::http_client::{check_protocol, HttpClient};
use crate::observer::EventSink;

/// External screenshot collaborator. Returns the stored image path.
pub trait Screenshotter: Send + Sync {
    fn capture(&self, url: &str) -> Result<String>;
}

/// One scan session: created per run, mutated by exactly one passive pass
/// and at most one active pass, then read-only for the vulnerability
/// driver. Nothing persists across sessions.
pub struct FingerScanner {
    pub(crate) task_id: String,
    pub(crate) urls: Vec<Url>,
    pub(crate) alive_urls: Mutex<Vec<Url>>,
    /// URL -> matched product names, union of both passes. Seeded from
    /// `tcp_target` entries that skip the passive pass entirely.
    pub(crate) url_fingerprints: RwLock<HashMap<String, Vec<String>>>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) thread: usize,
    pub(crate) screenshot: bool,
    pub(crate) deep_scan: bool,
    pub(crate) root_path: bool,
    pub(crate) generate_log4j2: bool,
    pub(crate) client: HttpClient,
    pub(crate) not_follow_client: HttpClient,
    pub(crate) honeypot: HoneypotPolicy,
    pub(crate) dns_servers: Vec<String>,
    pub(crate) web_db: Arc<Vec<FingerPEntity>>,
    pub(crate) active_db: Arc<Vec<ActiveFingerprintEntry>>,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) screenshotter: Option<Arc<dyn Screenshotter>>,
}

impl FingerScanner {
    /// Build a session from raw options. Scheme-less targets go through
    /// protocol promotion; targets that answer on neither scheme are
    /// skipped with a log. Fails only when nothing scannable remains.
    pub async fn new(
        task_id: &str,
        options: WebscanOptions,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ScannerError> {
        let client = HttpClient::new(true, &options.proxy_url)
            .map_err(|e| ScannerError::Configuration(e.to_string()))?;
        let not_follow_client = HttpClient::new(false, &options.proxy_url)
            .map_err(|e| ScannerError::Configuration(e.to_string()))?;

        let mut urls = Vec::with_capacity(options.target.len());
        let mut wait_checks = Vec::new();
        for raw in &options.target {
            let raw = raw.trim().trim_end_matches('/');
            if raw.is_empty() {
                continue;
            }
            if raw.contains("://") {
                match Url::parse(raw) {
                    Ok(u) => urls.push(u),
                    Err(err) => error!("skipping unparseable target {}: {}", raw, err),
                }
            } else {
                wait_checks.push(raw.to_string());
            }
        }

        if !wait_checks.is_empty() {
            info!(
                "{} target(s) missing a scheme, probing http/https",
                wait_checks.len()
            );
            for raw in wait_checks {
                match check_protocol(&raw, &client).await {
                    Ok(promoted) => match Url::parse(&promoted) {
                        Ok(u) => urls.push(u),
                        Err(err) => error!("skipping {}: {}", promoted, err),
                    },
                    Err(err) => warn!("skipping {}: {}", raw, err),
                }
            }
        }

        let mut url_fingerprints = HashMap::new();
        for (target, fingerprints) in options.tcp_target {
            if !fingerprints.is_empty() {
                url_fingerprints.insert(target, fingerprints);
            }
        }

        if urls.is_empty() && url_fingerprints.is_empty() {
            return Err(ScannerError::NoTargets);
        }

        Ok(Self {
            task_id: task_id.to_string(),
            urls,
            alive_urls: Mutex::new(Vec::new()),
            url_fingerprints: RwLock::new(url_fingerprints),
            headers: parse_custom_headers(&options.custom_headers),
            thread: options.thread.max(1),
            screenshot: options.screenshot,
            deep_scan: options.deep_scan,
            root_path: options.root_path,
            generate_log4j2: options.generate_log4j2,
            client,
            not_follow_client,
            honeypot: HoneypotPolicy::default(),
            dns_servers: waf::DEFAULT_DNS_SERVERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            web_db: Arc::new(crate::fingerprint::web_fingerprint_db().to_vec()),
            active_db: Arc::new(crate::fingerprint::active_fingerprint_db().to_vec()),
            sink,
            screenshotter: None,
        })
    }

    /// Override the embedded passive signature database.
    pub fn with_web_db(mut self, db: Vec<FingerPEntity>) -> Self {
        self.web_db = Arc::new(db);
        self
    }

    /// Override the embedded active signature database.
    pub fn with_active_db(mut self, db: Vec<ActiveFingerprintEntry>) -> Self {
        self.active_db = Arc::new(db);
        self
    }

    /// Override the honeypot heuristics.
    pub fn with_honeypot_policy(mut self, policy: HoneypotPolicy) -> Self {
        self.honeypot = policy;
        self
    }

    /// Override the DNS servers used for WAF identification.
    pub fn with_dns_servers(mut self, servers: Vec<String>) -> Self {
        self.dns_servers = servers;
        self
    }

    /// Attach the external screenshot collaborator.
    pub fn with_screenshotter(mut self, shooter: Arc<dyn Screenshotter>) -> Self {
        self.screenshotter = Some(shooter);
        self
    }

    pub fn deep_scan(&self) -> bool {
        self.deep_scan
    }

    pub fn alive_urls(&self) -> Vec<Url> {
        self.alive_urls.lock().clone()
    }

    /// Snapshot of the URL -> fingerprint map for the vulnerability driver.
    pub fn url_fingerprint_map(&self) -> HashMap<String, Vec<String>> {
        self.url_fingerprints.read().clone()
    }

    /// Record a URL as alive. Passive pass only.
    pub(crate) fn record_alive(&self, u: &Url) {
        self.alive_urls.lock().push(u.clone());
    }

    /// Merge fingerprints for a URL, keeping first-seen order, no dupes.
    pub(crate) fn merge_fingerprints(&self, url: &str, fingerprints: &[String]) {
        if fingerprints.is_empty() {
            return;
        }
        let mut map = self.url_fingerprints.write();
        let entry = map.entry(url.to_string()).or_default();
        for fp in fingerprints {
            if !entry.contains(fp) {
                entry.push(fp.clone());
            }
        }
    }
}
