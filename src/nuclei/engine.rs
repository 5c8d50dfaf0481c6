// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Template Engine Contract
 * Interface consumed by the vulnerability driver; the engine itself is
 * an external collaborator (see executor.rs for the CLI-backed default)
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::ScannerError;

/// Raw per-finding event produced by a template engine run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultEvent {
    pub template_id: String,
    pub name: String,
    pub description: String,
    pub reference: Vec<String>,
    /// Exact location the template matched, when the engine reports one.
    pub matched: String,
    /// Target URL the event belongs to.
    pub url: String,
    pub request: String,
    pub response: String,
    /// OOB interaction payloads, for templates that fire out-of-band.
    pub interaction_raw_request: String,
    pub interaction_raw_response: String,
    pub response_time: String,
    pub extracted_results: Vec<String>,
    /// Protocol kind: http, network, dns, ...
    pub kind: String,
    pub severity: String,
}

/// Finding callback shared between driver and engine.
pub type ResultCallback = Arc<dyn Fn(ResultEvent) + Send + Sync>;

/// Engine construction / execution options.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub disable_update_check: bool,
    /// "Key: Value" header lines forwarded to every template request.
    pub headers: Vec<String>,
    /// Concrete template files to execute.
    pub templates: Vec<PathBuf>,
    pub proxy: Vec<String>,
    pub verbose_proxy: bool,
}

impl EngineOptions {
    pub fn disable_update_check(mut self) -> Self {
        self.disable_update_check = true;
        self
    }

    pub fn with_headers(mut self, headers: Vec<String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_templates_or_workflows(mut self, templates: Vec<PathBuf>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_proxy(mut self, proxy: Vec<String>, verbose: bool) -> Self {
        self.proxy = proxy;
        self.verbose_proxy = verbose;
        self
    }
}

/// One engine instance, used for a single target batch then dropped.
#[async_trait]
pub trait TemplateEngine: Send + Sync {
    /// Load targets; `probe_non_http` asks the engine to probe bare
    /// host:port targets for a usable scheme itself.
    fn load_targets(&mut self, targets: Vec<String>, probe_non_http: bool);

    /// Run every loaded template against every loaded target.
    async fn execute_with_callback(&mut self, callback: ResultCallback)
        -> Result<(), ScannerError>;
}

/// Shared engine reused across concurrent targets.
#[async_trait]
pub trait ThreadSafeTemplateEngine: Send + Sync {
    /// Install the callback invoked for every finding of every run.
    fn global_result_callback(&self, callback: ResultCallback);

    /// Execute one target batch with per-run options.
    async fn execute_with_opts(
        &self,
        targets: Vec<String>,
        options: EngineOptions,
    ) -> Result<(), ScannerError>;
}

/// Factory the driver uses so engine construction failures stay
/// distinguishable from execution failures.
pub trait EngineProvider: Send + Sync {
    fn new_engine(&self, options: EngineOptions) -> Result<Box<dyn TemplateEngine>, ScannerError>;
    fn new_thread_safe_engine(&self) -> Result<Arc<dyn ThreadSafeTemplateEngine>, ScannerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder_chain() {
        let opts = EngineOptions::default()
            .disable_update_check()
            .with_headers(vec!["X-Scan: vainu".into()])
            .with_templates_or_workflows(vec![PathBuf::from("/tmp/t.yaml")])
            .with_proxy(vec!["http://127.0.0.1:8080".into()], false);
        assert!(opts.disable_update_check);
        assert_eq!(opts.headers.len(), 1);
        assert_eq!(opts.templates.len(), 1);
        assert_eq!(opts.proxy.len(), 1);
        assert!(!opts.verbose_proxy);
    }
}
