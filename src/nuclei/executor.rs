// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Nuclei CLI Executor
 * Default template-engine implementation: drives the external nuclei
 * binary in JSONL mode and maps its output onto ResultEvent
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

use super::engine::{
    EngineOptions, EngineProvider, ResultCallback, ResultEvent, TemplateEngine,
    ThreadSafeTemplateEngine,
};
use crate::errors::ScannerError;

/// Nuclei binary locations accepted without a PATH search.
const ALLOWED_BINARY_PATHS: &[&str] = &[
    "nuclei",
    "/usr/bin/nuclei",
    "/usr/local/bin/nuclei",
    "/opt/nuclei/nuclei",
];

/// Engine provider backed by the nuclei CLI.
#[derive(Debug, Clone)]
pub struct NucleiCli {
    binary_path: String,
}

impl NucleiCli {
    pub fn new(binary_path: Option<String>) -> Self {
        let binary_path = match binary_path {
            Some(path) if ALLOWED_BINARY_PATHS.contains(&path.as_str()) => path,
            Some(path) => {
                warn!("nuclei binary path {} not allowed, using PATH lookup", path);
                "nuclei".to_string()
            }
            None => "nuclei".to_string(),
        };
        Self { binary_path }
    }

    /// Probe the binary so init failures surface before a scan starts.
    pub async fn check_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn run(
        &self,
        targets: &[String],
        options: &EngineOptions,
        callback: &ResultCallback,
    ) -> Result<(), ScannerError> {
        // Never fall through to the binary's bundled template set.
        if options.templates.is_empty() {
            return Err(ScannerError::EngineExecution {
                target: targets.join(","),
                reason: "no templates resolved".to_string(),
            });
        }

        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-jsonl").arg("-silent").arg("-nc");
        if options.disable_update_check {
            cmd.arg("-duc");
        }
        for target in targets {
            cmd.arg("-u").arg(target);
        }
        for template in &options.templates {
            cmd.arg("-t").arg(template);
        }
        for header in &options.headers {
            cmd.arg("-H").arg(header);
        }
        if let Some(proxy) = options.proxy.first() {
            cmd.arg("-proxy").arg(proxy);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = cmd.output().await.map_err(|err| {
            ScannerError::EngineExecution {
                target: targets.join(","),
                reason: format!("failed to spawn nuclei: {}", err),
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScannerError::EngineExecution {
                target: targets.join(","),
                reason: stderr.trim().to_string(),
            });
        }

        for line in stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<NucleiOutput>(line) {
                Ok(parsed) => callback(parsed.into_event()),
                Err(err) => debug!("unparseable nuclei output line: {} ({})", line, err),
            }
        }
        Ok(())
    }
}

impl EngineProvider for NucleiCli {
    fn new_engine(&self, options: EngineOptions) -> Result<Box<dyn TemplateEngine>, ScannerError> {
        if options.templates.is_empty() {
            return Err(ScannerError::EngineInit(
                "no templates resolved for engine".to_string(),
            ));
        }
        Ok(Box::new(NucleiCliEngine {
            cli: self.clone(),
            options,
            targets: Vec::new(),
        }))
    }

    fn new_thread_safe_engine(&self) -> Result<Arc<dyn ThreadSafeTemplateEngine>, ScannerError> {
        Ok(Arc::new(NucleiCliThreadSafeEngine {
            cli: self.clone(),
            callback: RwLock::new(None),
        }))
    }
}

/// Single-use engine: options fixed at construction, targets loaded once.
struct NucleiCliEngine {
    cli: NucleiCli,
    options: EngineOptions,
    targets: Vec<String>,
}

#[async_trait]
impl TemplateEngine for NucleiCliEngine {
    fn load_targets(&mut self, targets: Vec<String>, _probe_non_http: bool) {
        self.targets = targets;
    }

    async fn execute_with_callback(
        &mut self,
        callback: ResultCallback,
    ) -> Result<(), ScannerError> {
        self.cli.run(&self.targets, &self.options, &callback).await
    }
}

/// Shared engine: one global callback, per-run options.
struct NucleiCliThreadSafeEngine {
    cli: NucleiCli,
    callback: RwLock<Option<ResultCallback>>,
}

#[async_trait]
impl ThreadSafeTemplateEngine for NucleiCliThreadSafeEngine {
    fn global_result_callback(&self, callback: ResultCallback) {
        *self.callback.write() = Some(callback);
    }

    async fn execute_with_opts(
        &self,
        targets: Vec<String>,
        options: EngineOptions,
    ) -> Result<(), ScannerError> {
        let callback = match self.callback.read().clone() {
            Some(cb) => cb,
            None => Arc::new(|_event| {}),
        };
        self.cli.run(&targets, &options, &callback).await
    }
}

/// JSONL shape emitted by nuclei.
#[derive(Debug, Deserialize)]
struct NucleiOutput {
    #[serde(rename = "template-id", default)]
    template_id: Option<String>,
    info: NucleiInfo,
    #[serde(rename = "matched-at", default)]
    matched_at: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(rename = "extracted-results", default)]
    extracted_results: Option<Vec<String>>,
    #[serde(default)]
    request: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(rename = "response-time", default)]
    response_time: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    interaction: Option<NucleiInteraction>,
}

#[derive(Debug, Deserialize)]
struct NucleiInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    reference: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct NucleiInteraction {
    #[serde(rename = "raw-request", default)]
    raw_request: Option<String>,
    #[serde(rename = "raw-response", default)]
    raw_response: Option<String>,
}

impl NucleiOutput {
    fn into_event(self) -> ResultEvent {
        ResultEvent {
            template_id: self.template_id.unwrap_or_default(),
            name: self.info.name.unwrap_or_default(),
            description: self.info.description.unwrap_or_default(),
            reference: self.info.reference.unwrap_or_default(),
            matched: self.matched_at.unwrap_or_default(),
            url: self.host.unwrap_or_default(),
            request: self.request.unwrap_or_default(),
            response: self.response.unwrap_or_default(),
            interaction_raw_request: self
                .interaction
                .as_ref()
                .and_then(|i| i.raw_request.clone())
                .unwrap_or_default(),
            interaction_raw_response: self
                .interaction
                .as_ref()
                .and_then(|i| i.raw_response.clone())
                .unwrap_or_default(),
            response_time: self.response_time.unwrap_or_default(),
            extracted_results: self.extracted_results.unwrap_or_default(),
            kind: self.kind.unwrap_or_else(|| "http".to_string()),
            severity: self.info.severity.unwrap_or_else(|| "info".to_string()),
        }
    }
}
