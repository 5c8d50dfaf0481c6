// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Active Fingerprint Pass
 * Probes fingerprint-specific paths on every alive URL with URL+path
 * dedup and a per-target transport-failure budget
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use parking_lot::Mutex;
use reqwest::Method;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;

use super::collector::extract_title;
use super::FingerScanner;
use crate::fingerprint::matcher::{evaluate, WebInfo};
use crate::http_client::{basic_url, host_with_port, url_port};
use crate::observer::ProgressKind;
use crate::types::{CancelFlag, Detect, InfoResult};

/// A base URL stops being probed after this many transport failures.
const ACTIVE_TIMEOUT_LIMIT: usize = 15;

/// One active probe: alive URL x signature entry x path.
#[derive(Clone)]
struct ActiveTask {
    url: Url,
    entry_index: usize,
    path: String,
}

impl FingerScanner {
    /// Run the active pass over the passive pass survivors.
    pub async fn active_finger_scan(self: &Arc<Self>, cancel: &CancelFlag) {
        let alive = self.alive_urls();
        if alive.is_empty() {
            warn!("No surviving target found, active fingerprint scanning has been skipped");
            return;
        }
        info!("Active fingerprint detection in progress");

        let mut tasks = Vec::new();
        for target in &alive {
            for (entry_index, entry) in self.active_db.iter().enumerate() {
                for path in &entry.path {
                    tasks.push(ActiveTask {
                        url: target.clone(),
                        entry_index,
                        path: path.clone(),
                    });
                }
            }
        }

        let total = tasks.len();
        self.sink.progress(ProgressKind::ActiveCounts, 0, total);

        let (tx, mut rx) = mpsc::channel::<InfoResult>(total.max(1));
        let sink = self.sink.clone();
        let drainer = tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                sink.active_result(result);
            }
        });

        let tasks = Arc::new(tasks);
        let next = Arc::new(AtomicUsize::new(0));
        let progress = Arc::new(AtomicUsize::new(0));
        // URL+path dedup and the per-base failure budget. The budget is
        // keyed on the base alone, so a target that burns its budget loses
        // every remaining path.
        let visited: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        let timeouts: Arc<Mutex<HashMap<String, usize>>> = Arc::new(Mutex::new(HashMap::new()));

        let width = self.thread.min(total.max(1));
        let mut workers = Vec::with_capacity(width);
        for _ in 0..width {
            let scanner = Arc::clone(self);
            let tasks = Arc::clone(&tasks);
            let next = Arc::clone(&next);
            let progress = Arc::clone(&progress);
            let visited = Arc::clone(&visited);
            let timeouts = Arc::clone(&timeouts);
            let tx = tx.clone();
            let cancel = cancel.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= tasks.len() {
                        return;
                    }
                    let task = &tasks[index];
                    scanner
                        .run_active_task(task, &visited, &timeouts, &tx)
                        .await;
                    let done = progress.fetch_add(1, Ordering::SeqCst) + 1;
                    scanner
                        .sink
                        .progress(ProgressKind::ActiveProgress, done, tasks.len());
                }
            }));
        }
        drop(tx);

        for worker in workers {
            let _ = worker.await;
        }
        let _ = drainer.await;
        info!("ActiveFingerScan finished");
    }

    async fn run_active_task(
        &self,
        task: &ActiveTask,
        visited: &Mutex<HashSet<String>>,
        timeouts: &Mutex<HashMap<String, usize>>,
        tx: &mpsc::Sender<InfoResult>,
    ) {
        // Each task resolves its own base so root-path reduction never
        // leaks across path iterations of the same URL.
        let base = if self.root_path {
            basic_url(task.url.as_str())
        } else {
            task.url.as_str().trim_end_matches('/').to_string()
        };
        let full_url = format!("{}{}", base, task.path);

        if let Some(count) = timeouts.lock().get(&base) {
            if *count >= ACTIVE_TIMEOUT_LIMIT {
                warn!(
                    "Target {} has reached the timeout limit, skipping active scan",
                    base
                );
                return;
            }
        }

        if !visited.lock().insert(full_url.clone()) {
            return;
        }

        let entry = &self.active_db[task.entry_index];
        let resp = match self
            .client
            .request(Method::GET, &full_url, &self.headers, None, 5)
            .await
        {
            Ok(resp) => resp,
            Err(_) => {
                *timeouts.lock().entry(base).or_insert(0) += 1;
                return;
            }
        };

        let title = extract_title(&resp.body);
        let web = WebInfo {
            protocol: task.url.scheme().to_string(),
            port: url_port(&task.url),
            path: task.path.to_lowercase(),
            title: title.to_lowercase(),
            status_code: resp.status_code,
            content_length: resp.body.len(),
            body_string: String::from_utf8_lossy(&resp.body).to_lowercase(),
            header_string: resp.raw_headers.to_lowercase(),
            content_type: resp
                .header("content-type")
                .unwrap_or_default()
                .to_lowercase(),
            server: resp.header("server").unwrap_or_default().to_lowercase(),
            ..WebInfo::default()
        };

        let result = evaluate(&entry.fpe, &web);

        // 404 pages are noise except for ThinkPHP, whose 404 page is
        // itself the signal.
        let keep = (!result.is_empty() && web.status_code != 404)
            || result.iter().any(|p| p == "ThinkPHP");
        if !keep {
            return;
        }

        self.merge_fingerprints(task.url.as_str(), &result);

        let product = entry
            .fpe
            .first()
            .map(|f| f.product_name.clone())
            .unwrap_or_default();
        let _ = tx
            .send(InfoResult {
                task_id: self.task_id.clone(),
                url: full_url,
                scheme: task.url.scheme().to_string(),
                host: host_with_port(&task.url),
                port: web.port,
                status_code: web.status_code,
                length: web.content_length,
                title,
                fingerprints: vec![product],
                is_waf: false,
                waf: String::new(),
                detect: Detect::Active,
                screenshot: String::new(),
            })
            .await;
    }
}
