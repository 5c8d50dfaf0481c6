// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Passive Fingerprint Pass
 * Worker pool over the raw target list: one observation per target,
 * results drained to the observer through a bounded channel
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use super::FingerScanner;
use crate::observer::ProgressKind;
use crate::types::{CancelFlag, InfoResult};

impl FingerScanner {
    /// Run the passive pass. Every target yields exactly one published
    /// result (status 0 for unreachable, 422 for CDN-blocked). Alive
    /// targets land in `alive_urls` with their fingerprints merged.
    pub async fn finger_scan(self: &Arc<Self>, cancel: &CancelFlag) {
        let total = self.urls.len();
        if total == 0 {
            info!("FingerScan finished (no web targets)");
            return;
        }

        let (tx, mut rx) = mpsc::channel::<InfoResult>(total);

        let sink = self.sink.clone();
        let drainer = tokio::spawn(async move {
            let mut done = 0usize;
            while let Some(result) = rx.recv().await {
                done += 1;
                sink.progress(ProgressKind::FingerPassive, done, total);
                sink.passive_result(result);
            }
        });

        let next = Arc::new(AtomicUsize::new(0));
        let width = self.thread.min(total);
        let mut workers = Vec::with_capacity(width);
        for _ in 0..width {
            let scanner = Arc::clone(self);
            let next = Arc::clone(&next);
            let tx = tx.clone();
            let cancel = cancel.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    // Cancellation is cooperative: checked before claiming
                    // work, in-flight probes run to their own timeout.
                    if cancel.is_cancelled() {
                        return;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= scanner.urls.len() {
                        return;
                    }
                    let target = scanner.urls[index].clone();
                    let (result, alive) = scanner.observe_target(&target).await;
                    if alive {
                        scanner.record_alive(&target);
                        scanner.merge_fingerprints(target.as_str(), &result.fingerprints);
                    }
                    if tx.send(result).await.is_err() {
                        return;
                    }
                }
            }));
        }
        drop(tx);

        for worker in workers {
            let _ = worker.await;
        }
        let _ = drainer.await;
        info!("FingerScan finished");
    }
}
