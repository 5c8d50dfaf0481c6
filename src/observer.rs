// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Event Observer Contract
 * Frontends (CLI, GUI bridge) subscribe here; the scan passes publish.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use tracing::{error, info};

use crate::types::{InfoResult, VulnerabilityInfo};

/// Progress event kinds, one per pass counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    /// Passive fingerprint pass, one tick per target.
    FingerPassive,
    /// Total task count of the active pass, emitted once before it starts.
    ActiveCounts,
    /// Active pass, one tick per task whether executed or skipped.
    ActiveProgress,
    /// Vulnerability driver, one tick per target.
    NucleiProgress,
}

impl std::fmt::Display for ProgressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProgressKind::FingerPassive => "FingerPassive",
            ProgressKind::ActiveCounts => "ActiveCounts",
            ProgressKind::ActiveProgress => "ActiveProgress",
            ProgressKind::NucleiProgress => "NucleiProgress",
        };
        write!(f, "{}", name)
    }
}

/// Subscriber interface for scan output. Implementations must be cheap:
/// callbacks run on scan workers and drainer tasks.
pub trait EventSink: Send + Sync {
    fn passive_result(&self, result: InfoResult);
    fn active_result(&self, result: InfoResult);
    fn finding(&self, finding: VulnerabilityInfo);
    fn progress(&self, kind: ProgressKind, current: usize, total: usize);
    /// Fatal pass errors (engine init). Per-target errors never reach here.
    fn error(&self, message: String);
}

/// Default sink: structured logs, findings at info level.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn passive_result(&self, result: InfoResult) {
        info!(
            "[{}] {} [{}] {:?}",
            result.status_code, result.url, result.title, result.fingerprints
        );
    }

    fn active_result(&self, result: InfoResult) {
        info!(
            "[active] [{}] {} {:?}",
            result.status_code, result.url, result.fingerprints
        );
    }

    fn finding(&self, finding: VulnerabilityInfo) {
        info!(
            "[{}] [{}] {}",
            finding.id, finding.severity, finding.url
        );
    }

    fn progress(&self, kind: ProgressKind, current: usize, total: usize) {
        tracing::debug!("{} {}/{}", kind, current, total);
    }

    fn error(&self, message: String) {
        error!("{}", message);
    }
}
