// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Shared test support: an event sink that records everything it sees.

use std::sync::Mutex;

use vainu_scanner::observer::{EventSink, ProgressKind};
use vainu_scanner::types::{InfoResult, VulnerabilityInfo};

#[derive(Default)]
pub struct CollectSink {
    pub passive: Mutex<Vec<InfoResult>>,
    pub active: Mutex<Vec<InfoResult>>,
    pub findings: Mutex<Vec<VulnerabilityInfo>>,
    pub progress: Mutex<Vec<(String, usize, usize)>>,
    pub errors: Mutex<Vec<String>>,
}

impl EventSink for CollectSink {
    fn passive_result(&self, result: InfoResult) {
        self.passive.lock().unwrap().push(result);
    }

    fn active_result(&self, result: InfoResult) {
        self.active.lock().unwrap().push(result);
    }

    fn finding(&self, finding: VulnerabilityInfo) {
        self.findings.lock().unwrap().push(finding);
    }

    fn progress(&self, kind: ProgressKind, current: usize, total: usize) {
        self.progress
            .lock()
            .unwrap()
            .push((kind.to_string(), current, total));
    }

    fn error(&self, message: String) {
        self.errors.lock().unwrap().push(message);
    }
}
