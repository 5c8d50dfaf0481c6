// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Honeypot suspicion heuristics.
//!
//! Decoy services answer with canned stacks, so they either expose a
//! honeypot product header or match an implausible number of signatures
//! at once. Both triggers are deliberately coarse and configurable.

use serde::{Deserialize, Serialize};

/// The override marker reported instead of matched fingerprints.
pub const HONEYPOT_MARKER: &str = "疑似蜜罐";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoneypotPolicy {
    /// Lower-cased substrings searched in the observation's header string.
    pub header_signatures: Vec<String>,
    /// A fingerprint set larger than this is considered a decoy.
    pub max_fingerprints: usize,
}

impl Default for HoneypotPolicy {
    fn default() -> Self {
        Self {
            header_signatures: vec![
                "hfish".to_string(),
                "glastopf".to_string(),
                "dionaea".to_string(),
                "x-honeypot".to_string(),
                "set-cookie: thinkphp_lang".to_string(),
            ],
            max_fingerprints: 8,
        }
    }
}

impl HoneypotPolicy {
    pub fn header_suspicious(&self, header_string: &str) -> bool {
        self.header_signatures
            .iter()
            .any(|sig| header_string.contains(sig.as_str()))
    }

    pub fn density_suspicious(&self, fingerprint_count: usize) -> bool {
        fingerprint_count > self.max_fingerprints
    }

    /// Apply the override: a suspicious result discards every matched
    /// fingerprint and reports exactly the honeypot marker.
    pub fn apply(&self, header_string: &str, fingerprints: Vec<String>) -> Vec<String> {
        if self.header_suspicious(header_string) || self.density_suspicious(fingerprints.len()) {
            vec![HONEYPOT_MARKER.to_string()]
        } else {
            fingerprints
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_trigger_overrides_everything() {
        let policy = HoneypotPolicy::default();
        let out = policy.apply(
            "server: hfish\r\n",
            vec!["Nginx".into(), "WordPress".into()],
        );
        assert_eq!(out, vec![HONEYPOT_MARKER.to_string()]);
    }

    #[test]
    fn test_density_trigger() {
        let policy = HoneypotPolicy {
            header_signatures: vec![],
            max_fingerprints: 2,
        };
        let many = vec!["A".into(), "B".into(), "C".into()];
        assert_eq!(policy.apply("", many), vec![HONEYPOT_MARKER.to_string()]);
        let few = vec!["A".to_string(), "B".to_string()];
        assert_eq!(policy.apply("", few.clone()), few);
    }

    #[test]
    fn test_clean_result_passes_through() {
        let policy = HoneypotPolicy::default();
        let fps = vec!["Nginx".to_string()];
        assert_eq!(policy.apply("server: nginx\r\n", fps.clone()), fps);
    }
}
