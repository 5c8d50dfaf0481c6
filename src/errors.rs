// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scanner Error Types
 * Production error handling with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::path::PathBuf;
use thiserror::Error;

/// Main scanner error type
#[derive(Error, Debug)]
pub enum ScannerError {
    /// Transport-level failures (connection refused, timeout, TLS failure)
    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A fingerprint signature whose boolean expression does not parse
    #[error("Malformed signature expression for {product}: {expression:?}")]
    MalformedSignature {
        product: String,
        expression: String,
    },

    /// Template engine failed to initialize; fatal for the current pass
    #[error("Template engine init failed: {0}")]
    EngineInit(String),

    /// Template engine failed while executing a single target
    #[error("Template execution failed for {target}: {reason}")]
    EngineExecution { target: String, reason: String },

    /// Template file could not be read or walked
    #[error("Template discovery error at {path}: {source}")]
    TemplateDiscovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No usable target survived input parsing
    #[error("No available targets found, please check input")]
    NoTargets,

    /// Configuration errors (bad proxy URL, bad header line, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ScannerError {
    /// Errors that abort the current pass instead of a single target.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScannerError::EngineInit(_) | ScannerError::NoTargets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ScannerError::EngineInit("boom".into()).is_fatal());
        assert!(ScannerError::NoTargets.is_fatal());
        assert!(!ScannerError::Configuration("x".into()).is_fatal());
        assert!(!ScannerError::MalformedSignature {
            product: "X".into(),
            expression: "((".into()
        }
        .is_fatal());
    }
}
