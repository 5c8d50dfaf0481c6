// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Fingerprint Signature Database
 * Rule model for the boolean-expression signature DSL, plus the embedded
 * default databases (passive web signatures, active path signatures,
 * template workflow tags)
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod expression;
pub mod honeypot;
pub mod matcher;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::ScannerError;
use self::expression::eval_bool_expr;

/// Observation attribute a rule matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKey {
    Header,
    Body,
    Server,
    Title,
    Cert,
    Port,
    Protocol,
    Path,
    IconHash,
    IconMdhash,
    Status,
    ContentType,
    Banner,
}

/// One atom of a signature expression.
///
/// `start..end` is the byte range of this atom's placeholder inside the
/// parent signature's `all_string`. Rule values are stored lower-cased;
/// observations are lower-cased before evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerRule {
    pub key: RuleKey,
    /// 0 = contains/equals, 1 = not-contains/not-equals
    pub op: u8,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

/// A fingerprint signature: a product name and a boolean expression over
/// rule placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerPEntity {
    pub product_name: String,
    pub all_string: String,
    #[serde(default)]
    pub rule: Vec<FingerRule>,
}

/// Signatures probed at specific non-root paths by the active pass.
/// Every (alive URL, path, fpe) triple becomes one scan task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveFingerprintEntry {
    pub path: Vec<String>,
    pub fpe: Vec<FingerPEntity>,
}

/// Check that a signature's expression parses once every placeholder is
/// substituted. Run at load time so broken database entries surface before
/// a scan, not during one.
pub fn validate_signature(finger: &FingerPEntity) -> Result<(), ScannerError> {
    let malformed = || ScannerError::MalformedSignature {
        product: finger.product_name.clone(),
        expression: finger.all_string.clone(),
    };

    let mut expr = finger.all_string.clone().into_bytes();
    for rule in &finger.rule {
        if rule.start >= rule.end || rule.end > expr.len() {
            return Err(malformed());
        }
        for byte in &mut expr[rule.start..rule.end] {
            *byte = b'T';
        }
    }
    let expr = String::from_utf8(expr).map_err(|_| malformed())?;
    eval_bool_expr(&expr).map_err(|_| malformed())?;
    Ok(())
}

static WEB_FINGERPRINT_DB: Lazy<Vec<FingerPEntity>> = Lazy::new(|| {
    parse_web_db(include_str!("data/web_fingerprints.json"))
        .expect("embedded web fingerprint database is valid")
});

static ACTIVE_FINGERPRINT_DB: Lazy<Vec<ActiveFingerprintEntry>> = Lazy::new(|| {
    parse_active_db(include_str!("data/active_fingerprints.json"))
        .expect("embedded active fingerprint database is valid")
});

static WORKFLOW_DB: Lazy<HashMap<String, Vec<String>>> = Lazy::new(|| {
    serde_json::from_str(include_str!("data/workflows.json"))
        .expect("embedded workflow database is valid")
});

/// Built-in passive signature database.
pub fn web_fingerprint_db() -> &'static [FingerPEntity] {
    &WEB_FINGERPRINT_DB
}

/// Built-in active (path-probing) signature database.
pub fn active_fingerprint_db() -> &'static [ActiveFingerprintEntry] {
    &ACTIVE_FINGERPRINT_DB
}

/// Built-in template-name -> tag-set table used by the template filter.
pub fn workflow_db() -> &'static HashMap<String, Vec<String>> {
    &WORKFLOW_DB
}

fn parse_web_db(raw: &str) -> Result<Vec<FingerPEntity>> {
    let db: Vec<FingerPEntity> =
        serde_json::from_str(raw).context("Failed to parse web fingerprint database")?;
    for finger in &db {
        validate_signature(finger)
            .with_context(|| format!("Invalid signature for {}", finger.product_name))?;
    }
    Ok(db)
}

fn parse_active_db(raw: &str) -> Result<Vec<ActiveFingerprintEntry>> {
    let db: Vec<ActiveFingerprintEntry> =
        serde_json::from_str(raw).context("Failed to parse active fingerprint database")?;
    for entry in &db {
        for finger in &entry.fpe {
            validate_signature(finger)
                .with_context(|| format!("Invalid active signature for {}", finger.product_name))?;
        }
    }
    Ok(db)
}

/// Load a user-supplied signature database, replacing the embedded one.
pub fn load_web_db(path: &Path) -> Result<Vec<FingerPEntity>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_web_db(&raw)
}

/// Load a user-supplied active database, replacing the embedded one.
pub fn load_active_db(path: &Path) -> Result<Vec<ActiveFingerprintEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_active_db(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_databases_load() {
        assert!(!web_fingerprint_db().is_empty());
        assert!(!active_fingerprint_db().is_empty());
        assert!(!workflow_db().is_empty());
    }

    #[test]
    fn test_embedded_rule_values_are_lowercase() {
        for finger in web_fingerprint_db() {
            for rule in &finger.rule {
                assert_eq!(
                    rule.value,
                    rule.value.to_lowercase(),
                    "rule value for {} must be lower-cased",
                    finger.product_name
                );
            }
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_placeholder() {
        let finger = FingerPEntity {
            product_name: "Broken".into(),
            all_string: "0".into(),
            rule: vec![FingerRule {
                key: RuleKey::Body,
                op: 0,
                value: "x".into(),
                start: 0,
                end: 5,
            }],
        };
        assert!(validate_signature(&finger).is_err());
    }

    #[test]
    fn test_validate_rejects_unparseable_expression() {
        let finger = FingerPEntity {
            product_name: "Broken".into(),
            all_string: "0 &&".into(),
            rule: vec![FingerRule {
                key: RuleKey::Body,
                op: 0,
                value: "x".into(),
                start: 0,
                end: 1,
            }],
        };
        assert!(validate_signature(&finger).is_err());
    }

    #[test]
    fn test_workflow_db_tags_reference_known_products() {
        // Every product named in the passive DB that has templates keyed on
        // it must appear verbatim in at least one workflow tag list.
        let tags: std::collections::HashSet<&str> = workflow_db()
            .values()
            .flat_map(|tags| tags.iter().map(|t| t.as_str()))
            .collect();
        assert!(tags.contains("ThinkPHP"));
        assert!(tags.contains("Apache Shiro"));
        assert!(tags.contains("Generate-Log4j2"));
    }
}
