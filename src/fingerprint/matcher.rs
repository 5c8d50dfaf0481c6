// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Fingerprint Rule Evaluator
 * Tests signature rule atoms against a WebInfo observation and reduces
 * each signature's boolean expression
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use tracing::error;

use super::expression::eval_bool_expr;
use super::{FingerPEntity, RuleKey};

/// Case-normalized observation record for one probed URL.
///
/// Every textual field a rule may match is lower-cased before evaluation;
/// rule values are stored lower-cased in the database.
#[derive(Debug, Clone, Default)]
pub struct WebInfo {
    pub protocol: String,
    pub port: u16,
    pub path: String,
    pub title: String,
    pub status_code: u16,
    pub content_length: usize,
    /// Signed 32-bit MurmurHash3 in decimal, or "" when no favicon.
    pub icon_hash: String,
    pub icon_md5: String,
    pub body_string: String,
    pub header_string: String,
    pub content_type: String,
    pub server: String,
    pub cert: String,
    pub banner: String,
}

/// Evaluate every signature against one observation. Returns the matched
/// product names, deduplicated, in database order.
pub fn evaluate(signatures: &[FingerPEntity], web: &WebInfo) -> Vec<String> {
    let mut results: Vec<String> = Vec::new();

    for finger in signatures {
        let mut expr = finger.all_string.clone().into_bytes();
        for rule in &finger.rule {
            let matched = check_rule(rule, web);
            if rule.start >= rule.end || rule.end > expr.len() {
                // Range errors surface as a syntax error below.
                continue;
            }
            let fill = if matched { b'T' } else { b'F' };
            for byte in &mut expr[rule.start..rule.end] {
                *byte = fill;
            }
        }

        let expr = String::from_utf8_lossy(&expr).into_owned();
        match eval_bool_expr(&expr) {
            Ok(true) => {
                if !results.contains(&finger.product_name) {
                    results.push(finger.product_name.clone());
                }
            }
            Ok(false) => {}
            Err(err) => {
                error!(
                    "[fingerprint] bad signature {}: {:?} ({})",
                    finger.product_name, finger.all_string, err
                );
            }
        }
    }

    results
}

fn check_rule(rule: &super::FingerRule, web: &WebInfo) -> bool {
    match rule.key {
        RuleKey::Header => check_string(rule.op, &web.header_string, &rule.value),
        RuleKey::Body => check_string(rule.op, &web.body_string, &rule.value),
        RuleKey::Server => check_string(rule.op, &web.server, &rule.value),
        RuleKey::Title => check_string(rule.op, &web.title, &rule.value),
        RuleKey::Cert => check_string(rule.op, &web.cert, &rule.value),
        RuleKey::Path => check_string(rule.op, &web.path, &rule.value),
        RuleKey::IconMdhash => check_string(rule.op, &web.icon_md5, &rule.value),
        RuleKey::ContentType => check_string(rule.op, &web.content_type, &rule.value),
        RuleKey::Banner => check_string(rule.op, &web.banner, &rule.value),
        RuleKey::Protocol => {
            (rule.op == 0 && web.protocol == rule.value)
                || (rule.op == 1 && web.protocol != rule.value)
        }
        RuleKey::Port => check_int(rule.op, i64::from(web.port), &rule.value),
        RuleKey::Status => check_int(rule.op, i64::from(web.status_code), &rule.value),
        RuleKey::IconHash => match web.icon_hash.parse::<i64>() {
            Ok(observed) => check_int(rule.op, observed, &rule.value),
            Err(_) => false,
        },
    }
}

/// op 0 = contains, op 1 = not-contains. Unknown ops never match.
fn check_string(op: u8, data: &str, value: &str) -> bool {
    match op {
        0 => data.contains(value),
        1 => !data.contains(value),
        _ => false,
    }
}

/// op 0 = equals, op 1 = not-equals. A value that does not parse as an
/// integer makes the atom false.
fn check_int(op: u8, data: i64, value: &str) -> bool {
    match value.parse::<i64>() {
        Ok(value) => match op {
            0 => data == value,
            1 => data != value,
            _ => false,
        },
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FingerRule;

    fn rule(key: RuleKey, op: u8, value: &str, start: usize, end: usize) -> FingerRule {
        FingerRule {
            key,
            op,
            value: value.into(),
            start,
            end,
        }
    }

    fn web_with_body(body: &str) -> WebInfo {
        WebInfo {
            body_string: body.to_lowercase(),
            ..WebInfo::default()
        }
    }

    #[test]
    fn test_single_rule_match() {
        let db = vec![FingerPEntity {
            product_name: "Nginx".into(),
            all_string: "0".into(),
            rule: vec![rule(RuleKey::Server, 0, "nginx", 0, 1)],
        }];
        let mut web = WebInfo::default();
        web.server = "nginx/1.18.0".into();
        assert_eq!(evaluate(&db, &web), vec!["Nginx".to_string()]);
    }

    #[test]
    fn test_and_expression_requires_both() {
        let db = vec![FingerPEntity {
            product_name: "Harbor".into(),
            all_string: "0 && 1".into(),
            rule: vec![
                rule(RuleKey::Title, 0, "harbor", 0, 1),
                rule(RuleKey::Body, 0, "harbor-app", 5, 6),
            ],
        }];
        let mut web = web_with_body("<harbor-app></harbor-app>");
        assert!(evaluate(&db, &web).is_empty());
        web.title = "harbor".into();
        assert_eq!(evaluate(&db, &web), vec!["Harbor".to_string()]);
    }

    #[test]
    fn test_negated_atom() {
        let db = vec![FingerPEntity {
            product_name: "Apache HTTP Server".into(),
            all_string: "0 && !1".into(),
            rule: vec![
                rule(RuleKey::Server, 0, "apache", 0, 1),
                rule(RuleKey::Server, 0, "coyote", 6, 7),
            ],
        }];
        let mut web = WebInfo::default();
        web.server = "apache/2.4.41".into();
        assert_eq!(evaluate(&db, &web), vec!["Apache HTTP Server".to_string()]);
        web.server = "apache-coyote/1.1".into();
        assert!(evaluate(&db, &web).is_empty());
    }

    #[test]
    fn test_numeric_atoms() {
        let db = vec![FingerPEntity {
            product_name: "K8s".into(),
            all_string: "0 && 1".into(),
            rule: vec![
                rule(RuleKey::Port, 0, "6443", 0, 1),
                rule(RuleKey::Status, 1, "404", 5, 6),
            ],
        }];
        let mut web = WebInfo::default();
        web.port = 6443;
        web.status_code = 401;
        assert_eq!(evaluate(&db, &web), vec!["K8s".to_string()]);
        web.status_code = 404;
        assert!(evaluate(&db, &web).is_empty());
    }

    #[test]
    fn test_icon_hash_parse_failure_is_false() {
        let db = vec![FingerPEntity {
            product_name: "Grafana".into(),
            all_string: "0".into(),
            rule: vec![rule(RuleKey::IconHash, 0, "999357577", 0, 1)],
        }];
        // No favicon observed: icon_hash is "", which does not parse.
        let web = WebInfo::default();
        assert!(evaluate(&db, &web).is_empty());
    }

    #[test]
    fn test_protocol_is_exact_equality() {
        let db = vec![FingerPEntity {
            product_name: "TlsOnly".into(),
            all_string: "0".into(),
            rule: vec![rule(RuleKey::Protocol, 0, "http", 0, 1)],
        }];
        let mut web = WebInfo::default();
        web.protocol = "https".into();
        // Containment would match here; equality must not.
        assert!(evaluate(&db, &web).is_empty());
        web.protocol = "http".into();
        assert_eq!(evaluate(&db, &web), vec!["TlsOnly".to_string()]);
    }

    #[test]
    fn test_malformed_signature_is_skipped_not_fatal() {
        let db = vec![
            FingerPEntity {
                product_name: "Broken".into(),
                all_string: "0 &&".into(),
                rule: vec![rule(RuleKey::Body, 0, "x", 0, 1)],
            },
            FingerPEntity {
                product_name: "Nginx".into(),
                all_string: "0".into(),
                rule: vec![rule(RuleKey::Server, 0, "nginx", 0, 1)],
            },
        ];
        let mut web = web_with_body("x");
        web.server = "nginx".into();
        assert_eq!(evaluate(&db, &web), vec!["Nginx".to_string()]);
    }

    #[test]
    fn test_wide_placeholder_substitution() {
        // Width-agnostic substitution: a 3-byte placeholder is overwritten
        // in place, keeping every other rule's offsets valid.
        let db = vec![FingerPEntity {
            product_name: "Wide".into(),
            all_string: "aaa || 1".into(),
            rule: vec![
                rule(RuleKey::Body, 0, "nope", 0, 3),
                rule(RuleKey::Server, 0, "nginx", 7, 8),
            ],
        }];
        let mut web = WebInfo::default();
        web.server = "nginx".into();
        // "aaa" -> "FFF" which is a syntax error; signature must be skipped,
        // never reported.
        assert!(evaluate(&db, &web).is_empty());
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let db = crate::fingerprint::web_fingerprint_db();
        let mut web = WebInfo::default();
        web.server = "nginx/1.25.3".into();
        web.body_string = "<a href=\"/wp-content/themes/x\">".into();
        let first = evaluate(db, &web);
        let second = evaluate(db, &web);
        assert_eq!(first, second);
        assert!(first.contains(&"Nginx".to_string()));
        assert!(first.contains(&"WordPress".to_string()));
    }
}
