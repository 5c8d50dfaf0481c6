// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Favicon Hash Wire-Format Tests
 * Golden checks against an independent MurmurHash3 reference so a
 * chunking or trailing-newline regression cannot slip through
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vainu_scanner::http_client::HttpClient;
use vainu_scanner::webscan::favicon::{base64_chunked, favicon_hash, mmh3_hash32};

/// Independent MurmurHash3_x86_32 reference, kept deliberately separate
/// from the implementation under test.
fn reference_murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;
    let chunks = data.chunks_exact(4);
    let tail = chunks.remainder();
    for chunk in chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(0xcc9e2d51).rotate_left(15).wrapping_mul(0x1b873593);
        h ^= k;
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe6546b64);
    }
    let mut k: u32 = 0;
    for (i, byte) in tail.iter().enumerate() {
        k ^= (*byte as u32) << (8 * i);
    }
    if !tail.is_empty() {
        k = k.wrapping_mul(0xcc9e2d51).rotate_left(15).wrapping_mul(0x1b873593);
        h ^= k;
    }
    h ^= data.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

#[test]
fn test_golden_hello_newline() {
    // base64("hello\n") == "aGVsbG8K"; the hash input must be
    // "aGVsbG8K\n" including the trailing newline. An implementation
    // that omits the newline produces a different sum and fails here.
    let expected = format!("{}", reference_murmur3_32(b"aGVsbG8K\n", 0) as i32);
    assert_eq!(mmh3_hash32(b"hello\n"), expected);

    let without_newline = format!("{}", reference_murmur3_32(b"aGVsbG8K", 0) as i32);
    assert_ne!(mmh3_hash32(b"hello\n"), without_newline);
}

#[test]
fn test_golden_long_body_chunks_at_76() {
    // 100 zero bytes encode to 136 base64 chars: one break at 76 plus
    // the trailing newline.
    let raw = vec![0u8; 100];
    let chunked = base64_chunked(&raw);
    assert_eq!(chunked.iter().filter(|b| **b == b'\n').count(), 2);
    let expected = format!("{}", reference_murmur3_32(&chunked, 0) as i32);
    assert_eq!(mmh3_hash32(&raw), expected);
}

#[tokio::test]
async fn test_favicon_fetch_via_html_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><link rel="shortcut icon" href="/static/fav.ico"></head></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/fav.ico"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello\n".to_vec()))
        .mount(&server)
        .await;

    let client = HttpClient::new(true, "").unwrap();
    let base = Url::parse(&server.uri()).unwrap();
    let (icon_hash, icon_md5) = favicon_hash(&base, &HashMap::new(), &client).await;

    assert_eq!(
        icon_hash,
        format!("{}", reference_murmur3_32(b"aGVsbG8K\n", 0) as i32)
    );
    // md5("hello\n")
    assert_eq!(icon_md5, "b1946ac92492d2347c6235b4d2611184");
}

#[tokio::test]
async fn test_favicon_non_200_yields_empty_pair() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;
    // No /favicon.ico mock: the default path 404s.

    let client = HttpClient::new(true, "").unwrap();
    let base = Url::parse(&server.uri()).unwrap();
    let (icon_hash, icon_md5) = favicon_hash(&base, &HashMap::new(), &client).await;

    assert_eq!(icon_hash, "");
    assert_eq!(icon_md5, "");
}
