// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Favicon Hashing
 * Resolves the favicon of a target and computes the MurmurHash3-32 /
 * MD5 pair used by the signature database. The mmh3 input layout
 * (standard base64, line-broken at 76 chars, trailing newline) is
 * bit-compatible with the FOFA/Shodan favicon-hash convention.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use crate::http_client::{host_with_port, HttpClient};

/// Desktop icon rels are preferred; mobile rels are the fallback.
const DESKTOP_RELS: &[&str] = &["icon", "shortcut icon"];
const MOBILE_RELS: &[&str] = &["apple-touch-icon", "mask-icon"];

/// Fetch the favicon for `base` and return `(icon_hash, icon_md5)`.
/// Any failure along the way yields `("", "")`.
pub async fn favicon_hash(
    base: &Url,
    headers: &HashMap<String, String>,
    client: &HttpClient,
) -> (String, String) {
    let page = match client
        .request(reqwest::Method::GET, base.as_str(), headers, None, 10)
        .await
    {
        Ok(resp) => resp,
        Err(err) => {
            debug!("favicon page fetch failed for {}: {}", base, err);
            return (String::new(), String::new());
        }
    };

    let icon_link = parse_icons(&page.body_text())
        .into_iter()
        .next()
        .unwrap_or_else(|| "favicon.ico".to_string());
    let final_link = resolve_icon_link(base, &icon_link);

    match client
        .request(reqwest::Method::GET, &final_link, headers, None, 10)
        .await
    {
        Ok(resp) if resp.status_code == 200 => {
            let digest = md5::compute(&resp.body);
            (mmh3_hash32(&resp.body), format!("{:x}", digest))
        }
        Ok(resp) => {
            debug!("favicon fetch {} returned {}", final_link, resp.status_code);
            (String::new(), String::new())
        }
        Err(err) => {
            debug!("favicon fetch failed for {}: {}", final_link, err);
            (String::new(), String::new())
        }
    }
}

/// Collect icon hrefs from the document head, preferring desktop rels,
/// falling back to mobile rels, then to the default favicon path.
pub fn parse_icons(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("head link") {
        Ok(s) => s,
        Err(_) => return vec!["favicon.ico".to_string()],
    };

    let collect = |rels: &[&str]| -> Vec<String> {
        document
            .select(&selector)
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                let rel = link.value().attr("rel")?;
                let rel = rel.trim().to_lowercase();
                if rels.contains(&rel.as_str()) {
                    Some(href.to_string())
                } else {
                    None
                }
            })
            .collect()
    };

    let mut icons = collect(DESKTOP_RELS);
    if icons.is_empty() {
        icons = collect(MOBILE_RELS);
    }
    if icons.is_empty() {
        icons.push("favicon.ico".to_string());
    }
    icons
}

/// Resolve an icon href against the page URL.
pub fn resolve_icon_link(base: &Url, icon_link: &str) -> String {
    if icon_link.starts_with("http://") || icon_link.starts_with("https://") {
        return icon_link.to_string();
    }
    if let Some(rest) = icon_link.strip_prefix("//") {
        return format!("{}://{}", base.scheme(), rest);
    }

    let host = host_with_port(base);
    let candidate = icon_link.trim_start_matches('/');
    let path = base.path().trim_end_matches('/');
    if path.is_empty() {
        format!("{}://{}/{}", base.scheme(), host, candidate)
    } else {
        format!("{}://{}{}/{}", base.scheme(), host, path, candidate)
    }
}

/// MurmurHash3-32 of the chunked base64 encoding, reinterpreted as a
/// signed 32-bit integer and formatted in decimal.
pub fn mmh3_hash32(raw: &[u8]) -> String {
    let encoded = base64_chunked(raw);
    format!("{}", murmur3_32(&encoded, 0) as i32)
}

/// Standard base64, a newline after every 76 output characters, and one
/// trailing newline. Deviating from this layout silently breaks every
/// community-shared favicon hash.
pub fn base64_chunked(raw: &[u8]) -> Vec<u8> {
    let encoded = BASE64.encode(raw);
    let mut out = Vec::with_capacity(encoded.len() + encoded.len() / 76 + 1);
    for (i, byte) in encoded.bytes().enumerate() {
        out.push(byte);
        if (i + 1) % 76 == 0 {
            out.push(b'\n');
        }
    }
    out.push(b'\n');
    out
}

/// MurmurHash3 32-bit
fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e2d51;
    const C2: u32 = 0x1b873593;
    const R1: u32 = 15;
    const R2: u32 = 13;
    const M: u32 = 5;
    const N: u32 = 0xe6546b64;

    let mut h1 = seed;
    let len = data.len();
    let n_blocks = len / 4;

    for i in 0..n_blocks {
        let i4 = i * 4;
        let mut k1 = u32::from_le_bytes([data[i4], data[i4 + 1], data[i4 + 2], data[i4 + 3]]);

        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(R1);
        k1 = k1.wrapping_mul(C2);

        h1 ^= k1;
        h1 = h1.rotate_left(R2);
        h1 = h1.wrapping_mul(M).wrapping_add(N);
    }

    let tail = &data[n_blocks * 4..];
    let mut k1: u32 = 0;
    if tail.len() >= 3 {
        k1 ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        k1 ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        k1 ^= tail[0] as u32;
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(R1);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
    }

    h1 ^= len as u32;
    h1 ^= h1 >> 16;
    h1 = h1.wrapping_mul(0x85ebca6b);
    h1 ^= h1 >> 13;
    h1 = h1.wrapping_mul(0xc2b2ae35);
    h1 ^= h1 >> 16;

    h1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_chunked_wire_format() {
        // base64("hello\n") == "aGVsbG8K"; under 76 chars, so the only
        // newline is the trailing one.
        assert_eq!(base64_chunked(b"hello\n"), b"aGVsbG8K\n".to_vec());
    }

    #[test]
    fn test_base64_chunked_breaks_at_76() {
        let raw = vec![0u8; 100]; // encodes to 136 chars
        let chunked = base64_chunked(&raw);
        let text = String::from_utf8(chunked).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 136 - 76);
        // trailing newline => final empty segment
        assert_eq!(lines[2], "");
    }

    #[test]
    fn test_mmh3_is_signed_decimal_of_unsigned_sum() {
        let raw = b"hello\n";
        let unsigned = murmur3_32(&base64_chunked(raw), 0);
        assert_eq!(mmh3_hash32(raw), format!("{}", unsigned as i32));
    }

    #[test]
    fn test_mmh3_reference_vectors() {
        // Public MurmurHash3_x86_32 vectors (seed 0)
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"hello", 0), 0x248b_fa47);
        assert_eq!(murmur3_32(b"hello, world", 0), 0x149b_bb7f);
    }

    #[test]
    fn test_parse_icons_prefers_desktop_rels() {
        let html = r#"<html><head>
            <link rel="apple-touch-icon" href="/touch.png">
            <link rel="shortcut icon" href="/fav.ico">
        </head></html>"#;
        assert_eq!(parse_icons(html)[0], "/fav.ico");
    }

    #[test]
    fn test_parse_icons_falls_back_to_mobile_then_default() {
        let mobile = r#"<html><head><link rel="mask-icon" href="/mask.svg"></head></html>"#;
        assert_eq!(parse_icons(mobile)[0], "/mask.svg");
        assert_eq!(parse_icons("<html></html>")[0], "favicon.ico");
    }

    #[test]
    fn test_resolve_icon_link_variants() {
        let base = Url::parse("https://example.com").unwrap();
        assert_eq!(
            resolve_icon_link(&base, "http://cdn.example.com/f.ico"),
            "http://cdn.example.com/f.ico"
        );
        assert_eq!(
            resolve_icon_link(&base, "//cdn.example.com/f.ico"),
            "https://cdn.example.com/f.ico"
        );
        assert_eq!(
            resolve_icon_link(&base, "/static/f.ico"),
            "https://example.com/static/f.ico"
        );

        let with_path = Url::parse("https://example.com:8443/app/").unwrap();
        assert_eq!(
            resolve_icon_link(&with_path, "f.ico"),
            "https://example.com:8443/app/f.ico"
        );
    }
}
