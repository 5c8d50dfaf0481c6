// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! TLS certificate probe for the `cert` fingerprint field.
//!
//! Raw SNI handshake with verification disabled; recon only. The summary
//! string concatenates subject CN, issuer CN and DNS SANs so substring
//! rules can match any of them.

use anyhow::Result;
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use std::pin::Pin;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_openssl::SslStream;
use tracing::debug;

/// Lower-cased certificate summary for an https host, or "" when the
/// target is plain http or the handshake fails.
pub async fn cert_summary(scheme: &str, host: &str, port: u16, timeout_secs: u64) -> String {
    if scheme != "https" {
        return String::new();
    }
    match probe_cert(host, port, timeout_secs).await {
        Ok(Some(summary)) => summary.to_lowercase(),
        Ok(None) => String::new(),
        Err(err) => {
            debug!("tls probe failed for {}:{}: {}", host, port, err);
            String::new()
        }
    }
}

async fn probe_cert(host: &str, port: u16, timeout_secs: u64) -> Result<Option<String>> {
    let to = Duration::from_secs(timeout_secs);
    let addr = format!("{}:{}", host, port);

    let tcp = match timeout(to, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => stream,
        _ => return Ok(None),
    };

    let mut builder = SslConnector::builder(SslMethod::tls())?;
    builder.set_verify(SslVerifyMode::NONE);
    let connector = builder.build();

    let mut config = connector.configure()?;
    config.set_use_server_name_indication(true);
    config.set_verify_hostname(false);
    let ssl = config.into_ssl(host)?;

    let mut stream = SslStream::new(ssl, tcp)?;
    let _ = timeout(to, async { Pin::new(&mut stream).connect().await })
        .await
        .ok();

    let cert = match stream.ssl().peer_certificate() {
        Some(cert) => cert,
        None => return Ok(None),
    };

    let mut parts: Vec<String> = Vec::new();
    if let Some(cn) = cert
        .subject_name()
        .entries_by_nid(openssl::nid::Nid::COMMONNAME)
        .next()
        .and_then(|e| e.data().as_utf8().ok())
    {
        parts.push(format!("cn={}", cn));
    }
    if let Some(org) = cert
        .subject_name()
        .entries_by_nid(openssl::nid::Nid::ORGANIZATIONNAME)
        .next()
        .and_then(|e| e.data().as_utf8().ok())
    {
        parts.push(format!("o={}", org));
    }
    if let Some(issuer) = cert
        .issuer_name()
        .entries_by_nid(openssl::nid::Nid::COMMONNAME)
        .next()
        .and_then(|e| e.data().as_utf8().ok())
    {
        parts.push(format!("issuer={}", issuer));
    }
    if let Some(sans) = cert.subject_alt_names() {
        for san in sans {
            if let Some(dns) = san.dnsname() {
                parts.push(dns.to_string());
            }
        }
    }

    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parts.join(", ")))
    }
}
