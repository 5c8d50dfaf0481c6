// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - WAF Identification
 * CNAME-based WAF detection against configurable DNS servers
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use hickory_resolver::config::{NameServerConfig, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

use crate::types::WafInfo;

/// Resolvers queried when the session does not override them.
pub const DEFAULT_DNS_SERVERS: &[&str] = &["8.8.8.8", "1.1.1.1"];

/// CNAME suffix -> product table. Coarse on purpose: a CDN edge counts as
/// a WAF for scan-planning purposes.
const WAF_CNAME_TABLE: &[(&str, &str)] = &[
    ("cloudflare.net", "Cloudflare"),
    ("cdn.cloudflare.net", "Cloudflare"),
    ("cloudfront.net", "AWS CloudFront"),
    ("edgekey.net", "Akamai"),
    ("edgesuite.net", "Akamai"),
    ("akamaiedge.net", "Akamai"),
    ("incapdns.net", "Imperva Incapsula"),
    ("fastly.net", "Fastly"),
    ("azurefd.net", "Azure Front Door"),
    ("yunjiasu-cdn.net", "Baidu Yunjiasu"),
    ("aliyunddos.com", "Aliyun DDoS Protection"),
    ("aliyungf.com", "Aliyun WAF"),
    ("360wzb.com", "360 WangZhanBao"),
    ("jiasule.net", "Knownsec Jiasule"),
    ("chinacache.net", "ChinaCache"),
    ("sucuri.net", "Sucuri"),
];

/// Resolve `host` and identify a fronting WAF/CDN from its CNAME chain.
/// Resolution failures mean "no WAF observed", never an error: recon must
/// not stall on broken DNS.
pub async fn resolve_and_identify(host: &str, dns_servers: &[String]) -> WafInfo {
    // IP literals have no CNAME chain to inspect.
    if host.parse::<IpAddr>().is_ok() {
        return WafInfo::default();
    }

    let resolver = match build_resolver(dns_servers) {
        Some(resolver) => resolver,
        None => return WafInfo::default(),
    };

    let lookup = match resolver
        .lookup(host, hickory_resolver::proto::rr::RecordType::CNAME)
        .await
    {
        Ok(lookup) => lookup,
        Err(err) => {
            debug!("CNAME lookup failed for {}: {}", host, err);
            return WafInfo::default();
        }
    };

    for record in lookup.iter() {
        if let Some(cname) = record.as_cname() {
            let target = cname.0.to_string().to_lowercase();
            let target = target.trim_end_matches('.');
            for (suffix, name) in WAF_CNAME_TABLE {
                if target.ends_with(suffix) {
                    return WafInfo {
                        exists: true,
                        name: (*name).to_string(),
                    };
                }
            }
        }
    }

    WafInfo::default()
}

fn build_resolver(dns_servers: &[String]) -> Option<TokioResolver> {
    let mut config = ResolverConfig::new();
    let mut added = false;
    for server in dns_servers {
        let ip: IpAddr = match server.parse() {
            Ok(ip) => ip,
            Err(_) => continue,
        };
        config.add_name_server(NameServerConfig::new(
            SocketAddr::new(ip, 53),
            hickory_resolver::proto::xfer::Protocol::Udp,
        ));
        added = true;
    }
    if !added {
        for server in DEFAULT_DNS_SERVERS {
            let ip: IpAddr = server.parse().ok()?;
            config.add_name_server(NameServerConfig::new(
                SocketAddr::new(ip, 53),
                hickory_resolver::proto::xfer::Protocol::Udp,
            ));
        }
    }
    Some(TokioResolver::builder_with_config(config, TokioConnectionProvider::default()).build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ip_literal_is_never_waf() {
        let info = resolve_and_identify("192.168.1.10", &[]).await;
        assert!(!info.exists);
        assert!(info.name.is_empty());
    }

    #[test]
    fn test_cname_table_is_lowercase() {
        for (suffix, _) in WAF_CNAME_TABLE {
            assert_eq!(*suffix, suffix.to_lowercase());
        }
    }
}
