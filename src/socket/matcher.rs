//! `NO_PROXY` bypass matching.
//!
//! Decides whether a WebSocket target host is reached directly instead of
//! through the ambient proxy.

use std::net::IpAddr;
use url::Url;

/// One parsed `NO_PROXY` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BypassRule {
    Domain {
        /// Lowercase suffix with a leading dot.
        suffix: String,
        /// Whether the bare domain itself also matches.
        match_host: bool,
        port: Option<u16>,
    },
    Address(IpAddr, Option<u16>),
    Cidr(IpAddr, u8),
}

impl BypassRule {
    fn matches_domain(&self, host: &str, port: Option<u16>) -> bool {
        match self {
            BypassRule::Domain {
                suffix,
                match_host,
                port: rule_port,
            } => {
                let host_match =
                    host.ends_with(suffix.as_str()) || (*match_host && host == &suffix[1..]);
                host_match && port_matches(*rule_port, port)
            }
            _ => false,
        }
    }

    fn matches_ip(&self, ip: IpAddr, port: Option<u16>) -> bool {
        match self {
            BypassRule::Address(addr, rule_port) => *addr == ip && port_matches(*rule_port, port),
            BypassRule::Cidr(network, prefix) => cidr_contains(*network, *prefix, ip),
            BypassRule::Domain { .. } => false,
        }
    }
}

/// A rule without a port matches every port; a rule with one needs a known, equal port.
fn port_matches(rule: Option<u16>, port: Option<u16>) -> bool {
    rule.is_none() || rule == port
}

/// Proxy bypass rules.
///
/// Follows Go's `NO_PROXY` conventions:
/// - entries are comma-separated
/// - `example.com` matches the domain and its subdomains
/// - `.example.com` and `*.example.com` match subdomains only
/// - `example.com:8080` and `10.0.0.1:8080` match only that port
/// - IP addresses and CIDR ranges match literal IP hosts
/// - `*` bypasses every host
///
/// Matchers built from the environment also bypass loopback hosts, since a
/// local endpoint is never reachable through a remote proxy.
#[derive(Debug, Clone, Default)]
pub struct ProxyMatcher {
    rules: Vec<BypassRule>,
    match_all: bool,
    bypass_loopback: bool,
}

impl ProxyMatcher {
    /// Create from `NO_PROXY` then `no_proxy`, with loopback bypass enabled.
    pub fn from_env() -> Self {
        let raw = std::env::var("NO_PROXY")
            .or_else(|_| std::env::var("no_proxy"))
            .unwrap_or_default();
        let mut matcher = Self::from_string(&raw);
        matcher.bypass_loopback = true;
        matcher
    }

    /// Parse a `NO_PROXY` style list.
    pub fn from_string(no_proxy: &str) -> Self {
        let mut matcher = ProxyMatcher::default();

        for part in no_proxy.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part == "*" {
                matcher.match_all = true;
                continue;
            }
            if let Some(rule) = parse_rule(part) {
                matcher.rules.push(rule);
            }
        }

        matcher
    }

    /// Enable or disable the implicit loopback bypass.
    pub fn with_loopback_bypass(mut self, enabled: bool) -> Self {
        self.bypass_loopback = enabled;
        self
    }

    /// Check if a host should bypass the proxy, port unknown.
    ///
    /// Port-qualified entries never match here.
    pub fn should_bypass(&self, host: &str) -> bool {
        self.should_bypass_port(host, None)
    }

    /// Check if a host and port should bypass the proxy.
    pub fn should_bypass_port(&self, host: &str, port: Option<u16>) -> bool {
        if self.match_all {
            return true;
        }

        let host = host.trim_start_matches('[').trim_end_matches(']');

        if let Ok(ip) = host.parse::<IpAddr>() {
            if self.bypass_loopback && ip.is_loopback() {
                return true;
            }
            return self.rules.iter().any(|rule| rule.matches_ip(ip, port));
        }

        let host = host.trim_end_matches('.').to_lowercase();
        if self.bypass_loopback && (host == "localhost" || host.ends_with(".localhost")) {
            return true;
        }

        self.rules.iter().any(|rule| rule.matches_domain(&host, port))
    }

    /// Check if a URL's host should bypass the proxy. Uses the scheme's
    /// default port when the URL has none.
    pub fn should_bypass_url(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|h| self.should_bypass_port(h, url.port_or_known_default()))
    }
}

fn parse_rule(part: &str) -> Option<BypassRule> {
    if let Some((ip_str, prefix_str)) = part.split_once('/') {
        return match (ip_str.parse::<IpAddr>(), prefix_str.parse::<u8>()) {
            (Ok(ip), Ok(prefix)) => Some(BypassRule::Cidr(ip, prefix)),
            _ => None,
        };
    }

    let bare = part.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Some(BypassRule::Address(ip, None));
    }

    // `host:port`, `[v6]:port` or `v4:port`.
    let (host, port) = match part.rsplit_once(':') {
        Some((host, port)) => (host, Some(port.parse::<u16>().ok()?)),
        None => (part, None),
    };

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Some(BypassRule::Address(ip, port));
    }

    let host = host.trim_start_matches('*').trim_end_matches('.').to_lowercase();
    if host.is_empty() || host == "." {
        return None;
    }
    let rule = match host.strip_prefix('.') {
        Some(_) => BypassRule::Domain {
            suffix: host,
            match_host: false,
            port,
        },
        None => BypassRule::Domain {
            suffix: format!(".{}", host),
            match_host: true,
            port,
        },
    };
    Some(rule)
}

/// Check if IP is within CIDR range.
fn cidr_contains(network: IpAddr, prefix: u8, addr: IpAddr) -> bool {
    match (network, addr) {
        (IpAddr::V4(net), IpAddr::V4(ip)) => {
            if prefix > 32 {
                return false;
            }
            let mask = if prefix == 0 { 0u32 } else { !0u32 << (32 - prefix) };
            (u32::from(net) & mask) == (u32::from(ip) & mask)
        }
        (IpAddr::V6(net), IpAddr::V6(ip)) => {
            if prefix > 128 {
                return false;
            }
            let mask = if prefix == 0 { 0u128 } else { !0u128 << (128 - prefix) };
            (u128::from(net) & mask) == (u128::from(ip) & mask)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard() {
        let m = ProxyMatcher::from_string("*");
        assert!(m.should_bypass("anything.com"));
        assert!(m.should_bypass("192.168.1.1"));
    }

    #[test]
    fn test_domain_suffix() {
        let m = ProxyMatcher::from_string("example.com");
        assert!(m.should_bypass("example.com"));
        assert!(m.should_bypass("WWW.Example.com"));
        assert!(!m.should_bypass("notexample.com"));
    }

    #[test]
    fn test_leading_dot_matches_subdomains_only() {
        for entry in [".example.com", "*.example.com"] {
            let m = ProxyMatcher::from_string(entry);
            assert!(m.should_bypass("www.example.com"), "{}", entry);
            assert!(m.should_bypass("a.b.example.com"), "{}", entry);
            assert!(!m.should_bypass("example.com"), "{}", entry);
            assert!(!m.should_bypass("notexample.com"), "{}", entry);
        }
    }

    #[test]
    fn test_domain_with_port() {
        let m = ProxyMatcher::from_string("chat.internal:8080");
        assert!(m.should_bypass_port("chat.internal", Some(8080)));
        assert!(m.should_bypass_port("eu.chat.internal", Some(8080)));
        assert!(!m.should_bypass_port("chat.internal", Some(443)));
        assert!(!m.should_bypass("chat.internal"));
    }

    #[test]
    fn test_url_uses_default_port() {
        let m = ProxyMatcher::from_string("chat.internal:443, 10.0.0.1:9000");
        assert!(m.should_bypass_url(&Url::parse("wss://chat.internal/").unwrap()));
        assert!(!m.should_bypass_url(&Url::parse("ws://chat.internal/").unwrap()));
        assert!(!m.should_bypass_url(&Url::parse("wss://chat.internal:8443/").unwrap()));
        assert!(m.should_bypass_url(&Url::parse("ws://10.0.0.1:9000/").unwrap()));
        assert!(!m.should_bypass_url(&Url::parse("ws://10.0.0.1/").unwrap()));
    }

    #[test]
    fn test_malformed_entries_ignored() {
        let m = ProxyMatcher::from_string("host:notaport, 10.0.0.0/abc, .");
        assert!(!m.should_bypass("host"));
        assert!(!m.should_bypass("10.1.2.3"));
        assert!(!m.should_bypass("anything"));
    }

    #[test]
    fn test_cidr_and_ipv6() {
        let m = ProxyMatcher::from_string("10.0.0.0/8, ::1, 2001:db8::/32");
        assert!(m.should_bypass("10.1.2.3"));
        assert!(!m.should_bypass("11.1.2.3"));
        assert!(m.should_bypass("[::1]"));
        assert!(m.should_bypass("2001:db8::1"));
        assert!(!m.should_bypass("2001:db9::1"));
    }

    #[test]
    fn test_loopback_only_when_enabled() {
        let plain = ProxyMatcher::from_string("");
        assert!(!plain.should_bypass("127.0.0.1"));
        assert!(!plain.should_bypass("localhost"));

        let env_like = plain.with_loopback_bypass(true);
        assert!(env_like.should_bypass("127.0.0.1"));
        assert!(env_like.should_bypass("127.8.9.10"));
        assert!(env_like.should_bypass("[::1]"));
        assert!(env_like.should_bypass("localhost"));
        assert!(!env_like.should_bypass("example.com"));
    }
}
