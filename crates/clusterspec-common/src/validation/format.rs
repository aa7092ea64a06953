//! Shared format predicates
//!
//! Every validator checks domain names, addresses, URLs and versions through
//! these functions instead of carrying its own pattern.

use std::net::{IpAddr, SocketAddr};
use std::sync::LazyLock;

use regex::Regex;

static DNS1123_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

static DOMAIN_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9]*[A-Za-z0-9])?$").unwrap());

static TIMEZONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_+\-]+(/[A-Za-z0-9_+\-]+)*$").unwrap());

static SYSCTL_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+([./][A-Za-z0-9_\-]+)+$").unwrap());

static KERNEL_MODULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").unwrap());

/// Maximum length of a DNS label
const MAX_LABEL_LEN: usize = 63;

/// Maximum length of a DNS name
const MAX_DOMAIN_LEN: usize = 253;

/// True if `port` is in [1, 65535]
pub fn is_valid_port(port: i64) -> bool {
    (1..=65535).contains(&port)
}

/// True if `s` parses as an IPv4 or IPv6 address
pub fn is_valid_ip(s: &str) -> bool {
    s.parse::<IpAddr>().is_ok()
}

/// True if `s` is an RFC 1123 label: lowercase alphanumerics and `-`, at most 63 chars
pub fn is_dns1123_label(s: &str) -> bool {
    s.len() <= MAX_LABEL_LEN && DNS1123_LABEL.is_match(s)
}

/// True if `s` is an RFC 1123 subdomain: dot-separated labels, at most 253 chars
pub fn is_dns1123_subdomain(s: &str) -> bool {
    !s.is_empty() && s.len() <= MAX_DOMAIN_LEN && s.split('.').all(is_dns1123_label)
}

/// True if `s` is a fully qualified or relative domain name.
///
/// Case-insensitive; a single trailing dot is accepted.
pub fn is_valid_domain(s: &str) -> bool {
    let name = s.strip_suffix('.').unwrap_or(s);
    if name.is_empty() || name.len() > MAX_DOMAIN_LEN || is_valid_ip(name) {
        return false;
    }
    name.split('.')
        .all(|label| label.len() <= MAX_LABEL_LEN && DOMAIN_LABEL.is_match(label))
}

/// True if `s` is a domain, optionally prefixed by a single `*.` wildcard label
pub fn is_valid_wildcard_domain(s: &str) -> bool {
    match s.strip_prefix("*.") {
        Some(rest) => is_valid_domain(rest),
        None => is_valid_domain(s),
    }
}

/// True if `s` is either an IP address or a domain name
pub fn is_valid_ip_or_domain(s: &str) -> bool {
    is_valid_ip(s) || is_valid_domain(s)
}

/// Parse `address/prefix` into its address and prefix length
pub fn parse_cidr(s: &str) -> Option<(IpAddr, u8)> {
    let (addr, prefix) = s.split_once('/')?;
    let addr: IpAddr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    (prefix <= max).then_some((addr, prefix))
}

/// True if `s` is a valid IPv4 or IPv6 CIDR block
pub fn is_valid_cidr(s: &str) -> bool {
    parse_cidr(s).is_some()
}

/// True if two CIDR blocks of the same family share any address
pub fn cidrs_overlap(a: &str, b: &str) -> bool {
    match (parse_cidr(a), parse_cidr(b)) {
        (Some((IpAddr::V4(a_addr), a_len)), Some((IpAddr::V4(b_addr), b_len))) => {
            let len = a_len.min(b_len);
            let mask = if len == 0 { 0 } else { u32::MAX << (32 - u32::from(len)) };
            (u32::from(a_addr) & mask) == (u32::from(b_addr) & mask)
        }
        (Some((IpAddr::V6(a_addr), a_len)), Some((IpAddr::V6(b_addr), b_len))) => {
            let len = a_len.min(b_len);
            let mask = if len == 0 { 0 } else { u128::MAX << (128 - u32::from(len)) };
            (u128::from(a_addr) & mask) == (u128::from(b_addr) & mask)
        }
        _ => false,
    }
}

/// True if `s` is an absolute URL whose scheme is one of `schemes` and which names a host
pub fn is_valid_url(s: &str, schemes: &[&str]) -> bool {
    match url::Url::parse(s) {
        Ok(parsed) => {
            schemes.contains(&parsed.scheme())
                && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// True if `s` is a semantic version, with or without a leading `v`.
///
/// Used for Kubernetes, etcd, runtime and chart versions alike.
pub fn is_valid_version(s: &str) -> bool {
    let bare = s.strip_prefix('v').unwrap_or(s);
    semver::Version::parse(bare).is_ok()
}

/// True if `s` is `host` or `host:port` where host is a domain or IP.
///
/// IPv6 hosts must be bracketed when a port is given.
pub fn is_valid_host_port(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if s.parse::<SocketAddr>().is_ok() || is_valid_ip_or_domain(s) {
        return true;
    }
    match s.rsplit_once(':') {
        Some((host, port)) => {
            port.parse::<i64>().is_ok_and(is_valid_port) && is_valid_domain(host)
        }
        None => false,
    }
}

/// True if `s` is an IP address optionally followed by `:port`
pub fn is_valid_nameserver(s: &str) -> bool {
    is_valid_ip(s) || s.parse::<SocketAddr>().is_ok()
}

/// True if `s` is an absolute filesystem path
pub fn is_absolute_path(s: &str) -> bool {
    s.starts_with('/')
}

/// True if `s` looks like a tz database name such as `UTC` or `Asia/Shanghai`
pub fn is_valid_timezone(s: &str) -> bool {
    TIMEZONE.is_match(s)
}

/// True if `s` is a dotted or slashed sysctl key such as `net.ipv4.ip_forward`
pub fn is_valid_sysctl_key(s: &str) -> bool {
    SYSCTL_KEY.is_match(s)
}

/// True if `s` is a kernel module name
pub fn is_valid_kernel_module(s: &str) -> bool {
    KERNEL_MODULE.is_match(s)
}

/// Parse a `low-high` port range, requiring 1 <= low < high <= 65535
pub fn parse_port_range(s: &str) -> Option<(i64, i64)> {
    let (low, high) = s.split_once('-')?;
    let low: i64 = low.trim().parse().ok()?;
    let high: i64 = high.trim().parse().ok()?;
    (is_valid_port(low) && is_valid_port(high) && low < high).then_some((low, high))
}

/// Render an allowed-value table for error messages
pub fn one_of(values: &[&str]) -> String {
    values.join(", ")
}
