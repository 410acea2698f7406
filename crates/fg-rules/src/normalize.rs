//! Normalization helpers.
//!
//! Every function here is total: malformed input normalizes to an `Invalid`
//! sentinel that matches nothing. Matching goes through the `matches` /
//! `contains` methods, never through `==` on the sentinel.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NormalizedEmail {
    Valid(String),
    Invalid,
}

impl NormalizedEmail {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NormalizedEmail::Valid(s) => Some(s),
            NormalizedEmail::Invalid => None,
        }
    }

    /// Part after the `@`.
    pub fn domain(&self) -> Option<&str> {
        self.as_str()
            .and_then(|s| s.rsplit_once('@'))
            .map(|(_, d)| d)
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, NormalizedEmail::Valid(_))
    }

    pub fn matches(&self, other: &NormalizedEmail) -> bool {
        match (self, other) {
            (NormalizedEmail::Valid(a), NormalizedEmail::Valid(b)) => a == b,
            _ => false,
        }
    }
}

/// Trim + lowercase. Exactly one `@`, non-empty local and domain parts, no
/// interior whitespace.
pub fn normalize_email(raw: &str) -> NormalizedEmail {
    let s = raw.trim().to_lowercase();
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return NormalizedEmail::Invalid;
    }
    let mut parts = s.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return NormalizedEmail::Invalid;
    };
    if local.is_empty() || domain.is_empty() {
        return NormalizedEmail::Invalid;
    }
    NormalizedEmail::Valid(s)
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// A normalized domain filter entry.
///
/// `Wildcard("example.com")` is the pattern `*.example.com`: it matches any
/// strict subdomain at a label boundary, never the base domain itself.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DomainPattern {
    Exact(String),
    Wildcard(String),
    Invalid,
}

impl DomainPattern {
    pub fn is_valid(&self) -> bool {
        !matches!(self, DomainPattern::Invalid)
    }

    /// `domain` must already be normalized (see [`normalize_domain`]).
    pub fn matches(&self, domain: &str) -> bool {
        match self {
            DomainPattern::Exact(d) => d == domain,
            DomainPattern::Wildcard(base) => {
                domain.len() > base.len() + 1
                    && domain.ends_with(base.as_str())
                    && domain.as_bytes()[domain.len() - base.len() - 1] == b'.'
            }
            DomainPattern::Invalid => false,
        }
    }

    /// The concrete host name, if this is an exact (non-wildcard) domain.
    pub fn as_exact(&self) -> Option<&str> {
        match self {
            DomainPattern::Exact(d) => Some(d),
            _ => None,
        }
    }
}

impl std::fmt::Display for DomainPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainPattern::Exact(d) => f.write_str(d),
            DomainPattern::Wildcard(base) => write!(f, "*.{base}"),
            DomainPattern::Invalid => Ok(()),
        }
    }
}

impl From<DomainPattern> for String {
    fn from(p: DomainPattern) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for DomainPattern {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match normalize_domain(&s) {
            DomainPattern::Invalid => Err(format!("invalid domain pattern: {s:?}")),
            p => Ok(p),
        }
    }
}

/// Trim, lowercase, strip one leading `@` and trailing dots. A leading `*.`
/// yields a wildcard pattern.
pub fn normalize_domain(raw: &str) -> DomainPattern {
    let s = raw.trim().to_lowercase();
    let s = s.strip_prefix('@').unwrap_or(&s);
    let s = s.trim_end_matches('.');

    let (wildcard, host) = match s.strip_prefix("*.") {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    if !is_valid_host(host) {
        return DomainPattern::Invalid;
    }
    if wildcard {
        DomainPattern::Wildcard(host.to_string())
    } else {
        DomainPattern::Exact(host.to_string())
    }
}

fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host.split('.').all(|label| {
            !label.is_empty()
                && !label
                    .chars()
                    .any(|c| c.is_whitespace() || matches!(c, '@' | '*' | '/'))
        })
}

// ---------------------------------------------------------------------------
// IP address / CIDR range
// ---------------------------------------------------------------------------

/// A normalized IP filter entry. CIDR networks are stored with host bits
/// masked off, so `10.1.2.3/8` and `10.0.0.0/8` normalize identically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IpEntry {
    Exact(IpAddr),
    Cidr { network: IpAddr, prefix: u8 },
    Invalid,
}

impl IpEntry {
    pub fn is_valid(&self) -> bool {
        !matches!(self, IpEntry::Invalid)
    }

    /// Exact equality or prefix containment.
    ///
    /// An IPv4-mapped address (`::ffff:a.b.c.d`) is compared as IPv4 against
    /// exact entries and IPv4 ranges, and in its raw IPv6 form against IPv6
    /// ranges, so `::/0` still covers it.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let canonical = ip.to_canonical();
        match *self {
            IpEntry::Exact(addr) => addr == canonical,
            IpEntry::Cidr { network, prefix } => match (network, canonical, ip) {
                (IpAddr::V4(net), IpAddr::V4(v4), _) => {
                    let mask = mask_v4(prefix);
                    u32::from(v4) & mask == u32::from(net)
                }
                (IpAddr::V6(net), _, IpAddr::V6(v6)) => {
                    let mask = mask_v6(prefix);
                    u128::from(v6) & mask == u128::from(net)
                }
                _ => false,
            },
            IpEntry::Invalid => false,
        }
    }
}

impl std::fmt::Display for IpEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpEntry::Exact(addr) => write!(f, "{addr}"),
            IpEntry::Cidr { network, prefix } => write!(f, "{network}/{prefix}"),
            IpEntry::Invalid => Ok(()),
        }
    }
}

impl From<IpEntry> for String {
    fn from(e: IpEntry) -> Self {
        e.to_string()
    }
}

impl TryFrom<String> for IpEntry {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match parse_ip_or_range(&s) {
            IpEntry::Invalid => Err(format!("invalid ip entry: {s:?}")),
            e => Ok(e),
        }
    }
}

fn mask_v4(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn mask_v6(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

/// Parse an exact address or `addr/prefix` range.
///
/// IPv4-mapped IPv6 input is canonicalized to IPv4 (ranges only when the
/// prefix covers the mapping prefix).
pub fn parse_ip_or_range(raw: &str) -> IpEntry {
    let s = raw.trim();
    let Some((addr, prefix)) = s.split_once('/') else {
        return match s.parse::<IpAddr>() {
            Ok(ip) => IpEntry::Exact(ip.to_canonical()),
            Err(_) => IpEntry::Invalid,
        };
    };

    let (Ok(addr), Ok(prefix)) = (addr.trim().parse::<IpAddr>(), prefix.trim().parse::<u8>())
    else {
        return IpEntry::Invalid;
    };

    let (addr, prefix) = match (addr, addr.to_canonical()) {
        (IpAddr::V6(_), IpAddr::V4(v4)) if prefix >= 96 => (IpAddr::V4(v4), prefix - 96),
        _ => (addr, prefix),
    };

    match addr {
        IpAddr::V4(v4) if prefix <= 32 => IpEntry::Cidr {
            network: IpAddr::V4((u32::from(v4) & mask_v4(prefix)).into()),
            prefix,
        },
        IpAddr::V6(v6) if prefix <= 128 => IpEntry::Cidr {
            network: IpAddr::V6((u128::from(v6) & mask_v6(prefix)).into()),
            prefix,
        },
        _ => IpEntry::Invalid,
    }
}

// ---------------------------------------------------------------------------
// Country
// ---------------------------------------------------------------------------

/// ISO 3166-1 alpha-2 code, upper case.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CountryCode {
    Iso(String),
    Invalid,
}

impl CountryCode {
    pub fn is_valid(&self) -> bool {
        matches!(self, CountryCode::Iso(_))
    }

    pub fn matches(&self, other: &CountryCode) -> bool {
        match (self, other) {
            (CountryCode::Iso(a), CountryCode::Iso(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountryCode::Iso(c) => f.write_str(c),
            CountryCode::Invalid => Ok(()),
        }
    }
}

impl From<CountryCode> for String {
    fn from(c: CountryCode) -> Self {
        c.to_string()
    }
}

impl TryFrom<String> for CountryCode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match normalize_country(&s) {
            CountryCode::Invalid => Err(format!("invalid country code: {s:?}")),
            c => Ok(c),
        }
    }
}

pub fn normalize_country(raw: &str) -> CountryCode {
    let s = raw.trim();
    if s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()) {
        CountryCode::Iso(s.to_ascii_uppercase())
    } else {
        CountryCode::Invalid
    }
}
