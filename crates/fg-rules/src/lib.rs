//! fg-rules
//!
//! Rule model for merchant fraud filtering.
//!
//! Responsibilities:
//! - Typed rule categories (email blacklist, geo, IP, domain, first order)
//! - Total normalization helpers shared by the snapshot builder and admin validation
//! - Exact decimal money for order-value thresholds
//!
//! Deterministic, pure logic. No IO, no time, no store calls.

mod money;
mod normalize;
mod types;

pub use money::Money;
pub use normalize::{
    normalize_country, normalize_domain, normalize_email, parse_ip_or_range, CountryCode,
    DomainPattern, IpEntry, NormalizedEmail,
};
pub use types::*;
