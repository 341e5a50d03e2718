//! Autonomous System number ranges.

use std::fmt;

/// Private-use ASN ranges (RFC 6996), both inclusive
pub const PRIVATE_ASN_RANGES: [AsnRange; 2] = [
    AsnRange { min: 64_512, max: 65_534 },
    AsnRange { min: 4_200_000_000, max: 4_294_967_294 },
];

/// Inclusive range of ASNs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsnRange {
    pub min: u32,
    pub max: u32,
}

impl AsnRange {
    pub fn contains(&self, asn: u64) -> bool {
        u64::from(self.min) <= asn && asn <= u64::from(self.max)
    }
}

impl fmt::Display for AsnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

pub fn is_private_asn(asn: u64) -> bool {
    PRIVATE_ASN_RANGES.iter().any(|range| range.contains(asn))
}

/// Check an ASN against the lab's configured range and the private ranges
///
/// # Examples
/// ```
/// use labgen::utils::asn::{asn_allowed, AsnRange};
///
/// let lab = AsnRange { min: 100, max: 200 };
/// assert!(asn_allowed(150, Some(&lab)));
/// assert!(asn_allowed(65001, None));
/// assert!(!asn_allowed(70000, Some(&lab)));
/// ```
pub fn asn_allowed(asn: u64, configured: Option<&AsnRange>) -> bool {
    configured.map_or(false, |range| range.contains(asn)) || is_private_asn(asn)
}
