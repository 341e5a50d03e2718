//! Shared utilities: ASN ranges, IPv4 helpers, configuration validation.

pub mod asn;
pub mod ip_utils;
pub mod validation;

pub use asn::{asn_allowed, is_private_asn, AsnRange, PRIVATE_ASN_RANGES};
pub use ip_utils::{
    covering_network, parse_cidr, parse_ipv4, parse_network, usable_host_count, usable_hosts,
};
pub use validation::validate;
