use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// IPv4 utility functions for parsing and host enumeration

/// Parse a dotted-quad IPv4 address
pub fn parse_ipv4(value: &str) -> Result<Ipv4Addr, String> {
    value
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| format!("'{}' is not a valid IPv4 address", value))
}

/// Parse an IPv4 prefix in CIDR notation. Host bits are allowed.
pub fn parse_cidr(value: &str) -> Result<Ipv4Net, String> {
    let value = value.trim();
    if !value.contains('/') {
        return Err(format!("'{}' is missing a prefix length (expected a.b.c.d/len)", value));
    }
    value
        .parse::<Ipv4Net>()
        .map_err(|_| format!("'{}' is not a valid IPv4 CIDR", value))
}

/// Parse an IPv4 network in CIDR notation; host bits must be zero.
///
/// # Examples
/// ```
/// use labgen::utils::ip_utils::parse_network;
///
/// assert!(parse_network("10.0.0.0/29").is_ok());
/// assert!(parse_network("10.0.0.1/29").is_err());
/// ```
pub fn parse_network(value: &str) -> Result<Ipv4Net, String> {
    let net = parse_cidr(value)?;
    if net.trunc() != net {
        return Err(format!(
            "'{}' has host bits set (did you mean {}?)",
            value.trim(),
            net.trunc()
        ));
    }
    Ok(net)
}

/// Number of usable host addresses: 2^(32 - prefix length) - 2.
///
/// The network and broadcast addresses are never usable, so /31 and /32
/// have no usable hosts.
pub fn usable_host_count(net: &Ipv4Net) -> u64 {
    (1u64 << (32 - u32::from(net.prefix_len()))).saturating_sub(2)
}

/// Usable host addresses of a network in ascending order, excluding the
/// network and broadcast addresses
pub fn usable_hosts(net: &Ipv4Net) -> impl Iterator<Item = Ipv4Addr> {
    let first = u32::from(net.network());
    let count = usable_host_count(net) as u32;
    (1..=count).map(move |offset| Ipv4Addr::from(first + offset))
}

/// Smallest network, no longer than `max_prefix_len`, holding every given
/// address. `None` when there are no addresses.
///
/// # Examples
/// ```
/// use labgen::utils::ip_utils::covering_network;
/// use std::net::Ipv4Addr;
///
/// let addresses = [Ipv4Addr::new(172, 30, 0, 11), Ipv4Addr::new(172, 30, 0, 13)];
/// assert_eq!(covering_network(&addresses, 24).unwrap().to_string(), "172.30.0.0/24");
/// ```
pub fn covering_network(addresses: &[Ipv4Addr], max_prefix_len: u8) -> Option<Ipv4Net> {
    let low = addresses.iter().map(|ip| u32::from(*ip)).min()?;
    let high = addresses.iter().map(|ip| u32::from(*ip)).max()?;
    let common = (low ^ high).leading_zeros() as u8;
    Ipv4Net::new(Ipv4Addr::from(low), common.min(max_prefix_len).min(32))
        .ok()
        .map(|net| net.trunc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_host_count() {
        let cases = [
            ("10.0.0.0/24", 254),
            ("10.0.0.0/29", 6),
            ("10.0.0.0/30", 2),
            ("10.0.0.0/31", 0),
            ("10.0.0.1/32", 0),
            ("0.0.0.0/0", 4_294_967_294),
        ];
        for (cidr, expected) in cases {
            let net: Ipv4Net = cidr.parse().unwrap();
            assert_eq!(usable_host_count(&net), expected, "usable hosts of {}", cidr);
        }
    }

    #[test]
    fn test_usable_hosts_skip_network_and_broadcast() {
        let net: Ipv4Net = "10.0.0.0/29".parse().unwrap();
        let hosts: Vec<String> = usable_hosts(&net).map(|ip| ip.to_string()).collect();
        assert_eq!(
            hosts,
            vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5", "10.0.0.6"]
        );

        let tiny: Ipv4Net = "10.0.0.0/31".parse().unwrap();
        assert_eq!(usable_hosts(&tiny).count(), 0);
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_ipv4("1.1.1.1").is_ok());
        assert!(parse_ipv4("1.1.1").is_err());
        assert!(parse_cidr("10.0.0.1/29").is_ok());
        assert!(parse_cidr("10.0.0.0").unwrap_err().contains("prefix length"));
        assert!(parse_cidr("10.0.0.0/33").is_err());
        assert!(parse_network("10.0.0.1/29").unwrap_err().contains("10.0.0.0/29"));
    }

    #[test]
    fn test_covering_network() {
        let ip = |text: &str| text.parse::<Ipv4Addr>().unwrap();

        let close = [ip("172.30.0.11"), ip("172.30.0.200")];
        assert_eq!(covering_network(&close, 24).unwrap().to_string(), "172.30.0.0/24");

        let spread = [ip("172.30.0.11"), ip("172.30.9.12")];
        assert_eq!(covering_network(&spread, 24).unwrap().to_string(), "172.30.0.0/20");

        let unrelated = [ip("10.0.0.1"), ip("192.168.0.1")];
        assert_eq!(covering_network(&unrelated, 24).unwrap().to_string(), "0.0.0.0/0");

        assert_eq!(covering_network(&[], 24), None);
    }
}
