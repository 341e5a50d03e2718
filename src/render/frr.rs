//! FRR configuration files.
//!
//! One `frr.conf` and one `daemons` file per router. The configuration
//! is written out line by line; every section appears in a fixed order so
//! identical topologies give identical files.

use super::GeneratorSession;
use crate::error::GenerateError;
use crate::topology::{PropagationScope, Router};
use std::collections::{BTreeMap, BTreeSet};

/// FRR release the generated configuration targets
pub const FRR_VERSION: &str = "8.4.1";

const ROUTE_MAP_LIMITED: &str = "SCOPE-LIMITED";
const ROUTE_MAP_NONE: &str = "SCOPE-NONE";

/// Route-map attached to `network` statements of the given scope
fn scope_route_map(scope: PropagationScope) -> Option<(&'static str, &'static str)> {
    match scope {
        PropagationScope::Full => None,
        PropagationScope::Limited => Some((ROUTE_MAP_LIMITED, "no-export")),
        PropagationScope::Suppressed => Some((ROUTE_MAP_NONE, "no-advertise")),
    }
}

/// Name of the outbound route-map implementing an export policy
pub fn export_route_map(policy: &str) -> String {
    format!("EXPORT-{}", policy)
}

/// Render `frr.conf` for one router.
pub fn render_frr_conf(session: &GeneratorSession, router: &Router) -> Result<String, GenerateError> {
    let topology = session.topology();
    let role = topology.role_of(router).ok_or_else(|| GenerateError::Render {
        artifact: format!("frr.conf of {}", router.name),
        message: format!("role '{}' is not defined", router.role),
    })?;
    let export_map = export_route_map(&role.export_policy);
    let sessions = session.peer_sessions(router)?;

    let scopes: BTreeMap<_, _> = topology
        .prefixes_owned_by(&router.name)
        .map(|owner| (owner.prefix, owner.scope))
        .collect();

    let mut conf = String::new();
    conf.push_str(&format!("frr version {}\n", FRR_VERSION));
    conf.push_str("frr defaults traditional\n");
    conf.push_str(&format!("hostname {}\n", router.name));
    conf.push_str("log stdout informational\n");
    conf.push_str("service integrated-vtysh-config\n");
    conf.push_str("!\n");

    // Interfaces
    for interface in session.interfaces(router) {
        conf.push_str(&format!("interface {}\n", interface.name));
        match &interface.link {
            Some(link) => conf.push_str(&format!(" description link {}\n", link)),
            None => conf.push_str(&format!(" description management ({})\n", interface.network)),
        }
        conf.push_str(&format!(" ip address {}\n", interface.cidr()));
        conf.push_str("!\n");
    }
    if let Some(loopback) = &router.loopback {
        conf.push_str("interface lo\n");
        conf.push_str(&format!(" ip address {}\n", loopback));
        conf.push_str("!\n");
    }

    // BGP
    conf.push_str(&format!("router bgp {}\n", router.asn));
    conf.push_str(&format!(" bgp router-id {}\n", router.router_id));
    conf.push_str(" no bgp ebgp-requires-policy\n");
    conf.push_str(&format!(" bgp default local-preference {}\n", role.local_pref));
    for peer in &sessions {
        conf.push_str(&format!(" neighbor {} remote-as {}\n", peer.remote_address, peer.neighbor_asn));
        conf.push_str(&format!(
            " neighbor {} description {} via {}\n",
            peer.remote_address, peer.neighbor, peer.link
        ));
    }
    conf.push_str(" !\n");
    conf.push_str(" address-family ipv4 unicast\n");

    let mut used_scopes = BTreeSet::new();
    for network in &router.networks {
        let scope = scopes.get(network).copied().unwrap_or_default();
        match scope_route_map(scope) {
            Some((route_map, _)) => {
                used_scopes.insert(scope);
                conf.push_str(&format!("  network {} route-map {}\n", network, route_map));
            }
            None => conf.push_str(&format!("  network {}\n", network)),
        }
    }
    for peer in &sessions {
        conf.push_str(&format!("  neighbor {} send-community\n", peer.remote_address));
        conf.push_str(&format!("  neighbor {} route-map {} out\n", peer.remote_address, export_map));
    }
    conf.push_str(" exit-address-family\n");
    conf.push_str("exit\n");
    conf.push_str("!\n");

    // Route-maps
    for scope in used_scopes {
        if let Some((route_map, community)) = scope_route_map(scope) {
            conf.push_str(&format!("route-map {} permit 10\n", route_map));
            conf.push_str(&format!(" set community {} additive\n", community));
            conf.push_str("exit\n");
            conf.push_str("!\n");
        }
    }
    if !sessions.is_empty() {
        conf.push_str(&format!("route-map {} permit 10\n", export_map));
        conf.push_str("exit\n");
        conf.push_str("!\n");
    }

    conf.push_str("line vty\n");
    conf.push_str("!\n");
    conf.push_str("end\n");
    Ok(conf)
}

/// Render the `daemons` file. Only zebra and bgpd run.
pub fn render_daemons() -> String {
    let mut daemons = String::new();
    for (daemon, enabled) in [
        ("zebra", true),
        ("bgpd", true),
        ("ospfd", false),
        ("ospf6d", false),
        ("ripd", false),
        ("ripngd", false),
        ("isisd", false),
        ("pimd", false),
        ("ldpd", false),
        ("nhrpd", false),
        ("eigrpd", false),
        ("babeld", false),
        ("sharpd", false),
        ("pbrd", false),
        ("bfdd", false),
        ("fabricd", false),
        ("vrrpd", false),
    ] {
        daemons.push_str(&format!("{}={}\n", daemon, if enabled { "yes" } else { "no" }));
    }
    daemons.push('\n');
    daemons.push_str("vtysh_enable=yes\n");
    daemons.push_str("zebra_options=\"  -A 127.0.0.1 -s 90000000\"\n");
    daemons.push_str("bgpd_options=\"   -A 127.0.0.1\"\n");
    daemons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::allocate;
    use crate::render::tests::{topology, LAB};

    fn conf_of(router: &str) -> String {
        let topology = topology(LAB);
        let plan = allocate(&topology).unwrap();
        let session = GeneratorSession::new(&topology, &plan);
        render_frr_conf(&session, &topology.routers[router]).unwrap()
    }

    #[test]
    fn test_frr_conf_sections() {
        let conf = conf_of("r1");
        assert!(conf.starts_with("frr version 8.4.1\nfrr defaults traditional\nhostname r1\n"));
        assert!(conf.contains("interface eth0\n description management (lab_mgmt)\n ip address 172.30.0.11/24\n"));
        assert!(conf.contains("interface eth1\n description link fabric-a\n ip address 10.0.0.1/29\n"));
        assert!(conf.contains("interface lo\n ip address 1.1.1.1/32\n"));
        assert!(conf.contains("router bgp 65001\n bgp router-id 1.1.1.1\n"));
        assert!(conf.contains(" neighbor 10.0.0.2 remote-as 65002\n"));
        assert!(conf.contains(" neighbor 10.0.0.2 description r2 via fabric-a\n"));
        assert!(conf.contains("  neighbor 10.0.0.2 route-map EXPORT-customer out\n"));
        assert!(conf.ends_with("line vty\n!\nend\n"));

        let interface_at = conf.find("interface eth1").unwrap();
        let bgp_at = conf.find("router bgp").unwrap();
        let route_map_at = conf.find("route-map EXPORT-customer permit").unwrap();
        assert!(interface_at < bgp_at && bgp_at < route_map_at);
    }

    #[test]
    fn test_scoped_networks_get_route_maps() {
        let conf = conf_of("r1");
        assert!(conf.contains("  network 10.10.1.0/24\n"));
        assert!(conf.contains("  network 10.10.2.0/24 route-map SCOPE-LIMITED\n"));
        assert!(conf.contains("route-map SCOPE-LIMITED permit 10\n set community no-export additive\n"));
        assert!(!conf.contains("SCOPE-NONE"));
    }

    #[test]
    fn test_ownership_of_other_router_does_not_apply() {
        // r3 announces r1's prefix without owning it
        let conf = conf_of("r3");
        assert!(conf.contains("  network 10.10.1.0/24\n"));
        assert!(!conf.contains("SCOPE-"));
        assert!(conf.contains("bgp default local-preference 100\n"));
        assert!(!conf.contains("interface lo"));
    }

    #[test]
    fn test_transit_local_pref_and_sessions() {
        let conf = conf_of("r2");
        assert!(conf.contains("bgp default local-preference 200\n"));
        assert!(conf.contains(" neighbor 10.0.0.1 remote-as 65001\n"));
        assert!(conf.contains(" neighbor 10.0.0.10 remote-as 65003\n"));
        assert!(conf.contains("interface eth2\n description link fabric-b\n ip address 10.0.0.9/30\n"));
        assert!(conf.contains("route-map EXPORT-provider permit 10\n"));
    }

    #[test]
    fn test_daemons_file() {
        let daemons = render_daemons();
        assert!(daemons.starts_with("zebra=yes\nbgpd=yes\n"));
        assert!(daemons.contains("ospfd=no\n"));
        assert!(daemons.contains("vtysh_enable=yes\n"));
    }
}
